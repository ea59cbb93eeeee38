use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{
    ClassDetails, ClassId, ClassListing, ClassType, ClassTypeId, Instructor, InstructorId, Level,
    LevelId, Price, ScheduledClass,
};
use crate::domain::port::{ClassCatalogRepository, ClassChange, ClassQuery, RepositoryError, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, QueryBuilder, Row, Transaction};

/// 開催クラスの取得に使う列（fitness_classesの別名は c）
const CLASS_COLUMNS: &str = "c.id, c.class_type_id, c.level_id, c.instructor_id, \
     c.start_time, c.end_time, c.duration_minutes, c.max_capacity, c.price_cents, \
     c.is_active, c.is_cancelled";

const LISTING_SELECT: &str = "SELECT c.id, c.class_type_id, c.level_id, c.instructor_id, \
     c.start_time, c.end_time, c.duration_minutes, c.max_capacity, c.price_cents, \
     c.is_active, c.is_cancelled, \
     ct.name AS class_type_name, l.name AS level_name, i.display_name AS instructor_name \
     FROM fitness_classes c \
     JOIN class_types ct ON ct.id = c.class_type_id \
     JOIN levels l ON l.id = c.level_id \
     LEFT JOIN instructors i ON i.id = c.instructor_id";

pub(crate) fn column<'r, T>(row: &'r MySqlRow, name: &str) -> Result<T, DatabaseError>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get(name)
        .map_err(|e| DatabaseError::DecodeError(format!("列 {} の取得に失敗しました: {}", name, e)))
}

fn parse_id<T, F>(raw: &str, name: &str, parse: F) -> Result<T, DatabaseError>
where
    F: Fn(&str) -> Result<T, uuid::Error>,
{
    parse(raw).map_err(|e| DatabaseError::DecodeError(format!("{} の解析に失敗しました: {}", name, e)))
}

/// 行から開催クラスを再構築する
fn scheduled_class_from_row(row: &MySqlRow) -> Result<ScheduledClass, DatabaseError> {
    let id = parse_id(&column::<String>(row, "id")?, "クラスID", ClassId::from_string)?;
    let class_type_id = parse_id(
        &column::<String>(row, "class_type_id")?,
        "クラス種別ID",
        ClassTypeId::from_string,
    )?;
    let level_id = parse_id(&column::<String>(row, "level_id")?, "レベルID", LevelId::from_string)?;
    let instructor_id = match column::<Option<String>>(row, "instructor_id")? {
        Some(raw) => Some(parse_id(&raw, "インストラクターID", InstructorId::from_string)?),
        None => None,
    };
    let price = Price::from_cents(column::<i64>(row, "price_cents")?)
        .map_err(|e| DatabaseError::DecodeError(format!("料金の解析に失敗しました: {}", e)))?;

    let details = ClassDetails {
        class_type_id,
        level_id,
        instructor_id,
        start_time: column::<DateTime<Utc>>(row, "start_time")?,
        end_time: column::<DateTime<Utc>>(row, "end_time")?,
        duration_minutes: column::<u32>(row, "duration_minutes")?,
        max_capacity: column::<u32>(row, "max_capacity")?,
        price,
    };

    Ok(ScheduledClass::reconstruct(
        id,
        details,
        column::<bool>(row, "is_active")?,
        column::<bool>(row, "is_cancelled")?,
    ))
}

/// クラス行を排他ロックして取得（最新のコミット済みの行を読む）
pub(crate) async fn lock_class(
    tx: &mut Transaction<'static, MySql>,
    class_id: ClassId,
) -> Result<Option<ScheduledClass>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM fitness_classes c WHERE c.id = ? FOR UPDATE",
        CLASS_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(class_id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| DatabaseError::query("クラスのロックに失敗しました", e))?;

    row.as_ref().map(scheduled_class_from_row).transpose()
}

fn listing_from_row(row: &MySqlRow) -> Result<ClassListing, DatabaseError> {
    Ok(ClassListing {
        class: scheduled_class_from_row(row)?,
        class_type_name: column(row, "class_type_name")?,
        level_name: column(row, "level_name")?,
        instructor_name: column(row, "instructor_name")?,
    })
}

/// MySQLクラスカタログリポジトリ
pub struct MySqlClassRepository {
    pool: Pool<MySql>,
}

impl MySqlClassRepository {
    /// 新しいMySQLクラスカタログリポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClassCatalogRepository for MySqlClassRepository {
    async fn save(&self, class: &ScheduledClass) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO fitness_classes (
                id, class_type_id, level_id, instructor_id, start_time, end_time,
                duration_minutes, max_capacity, price_cents, is_active, is_cancelled
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                instructor_id = VALUES(instructor_id),
                start_time = VALUES(start_time),
                end_time = VALUES(end_time),
                duration_minutes = VALUES(duration_minutes),
                max_capacity = VALUES(max_capacity),
                price_cents = VALUES(price_cents),
                is_active = VALUES(is_active),
                is_cancelled = VALUES(is_cancelled)
            "#,
        )
        .bind(class.id().to_string())
        .bind(class.class_type_id().to_string())
        .bind(class.level_id().to_string())
        .bind(class.instructor_id().map(|id| id.to_string()))
        .bind(class.start_time())
        .bind(class.end_time())
        .bind(class.duration_minutes())
        .bind(class.max_capacity())
        .bind(class.price().cents())
        .bind(class.is_active())
        .bind(class.is_cancelled())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("クラスの保存に失敗しました", e))?;

        Ok(())
    }

    async fn update_class(
        &self,
        class_id: ClassId,
        change: ClassChange,
    ) -> Result<ScheduledClass, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DatabaseError::ConnectionError(format!("トランザクション開始に失敗しました: {}", e))
        })?;

        let mut class = lock_class(&mut tx, class_id)
            .await?
            .ok_or(StoreError::ClassNotFound(class_id))?;
        change(&mut class);

        // 管理操作で変わる列だけを更新する
        sqlx::query(
            "UPDATE fitness_classes SET instructor_id = ?, is_active = ?, is_cancelled = ? WHERE id = ?",
        )
        .bind(class.instructor_id().map(|id| id.to_string()))
        .bind(class.is_active())
        .bind(class.is_cancelled())
        .bind(class_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::query("クラスの更新に失敗しました", e))?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::query("コミットに失敗しました", e))?;
        Ok(class)
    }

    async fn find_by_id(&self, class_id: ClassId) -> Result<Option<ScheduledClass>, RepositoryError> {
        let sql = format!("SELECT {} FROM fitness_classes c WHERE c.id = ?", CLASS_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(class_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("クラスの取得に失敗しました", e))?;

        match row {
            Some(row) => Ok(Some(scheduled_class_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_listing(&self, class_id: ClassId) -> Result<Option<ClassListing>, RepositoryError> {
        let sql = format!("{} WHERE c.id = ?", LISTING_SELECT);
        let row = sqlx::query(&sql)
            .bind(class_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("クラスの取得に失敗しました", e))?;

        match row {
            Some(row) => Ok(Some(listing_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_listings(&self, query: ClassQuery) -> Result<Vec<ClassListing>, RepositoryError> {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(LISTING_SELECT);
        builder.push(" WHERE 1 = 1");

        if let Some(class_type_id) = query.class_type_id {
            builder
                .push(" AND c.class_type_id = ")
                .push_bind(class_type_id.to_string());
        }
        if let Some(level_id) = query.level_id {
            builder.push(" AND c.level_id = ").push_bind(level_id.to_string());
        }
        if let Some(instructor_id) = query.instructor_id {
            builder
                .push(" AND c.instructor_id = ")
                .push_bind(instructor_id.to_string());
        }
        if let Some(is_active) = query.is_active {
            builder.push(" AND c.is_active = ").push_bind(is_active);
        }
        if let (Some(is_upcoming), Some(now)) = (query.is_upcoming, query.now) {
            if is_upcoming {
                builder.push(" AND c.start_time > ").push_bind(now);
            } else {
                builder.push(" AND c.start_time <= ").push_bind(now);
            }
        }
        builder.push(" ORDER BY c.start_time ASC");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("クラス一覧の取得に失敗しました", e))?;

        let listings = rows
            .iter()
            .map(listing_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(listings)
    }

    async fn find_class_type(
        &self,
        class_type_id: ClassTypeId,
    ) -> Result<Option<ClassType>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, description, is_active FROM class_types WHERE id = ?")
            .bind(class_type_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("クラス種別の取得に失敗しました", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(ClassType {
            id: class_type_id,
            name: column(&row, "name")?,
            description: column(&row, "description")?,
            is_active: column(&row, "is_active")?,
        }))
    }

    async fn find_level(&self, level_id: LevelId) -> Result<Option<Level>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, description, difficulty_order FROM levels WHERE id = ?")
            .bind(level_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("レベルの取得に失敗しました", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Level {
            id: level_id,
            name: column(&row, "name")?,
            description: column(&row, "description")?,
            difficulty_order: column(&row, "difficulty_order")?,
        }))
    }

    async fn find_instructor(
        &self,
        instructor_id: InstructorId,
    ) -> Result<Option<Instructor>, RepositoryError> {
        let row = sqlx::query("SELECT id, display_name, is_active FROM instructors WHERE id = ?")
            .bind(instructor_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("インストラクターの取得に失敗しました", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Instructor {
            id: instructor_id,
            display_name: column(&row, "display_name")?,
            is_active: column(&row, "is_active")?,
        }))
    }

    fn next_identity(&self) -> ClassId {
        ClassId::new()
    }
}
