use crate::adapter::database_error::DatabaseError;
use crate::adapter::driven::mysql_class_repository::{column, lock_class};
use crate::domain::error::DomainError;
use crate::domain::model::{
    Booking, BookingId, BookingRecord, BookingStatus, ClassId, ConfirmationToken, ScheduledClass,
    StatusCounts, UserId,
};
use crate::domain::port::{
    BookingQuery, BookingRepository, BookingTimeframe, BookingTransition, RepositoryError,
    StoreError,
};
use crate::domain::service::{BookingPolicy, CapacityEvaluator};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, QueryBuilder, Transaction};

const BOOKING_COLUMNS: &str = "b.id, b.user_id, b.class_id, b.status, b.booked_at, \
     b.confirmed_at, b.cancelled_at, b.confirmation_token, b.email_confirmed";

const COUNT_BY_STATUS_SQL: &str =
    "SELECT status, COUNT(*) AS booking_count FROM bookings WHERE class_id = ? GROUP BY status";

/// トランザクション内の集計（ロック読み取り）
/// REPEATABLE READでもスナップショットではなく最新のコミット済みの行を数える
const LOCKED_COUNT_BY_STATUS_SQL: &str =
    "SELECT status, COUNT(*) AS booking_count FROM bookings WHERE class_id = ? GROUP BY status FOR SHARE";

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        StoreError::Repository(RepositoryError::from(err))
    }
}

fn decode_failed(what: &str, error: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::DecodeError(format!("{}の解析に失敗しました: {}", what, error))
}

fn booking_from_row(row: &MySqlRow) -> Result<Booking, DatabaseError> {
    let id = BookingId::from_string(&column::<String>(row, "id")?)
        .map_err(|e| decode_failed("予約ID", e))?;
    let user_id = UserId::from_string(&column::<String>(row, "user_id")?)
        .map_err(|e| decode_failed("ユーザーID", e))?;
    let class_id = ClassId::from_string(&column::<String>(row, "class_id")?)
        .map_err(|e| decode_failed("クラスID", e))?;
    let status = BookingStatus::from_string(&column::<String>(row, "status")?)
        .map_err(|e| decode_failed("予約ステータス", e))?;

    Ok(Booking::reconstruct(BookingRecord {
        id,
        user_id,
        class_id,
        status,
        booked_at: column::<DateTime<Utc>>(row, "booked_at")?,
        confirmed_at: column::<Option<DateTime<Utc>>>(row, "confirmed_at")?,
        cancelled_at: column::<Option<DateTime<Utc>>>(row, "cancelled_at")?,
        confirmation_token: ConfirmationToken::from_string(column(row, "confirmation_token")?),
        email_confirmed: column(row, "email_confirmed")?,
    }))
}

/// MySQL予約リポジトリ
/// 予約の作成と状態遷移は、クラス行をロックしたトランザクションの中で行う
/// ロック順は常に クラス -> 予約
pub struct MySqlBookingRepository {
    pool: Pool<MySql>,
}

impl MySqlBookingRepository {
    /// 新しいMySQL予約リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, MySql>, DatabaseError> {
        self.pool.begin().await.map_err(|e| {
            DatabaseError::ConnectionError(format!("トランザクション開始に失敗しました: {}", e))
        })
    }

    async fn count_statuses<'e, E>(
        executor: E,
        sql: &'static str,
        class_id: ClassId,
    ) -> Result<StatusCounts, DatabaseError>
    where
        E: sqlx::Executor<'e, Database = MySql>,
    {
        let rows = sqlx::query(sql)
            .bind(class_id.to_string())
            .fetch_all(executor)
            .await
            .map_err(|e| DatabaseError::query("予約件数の集計に失敗しました", e))?;

        let mut counts = StatusCounts::default();
        for row in &rows {
            let status = BookingStatus::from_string(&column::<String>(row, "status")?)
                .map_err(|e| decode_failed("予約ステータス", e))?;
            let count = column::<i64>(row, "booking_count")?;
            counts.add(status, u32::try_from(count).unwrap_or(u32::MAX));
        }
        Ok(counts)
    }

    async fn has_active_booking(
        tx: &mut Transaction<'static, MySql>,
        user_id: UserId,
        class_id: ClassId,
    ) -> Result<bool, DatabaseError> {
        let row = sqlx::query(
            "SELECT id FROM bookings WHERE user_id = ? AND class_id = ? \
             AND status IN ('pending', 'confirmed') LIMIT 1 FOR SHARE",
        )
        .bind(user_id.to_string())
        .bind(class_id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| DatabaseError::query("重複予約の確認に失敗しました", e))?;

        Ok(row.is_some())
    }
}

#[async_trait]
impl BookingRepository for MySqlBookingRepository {
    async fn create_pending(&self, booking: &Booking) -> Result<ScheduledClass, StoreError> {
        let now = booking.booked_at();
        let mut tx = self.begin().await?;

        let class = lock_class(&mut tx, booking.class_id())
            .await?
            .ok_or(StoreError::ClassNotFound(booking.class_id()))?;
        let counts = Self::count_statuses(&mut *tx, LOCKED_COUNT_BY_STATUS_SQL, class.id()).await?;
        let has_active = Self::has_active_booking(&mut tx, booking.user_id(), class.id()).await?;

        let capacity = CapacityEvaluator::evaluate(&class, &counts, now);
        BookingPolicy::check_admission(&class, &capacity, has_active, now)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO bookings (
                id, user_id, class_id, status, booked_at, confirmed_at, cancelled_at,
                confirmation_token, email_confirmed
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(booking.id().to_string())
        .bind(booking.user_id().to_string())
        .bind(booking.class_id().to_string())
        .bind(booking.status().as_str())
        .bind(booking.booked_at())
        .bind(booking.confirmed_at())
        .bind(booking.cancelled_at())
        .bind(booking.confirmation_token().as_str())
        .bind(booking.email_confirmed())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if DatabaseError::is_unique_violation(&e) => {
                return Err(StoreError::Rejected(DomainError::DuplicateBooking));
            }
            Err(e) => return Err(DatabaseError::query("予約の登録に失敗しました", e).into()),
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::query("コミットに失敗しました", e))?;
        Ok(class)
    }

    async fn apply_transition(
        &self,
        booking_id: BookingId,
        now: DateTime<Utc>,
        transition: BookingTransition,
    ) -> Result<(Booking, ScheduledClass), StoreError> {
        let mut tx = self.begin().await?;

        // 予約の所属クラスは変わらないため、ロック前に読んでよい
        // 以降の読み取りはすべてロック読み取りで、この読み取りのスナップショットには依存しない
        let class_row = sqlx::query("SELECT class_id FROM bookings WHERE id = ?")
            .bind(booking_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DatabaseError::query("予約の取得に失敗しました", e))?
            .ok_or(StoreError::BookingNotFound(booking_id))?;
        let class_id = ClassId::from_string(&column::<String>(&class_row, "class_id")?)
            .map_err(|e| decode_failed("クラスID", e))?;

        let class = lock_class(&mut tx, class_id)
            .await?
            .ok_or(StoreError::ClassNotFound(class_id))?;

        let sql = format!("SELECT {} FROM bookings b WHERE b.id = ? FOR UPDATE", BOOKING_COLUMNS);
        let booking_row = sqlx::query(&sql)
            .bind(booking_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DatabaseError::query("予約のロックに失敗しました", e))?
            .ok_or(StoreError::BookingNotFound(booking_id))?;
        let mut booking = booking_from_row(&booking_row)?;

        let counts = Self::count_statuses(&mut *tx, LOCKED_COUNT_BY_STATUS_SQL, class_id).await?;
        let capacity = CapacityEvaluator::evaluate(&class, &counts, now);
        transition(&mut booking, &class, &capacity)?;

        sqlx::query(
            r#"
            UPDATE bookings
            SET status = ?, confirmed_at = ?, cancelled_at = ?, email_confirmed = ?
            WHERE id = ?
            "#,
        )
        .bind(booking.status().as_str())
        .bind(booking.confirmed_at())
        .bind(booking.cancelled_at())
        .bind(booking.email_confirmed())
        .bind(booking.id().to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::query("予約の更新に失敗しました", e))?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::query("コミットに失敗しました", e))?;

        Ok((booking, class))
    }

    async fn find_by_id(&self, booking_id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        let sql = format!("SELECT {} FROM bookings b WHERE b.id = ?", BOOKING_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(booking_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("予約の取得に失敗しました", e))?;

        Ok(row.as_ref().map(booking_from_row).transpose()?)
    }

    async fn find_active_by_user_and_class(
        &self,
        user_id: UserId,
        class_id: ClassId,
    ) -> Result<Option<Booking>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM bookings b WHERE b.user_id = ? AND b.class_id = ? \
             AND b.status IN ('pending', 'confirmed')",
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(class_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("予約の取得に失敗しました", e))?;

        Ok(row.as_ref().map(booking_from_row).transpose()?)
    }

    async fn count_by_status(&self, class_id: ClassId) -> Result<StatusCounts, RepositoryError> {
        Ok(Self::count_statuses(&self.pool, COUNT_BY_STATUS_SQL, class_id).await?)
    }

    async fn list(&self, query: BookingQuery) -> Result<Vec<Booking>, RepositoryError> {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new("SELECT ");
        builder
            .push(BOOKING_COLUMNS)
            .push(" FROM bookings b JOIN fitness_classes c ON c.id = b.class_id WHERE 1 = 1");

        if let Some(user_id) = query.user_id {
            builder.push(" AND b.user_id = ").push_bind(user_id.to_string());
        }

        match query.timeframe {
            BookingTimeframe::All => {
                builder.push(" ORDER BY b.booked_at DESC");
            }
            BookingTimeframe::Upcoming => {
                builder
                    .push(" AND b.status IN ('pending', 'confirmed') AND c.start_time > ")
                    .push_bind(query.now)
                    .push(" ORDER BY c.start_time ASC");
            }
            BookingTimeframe::History => {
                builder
                    .push(" AND c.start_time < ")
                    .push_bind(query.now)
                    .push(" ORDER BY c.start_time DESC");
            }
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("予約一覧の取得に失敗しました", e))?;

        let bookings = rows
            .iter()
            .map(booking_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bookings)
    }

    fn next_identity(&self) -> BookingId {
        BookingId::new()
    }
}
