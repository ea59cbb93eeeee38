use crate::adapter::database_error::DatabaseError;
use sqlx::{MySql, Pool};

// 実行順に並べる。各ファイルは1文のみで、何度実行しても結果が変わらない
const MIGRATIONS: [(&str, &str); 7] = [
    (
        "001_create_class_types_table",
        include_str!("../../migrations/001_create_class_types_table.sql"),
    ),
    (
        "002_create_levels_table",
        include_str!("../../migrations/002_create_levels_table.sql"),
    ),
    (
        "003_create_instructors_table",
        include_str!("../../migrations/003_create_instructors_table.sql"),
    ),
    (
        "004_create_fitness_classes_table",
        include_str!("../../migrations/004_create_fitness_classes_table.sql"),
    ),
    (
        "005_create_bookings_table",
        include_str!("../../migrations/005_create_bookings_table.sql"),
    ),
    (
        "006_seed_class_types",
        include_str!("../../migrations/006_seed_class_types.sql"),
    ),
    (
        "007_seed_levels",
        include_str!("../../migrations/007_seed_levels.sql"),
    ),
];

/// データベースマイグレーションを管理する構造体
pub struct DatabaseMigration {
    pool: Pool<MySql>,
}

impl DatabaseMigration {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// マイグレーションを実行
    /// べき等性を保証（CREATE TABLE IF NOT EXISTS / INSERT IGNORE）
    pub async fn run(&self) -> Result<(), DatabaseError> {
        for (name, migration_sql) in MIGRATIONS {
            tracing::debug!(migration = name, "running migration");
            sqlx::query(migration_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationError(format!("{} failed: {}", name, e)))?;
        }

        tracing::info!(count = MIGRATIONS.len(), "database migrations completed");
        Ok(())
    }
}
