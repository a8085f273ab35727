//! Database module - in-memory SQLite connection and schema

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

/// Create the database pool.
///
/// A single connection: SQLite in-memory databases are per-connection,
/// and the store relies on one writer serializing all access.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await
}

/// Apply the schema
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS predictions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    is_fraud INTEGER NOT NULL,
    fraud_prob REAL NOT NULL
);
"#;
