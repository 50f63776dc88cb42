use crate::error::CoreError;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

pub use sqlx::SqlitePool as DbPool;

/// Opens (creating if necessary) the SQLite database at `db_path`, applies
/// pending migrations, and returns the connection pool the repository runs
/// on. The parent directory is created when missing so a fresh deployment
/// needs no setup step.
pub async fn establish_connection(db_path: &str) -> Result<SqlitePool, CoreError> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    if !Path::new(db_path).exists() {
        tokio::fs::File::create(db_path).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_path)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
