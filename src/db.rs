use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Open (or create) the SQLite database at `path` and run migrations.
pub async fn initialize_db(path: &Path) -> Result<DbPool, Box<dyn std::error::Error + Send + Sync>> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)?;
    }
  }

  let db_url = format!("sqlite://{}?mode=rwc", path.display());

  info!(path = %path.display(), "initializing database");

  // Create connection pool
  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  // Run migrations
  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("database ready");

  Ok(pool)
}
