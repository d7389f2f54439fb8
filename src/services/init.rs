//! Startup helpers: database connection and migrations.

use std::path::Path;

use anyhow::Result;

use crate::config::Config;

/// Redact userinfo from a database URL before logging it.
fn redact_db_url(db_url: &str) -> String {
    match db_url.find('@') {
        Some(at_pos) => format!("(redacted){}", &db_url[at_pos + 1..]),
        None => db_url.to_string(),
    }
}

/// Open the SQLite pool (creating the file and its parent directory when
/// missing) and run the migration set.
pub async fn init_db(config: &Config) -> Result<sqlx::SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Connecting to database: {}", redact_db_url(db_url));

    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database ready");

    Ok(pool)
}
