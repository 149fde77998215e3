//! Database migrations and initialization.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

/// Initialize the SQLite database with schema and pragmas.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_pragmas_conn(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully at {}", db_path);
    Ok(pool)
}

/// Run all database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");
    let schema_sql = include_str!("schema.sql");

    // Trigger bodies hold inner semicolons, so only a semicolon ending a line
    // terminates a statement.
    for statement in schema_sql.split(";\n") {
        let trimmed = statement.trim().trim_end_matches(';');
        if !trimmed.is_empty() && !is_comment_only(trimmed) {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }

    info!("Migrations completed successfully");
    Ok(())
}

fn is_comment_only(statement: &str) -> bool {
    statement
        .lines()
        .all(|line| line.trim().is_empty() || line.trim_start().starts_with("--"))
}

/// Configure SQLite pragmas for optimal performance and reliability.
async fn configure_pragmas_conn(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    use sqlx::Row;
    info!("Configuring SQLite pragmas...");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    // journal_mode returns the actual mode set; must use fetch to get result
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);
    info!("SQLite journal_mode set to: {}", journal_mode);

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    info!("SQLite pragmas configured");
    Ok(())
}
