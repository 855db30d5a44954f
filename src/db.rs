// src/db.rs
use crate::error::AppResult;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub async fn create_db_pool(database_url: &str) -> AppResult<SqlitePool> {
    tracing::info!("Conectando a la base de datos: {}", database_url);

    // Crear si no existe; las claves foráneas quedan activas en cada conexión
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> AppResult<()> {
    tracing::info!("Ejecutando migraciones de la base de datos...");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Migraciones completadas.");
    Ok(())
}

/// Pool en memoria con una única conexión, para que todas las consultas vean la misma base.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("opciones sqlite")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to create test db");

    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

/// Pool de producción sobre un fichero temporal: varias conexiones y bloqueos reales de SQLite.
/// El directorio se borra al soltar el `TempDir`.
#[cfg(test)]
pub async fn file_test_pool() -> (SqlitePool, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create tempdir");
    let url = format!("sqlite://{}", dir.path().join("syllabus-test.db").display());
    let pool = create_db_pool(&url).await.expect("Failed to create file db");
    (pool, dir)
}
