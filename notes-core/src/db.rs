use crate::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Statements run on every start. Each one is idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS notes (
        id         BLOB PRIMARY KEY NOT NULL,
        name       TEXT NOT NULL,
        date       TEXT NOT NULL,
        notes      TEXT NOT NULL,
        created_at TEXT NOT NULL,
        CONSTRAINT unique_name_date UNIQUE (name, date)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ix_notes_date ON notes (date)",
];

pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let path = shellexpand::full(&config.path)
        .map_err(|e| sqlx::Error::Configuration(e.to_string().into()))?;

    let options = SqliteConnectOptions::new()
        .filename(&*path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
}

/// Create the `notes` table and its indexes if they are missing.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("notes schema ready");
    Ok(())
}

/// Open the pool and make sure the schema exists.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let pool = create_pool(config).await?;
    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn health_check(pool: &SqlitePool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT sqlite_version()").fetch_one(pool).await?;
    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(dir: &tempfile::TempDir) -> DatabaseConfig {
        DatabaseConfig {
            path: dir.path().join("notes.db").to_string_lossy().into_owned(),
            max_connections: 2,
        }
    }

    #[tokio::test]
    async fn test_connect_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);

        let pool = connect(&config).await.expect("pool");
        assert!(dir.path().join("notes.db").exists(), "db file should be created");

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'notes'")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(tables.len(), 1);
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let pool = connect(&temp_config(&dir)).await.unwrap();

        init_schema(&pool).await.expect("second init must not fail");
        init_schema(&pool).await.expect("third init must not fail");
    }

    #[tokio::test]
    async fn test_health_check_reports_sqlite_version() {
        let dir = tempfile::tempdir().unwrap();
        let pool = connect(&temp_config(&dir)).await.unwrap();

        let version = health_check(&pool).await.unwrap();
        assert!(version.starts_with('3'), "unexpected sqlite version: {}", version);
    }

    #[tokio::test]
    async fn test_create_pool_fails_for_unreachable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir
                .path()
                .join("missing")
                .join("nested")
                .join("notes.db")
                .to_string_lossy()
                .into_owned(),
            max_connections: 1,
        };

        assert!(create_pool(&config).await.is_err());
    }
}
