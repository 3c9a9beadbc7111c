//! Note store subsystem: durable notes keyed by `(name, date)`
//!
//! - `save` inserts with a single `INSERT ... ON CONFLICT DO NOTHING`, so the
//!   uniqueness check and the write are one atomic statement
//! - `list` returns every note in insertion order, unfiltered
//!
//! Each operation holds one pooled connection for its duration; the guard
//! returns it to the pool on every exit path.

use notes_core::models::{legacy_note_key, Note};
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("A note with this name and date already exists.")]
    DuplicateKey { name: String, date: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NoteStore {
    pool: SqlitePool,
}

impl NoteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a note unless one with the same `(name, date)` exists.
    ///
    /// Name and date are stored verbatim; neither is validated.
    pub async fn save(&self, name: &str, date: &str, notes: &str) -> Result<Note, StoreError> {
        let note = Note::new(name, date, notes);
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO notes (id, name, date, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (name, date) DO NOTHING
            "#,
        )
        .bind(note.id)
        .bind(&note.name)
        .bind(&note.date)
        .bind(&note.notes)
        .bind(note.created_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                key = %legacy_note_key(name, date),
                "Rejected duplicate note"
            );
            return Err(StoreError::DuplicateKey {
                name: name.to_string(),
                date: date.to_string(),
            });
        }

        tracing::info!(id = %note.id, "Saved note");
        Ok(note)
    }

    /// All notes, oldest insert first.
    pub async fn list(&self) -> Result<Vec<Note>, StoreError> {
        let mut conn = self.pool.acquire().await?;

        let notes = sqlx::query_as::<_, Note>(
            "SELECT id, name, date, notes, created_at FROM notes ORDER BY rowid",
        )
        .fetch_all(&mut *conn)
        .await?;

        tracing::debug!(count = notes.len(), "Listed notes");
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notes_core::config::DatabaseConfig;

    impl NoteStore {
        async fn exists(&self, name: &str, date: &str) -> Result<bool, StoreError> {
            let row: (bool,) =
                sqlx::query_as("SELECT EXISTS (SELECT 1 FROM notes WHERE name = ?1 AND date = ?2)")
                    .bind(name)
                    .bind(date)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(row.0)
        }
    }

    async fn temp_store() -> (tempfile::TempDir, NoteStore) {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("notes.db").to_string_lossy().into_owned(),
            max_connections: 4,
        };
        let pool = notes_core::db::connect(&config).await.unwrap();
        (dir, NoteStore::new(pool))
    }

    #[tokio::test]
    async fn test_list_empty_store() {
        let (_dir, store) = temp_store().await;
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_list_round_trip() {
        let (_dir, store) = temp_store().await;

        let saved = store.save("Alice", "2024-01-01", "felt better").await.unwrap();
        assert_eq!(saved.name, "Alice");

        let notes = store.list().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, saved.id);
        assert_eq!(notes[0].name, "Alice");
        assert_eq!(notes[0].date, "2024-01-01");
        assert_eq!(notes[0].notes, "felt better");
    }

    #[tokio::test]
    async fn test_duplicate_rejected_and_original_kept() {
        let (_dir, store) = temp_store().await;

        store.save("Alice", "2024-01-01", "first").await.unwrap();
        let second = store.save("Alice", "2024-01-01", "second").await;

        match second {
            Err(StoreError::DuplicateKey { name, date }) => {
                assert_eq!(name, "Alice");
                assert_eq!(date, "2024-01-01");
            }
            other => panic!("Expected DuplicateKey, got {:?}", other),
        }

        let notes = store.list().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].notes, "first");
    }

    #[tokio::test]
    async fn test_same_name_different_date_allowed() {
        let (_dir, store) = temp_store().await;

        store.save("Alice", "2024-01-01", "a").await.unwrap();
        store.save("Alice", "2024-01-02", "b").await.unwrap();
        store.save("Bob", "2024-01-01", "c").await.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_pairs_with_same_legacy_key_are_distinct() {
        let (_dir, store) = temp_store().await;

        store.save("A_1", "2", "one").await.unwrap();
        store.save("A", "1_2", "two").await.unwrap();

        let notes = store.list().await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(
            legacy_note_key(&notes[0].name, &notes[0].date),
            legacy_note_key(&notes[1].name, &notes[1].date)
        );
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let (_dir, store) = temp_store().await;

        for (name, date) in [("Zed", "2024-03-01"), ("Amy", "2023-01-01"), ("Kim", "2025-12-31")] {
            store.save(name, date, "n").await.unwrap();
        }

        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["Zed", "Amy", "Kim"]);
    }

    #[tokio::test]
    async fn test_empty_name_and_date_are_accepted() {
        let (_dir, store) = temp_store().await;

        store.save("", "", "no label").await.unwrap();
        assert!(store.exists("", "").await.unwrap());
        assert!(matches!(
            store.save("", "", "again").await,
            Err(StoreError::DuplicateKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_exists() {
        let (_dir, store) = temp_store().await;

        assert!(!store.exists("Alice", "2024-01-01").await.unwrap());
        store.save("Alice", "2024-01-01", "x").await.unwrap();
        assert!(store.exists("Alice", "2024-01-01").await.unwrap());
        assert!(!store.exists("Alice", "2024-01-02").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_duplicate_saves_one_wins() {
        let (_dir, store) = temp_store().await;

        let (a, b) = tokio::join!(
            store.save("Alice", "2024-01-01", "from a"),
            store.save("Alice", "2024-01-01", "from b"),
        );

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        let duplicates = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(StoreError::DuplicateKey { .. })))
            .count();

        assert_eq!(successes, 1, "a: {:?}, b: {:?}", a, b);
        assert_eq!(duplicates, 1, "a: {:?}, b: {:?}", a, b);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_surfaces_database_error() {
        let (_dir, store) = temp_store().await;
        store.pool().close().await;

        assert!(matches!(store.list().await, Err(StoreError::Database(_))));
        assert!(matches!(
            store.save("Alice", "2024-01-01", "x").await,
            Err(StoreError::Database(_))
        ));
    }
}
