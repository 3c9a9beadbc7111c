use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored session note. `(name, date)` is unique across the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub name: String,
    pub date: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(name: impl Into<String>, date: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            date: date.into(),
            notes: notes.into(),
            created_at: Utc::now(),
        }
    }
}

/// The `name_date` string older deployments used as the primary key.
///
/// Not injective: `("A_1", "2")` and `("A", "1_2")` both yield `"A_1_2"`.
/// Rows are keyed by `Note::id` instead; this is kept for diagnostics only.
pub fn legacy_note_key(name: &str, date: &str) -> String {
    format!("{}_{}", name, date)
}
