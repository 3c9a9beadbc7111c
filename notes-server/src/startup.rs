//! Startup sequence for the HTTP server.
//!
//! The generation credential is checked before the SQLite file is touched, so
//! a refused start leaves nothing on disk.

use notes_core::{NotesConfig, NotesError, SummaryGenerator};

use crate::http::HttpState;
use crate::subsystems::notes::NoteStore;

/// Build the summary generator. Fails with `MissingApiKey` when no key is configured.
pub fn build_generator(config: &NotesConfig) -> Result<SummaryGenerator, NotesError> {
    Ok(SummaryGenerator::from_config(&config.openai)?)
}

/// Open the note store, creating the file and schema on first run.
pub async fn open_store(config: &NotesConfig) -> Result<NoteStore, NotesError> {
    let pool = notes_core::db::connect(&config.database).await?;
    tracing::info!(path = %config.database.path, "Opened note store");
    Ok(NoteStore::new(pool))
}

/// Everything the server needs before binding: generator, then store, then state.
pub async fn prepare_server(config: NotesConfig) -> Result<HttpState, NotesError> {
    let generator = build_generator(&config)?;
    let store = open_store(&config).await?;
    HttpState::new(store, generator, config)
}
