pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod models;

pub use config::NotesConfig;
pub use error::NotesError;
pub use generation::{
    build_prompt, GenerateRequest, GenerationError, OpenAiChatClient, SummaryBackend,
    SummaryGenerator, SummaryPrompt, NOT_SPECIFIED,
};
pub use models::Note;
