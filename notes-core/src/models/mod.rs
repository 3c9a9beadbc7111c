pub mod note;

pub use note::{legacy_note_key, Note};
