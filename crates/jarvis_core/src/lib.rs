//! Core note storage for Jarvis.
//! This crate owns the note model, its validation rules and persistence.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, init_logging_with, logging_status, LogSettings};
pub use model::note::{
    InvalidNoteType, NewNote, Note, NoteBody, NoteDraft, NoteId, NotePatch, NoteType,
    NoteValidationError,
};
pub use repo::filter::{NoteFilter, NoteFilterParams, TimeRange};
pub use repo::note_repo::{
    NoteRepository, NoteStore, RepoError, RepoResult, SqliteNoteRepository,
};
pub use service::note_service::NoteService;

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
