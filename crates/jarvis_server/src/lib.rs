//! HTTP facade over the Jarvis note service.
//!
//! # Responsibility
//! - Own the single SQLite connection behind a mutex.
//! - Expose the note routes and their status-code contract.

pub mod config;
pub mod error;
pub mod routes;

use jarvis_core::{NoteService, NoteStore, RepoResult, SqliteNoteRepository};
use parking_lot::Mutex;
use rusqlite::Connection;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use routes::configure;

/// Shared application state.
pub struct AppState {
    store: Mutex<NoteStore>,
}

impl AppState {
    /// Wraps a connection already returned by `jarvis_core::db::open_db*`.
    ///
    /// The partition schema is verified here, once per process.
    pub fn new(conn: Connection) -> RepoResult<Self> {
        Ok(Self {
            store: Mutex::new(NoteStore::try_new(conn)?),
        })
    }

    /// Runs `op` against a service bound to the locked connection.
    ///
    /// Blocks; call from a blocking worker, not the async executor.
    pub fn with_service<T, F>(&self, op: F) -> RepoResult<T>
    where
        F: FnOnce(&mut NoteService<SqliteNoteRepository<'_>>) -> RepoResult<T>,
    {
        let mut store = self.store.lock();
        let mut service = NoteService::new(store.repository());
        op(&mut service)
    }
}
