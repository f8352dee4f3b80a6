//! Note use-case service.
//!
//! # Responsibility
//! - Accept type names as strings and resolve them to partitions.
//! - Read notes back after writes so callers get the stored record.
//! - Emit one metadata-only log event per mutation.
//!
//! # Invariants
//! - Log lines never include note names or content.
//! - `list_all` always returns partitions in `NoteType::ALL` order.

use crate::model::note::{Note, NoteDraft, NoteId, NotePatch, NoteType};
use crate::repo::filter::NoteFilterParams;
use crate::repo::note_repo::{NoteRepository, RepoError, RepoResult};
use log::{error, info, warn};
use std::time::Instant;

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a note and returns the stored record.
    pub fn create_note(&mut self, draft: &NoteDraft) -> RepoResult<Note> {
        let started_at = Instant::now();
        let result = self.repo.create(draft).and_then(|id| {
            let kind = draft.note_type()?;
            self.repo.read(id, kind)?.ok_or_else(|| {
                RepoError::InvalidData(format!("created {kind} {id} missing on read-back"))
            })
        });
        log_outcome("note_create", draft.kind.as_deref(), None, started_at, &result);
        result
    }

    /// Gets one note by type name and id.
    pub fn get_note(&self, kind: &str, id: NoteId) -> RepoResult<Option<Note>> {
        self.repo.read(id, kind.parse()?)
    }

    /// Lists one partition.
    pub fn list_notes(&self, kind: &str) -> RepoResult<Vec<Note>> {
        self.repo.read_all(kind.parse()?)
    }

    /// Lists every partition, memos first, then events, then tasks.
    pub fn list_all(&self) -> RepoResult<Vec<Note>> {
        let mut notes = Vec::new();
        for kind in NoteType::ALL {
            notes.extend(self.repo.read_all(kind)?);
        }
        Ok(notes)
    }

    /// Lists notes of one partition matching raw query-string filters.
    pub fn filter_notes(&self, kind: &str, params: &NoteFilterParams) -> RepoResult<Vec<Note>> {
        let kind: NoteType = kind.parse()?;
        let filter = params.to_filter()?;
        self.repo.get_filtered(kind, &filter)
    }

    /// Applies a partial update and returns the stored record.
    pub fn update_note(&mut self, id: NoteId, patch: &NotePatch) -> RepoResult<Note> {
        let started_at = Instant::now();
        let result = self.repo.update(id, patch).and_then(|()| {
            let kind = patch.note_type()?;
            self.repo
                .read(id, kind)?
                .ok_or(RepoError::NotFound { kind, id })
        });
        log_outcome("note_update", patch.kind.as_deref(), Some(id), started_at, &result);
        result
    }

    /// Permanently deletes one note.
    pub fn delete_note(&mut self, kind: &str, id: NoteId) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = kind
            .parse::<NoteType>()
            .map_err(RepoError::from)
            .and_then(|kind| self.repo.delete(id, kind));
        log_outcome("note_delete", Some(kind), Some(id), started_at, &result);
        result
    }

    /// Clears one partition, or every partition when `kind` is `None`.
    pub fn delete_all(&mut self, kind: Option<&str>) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = kind
            .map(str::parse::<NoteType>)
            .transpose()
            .map_err(RepoError::from)
            .and_then(|kind| self.repo.delete_all(kind));
        log_outcome(
            "note_delete_all",
            Some(kind.unwrap_or("all")),
            None,
            started_at,
            &result,
        );
        result
    }
}

/// Id of the record an operation touched, when it returned one.
trait LoggedId {
    fn logged_id(&self) -> Option<NoteId>;
}

impl LoggedId for Note {
    fn logged_id(&self) -> Option<NoteId> {
        Some(self.id)
    }
}

impl LoggedId for () {
    fn logged_id(&self) -> Option<NoteId> {
        None
    }
}

fn log_outcome<T: LoggedId>(
    event: &str,
    kind: Option<&str>,
    id: Option<NoteId>,
    started_at: Instant,
    result: &RepoResult<T>,
) {
    let kind = kind.unwrap_or("-");
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(value) => {
            let id = display_id(value.logged_id().or(id));
            info!("event={event} module=service status=ok type={kind} id={id} duration_ms={duration_ms}");
        }
        Err(err) if err.is_client_error() || matches!(err, RepoError::NotFound { .. }) => {
            let id = display_id(id);
            warn!(
                "event={event} module=service status=rejected type={kind} id={id} duration_ms={duration_ms} error={err}"
            );
        }
        Err(err) => {
            let id = display_id(id);
            error!(
                "event={event} module=service status=error type={kind} id={id} duration_ms={duration_ms} error={err}"
            );
        }
    }
}

fn display_id(id: Option<NoteId>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}
