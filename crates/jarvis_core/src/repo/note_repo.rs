//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - CRUD and filter operations over the per-type note partitions.
//! - Keep tag link rows consistent with their note row.
//!
//! # Invariants
//! - Every mutation runs in one `IMMEDIATE` transaction; on any error the
//!   transaction is dropped and rolls back, so no partial write is visible.
//! - Write paths validate input before touching SQL.
//! - Read paths reject corrupt persisted rows instead of masking them.

use crate::db::DbError;
use crate::model::note::{
    InvalidNoteType, Note, NoteDraft, NoteId, NotePatch, NoteType, NoteValidationError,
};
use crate::model::time::{now_utc, TimestampOverflow};
use crate::repo::filter::NoteFilter;
use crate::repo::partition::{partition, Partition};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error taxonomy.
///
/// `Validation` and `InvalidType` are caller mistakes, `NotFound` is a
/// missing record, `Storage` and `InvalidData` are server-side failures.
#[derive(Debug)]
pub enum RepoError {
    Validation(NoteValidationError),
    InvalidType(InvalidNoteType),
    NotFound { kind: NoteType, id: NoteId },
    Storage(DbError),
    InvalidData(String),
}

impl RepoError {
    /// Whether the caller can fix the request and retry.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidType(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidType(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Storage(err) => write!(f, "storage error: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidType(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        match value {
            NoteValidationError::InvalidType(err) => Self::InvalidType(err),
            other => Self::Validation(other),
        }
    }
}

impl From<InvalidNoteType> for RepoError {
    fn from(value: InvalidNoteType) -> Self {
        Self::InvalidType(value)
    }
}

impl From<TimestampOverflow> for RepoError {
    fn from(value: TimestampOverflow) -> Self {
        Self::InvalidData(value.to_string())
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

/// Repository interface for note persistence.
pub trait NoteRepository {
    /// Validates and stores a new note, returning its partition-local id.
    fn create(&mut self, draft: &NoteDraft) -> RepoResult<NoteId>;
    /// Gets one note, `None` when the partition has no such id.
    fn read(&self, id: NoteId, kind: NoteType) -> RepoResult<Option<Note>>;
    /// Lists a whole partition ordered by id.
    fn read_all(&self, kind: NoteType) -> RepoResult<Vec<Note>>;
    /// Lists notes of one partition matching every predicate in `filter`.
    fn get_filtered(&self, kind: NoteType, filter: &NoteFilter) -> RepoResult<Vec<Note>>;
    /// Merges `patch` onto the stored note and refreshes `updated`.
    fn update(&mut self, id: NoteId, patch: &NotePatch) -> RepoResult<()>;
    /// Permanently removes one note and its tags.
    fn delete(&mut self, id: NoteId, kind: NoteType) -> RepoResult<()>;
    /// Clears one partition, or all of them when `kind` is `None`.
    fn delete_all(&mut self, kind: Option<NoteType>) -> RepoResult<()>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Wraps a migrated connection after checking the partition schema.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

/// Owned connection whose partition schema was verified once.
///
/// Long-lived owners (such as a server) keep one of these and borrow
/// repositories from it without repeating the schema check.
pub struct NoteStore {
    conn: Connection,
}

impl NoteStore {
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    pub fn repository(&mut self) -> SqliteNoteRepository<'_> {
        SqliteNoteRepository {
            conn: &mut self.conn,
        }
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create(&mut self, draft: &NoteDraft) -> RepoResult<NoteId> {
        let new_note = draft.validate()?;
        let target = partition(new_note.kind());
        let now = now_utc();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = target.insert(&tx, &new_note, now)?;
        write_tags(&tx, target, id, &new_note.tags)?;
        tx.commit()?;

        Ok(id)
    }

    fn read(&self, id: NoteId, kind: NoteType) -> RepoResult<Option<Note>> {
        load_note(self.conn, partition(kind), id)
    }

    fn read_all(&self, kind: NoteType) -> RepoResult<Vec<Note>> {
        self.get_filtered(kind, &NoteFilter::default())
    }

    fn get_filtered(&self, kind: NoteType, filter: &NoteFilter) -> RepoResult<Vec<Note>> {
        let target = partition(kind);
        let mut sql = format!("{} WHERE 1 = 1", target.select_sql());
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(range) = filter.created {
            sql.push_str(" AND created_at BETWEEN ? AND ?");
            bind_values.push(Value::Integer(range.start.timestamp_micros()));
            bind_values.push(Value::Integer(range.end.timestamp_micros()));
        }
        if let Some(range) = filter.updated {
            sql.push_str(" AND updated_at BETWEEN ? AND ?");
            bind_values.push(Value::Integer(range.start.timestamp_micros()));
            bind_values.push(Value::Integer(range.end.timestamp_micros()));
        }
        for tag in &filter.tags {
            sql.push_str(&format!(
                " AND EXISTS (
                    SELECT 1
                    FROM {tags} t
                    WHERE t.note_id = {table}.id
                      AND t.tag = ?
                )",
                tags = target.tag_table,
                table = target.table,
            ));
            bind_values.push(Value::Text(tag.clone()));
        }
        sql.push_str(" ORDER BY id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let mut note = target.decode_row(row)?;
            note.tags = load_tags(self.conn, target, note.id)?;
            notes.push(note);
        }

        Ok(notes)
    }

    fn update(&mut self, id: NoteId, patch: &NotePatch) -> RepoResult<()> {
        let kind = patch.note_type()?;
        let target = partition(kind);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = load_note(&tx, target, id)?.ok_or(RepoError::NotFound { kind, id })?;
        let mut next = patch.apply(&current)?;
        next.touch(now_utc())?;

        if target.overwrite(&tx, &next)? == 0 {
            return Err(RepoError::NotFound { kind, id });
        }
        if patch.tags.is_some() {
            tx.execute(
                &format!("DELETE FROM {} WHERE note_id = ?1;", target.tag_table),
                [id],
            )?;
            write_tags(&tx, target, id, &next.tags)?;
        }
        tx.commit()?;

        Ok(())
    }

    fn delete(&mut self, id: NoteId, kind: NoteType) -> RepoResult<()> {
        let target = partition(kind);
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            &format!("DELETE FROM {} WHERE note_id = ?1;", target.tag_table),
            [id],
        )?;
        let changed = tx.execute(&format!("DELETE FROM {} WHERE id = ?1;", target.table), [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind, id });
        }
        tx.commit()?;

        Ok(())
    }

    fn delete_all(&mut self, kind: Option<NoteType>) -> RepoResult<()> {
        let scope: Vec<NoteType> = match kind {
            Some(kind) => vec![kind],
            None => NoteType::ALL.to_vec(),
        };

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for kind in scope {
            let target = partition(kind);
            tx.execute_batch(&format!(
                "DELETE FROM {tags}; DELETE FROM {table};",
                tags = target.tag_table,
                table = target.table,
            ))?;
        }
        tx.commit()?;

        Ok(())
    }
}

fn load_note(conn: &Connection, target: &Partition, id: NoteId) -> RepoResult<Option<Note>> {
    let mut stmt = conn.prepare(&format!("{} WHERE id = ?1;", target.select_sql()))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        let mut note = target.decode_row(row)?;
        note.tags = load_tags(conn, target, id)?;
        return Ok(Some(note));
    }

    Ok(None)
}

fn load_tags(conn: &Connection, target: &Partition, id: NoteId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT tag FROM {} WHERE note_id = ?1 ORDER BY position ASC;",
        target.tag_table
    ))?;
    let mut rows = stmt.query([id])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(row.get(0)?);
    }
    Ok(tags)
}

fn write_tags(
    conn: &Connection,
    target: &Partition,
    id: NoteId,
    tags: &[String],
) -> RepoResult<()> {
    let sql = format!(
        "INSERT INTO {} (note_id, position, tag) VALUES (?1, ?2, ?3);",
        target.tag_table
    );
    for (position, tag) in tags.iter().enumerate() {
        let position = i64::try_from(position)
            .map_err(|_| RepoError::InvalidData(format!("tag position {position} overflows")))?;
        conn.execute(&sql, params![id, position, tag.as_str()])?;
    }
    Ok(())
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    for kind in NoteType::ALL {
        let target = partition(kind);
        if !table_exists(conn, target.table)? {
            return Err(DbError::MissingTable(target.table).into());
        }
        for column in target.columns() {
            if !table_has_column(conn, target.table, column)? {
                return Err(DbError::MissingColumn {
                    table: target.table,
                    column,
                }
                .into());
            }
        }

        if !table_exists(conn, target.tag_table)? {
            return Err(DbError::MissingTable(target.tag_table).into());
        }
        for column in ["note_id", "position", "tag"] {
            if !table_has_column(conn, target.tag_table, column)? {
                return Err(DbError::MissingColumn {
                    table: target.tag_table,
                    column,
                }
                .into());
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
