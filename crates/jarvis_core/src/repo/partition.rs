//! Note type -> storage partition mapping.
//!
//! # Responsibility
//! - Map every `NoteType` to its table and tag link table.
//! - Encode/decode the variant-specific columns of each table.
//!
//! # Invariants
//! - Shared columns (`id, name, content, created_at, updated_at`) come first
//!   in every statement; variant columns follow in `variant_columns` order.
//! - Table names only ever come from this static mapping, never from input.

use crate::model::note::{NewNote, Note, NoteBody, NoteId, NoteType};
use crate::model::time::{from_storage, to_storage};
use crate::repo::note_repo::{RepoError, RepoResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

const SHARED_COLUMNS: [&str; 5] = ["id", "name", "content", "created_at", "updated_at"];

/// One note partition: a table plus its ordered tag link table.
#[derive(Debug)]
pub struct Partition {
    pub kind: NoteType,
    pub table: &'static str,
    pub tag_table: &'static str,
    pub variant_columns: &'static [&'static str],
}

static MEMOS: Partition = Partition {
    kind: NoteType::Memo,
    table: "memos",
    tag_table: "memo_tags",
    variant_columns: &[],
};

static EVENTS: Partition = Partition {
    kind: NoteType::Event,
    table: "events",
    tag_table: "event_tags",
    variant_columns: &["date"],
};

static TASKS: Partition = Partition {
    kind: NoteType::Task,
    table: "tasks",
    tag_table: "task_tags",
    variant_columns: &["due_date", "done"],
};

/// Returns the partition that stores notes of `kind`.
pub fn partition(kind: NoteType) -> &'static Partition {
    match kind {
        NoteType::Memo => &MEMOS,
        NoteType::Event => &EVENTS,
        NoteType::Task => &TASKS,
    }
}

impl Partition {
    /// Every column this partition reads and writes.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        SHARED_COLUMNS
            .iter()
            .copied()
            .chain(self.variant_columns.iter().copied())
    }

    /// `SELECT <columns> FROM <table>` without a trailing clause.
    pub fn select_sql(&self) -> String {
        let columns = self.columns().collect::<Vec<_>>().join(", ");
        format!("SELECT {columns} FROM {}", self.table)
    }

    /// Inserts the shared and variant columns, returning the assigned id.
    pub fn insert(
        &self,
        conn: &Connection,
        note: &NewNote,
        now: DateTime<Utc>,
    ) -> RepoResult<NoteId> {
        self.ensure_kind(note.kind())?;

        let mut columns = vec!["name", "content", "created_at", "updated_at"];
        columns.extend_from_slice(self.variant_columns);
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            self.table,
            columns.join(", ")
        );

        let stamp = to_storage(now);
        let mut values = vec![
            Value::Text(note.name.clone()),
            Value::Text(note.content.clone()),
            Value::Integer(stamp),
            Value::Integer(stamp),
        ];
        values.extend(variant_values(&note.body));

        conn.execute(&sql, params_from_iter(values))?;
        Ok(conn.last_insert_rowid())
    }

    /// Overwrites every mutable column of an existing row.
    ///
    /// Returns the number of rows changed (0 when the id is absent).
    pub fn overwrite(&self, conn: &Connection, note: &Note) -> RepoResult<usize> {
        self.ensure_kind(note.kind())?;

        let mut assignments = vec!["name = ?", "content = ?", "created_at = ?", "updated_at = ?"]
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        assignments.extend(
            self.variant_columns
                .iter()
                .map(|column| format!("{column} = ?")),
        );
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?;",
            self.table,
            assignments.join(", ")
        );

        let mut values = vec![
            Value::Text(note.name.clone()),
            Value::Text(note.content.clone()),
            Value::Integer(to_storage(note.created)),
            Value::Integer(to_storage(note.updated)),
        ];
        values.extend(variant_values(&note.body));
        values.push(Value::Integer(note.id));

        Ok(conn.execute(&sql, params_from_iter(values))?)
    }

    /// Decodes one row produced by `select_sql`. Tags are left empty.
    pub fn decode_row(&self, row: &Row<'_>) -> RepoResult<Note> {
        let id: NoteId = row.get("id")?;
        let body = match self.kind {
            NoteType::Memo => NoteBody::Memo,
            NoteType::Event => NoteBody::Event {
                date: decode_timestamp(self.table, "date", row.get("date")?)?,
            },
            NoteType::Task => NoteBody::Task {
                due_date: row
                    .get::<_, Option<i64>>("due_date")?
                    .map(|value| decode_timestamp(self.table, "due_date", value))
                    .transpose()?,
                done: decode_bool(self.table, "done", row.get("done")?)?,
            },
        };

        Ok(Note {
            id,
            name: row.get("name")?,
            content: row.get("content")?,
            tags: Vec::new(),
            created: decode_timestamp(self.table, "created_at", row.get("created_at")?)?,
            updated: decode_timestamp(self.table, "updated_at", row.get("updated_at")?)?,
            body,
        })
    }

    fn ensure_kind(&self, kind: NoteType) -> RepoResult<()> {
        if kind != self.kind {
            return Err(RepoError::InvalidData(format!(
                "{kind} note routed to `{}` partition",
                self.table
            )));
        }
        Ok(())
    }
}

fn variant_values(body: &NoteBody) -> Vec<Value> {
    match body {
        NoteBody::Memo => Vec::new(),
        NoteBody::Event { date } => vec![Value::Integer(to_storage(*date))],
        NoteBody::Task { due_date, done } => vec![
            due_date.map_or(Value::Null, |value| Value::Integer(to_storage(value))),
            Value::Integer(i64::from(*done)),
        ],
    }
}

fn decode_timestamp(table: &str, column: &str, value: i64) -> RepoResult<DateTime<Utc>> {
    from_storage(value).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "timestamp `{value}` out of range in {table}.{column}"
        ))
    })
}

fn decode_bool(table: &str, column: &str, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {table}.{column}"
        ))),
    }
}
