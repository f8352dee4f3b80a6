//! Conjunctive note filters.
//!
//! # Invariants
//! - Every supplied predicate must hold (AND, never OR).
//! - Ranges are inclusive on both ends and need both ends.
//! - Tag matching is superset matching: a note must carry every requested
//!   tag and may carry more.

use crate::model::note::{normalize_tag, Note, NoteValidationError};
use crate::model::time::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, value: DateTime<Utc>) -> bool {
        self.start <= value && value <= self.end
    }
}

/// Typed filter consumed by the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub created: Option<TimeRange>,
    pub updated: Option<TimeRange>,
    /// Required tags; empty means no tag constraint.
    pub tags: Vec<String>,
}

impl NoteFilter {
    pub fn is_empty(&self) -> bool {
        self.created.is_none() && self.updated.is_none() && self.tags.is_empty()
    }

    /// In-memory evaluation of the same predicate the SQL query applies.
    pub fn matches(&self, note: &Note) -> bool {
        self.created.map_or(true, |range| range.contains(note.created))
            && self.updated.map_or(true, |range| range.contains(note.updated))
            && self.tags.iter().all(|tag| note.tags.contains(tag))
    }
}

/// Raw filter as it arrives in a query string.
///
/// `tags` is a comma-joined list, e.g. `work,project`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFilterParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

impl NoteFilterParams {
    /// Parses timestamps and splits the tag list.
    ///
    /// # Errors
    /// - `IncompleteRange` when only one end of a range is present.
    /// - `InvalidTimestamp` for unparseable range ends.
    pub fn to_filter(&self) -> Result<NoteFilter, NoteValidationError> {
        let created = parse_range(
            "created",
            ("created_start", self.created_start.as_deref()),
            ("created_end", self.created_end.as_deref()),
        )?;
        let updated = parse_range(
            "updated",
            ("updated_start", self.updated_start.as_deref()),
            ("updated_end", self.updated_end.as_deref()),
        )?;

        let mut tags: Vec<String> = Vec::new();
        if let Some(raw) = &self.tags {
            for piece in raw.split(',') {
                if piece.trim().is_empty() {
                    continue;
                }
                let tag = normalize_tag(piece)?;
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }

        Ok(NoteFilter {
            created,
            updated,
            tags,
        })
    }
}

fn parse_range(
    field: &'static str,
    (start_field, start): (&'static str, Option<&str>),
    (end_field, end): (&'static str, Option<&str>),
) -> Result<Option<TimeRange>, NoteValidationError> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => Ok(Some(TimeRange::new(
            parse_timestamp(start_field, start)?,
            parse_timestamp(end_field, end)?,
        ))),
        _ => Err(NoteValidationError::IncompleteRange(field)),
    }
}
