//! Note domain model.
//!
//! # Responsibility
//! - Define the shared note record and the `memo|event|task` payloads.
//! - Validate create/update input before it reaches storage.
//!
//! # Invariants
//! - `id` is assigned by storage and never changes.
//! - The variant (`type`) never changes after creation.
//! - `updated >= created`, and every successful mutation moves `updated`
//!   strictly forward.
//! - Tags are trimmed, non-blank, comma-free and unique per note.

use crate::model::time::{advance_past, parse_timestamp, TimestampOverflow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Partition-local note identifier.
///
/// Two notes of different types may share the same id.
pub type NoteId = i64;

/// Note variant discriminator. Each variant owns one storage partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    /// Free-form text with no extra fields.
    Memo,
    /// Something happening at a point in time.
    Event,
    /// Actionable item with an optional deadline.
    Task,
}

impl NoteType {
    /// Every known variant, in partition order.
    pub const ALL: [NoteType; 3] = [NoteType::Memo, NoteType::Event, NoteType::Task];

    /// Wire/storage name of the variant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memo => "memo",
            Self::Event => "event",
            Self::Task => "task",
        }
    }
}

impl Display for NoteType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteType {
    type Err = InvalidNoteType;

    /// Parses a type name, ignoring case and surrounding whitespace.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memo" => Ok(Self::Memo),
            "event" => Ok(Self::Event),
            "task" => Ok(Self::Task),
            _ => Err(InvalidNoteType(value.to_string())),
        }
    }
}

/// Unrecognized note type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidNoteType(pub String);

impl Display for InvalidNoteType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid note type: `{}`", self.0)
    }
}

impl Error for InvalidNoteType {}

/// Input rejected before it reached storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    /// The `type` value is not a known variant.
    InvalidType(InvalidNoteType),
    /// A required field is absent.
    MissingField(&'static str),
    /// `name` is empty or whitespace.
    BlankName,
    /// A timestamp string could not be parsed.
    InvalidTimestamp { field: &'static str, value: String },
    /// A field was supplied for a variant that does not have it.
    FieldNotAllowed { field: &'static str, kind: NoteType },
    /// A tag is empty or contains the `,` separator.
    InvalidTag(String),
    /// A patch tried to change an immutable field.
    ImmutableField(&'static str),
    /// Only one end of a filter range was supplied.
    IncompleteRange(&'static str),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidType(err) => write!(f, "{err}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::BlankName => write!(f, "name must not be empty"),
            Self::InvalidTimestamp { field, value } => {
                write!(f, "invalid timestamp `{value}` for field {field}")
            }
            Self::FieldNotAllowed { field, kind } => {
                write!(f, "field {field} is not allowed for {kind} notes")
            }
            Self::InvalidTag(tag) => write!(f, "invalid tag: `{tag}`"),
            Self::ImmutableField(field) => write!(f, "field {field} cannot be changed"),
            Self::IncompleteRange(field) => write!(
                f,
                "{field} range needs both {field}_start and {field}_end"
            ),
        }
    }
}

impl Error for NoteValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidType(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidNoteType> for NoteValidationError {
    fn from(value: InvalidNoteType) -> Self {
        Self::InvalidType(value)
    }
}

/// Variant-specific payload, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoteBody {
    Memo,
    Event {
        date: DateTime<Utc>,
    },
    Task {
        #[serde(default)]
        due_date: Option<DateTime<Utc>>,
        #[serde(default)]
        done: bool,
    },
}

impl NoteBody {
    /// Returns the variant discriminator for this payload.
    pub fn kind(&self) -> NoteType {
        match self {
            Self::Memo => NoteType::Memo,
            Self::Event { .. } => NoteType::Event,
            Self::Task { .. } => NoteType::Task,
        }
    }
}

/// Persisted note. Serializes flat: shared fields plus `type` and the
/// variant fields at the same level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(flatten)]
    pub body: NoteBody,
}

impl Note {
    pub fn kind(&self) -> NoteType {
        self.body.kind()
    }

    /// Moves `updated` to `now`, or one microsecond past its previous value
    /// when the clock has not advanced.
    ///
    /// Fails when `updated` already sits at the last representable instant.
    pub fn touch(&mut self, now: DateTime<Utc>) -> Result<(), TimestampOverflow> {
        self.updated = advance_past(self.updated, now)?;
        Ok(())
    }
}

/// Validated create input. Storage assigns `id` and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub name: String,
    pub content: String,
    pub tags: Vec<String>,
    pub body: NoteBody,
}

impl NewNote {
    pub fn kind(&self) -> NoteType {
        self.body.kind()
    }
}

/// Raw create request as received from callers.
///
/// Timestamps stay strings until `validate` so malformed values surface as
/// validation errors instead of decode failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

impl NoteDraft {
    /// Starts a draft for the given variant.
    pub fn new(kind: NoteType, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.as_str().to_string()),
            name: Some(name.into()),
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Resolves the target partition.
    pub fn note_type(&self) -> Result<NoteType, NoteValidationError> {
        let raw = self
            .kind
            .as_deref()
            .ok_or(NoteValidationError::MissingField("type"))?;
        Ok(raw.parse()?)
    }

    /// Checks required fields and parses timestamps.
    ///
    /// # Errors
    /// - `InvalidType` for an unknown `type`.
    /// - `MissingField`/`BlankName` for absent required fields.
    /// - `InvalidTimestamp` for unparseable `date`/`due_date`.
    /// - `FieldNotAllowed` for variant fields sent to another variant.
    pub fn validate(&self) -> Result<NewNote, NoteValidationError> {
        let kind = self.note_type()?;
        let name = self
            .name
            .as_deref()
            .ok_or(NoteValidationError::MissingField("name"))?;
        if name.trim().is_empty() {
            return Err(NoteValidationError::BlankName);
        }
        let content = self
            .content
            .clone()
            .ok_or(NoteValidationError::MissingField("content"))?;

        let body = match kind {
            NoteType::Memo => {
                reject_field(kind, "date", self.date.is_some())?;
                reject_field(kind, "due_date", self.due_date.is_some())?;
                reject_field(kind, "done", self.done.is_some())?;
                NoteBody::Memo
            }
            NoteType::Event => {
                reject_field(kind, "due_date", self.due_date.is_some())?;
                reject_field(kind, "done", self.done.is_some())?;
                let raw = self
                    .date
                    .as_deref()
                    .ok_or(NoteValidationError::MissingField("date"))?;
                NoteBody::Event {
                    date: parse_timestamp("date", raw)?,
                }
            }
            NoteType::Task => {
                reject_field(kind, "date", self.date.is_some())?;
                let due_date = self
                    .due_date
                    .as_deref()
                    .map(|raw| parse_timestamp("due_date", raw))
                    .transpose()?;
                NoteBody::Task {
                    due_date,
                    done: self.done.unwrap_or(false),
                }
            }
        };

        Ok(NewNote {
            name: name.to_string(),
            content,
            tags: normalize_tags(&self.tags)?,
            body,
        })
    }
}

/// Raw partial update. Absent fields leave the stored value untouched.
///
/// `due_date` distinguishes an absent key (`None`) from an explicit `null`
/// (`Some(None)`), which clears the deadline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

impl NotePatch {
    /// Starts an empty patch addressed to one partition.
    pub fn for_type(kind: NoteType) -> Self {
        Self {
            kind: Some(kind.as_str().to_string()),
            ..Self::default()
        }
    }

    /// Resolves the partition this patch targets. `type` is mandatory.
    pub fn note_type(&self) -> Result<NoteType, NoteValidationError> {
        let raw = self
            .kind
            .as_deref()
            .ok_or(NoteValidationError::MissingField("type"))?;
        Ok(raw.parse()?)
    }

    /// Merges this patch onto `current`.
    ///
    /// Returns the merged record; `current` is left as is so a failed
    /// validation never leaves a half-applied note behind. `updated` is not
    /// refreshed here; callers follow up with [`Note::touch`].
    pub fn apply(&self, current: &Note) -> Result<Note, NoteValidationError> {
        let kind = current.kind();
        if self.note_type()? != kind {
            return Err(NoteValidationError::ImmutableField("type"));
        }
        if self.id.is_some_and(|id| id != current.id) {
            return Err(NoteValidationError::ImmutableField("id"));
        }

        let mut next = current.clone();

        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(NoteValidationError::BlankName);
            }
            next.name = name.clone();
        }
        if let Some(content) = &self.content {
            next.content = content.clone();
        }
        if let Some(tags) = &self.tags {
            next.tags = normalize_tags(tags)?;
        }
        if let Some(raw) = &self.created {
            if parse_timestamp("created", raw)? != current.created {
                return Err(NoteValidationError::ImmutableField("created"));
            }
        }
        if let Some(raw) = &self.updated {
            // Parsed for validity only; `touch` supersedes it.
            parse_timestamp("updated", raw)?;
        }

        match &mut next.body {
            NoteBody::Memo => {
                reject_field(kind, "date", self.date.is_some())?;
                reject_field(kind, "due_date", self.due_date.is_some())?;
                reject_field(kind, "done", self.done.is_some())?;
            }
            NoteBody::Event { date } => {
                reject_field(kind, "due_date", self.due_date.is_some())?;
                reject_field(kind, "done", self.done.is_some())?;
                if let Some(raw) = &self.date {
                    *date = parse_timestamp("date", raw)?;
                }
            }
            NoteBody::Task { due_date, done } => {
                reject_field(kind, "date", self.date.is_some())?;
                match &self.due_date {
                    Some(Some(raw)) => *due_date = Some(parse_timestamp("due_date", raw)?),
                    Some(None) => *due_date = None,
                    None => {}
                }
                if let Some(value) = self.done {
                    *done = value;
                }
            }
        }

        Ok(next)
    }
}

/// Normalizes one tag: trims it and rejects blank or comma-bearing values.
pub fn normalize_tag(tag: &str) -> Result<String, NoteValidationError> {
    let trimmed = tag.trim();
    if trimmed.is_empty() || trimmed.contains(',') {
        return Err(NoteValidationError::InvalidTag(tag.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Normalizes a tag list, dropping duplicates but keeping first-seen order.
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, NoteValidationError> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let value = normalize_tag(tag)?;
        if !normalized.contains(&value) {
            normalized.push(value);
        }
    }
    Ok(normalized)
}

/// Maps a present key to `Some`, so `null` becomes `Some(None)`.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn reject_field(
    kind: NoteType,
    field: &'static str,
    present: bool,
) -> Result<(), NoteValidationError> {
    if present {
        return Err(NoteValidationError::FieldNotAllowed { field, kind });
    }
    Ok(())
}
