//! Note domain model: one shared record, three variant payloads.
//!
//! # Responsibility
//! - Define canonical data structures used by repository and service code.
//! - Own input validation for create/update requests.
//!
//! # Invariants
//! - Every note belongs to exactly one `NoteType` partition.
//! - Deletion is permanent; there are no tombstones.

pub mod note;
pub mod time;
