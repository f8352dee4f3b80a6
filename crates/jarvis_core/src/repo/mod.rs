//! Repository layer for note persistence.
//!
//! # Responsibility
//! - Define the note data-access contract.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Dispatch by note type goes through the explicit partition mapping.
//! - Repository APIs return semantic errors (`NotFound`, `Validation`,
//!   `InvalidType`) separately from storage failures.

pub mod filter;
pub mod note_repo;
pub mod partition;
