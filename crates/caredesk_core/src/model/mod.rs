//! Submission domain model.
//!
//! # Responsibility
//! - Define the two submission kinds and their lifecycle states.
//! - Keep the unread predicate in one place.
//!
//! # Invariants
//! - Every submission is identified by a store-assigned `SubmissionId`.
//! - Submissions are never deleted by the core.

pub mod status;
pub mod submission;
