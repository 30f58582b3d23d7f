//! Submission lifecycle states.
//!
//! # Responsibility
//! - Define the finite status set for each submission kind.
//! - Provide the single `is_unread` predicate used by counters, list rows
//!   and detail badges.
//!
//! # Invariants
//! - A missing stored status is `New`, never an error.
//! - Staff may set any member of a kind's enum directly; the forward chain
//!   `new -> reviewed -> contacted|responded` is only what the UI offers.

use crate::model::submission::SubmissionKind;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Shared contract for per-kind status enums.
pub trait LifecycleStatus: Copy + Eq + Debug + 'static {
    /// Submission kind this status set belongs to.
    const KIND: SubmissionKind;
    /// Status assumed when the stored field is absent.
    const INITIAL: Self;
    /// Status set when staff opens an unread submission.
    const REVIEWED: Self;
    /// Status set after a reply email is sent successfully.
    const REPLIED: Self;

    /// Every member in lifecycle order.
    fn all() -> &'static [Self];

    /// Stored wire value (`new`, `reviewed`, ...).
    fn as_str(self) -> &'static str;

    /// Human-readable badge label.
    fn label(self) -> &'static str;

    /// Parses a stored wire value. Unknown values return `None`.
    fn parse(value: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == value)
    }
}

/// Job application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    New,
    Reviewed,
    Contacted,
    Hired,
    Rejected,
}

/// Contact inquiry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    New,
    Reviewed,
    Responded,
}

impl LifecycleStatus for ApplicationStatus {
    const KIND: SubmissionKind = SubmissionKind::Application;
    const INITIAL: Self = Self::New;
    const REVIEWED: Self = Self::Reviewed;
    const REPLIED: Self = Self::Contacted;

    fn all() -> &'static [Self] {
        &[
            Self::New,
            Self::Reviewed,
            Self::Contacted,
            Self::Hired,
            Self::Rejected,
        ]
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Reviewed => "reviewed",
            Self::Contacted => "contacted",
            Self::Hired => "hired",
            Self::Rejected => "rejected",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Reviewed => "Reviewed",
            Self::Contacted => "Contacted",
            Self::Hired => "Hired",
            Self::Rejected => "Rejected",
        }
    }
}

impl LifecycleStatus for InquiryStatus {
    const KIND: SubmissionKind = SubmissionKind::Inquiry;
    const INITIAL: Self = Self::New;
    const REVIEWED: Self = Self::Reviewed;
    const REPLIED: Self = Self::Responded;

    fn all() -> &'static [Self] {
        &[Self::New, Self::Reviewed, Self::Responded]
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Reviewed => "reviewed",
            Self::Responded => "responded",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Reviewed => "Reviewed",
            Self::Responded => "Responded",
        }
    }
}

/// Resolves a possibly-absent stored status into a concrete one.
pub fn effective_status<S: LifecycleStatus>(stored: Option<S>) -> S {
    stored.unwrap_or(S::INITIAL)
}

/// Unread means the stored status is absent or equal to the initial state.
pub fn is_unread<S: LifecycleStatus>(stored: Option<S>) -> bool {
    effective_status(stored) == S::INITIAL
}
