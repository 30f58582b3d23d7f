//! Dashboard use-case services.
//!
//! # Responsibility
//! - Orchestrate store and mailer calls into staff actions.
//! - Keep the CLI decoupled from storage and transport details.

pub mod export_service;
pub mod reply_service;
pub mod transition_service;
