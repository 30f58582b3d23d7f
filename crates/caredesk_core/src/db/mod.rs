//! Local document database bootstrap.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - No document is read or written before every migration has applied.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};
pub use rusqlite::Connection;

pub type DbResult<T> = Result<T, DbError>;

/// Failure to produce a usable document database connection.
#[derive(Debug)]
pub enum DbError {
    /// The file could not be opened or configured.
    Open(rusqlite::Error),
    /// One migration step failed; earlier steps stay applied.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The file was written by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
}

impl DbError {
    /// Stable metadata-only code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Open(_) => "db_open_failed",
            Self::Migration { .. } => "db_migration_failed",
            Self::SchemaTooNew { .. } => "db_schema_too_new",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(err) => write!(f, "cannot open document database: {err}"),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "migration {version:04} `{name}` failed: {source}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "document database is at schema {found}; this build supports up to {supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}
