//! Schema steps for the document database.
//!
//! Each step runs in its own transaction together with its `user_version`
//! bump, so a failing step leaves the database at the previous version.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "documents",
    sql: include_str!("0001_documents.sql"),
}];

/// Newest schema version this build can open.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Schema version recorded in the database file.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
}

/// Brings the document schema up to `latest_version()`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    run_steps(conn, MIGRATIONS)
}

pub(crate) fn run_steps(conn: &mut Connection, steps: &[Migration]) -> DbResult<()> {
    let found = schema_version(conn).map_err(DbError::Open)?;
    let supported = steps.last().map_or(0, |step| step.version);
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    for step in steps.iter().filter(|step| step.version > found) {
        apply_step(conn, step).map_err(|source| {
            error!(
                "event=db_migrate module=db status=error version={} name={} error_code=db_migration_failed",
                step.version, step.name
            );
            DbError::Migration {
                version: step.version,
                name: step.name,
                source,
            }
        })?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    Ok(())
}

fn apply_step(conn: &mut Connection, step: &Migration) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::{run_steps, schema_version, Migration};
    use crate::db::DbError;
    use rusqlite::Connection;

    const STEPS: &[Migration] = &[
        Migration {
            version: 1,
            name: "first",
            sql: "CREATE TABLE first (id INTEGER);",
        },
        Migration {
            version: 2,
            name: "broken",
            sql: "CREATE TABLE second (id INTEGER); INSERT INTO missing VALUES (1);",
        },
    ];

    #[test]
    fn failing_step_keeps_earlier_steps_and_names_itself() {
        let mut conn = Connection::open_in_memory().unwrap();

        let err = run_steps(&mut conn, STEPS).unwrap_err();
        assert_eq!(err.code(), "db_migration_failed");
        assert!(matches!(err, DbError::Migration { version: 2, name: "broken", .. }));

        assert_eq!(schema_version(&conn).unwrap(), 1);
        let second_exists: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'second';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(second_exists, 0);
    }

    #[test]
    fn up_to_date_database_runs_nothing() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_steps(&mut conn, &STEPS[..1]).unwrap();
        run_steps(&mut conn, &STEPS[..1]).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 1);
    }
}
