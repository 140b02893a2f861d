//! SQLite storage bootstrap, schema checks and store fault classification.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the storefront store.
//! - Apply schema migrations in deterministic order.
//! - Classify SQLite failures so repositories can map them to error kinds.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Repositories must not be built on a connection that failed schema checks.

use rusqlite::{ffi, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Bootstrap and schema errors. Request-level failures use `RepoError`.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Store-level failure class, derived from SQLite extended result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFault {
    /// `UNIQUE` or `PRIMARY KEY` constraint.
    UniqueViolation,
    ForeignKeyViolation,
    CheckViolation,
    /// Anything else: I/O, busy, malformed SQL, conversion failures.
    Other,
}

impl StoreFault {
    /// Classifies one rusqlite error.
    pub fn classify(err: &rusqlite::Error) -> Self {
        let rusqlite::Error::SqliteFailure(failure, _) = err else {
            return Self::Other;
        };
        if failure.code != rusqlite::ErrorCode::ConstraintViolation {
            return Self::Other;
        }
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                Self::UniqueViolation
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ForeignKeyViolation,
            ffi::SQLITE_CONSTRAINT_CHECK => Self::CheckViolation,
            _ => Self::Other,
        }
    }

    /// Stable snake_case code used in log lines.
    pub fn as_code(self) -> &'static str {
        match self {
            Self::UniqueViolation => "unique_violation",
            Self::ForeignKeyViolation => "foreign_key_violation",
            Self::CheckViolation => "check_violation",
            Self::Other => "store_error",
        }
    }
}

/// Verifies that `conn` is migrated and exposes `table` with `columns`.
///
/// Used by repository constructors so a half-initialized connection fails
/// fast instead of surfacing as per-request server errors.
pub fn ensure_table_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> DbResult<()> {
    let expected_version = migrations::latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(DbError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(DbError::MissingRequiredTable(table));
    }

    let present = table_columns(conn, table)?;
    for &column in columns {
        if !present.iter().any(|name| name == column) {
            return Err(DbError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::StoreFault;
    use rusqlite::Connection;

    fn constraint_error(sql: &str) -> rusqlite::Error {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id TEXT PRIMARY KEY NOT NULL, code TEXT NOT NULL UNIQUE);
             CREATE TABLE child (
                id TEXT PRIMARY KEY NOT NULL,
                parent_id TEXT NOT NULL REFERENCES parent(id),
                qty INTEGER NOT NULL CHECK (qty >= 0)
             );
             INSERT INTO parent (id, code) VALUES ('p1', 'A');",
        )
        .unwrap();
        conn.execute_batch(sql).unwrap_err()
    }

    #[test]
    fn classifies_unique_and_primary_key_violations() {
        let unique = constraint_error("INSERT INTO parent (id, code) VALUES ('p2', 'A');");
        assert_eq!(StoreFault::classify(&unique), StoreFault::UniqueViolation);

        let primary = constraint_error("INSERT INTO parent (id, code) VALUES ('p1', 'B');");
        assert_eq!(StoreFault::classify(&primary), StoreFault::UniqueViolation);
    }

    #[test]
    fn classifies_foreign_key_and_check_violations() {
        let foreign =
            constraint_error("INSERT INTO child (id, parent_id, qty) VALUES ('c1', 'nope', 1);");
        assert_eq!(StoreFault::classify(&foreign), StoreFault::ForeignKeyViolation);

        let check =
            constraint_error("INSERT INTO child (id, parent_id, qty) VALUES ('c1', 'p1', -1);");
        assert_eq!(StoreFault::classify(&check), StoreFault::CheckViolation);
    }

    #[test]
    fn non_constraint_errors_are_other() {
        let malformed = constraint_error("SELECT * FROM missing_table;");
        assert_eq!(StoreFault::classify(&malformed), StoreFault::Other);
        assert_eq!(
            StoreFault::classify(&rusqlite::Error::QueryReturnedNoRows),
            StoreFault::Other
        );
    }
}
