//! Column decoding helpers shared by the SQLite repositories.

use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

/// Ordering for every "newest first" listing. `rowid` breaks ties between
/// rows created within the same millisecond.
pub(crate) const NEWEST_FIRST: &str = "created_at DESC, rowid DESC";

/// Reads a TEXT uuid column, reporting malformed values as conversion errors.
pub(crate) fn uuid_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Uuid> {
    let text: String = row.get(column)?;
    parse_uuid(row, column, &text)
}

/// Reads a nullable TEXT uuid column.
pub(crate) fn optional_uuid_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<Uuid>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => parse_uuid(row, column, &text).map(Some),
        None => Ok(None),
    }
}

fn parse_uuid(row: &Row<'_>, column: &str, text: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(text).map_err(|err| {
        let index = row.as_ref().column_index(column).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
    })
}
