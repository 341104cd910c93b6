//! Readiness checks for repository connections.

use crate::db::migrations::schema_version;
use crate::db::DbError;
use rusqlite::Connection;

#[derive(Debug)]
pub(crate) enum SchemaError {
    Db(DbError),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl From<DbError> for SchemaError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SchemaError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Rejects connections that were not opened through `db::open_*`.
pub(crate) fn ensure_tables(
    conn: &Connection,
    expected_version: u32,
    tables: &[&'static str],
) -> Result<(), SchemaError> {
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(SchemaError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(SchemaError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
