//! Raw row access for the `records` document table.
//!
//! Rows are addressed by `(set_name, id)`. Payloads are opaque JSON text at
//! this layer; decoding belongs to the session.

use super::DbResult;
use crate::model::entity::EntityId;
use rusqlite::{params, Connection, OptionalExtension, Row};

const RECORD_SELECT_SQL: &str = "SELECT
    id,
    timestamp,
    payload
FROM records";

/// One persisted entity document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordRow {
    pub id: EntityId,
    pub timestamp: i64,
    pub payload: String,
}

/// Reserves a new row and returns its id. The payload is written afterwards
/// with [`write_payload`] once the entity knows its id.
pub(crate) fn insert_record(conn: &Connection, set: &str, timestamp: i64) -> DbResult<EntityId> {
    conn.execute(
        "INSERT INTO records (set_name, timestamp, payload)
         VALUES (?1, ?2, '{}');",
        params![set, timestamp],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrites one row payload. Returns `false` when the row does not exist.
pub(crate) fn write_payload(
    conn: &Connection,
    set: &str,
    id: EntityId,
    timestamp: i64,
    payload: &str,
) -> DbResult<bool> {
    let changed = conn.execute(
        "UPDATE records
         SET
            timestamp = ?3,
            payload = ?4
         WHERE set_name = ?1
           AND id = ?2;",
        params![set, id, timestamp, payload],
    )?;
    Ok(changed > 0)
}

pub(crate) fn select_record(conn: &Connection, set: &str, id: EntityId) -> DbResult<Option<RecordRow>> {
    let row = conn
        .query_row(
            &format!("{RECORD_SELECT_SQL} WHERE set_name = ?1 AND id = ?2;"),
            params![set, id],
            parse_record_row,
        )
        .optional()?;
    Ok(row)
}

/// Loads every row of one set in ascending id order.
pub(crate) fn select_set(conn: &Connection, set: &str) -> DbResult<Vec<RecordRow>> {
    let mut stmt = conn.prepare(&format!(
        "{RECORD_SELECT_SQL} WHERE set_name = ?1 ORDER BY id ASC;"
    ))?;
    let mut rows = stmt.query([set])?;
    let mut records = Vec::new();

    while let Some(row) = rows.next()? {
        records.push(parse_record_row(row)?);
    }

    Ok(records)
}

/// Deletes one row. Returns `false` when the row does not exist.
pub(crate) fn delete_record(conn: &Connection, set: &str, id: EntityId) -> DbResult<bool> {
    let changed = conn.execute(
        "DELETE FROM records WHERE set_name = ?1 AND id = ?2;",
        params![set, id],
    )?;
    Ok(changed > 0)
}

pub(crate) fn count_set(conn: &Connection, set: &str) -> DbResult<usize> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM records WHERE set_name = ?1;",
        [set],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

fn parse_record_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get("id")?,
        timestamp: row.get("timestamp")?,
        payload: row.get("payload")?,
    })
}
