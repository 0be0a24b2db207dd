//! Persisted identifier sequences.
//!
//! Each sequence is one row of `tabula_sequences` holding the next unused
//! identifier. Reads post-increment in a single statement; writes only ever
//! move the counter forward.

use rusqlite::{named_params, Connection, OptionalExtension};
use tabula_common::{Error, Result};

/// Create the sequence row if it does not exist yet.
pub fn ensure(conn: &Connection, name: &str, start: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO tabula_sequences (name, next_id) VALUES (:name, :start)",
        named_params! {
            ":name": name,
            ":start": start,
        },
    )
    .map_err(Error::execution)?;

    Ok(())
}

/// Return the next unused identifier and advance the counter by one.
///
/// The sequence is created at `start` on first use. Fails with
/// `InvalidInput` once the counter reaches `i64::MAX`.
pub fn next_id(conn: &Connection, name: &str, start: i64) -> Result<i64> {
    ensure(conn, name, start)?;

    conn.query_row(
        "UPDATE tabula_sequences SET next_id = next_id + 1
         WHERE name = :name AND next_id < :max
         RETURNING next_id - 1",
        named_params! {
            ":name": name,
            ":max": i64::MAX,
        },
        |row| row.get(0),
    )
    .optional()
    .map_err(Error::execution)?
    .ok_or_else(|| Error::invalid_input(format!("identifier space of sequence {name} exhausted")))
}

/// Move the counter to `next` unless it is already further ahead.
pub fn set_next_id(conn: &Connection, name: &str, start: i64, next: i64) -> Result<()> {
    ensure(conn, name, start)?;

    conn.execute(
        "UPDATE tabula_sequences SET next_id = MAX(next_id, :next) WHERE name = :name",
        named_params! {
            ":name": name,
            ":next": next,
        },
    )
    .map_err(Error::execution)?;

    Ok(())
}

/// Peek at the next unused identifier without advancing it.
pub fn peek(conn: &Connection, name: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT next_id FROM tabula_sequences WHERE name = :name",
        named_params! { ":name": name },
        |row| row.get(0),
    )
    .optional()
    .map_err(Error::execution)
}
