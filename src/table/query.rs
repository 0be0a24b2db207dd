//! SQL text generation.
//!
//! Table and column names are double-quoted; values only ever reach the
//! database through named placeholders.

use std::collections::HashSet;

use tabula_common::{Error, Result};

use crate::accessor::parameter_name;

/// Placeholder name used by key lookups.
pub const KEY_PARAMETER: &str = "key";

/// Most parameters one statement may bind (`SQLITE_MAX_VARIABLE_NUMBER` of
/// the bundled SQLite).
pub const MAX_PARAMETERS: usize = 32766;

/// Quote a table or column name for use in SQL text.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Whether `name` can be used as a `:name` placeholder.
pub fn is_parameter_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Upsert statement for `rows` rows of `identifier` followed by `fields`.
///
/// ```text
/// INSERT INTO "t" ("Id", "Name") VALUES (:Id, :Name), (:Id1, :Name1)
/// ON CONFLICT ("Id") DO UPDATE SET "Name" = excluded."Name"
/// ```
pub fn save_statement(table: &str, identifier: &str, fields: &[&str], rows: usize) -> Result<String> {
    if rows == 0 {
        return Err(Error::invalid_input("a save query needs at least one row"));
    }

    let columns: Vec<&str> = std::iter::once(identifier)
        .chain(fields.iter().copied())
        .collect();

    let parameters = rows.saturating_mul(columns.len());
    if parameters > MAX_PARAMETERS {
        return Err(Error::invalid_input(format!(
            "saving {rows} rows of table {table} needs {parameters} parameters, \
             more than the {MAX_PARAMETERS} SQLite allows; split the batch"
        )));
    }

    let mut seen = HashSet::with_capacity(columns.len() * rows);
    let mut groups = Vec::with_capacity(rows);
    for row in 0..rows {
        let mut placeholders = Vec::with_capacity(columns.len());
        for column in &columns {
            let name = parameter_name(column, row);
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(Error::invalid_input(format!(
                    "parameter :{name} is generated twice for table {table}"
                )));
            }
            placeholders.push(format!(":{name}"));
        }
        groups.push(format!("({})", placeholders.join(", ")));
    }

    let column_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");

    let on_conflict = if fields.is_empty() {
        "DO NOTHING".to_string()
    } else {
        let updates = fields
            .iter()
            .map(|f| {
                let quoted = quote_identifier(f);
                format!("{quoted} = excluded.{quoted}")
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("DO UPDATE SET {updates}")
    };

    Ok(format!(
        "INSERT INTO {} ({column_list}) VALUES {} ON CONFLICT ({}) {on_conflict}",
        quote_identifier(table),
        groups.join(", "),
        quote_identifier(identifier),
    ))
}

/// Select `columns` from every row whose `key` column equals `:key`.
pub fn select_statement(table: &str, columns: &[&str], key: &str) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {column_list} FROM {} WHERE {} = :{KEY_PARAMETER}",
        quote_identifier(table),
        quote_identifier(key)
    )
}

/// Delete every row whose `key` column equals `:key`.
pub fn delete_statement(table: &str, key: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {} = :{KEY_PARAMETER}",
        quote_identifier(table),
        quote_identifier(key)
    )
}
