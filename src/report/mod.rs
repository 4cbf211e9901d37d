//! Plain-text dump of database tables for the report screen.
//!
//! Each row renders as one `column: value` line per column followed by a
//! blank line. Requested tables that do not exist produce an empty section.

use anyhow::Result;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};

use crate::auth::CredentialStore;

/// The rows of one table, each row as `(column, value)` pairs in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub missing: bool,
    pub rows: Vec<Vec<(String, String)>>,
}

impl TableReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            for (column, value) in row {
                out.push_str(column);
                out.push_str(": ");
                out.push_str(value);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}

/// Read every row of each table in `tables`, in the order given.
pub fn collect<S: AsRef<str>>(store: &CredentialStore, tables: &[S]) -> Result<Vec<TableReport>> {
    let conn = store.connect()?;
    tables
        .iter()
        .map(|table| read_table(&conn, table.as_ref()))
        .collect()
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn read_table(conn: &Connection, table: &str) -> Result<TableReport> {
    if !table_exists(conn, table)? {
        tracing::warn!(table, "Report skipped missing table");
        return Ok(TableReport {
            table: table.to_string(),
            missing: true,
            rows: Vec::new(),
        });
    }

    // Name is confirmed against sqlite_master above; quote it for odd characters.
    let quoted = table.replace('"', "\"\"");
    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{quoted}\" ORDER BY rowid"))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let rows = stmt
        .query_map([], |row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, column)| Ok((column.clone(), render_value(row.get_ref(i)?))))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(table, rows = rows.len(), "Report table read");
    Ok(TableReport {
        table: table.to_string(),
        missing: false,
        rows,
    })
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => hex::encode(b),
    }
}
