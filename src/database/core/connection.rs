//! Database connection management
//!
//! This module provides the SQLite connection wrapper that datasource plugins run
//! their queries on.

use anyhow::{anyhow, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use std::path::Path;

/// A single result row, keyed by projected column name
pub type RowMap = Map<String, Value>;

/// SQL function `dt_contains(haystack, needle)`: case-insensitive substring match
pub const CONTAINS_FN: &str = "dt_contains";

/// Core database connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around SQLite connections. The database
/// belongs to the application being served, so file-backed connections are opened
/// read-only and never change the file's settings.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open an existing database file read-only
    ///
    /// A missing file is an error; nothing is created.
    pub fn open_read_only(path: &str) -> Result<Self> {
        if !Path::new(path).is_file() {
            return Err(anyhow!("Database file '{}' does not exist", path));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| anyhow!("Failed to open database at '{}': {}", path, e))?;

        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?;

        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Per-connection settings only; the database file itself is left as is
    fn configure(&self) -> Result<()> {
        self.conn
            .execute("PRAGMA temp_store=MEMORY", [])
            .map_err(|e| anyhow!("Failed to set temp store: {}", e))?;

        self.conn
            .create_scalar_function(
                CONTAINS_FN,
                2,
                FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
                |ctx| {
                    let haystack = search_text(ctx.get_raw(0));
                    let needle = search_text(ctx.get_raw(1));
                    Ok(match (haystack, needle) {
                        (Some(haystack), Some(needle)) => contains_ignore_case(&haystack, &needle),
                        _ => false,
                    })
                },
            )
            .map_err(|e| anyhow!("Failed to register {}(): {}", CONTAINS_FN, e))?;

        Ok(())
    }

    /// Execute a SQL statement
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.conn
            .execute(sql, [])
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    /// Execute several `;`-separated statements
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| anyhow!("Failed to execute SQL batch: {}", e))
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }

    /// Run a single-value `COUNT(*)` style query
    pub fn count(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(sql, params_from_iter(params.iter()), |row| row.get(0))
            .map_err(|e| anyhow!("Failed to count rows: {}", e))?;
        Ok(count.max(0) as u64)
    }

    /// Names of the columns a statement projects, without running it
    pub fn column_names(&self, sql: &str) -> Result<Vec<String>> {
        let stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare statement: {}", e))?;
        Ok(stmt.column_names().into_iter().map(String::from).collect())
    }

    /// Run a query and collect every row as a key/value map, preserving result order
    pub fn query_rows(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<RowMap>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare statement: {}", e))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(|e| anyhow!("Failed to execute query: {}", e))?;

        let mut result = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| anyhow!("Failed to read row: {}", e))?
        {
            let mut map = RowMap::new();
            for (idx, name) in names.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| anyhow!("Failed to read column '{}': {}", name, e))?;
                map.insert(name.clone(), value_to_json(value));
            }
            result.push(map);
        }

        Ok(result)
    }
}

/// Text a value is searched by; `NULL` has none
fn search_text(value: ValueRef<'_>) -> Option<Cow<'_, str>> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(Cow::Owned(i.to_string())),
        ValueRef::Real(f) => Some(Cow::Owned(f.to_string())),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t)),
    }
}

/// Substring match on the Unicode lowercase forms of both strings
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Convert a SQLite value to its JSON counterpart
///
/// Blobs are rendered as lossy UTF-8 text; non-finite reals become `null`.
pub fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}
