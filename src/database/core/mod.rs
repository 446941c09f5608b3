//! Core database infrastructure
//!
//! - `DatabaseConn`: SQLite connection wrapper with configuration and row mapping
//! - `SelectQuery`: select builder the datasource plugins compose their queries with

mod connection;
mod select;

pub use connection::{contains_ignore_case, value_to_json, DatabaseConn, RowMap, CONTAINS_FN};
pub use select::{quote_ident, sql_literal, Predicate, SelectQuery, SortDirection};
