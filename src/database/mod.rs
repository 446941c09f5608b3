//! Database module
//!
//! ```text
//! database/
//! └── core/
//!     ├── connection  # SQLite DatabaseConn wrapper, row -> JSON mapping
//!     └── select      # SelectQuery builder and Predicate tree
//! ```
//!
//! The database is an application's own SQLite file. dtbridge opens it read-only and
//! never creates it, it only reads the models it is configured to expose.

pub mod core;

pub use core::{
    contains_ignore_case, quote_ident, sql_literal, value_to_json, DatabaseConn, Predicate,
    RowMap, SelectQuery, SortDirection, CONTAINS_FN,
};

