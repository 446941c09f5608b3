//! SQL select builder for server-side paging
//!
//! `SelectQuery` assembles the SQLite statements a datasource runs for one widget
//! request: a base projection with `WHERE` conditions, predicates evaluated against
//! the projected row (the `having` list), and the ordering and paging clauses that are
//! recomputed for every request.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dtbridge::database::{Predicate, SelectQuery, SortDirection};
//!
//! let mut select = SelectQuery::new("users");
//! select
//!     .and_where(Predicate::eq("status", "active".to_string()))
//!     .having(Predicate::contains("name", "ann"))
//!     .order_by("name", SortDirection::Asc)
//!     .limit(10)
//!     .offset(20);
//!
//! let (sql, params) = select.build();
//! ```
//!
//! Table names, projected column expressions and raw predicates are emitted verbatim
//! and must come from trusted configuration. Field names used by `Contains`, `Eq`, `In`
//! and `order_by` are quoted as identifiers, values are always bound parameters.

use super::connection::CONTAINS_FN;
use rusqlite::types::Value as SqlValue;

/// Alias used when `having` predicates wrap the base select
const OUTER_ALIAS: &str = "dt_rows";

/// Sort direction of an `ORDER BY` term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Boolean condition tree rendered into SQL with positional parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Always true (`1`)
    True,
    /// Trusted SQL fragment with its own `?` parameters
    Raw { sql: String, params: Vec<SqlValue> },
    /// Case-insensitive substring match, `dt_contains(field, term)`
    Contains { field: String, term: String },
    /// `field = value`
    Eq { field: String, value: SqlValue },
    /// `field IN (values...)`; an empty list matches nothing
    In { field: String, values: Vec<SqlValue> },
    /// Disjunction; an empty group is vacuously true
    Any(Vec<Predicate>),
    /// Conjunction; an empty group is vacuously true
    All(Vec<Predicate>),
}

impl Predicate {
    /// Trusted SQL fragment without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Predicate::Raw {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Substring match ignoring case; every character of `term` matches literally
    pub fn contains(field: impl Into<String>, term: impl Into<String>) -> Self {
        Predicate::Contains {
            field: field.into(),
            term: term.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Predicate::In {
            field: field.into(),
            values,
        }
    }

    /// Render to SQL, appending bound values to `params` in textual order
    pub fn render(&self, params: &mut Vec<SqlValue>) -> String {
        match self {
            Predicate::True => "1".to_string(),
            Predicate::Raw { sql, params: raw } => {
                params.extend(raw.iter().cloned());
                format!("({})", sql)
            }
            Predicate::Contains { field, term } => {
                params.push(SqlValue::Text(term.clone()));
                format!("{}({}, ?)", CONTAINS_FN, quote_ident(field))
            }
            Predicate::Eq { field, value } => {
                params.push(value.clone());
                format!("{} = ?", quote_ident(field))
            }
            Predicate::In { field, values } => {
                if values.is_empty() {
                    return "0".to_string();
                }
                params.extend(values.iter().cloned());
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("{} IN ({})", quote_ident(field), placeholders)
            }
            Predicate::Any(items) => render_group(items, " OR ", params),
            Predicate::All(items) => render_group(items, " AND ", params),
        }
    }
}

fn render_group(items: &[Predicate], joiner: &str, params: &mut Vec<SqlValue>) -> String {
    if items.is_empty() {
        return "1".to_string();
    }
    let parts: Vec<String> = items.iter().map(|p| p.render(params)).collect();
    format!("({})", parts.join(joiner))
}

/// Quote an identifier, keeping `table.column` qualification
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Render a bound value as a SQL literal (diagnostics only)
pub fn sql_literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => f.to_string(),
        SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        SqlValue::Blob(b) => {
            let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
            format!("X'{}'", hex)
        }
    }
}

/// Mutable select statement
///
/// Unlike a one-shot builder, hooks receive `&mut SelectQuery` and amend it in
/// place, so every setter takes `&mut self`.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    joins: Vec<String>,
    conditions: Vec<Predicate>,
    group_by: Vec<String>,
    having: Vec<Predicate>,
    order_by: Vec<(String, SortDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQuery {
    /// Select everything from `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Add several projected column expressions
    pub fn columns<I, S>(&mut self, exprs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(exprs.into_iter().map(Into::into));
        self
    }

    /// Add a join clause, e.g. `LEFT JOIN orgs o ON o.id = u.org_id`
    pub fn join(&mut self, clause: impl Into<String>) -> &mut Self {
        self.joins.push(clause.into());
        self
    }

    /// AND a condition into the base `WHERE` clause
    pub fn and_where(&mut self, predicate: Predicate) -> &mut Self {
        self.conditions.push(predicate);
        self
    }

    pub fn group_by(&mut self, expr: impl Into<String>) -> &mut Self {
        self.group_by.push(expr.into());
        self
    }

    /// AND a condition evaluated against the projected row
    pub fn having(&mut self, predicate: Predicate) -> &mut Self {
        self.having.push(predicate);
        self
    }

    pub fn order_by(&mut self, field: impl Into<String>, dir: SortDirection) -> &mut Self {
        self.order_by.push((field.into(), dir));
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    pub fn reset_order(&mut self) -> &mut Self {
        self.order_by.clear();
        self
    }

    pub fn reset_limit(&mut self) -> &mut Self {
        self.limit = None;
        self
    }

    pub fn reset_offset(&mut self) -> &mut Self {
        self.offset = None;
        self
    }

    /// Build the full statement and its positional parameters
    pub fn build(&self) -> (String, Vec<SqlValue>) {
        let mut params = Vec::new();
        let mut sql = self.build_base(&mut params);

        if !self.having.is_empty() {
            let having = render_group(&self.having, " AND ", &mut params);
            sql = format!(
                "SELECT * FROM ({}) AS {} WHERE {}",
                sql, OUTER_ALIAS, having
            );
        }

        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|(field, dir)| format!("{} {}", quote_ident(field), dir.as_sql()))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        (sql, params)
    }

    /// Build a statement counting the rows this select returns (paging ignored)
    pub fn build_count(&self) -> (String, Vec<SqlValue>) {
        let mut unpaged = self.clone();
        unpaged.reset_order().reset_limit().reset_offset();
        let (sql, params) = unpaged.build();
        (format!("SELECT COUNT(*) FROM ({}) AS dt_count", sql), params)
    }

    /// The statement with parameters inlined as literals, for troubleshooting
    pub fn to_sql_string(&self) -> String {
        let (sql, params) = self.build();
        inline_params(&sql, &params)
    }

    fn build_base(&self, params: &mut Vec<SqlValue>) -> String {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", columns, self.table);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.conditions.is_empty() {
            let condition = render_group(&self.conditions, " AND ", params);
            sql.push_str(&format!(" WHERE {}", condition));
        }

        if !self.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", self.group_by.join(", ")));
        }

        sql
    }
}

/// Replace `?` placeholders outside of quoted literals with the bound values
fn inline_params(sql: &str, params: &[SqlValue]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut values = params.iter();
    let mut quote: Option<char> = None;

    for c in sql.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => match values.next() {
                    Some(value) => out.push_str(&sql_literal(value)),
                    None => out.push(c),
                },
                _ => out.push(c),
            },
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_query() {
        let (sql, params) = SelectQuery::new("users").build();
        assert_eq!(sql, "SELECT * FROM users");
        assert!(params.is_empty());
    }

    #[test]
    fn test_columns_and_where() {
        let mut select = SelectQuery::new("users");
        select
            .columns(["id", "name"])
            .and_where(Predicate::eq("status", "active".to_string()));

        let (sql, params) = select.build();
        assert_eq!(sql, "SELECT id, name FROM users WHERE (\"status\" = ?)");
        assert_eq!(params, vec![SqlValue::Text("active".to_string())]);
    }

    #[test]
    fn test_having_wraps_base_select() {
        let mut select = SelectQuery::new("users");
        select
            .and_where(Predicate::eq("status", "active".to_string()))
            .having(Predicate::contains("name", "an"));

        let (sql, params) = select.build();
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT * FROM users WHERE (\"status\" = ?)) AS dt_rows \
             WHERE (dt_contains(\"name\", ?))"
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Text("active".to_string()),
                SqlValue::Text("an".to_string())
            ]
        );
    }

    #[test]
    fn test_join_and_group_by() {
        let mut select = SelectQuery::new("orgs o");
        select
            .columns(["o.name AS org", "COUNT(u.id) AS members"])
            .join("LEFT JOIN users u ON u.org_id = o.id")
            .and_where(Predicate::raw("o.active = 1"))
            .group_by("o.id")
            .having(Predicate::contains("org", "acme"));

        let (sql, _) = select.build();
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT o.name AS org, COUNT(u.id) AS members FROM orgs o \
             LEFT JOIN users u ON u.org_id = o.id WHERE ((o.active = 1)) GROUP BY o.id) \
             AS dt_rows WHERE (dt_contains(\"org\", ?))"
        );
    }

    #[test]
    fn test_contains_term_is_bound_verbatim() {
        let mut select = SelectQuery::new("users");
        select.having(Predicate::contains("name", "50%_off"));
        assert_eq!(
            select.to_sql_string(),
            "SELECT * FROM (SELECT * FROM users) AS dt_rows WHERE (dt_contains(\"name\", '50%_off'))"
        );
    }

    #[test]
    fn test_empty_groups_are_true() {
        let mut params = Vec::new();
        assert_eq!(Predicate::Any(vec![]).render(&mut params), "1");
        assert_eq!(Predicate::All(vec![]).render(&mut params), "1");
        assert_eq!(Predicate::True.render(&mut params), "1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let mut params = Vec::new();
        assert_eq!(Predicate::is_in("id", vec![]).render(&mut params), "0");
    }

    #[test]
    fn test_any_group() {
        let mut params = Vec::new();
        let sql = Predicate::Any(vec![
            Predicate::contains("name", "x"),
            Predicate::contains("email", "x"),
        ])
        .render(&mut params);

        assert_eq!(
            sql,
            "(dt_contains(\"name\", ?) OR dt_contains(\"email\", ?))"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_order_limit_offset() {
        let mut select = SelectQuery::new("users");
        select
            .order_by("name", SortDirection::Asc)
            .order_by("id", SortDirection::Desc)
            .limit(5)
            .offset(10);

        let (sql, _) = select.build();
        assert_eq!(
            sql,
            "SELECT * FROM users ORDER BY \"name\" ASC, \"id\" DESC LIMIT 5 OFFSET 10"
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let mut select = SelectQuery::new("users");
        select.offset(3);
        let (sql, _) = select.build();
        assert!(sql.ends_with("LIMIT -1 OFFSET 3"));
    }

    #[test]
    fn test_reset_paging() {
        let mut select = SelectQuery::new("users");
        select
            .order_by("name", SortDirection::Asc)
            .limit(5)
            .offset(10);
        select.reset_order().reset_limit().reset_offset();

        let (sql, _) = select.build();
        assert_eq!(sql, "SELECT * FROM users");
    }

    #[test]
    fn test_count_query_ignores_paging() {
        let mut select = SelectQuery::new("users");
        select
            .and_where(Predicate::eq("id", 3i64))
            .order_by("name", SortDirection::Asc)
            .limit(5);

        let (sql, params) = select.build_count();
        assert!(sql.starts_with("SELECT COUNT(*) FROM (SELECT * FROM users"));
        assert!(!sql.contains("ORDER BY"));
        assert!(!sql.contains("LIMIT"));
        assert_eq!(params, vec![SqlValue::Integer(3)]);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("name"), "\"name\"");
        assert_eq!(quote_ident("u.name"), "\"u\".\"name\"");
        assert_eq!(quote_ident("bad\"name"), "\"bad\"\"name\"");
    }

    #[test]
    fn test_to_sql_string_inlines_params() {
        let mut select = SelectQuery::new("users");
        select
            .and_where(Predicate::raw("note <> '?'"))
            .and_where(Predicate::eq("name", "O'Brien".to_string()))
            .and_where(Predicate::is_in(
                "id",
                vec![SqlValue::Integer(1), SqlValue::Integer(2)],
            ));

        assert_eq!(
            select.to_sql_string(),
            "SELECT * FROM users WHERE ((note <> '?') AND \"name\" = 'O''Brien' AND \"id\" IN (1, 2))"
        );
    }
}
