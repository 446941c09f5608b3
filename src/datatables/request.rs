//! Normalized paging request
//!
//! A `DatatablesRequest` is built once per HTTP request from the path below the
//! mount point and the parameter tree (query string for `GET`, body otherwise). The
//! translator never fails on parameter content: missing or malformed values fall back
//! to the protocol defaults, and routing errors are left to the datasource.

use crate::datatables::column::{Column, OrderDir};
use crate::datatables::params::{indexed_entries, int_param};
use serde_json::{Map, Value};
use tracing::debug;

/// Characters trimmed from both ends of the request path
const PATH_TRIM: &[char] = &[' ', '/', '\\'];

#[derive(Debug, Clone)]
pub struct DatatablesRequest {
    method: String,
    path_parts: Vec<String>,
    params: Value,
    columns: Vec<Column>,
}

impl DatatablesRequest {
    /// Request with an explicit parameter tree, as a `GET` would produce
    pub fn new(path: &str, params: Value) -> Self {
        Self::build("GET", path, params)
    }

    /// Request from HTTP parts: `GET` reads `query`, every other method reads `body`
    pub fn from_params(method: &str, path: &str, query: Value, body: Value) -> Self {
        let method = method.to_ascii_uppercase();
        let params = if method == "GET" { query } else { body };
        Self::build(&method, path, params)
    }

    fn build(method: &str, path: &str, params: Value) -> Self {
        let params = match params {
            Value::Object(_) => params,
            _ => Value::Object(Map::new()),
        };
        let columns = merge_columns(&params);
        let request = Self {
            method: method.to_string(),
            path_parts: split_path(path),
            params,
            columns,
        };
        debug!(
            "datatables request: method={} path={:?} draw={} start={} length={} columns={}",
            request.method,
            request.path_parts,
            request.draw(),
            request.start(),
            request.length(),
            request.columns.len()
        );
        request
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path segments below the mount point
    pub fn path_parts(&self) -> &[String] {
        &self.path_parts
    }

    /// Segment 0: alias of the datasource plugin
    pub fn plugin_alias(&self) -> &str {
        self.path_parts.first().map(String::as_str).unwrap_or("")
    }

    /// Segment 1: model the plugin should target
    pub fn model_name(&self) -> Option<&str> {
        self.segment(1)
    }

    /// Segment 2: optional query customization hook
    pub fn customization_name(&self) -> Option<&str> {
        self.segment(2)
    }

    fn segment(&self, idx: usize) -> Option<&str> {
        self.path_parts
            .get(idx)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Draw counter, echoed back; `-1` when absent
    pub fn draw(&self) -> i64 {
        int_param(self.params.get("draw"), -1)
    }

    /// Row offset, never negative
    pub fn start(&self) -> i64 {
        int_param(self.params.get("start"), 0).max(0)
    }

    /// Page length; negative means no limit
    pub fn length(&self) -> i64 {
        int_param(self.params.get("length"), -1)
    }

    /// Page length as a `LIMIT`, `None` when unlimited
    pub fn limit(&self) -> Option<u64> {
        let length = self.length();
        (length >= 0).then_some(length as u64)
    }

    /// Global search term (`search[value]`)
    pub fn search(&self) -> String {
        match self.params.get("search").and_then(|s| s.get("value")) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// Columns in request order, with `order[]` directions merged in
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Filter form data; empty when missing or not a mapping
    pub fn filter(&self) -> Map<String, Value> {
        match self.params.get("filter") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    /// The raw parameter tree
    pub fn params(&self) -> &Value {
        &self.params
    }
}

/// Trim `" /\"` from both ends and split on `/`
pub fn split_path(path: &str) -> Vec<String> {
    path.trim_matches(PATH_TRIM)
        .split('/')
        .map(String::from)
        .collect()
}

fn merge_columns(params: &Value) -> Vec<Column> {
    let entries: Vec<(usize, &Value)> = params
        .get("columns")
        .map(indexed_entries)
        .unwrap_or_default();

    let mut columns: Vec<(usize, Column)> = entries
        .iter()
        .map(|(idx, value)| (*idx, Column::from_value(value)))
        .collect();

    if let Some(order) = params.get("order") {
        for (_, item) in indexed_entries(order) {
            let Some(target) = order_index(item.get("column")) else {
                debug!("ignoring order entry without a column index: {}", item);
                continue;
            };
            let dir = item
                .get("dir")
                .and_then(Value::as_str)
                .map(OrderDir::parse)
                .unwrap_or_default();
            match columns.iter_mut().find(|(idx, _)| *idx == target) {
                Some((_, column)) => column.set_order_dir(dir),
                None => debug!("ignoring order entry for unknown column {}", target),
            }
        }
    }

    columns.into_iter().map(|(_, column)| column).collect()
}

fn order_index(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatables::params::nest_pairs;
    use serde_json::json;

    #[test]
    fn test_path_parts() {
        let request = DatatablesRequest::new("/model/Users/active/", json!({}));
        assert_eq!(request.path_parts(), &["model", "Users", "active"]);
        assert_eq!(request.plugin_alias(), "model");
        assert_eq!(request.model_name(), Some("Users"));
        assert_eq!(request.customization_name(), Some("active"));

        let request = DatatablesRequest::new(" \\model\\ ", json!({}));
        assert_eq!(request.path_parts(), &["model"]);
        assert_eq!(request.model_name(), None);

        let request = DatatablesRequest::new("", json!({}));
        assert_eq!(request.plugin_alias(), "");
    }

    #[test]
    fn test_defaults() {
        let request = DatatablesRequest::new("model/Users", json!({}));
        assert_eq!(request.draw(), -1);
        assert_eq!(request.start(), 0);
        assert_eq!(request.length(), -1);
        assert_eq!(request.limit(), None);
        assert_eq!(request.search(), "");
        assert!(request.columns().is_empty());
        assert!(request.filter().is_empty());
    }

    #[test]
    fn test_non_object_params_are_empty() {
        let request = DatatablesRequest::new("model/Users", json!([1, 2]));
        assert_eq!(request.draw(), -1);
        assert_eq!(request.params(), &json!({}));
    }

    #[test]
    fn test_paging_values() {
        let request = DatatablesRequest::new(
            "model/Users",
            json!({"draw": "4", "start": "-5", "length": "-7"}),
        );
        assert_eq!(request.draw(), 4);
        assert_eq!(request.start(), 0);
        assert_eq!(request.length(), -7);
        assert_eq!(request.limit(), None);

        let request = DatatablesRequest::new("model/Users", json!({"length": 0}));
        assert_eq!(request.limit(), Some(0));
    }

    #[test]
    fn test_method_selects_source() {
        let query = json!({"draw": 1});
        let body = json!({"draw": 2});

        let get = DatatablesRequest::from_params("get", "model/Users", query.clone(), body.clone());
        assert_eq!(get.method(), "GET");
        assert_eq!(get.draw(), 1);

        let post = DatatablesRequest::from_params("POST", "model/Users", query, body);
        assert_eq!(post.draw(), 2);
    }

    #[test]
    fn test_order_merged_into_columns() {
        let params = json!({
            "columns": [{"data": "a"}, {"data": "b"}, {"data": "c"}],
            "order": [
                {"column": "2", "dir": "desc"},
                {"column": 1, "dir": "asc"},
                {"column": 9, "dir": "asc"},
                {"column": "x", "dir": "asc"}
            ]
        });
        let request = DatatablesRequest::new("model/T", params);
        let dirs: Vec<OrderDir> = request.columns().iter().map(|c| c.order_dir()).collect();
        assert_eq!(dirs, vec![OrderDir::None, OrderDir::Asc, OrderDir::Desc]);
    }

    #[test]
    fn test_last_order_entry_wins() {
        let params = json!({
            "columns": [{"data": "a"}],
            "order": [{"column": 0, "dir": "asc"}, {"column": 0, "dir": "desc"}]
        });
        let request = DatatablesRequest::new("model/T", params);
        assert_eq!(request.columns()[0].order_dir(), OrderDir::Desc);
    }

    #[test]
    fn test_from_form_pairs() {
        let params = nest_pairs(vec![
            ("draw", "3"),
            ("start", "10"),
            ("length", "5"),
            ("search[value]", "ann"),
            ("columns[0][data]", "name"),
            ("columns[0][searchable]", "true"),
            ("columns[1][data]", "email"),
            ("columns[1][searchable]", "false"),
            ("order[0][column]", "0"),
            ("order[0][dir]", "asc"),
            ("filter[status]", "active"),
        ]);
        let request = DatatablesRequest::new("model/Users", params);

        assert_eq!(request.draw(), 3);
        assert_eq!(request.start(), 10);
        assert_eq!(request.limit(), Some(5));
        assert_eq!(request.search(), "ann");
        assert_eq!(request.columns().len(), 2);
        assert_eq!(request.columns()[0].order_dir(), OrderDir::Asc);
        assert!(!request.columns()[1].is_searchable());
        assert_eq!(request.filter().get("status"), Some(&json!("active")));
    }

    #[test]
    fn test_filter_must_be_mapping() {
        let request = DatatablesRequest::new("model/Users", json!({"filter": "status=1"}));
        assert!(request.filter().is_empty());
    }
}
