//! Column descriptors sent by the grid widget

use crate::database::SortDirection;
use crate::datatables::params::{bool_param, string_param};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Requested order direction of a column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDir {
    Asc,
    Desc,
    #[default]
    None,
}

impl OrderDir {
    /// Parse a direction; anything other than `asc`/`desc` is `None`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => OrderDir::Asc,
            "desc" => OrderDir::Desc,
            _ => OrderDir::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDir::Asc => "asc",
            OrderDir::Desc => "desc",
            OrderDir::None => "none",
        }
    }

    pub fn to_sort(self) -> Option<SortDirection> {
        match self {
            OrderDir::Asc => Some(SortDirection::Asc),
            OrderDir::Desc => Some(SortDirection::Desc),
            OrderDir::None => None,
        }
    }
}

impl Display for OrderDir {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One column of a widget request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    name: String,
    data: Option<String>,
    db_data: String,
    searchable: bool,
    orderable: bool,
    order_dir: OrderDir,
    search_value: String,
}

impl Column {
    /// Column with `data` set and every other option at its default
    pub fn new(data: impl Into<String>) -> Self {
        let data = data.into();
        Self {
            name: data.clone(),
            db_data: data.clone(),
            data: Some(data),
            searchable: true,
            orderable: true,
            order_dir: OrderDir::None,
            search_value: String::new(),
        }
    }

    /// Build a column from one `columns[i]` entry
    ///
    /// The name falls back from `name` to `data` to the lowercased `fullname`, and
    /// finally to a generated id. The data-source field falls back from `dbData` to
    /// `data` to the name.
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| string_param(value.get(key));

        let data = field("data");
        let name = field("name")
            .or_else(|| data.clone())
            .or_else(|| field("fullname").map(|f| f.to_lowercase()))
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let db_data = field("dbData")
            .or_else(|| data.clone())
            .unwrap_or_else(|| name.clone());

        let search_value = value
            .get("search")
            .and_then(|s| string_param(s.get("value")))
            .unwrap_or_default();

        let order_dir = value
            .get("orderDir")
            .and_then(Value::as_str)
            .map(OrderDir::parse)
            .unwrap_or_default();

        Self {
            name,
            data,
            db_data,
            searchable: bool_param(value.get("searchable"), true),
            orderable: bool_param(value.get("orderable"), true),
            order_dir,
            search_value,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_db_data(mut self, db_data: impl Into<String>) -> Self {
        self.db_data = db_data.into();
        self
    }

    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn with_orderable(mut self, orderable: bool) -> Self {
        self.orderable = orderable;
        self
    }

    pub fn with_order_dir(mut self, dir: OrderDir) -> Self {
        self.order_dir = dir;
        self
    }

    pub fn with_search_value(mut self, value: impl Into<String>) -> Self {
        self.search_value = value.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Field the datasource searches and orders on
    pub fn db_data(&self) -> &str {
        &self.db_data
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    pub fn is_orderable(&self) -> bool {
        self.orderable
    }

    /// Effective order direction; non-orderable columns are never ordered
    pub fn order_dir(&self) -> OrderDir {
        if !self.orderable {
            return OrderDir::None;
        }
        self.order_dir
    }

    pub fn set_order_dir(&mut self, dir: OrderDir) {
        self.order_dir = dir;
    }

    /// Per-column search term (`columns[i][search][value]`)
    pub fn search_value(&self) -> &str {
        &self.search_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_dir_parse() {
        assert_eq!(OrderDir::parse("asc"), OrderDir::Asc);
        assert_eq!(OrderDir::parse("DESC"), OrderDir::Desc);
        assert_eq!(OrderDir::parse("sideways"), OrderDir::None);
        assert_eq!(OrderDir::parse(""), OrderDir::None);
        assert_eq!(OrderDir::Desc.to_string(), "desc");
        assert_eq!(OrderDir::None.to_sort(), None);
        assert_eq!(OrderDir::Asc.to_sort(), Some(SortDirection::Asc));
    }

    #[test]
    fn test_from_value_defaults() {
        let column = Column::from_value(&json!({"data": "email"}));
        assert_eq!(column.name(), "email");
        assert_eq!(column.data(), Some("email"));
        assert_eq!(column.db_data(), "email");
        assert!(column.is_searchable());
        assert!(column.is_orderable());
        assert_eq!(column.order_dir(), OrderDir::None);
        assert_eq!(column.search_value(), "");
    }

    #[test]
    fn test_name_fallbacks() {
        let named = Column::from_value(&json!({"name": "n", "data": "d"}));
        assert_eq!(named.name(), "n");
        assert_eq!(named.db_data(), "d");

        let by_fullname = Column::from_value(&json!({"fullname": "Last Login"}));
        assert_eq!(by_fullname.name(), "last login");
        assert_eq!(by_fullname.db_data(), "last login");

        let empty_name = Column::from_value(&json!({"name": "", "data": "d"}));
        assert_eq!(empty_name.name(), "d");

        let generated = Column::from_value(&json!({}));
        assert_eq!(generated.name().len(), 32);
        assert_eq!(generated.db_data(), generated.name());
    }

    #[test]
    fn test_db_data_override() {
        let column = Column::from_value(&json!({"data": "owner", "dbData": "owner_name"}));
        assert_eq!(column.name(), "owner");
        assert_eq!(column.db_data(), "owner_name");
    }

    #[test]
    fn test_flags_and_search_value() {
        let column = Column::from_value(&json!({
            "data": "id",
            "searchable": "false",
            "orderable": "true",
            "search": {"value": "42", "regex": "false"}
        }));
        assert!(!column.is_searchable());
        assert!(column.is_orderable());
        assert_eq!(column.search_value(), "42");
    }

    #[test]
    fn test_non_orderable_reports_none() {
        let mut column = Column::new("id").with_orderable(false);
        column.set_order_dir(OrderDir::Desc);
        assert_eq!(column.order_dir(), OrderDir::None);

        let column = column.with_orderable(true);
        assert_eq!(column.order_dir(), OrderDir::Desc);
    }
}
