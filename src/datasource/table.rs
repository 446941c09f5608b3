//! Model tables the `model` plugin can query
//!
//! A `ModelTable` hands out the base select for one named model and optionally
//! supports two hooks: a named customization picked by the third path segment, and
//! the application of filter form data. `ModelResolver` maps the model name in the
//! request path to a table.

use crate::config::ModelConfig;
use crate::database::{Predicate, SelectQuery};
use crate::datatables::DatatablesRequest;
use anyhow::{anyhow, Result};
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub trait ModelTable: Send + Sync {
    /// Name the model is requested by
    fn name(&self) -> &str;

    /// Select over the whole model, before any request-specific clauses
    fn base_select(&self) -> SelectQuery;

    /// Whether `customize_select` knows the customization `name`
    fn supports_customization(&self, _name: &str) -> bool {
        false
    }

    /// Amend the base select for the customization `name`
    fn customize_select(
        &self,
        _name: &str,
        _select: &mut SelectQuery,
        _request: &DatatablesRequest,
    ) -> Result<()> {
        Ok(())
    }

    /// Whether this model accepts filter form data
    fn supports_filter(&self) -> bool {
        false
    }

    /// Restrict the select by the request's filter form data
    fn apply_filter(&self, _filter: &Map<String, Value>, _select: &mut SelectQuery) -> Result<()> {
        Ok(())
    }
}

pub trait ModelResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<dyn ModelTable>>;

    /// Names of every model this resolver knows
    fn model_names(&self) -> Vec<String>;
}

/// In-memory resolver
///
/// Lookups try the exact name first, then a case-insensitive match.
#[derive(Default, Clone)]
pub struct ModelRegistry {
    tables: BTreeMap<String, Arc<dyn ModelTable>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry holding one `ConfiguredTable` per configured model
    pub fn from_config(models: &BTreeMap<String, ModelConfig>) -> Self {
        let mut registry = Self::new();
        for (name, model) in models {
            registry.register(ConfiguredTable::new(name.clone(), model.clone()));
        }
        registry
    }

    pub fn register<T: ModelTable + 'static>(&mut self, table: T) {
        self.register_arc(Arc::new(table));
    }

    pub fn register_arc(&mut self, table: Arc<dyn ModelTable>) {
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl ModelResolver for ModelRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn ModelTable>> {
        if let Some(table) = self.tables.get(name) {
            return Some(table.clone());
        }
        self.tables
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, table)| table.clone())
    }

    fn model_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}

/// A model defined entirely by configuration
#[derive(Debug, Clone)]
pub struct ConfiguredTable {
    name: String,
    config: ModelConfig,
}

impl ConfiguredTable {
    pub fn new(name: impl Into<String>, config: ModelConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn is_filter_field(&self, field: &str) -> bool {
        self.config.filter_fields.iter().any(|f| f == field)
    }
}

impl ModelTable for ConfiguredTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_select(&self) -> SelectQuery {
        let mut select = SelectQuery::new(self.config.table.clone());
        select.columns(self.config.columns.iter().cloned());
        for join in &self.config.joins {
            select.join(join.clone());
        }
        if let Some(condition) = &self.config.condition {
            select.and_where(Predicate::raw(condition.clone()));
        }
        for expr in &self.config.group_by {
            select.group_by(expr.clone());
        }
        select
    }

    fn supports_customization(&self, name: &str) -> bool {
        self.config.customizations.contains_key(name)
    }

    fn customize_select(
        &self,
        name: &str,
        select: &mut SelectQuery,
        _request: &DatatablesRequest,
    ) -> Result<()> {
        let condition = self
            .config
            .customizations
            .get(name)
            .ok_or_else(|| anyhow!("Model {} has no customization '{}'", self.name, name))?;
        select.and_where(Predicate::raw(condition.clone()));
        Ok(())
    }

    fn supports_filter(&self) -> bool {
        !self.config.filter_fields.is_empty()
    }

    fn apply_filter(&self, filter: &Map<String, Value>, select: &mut SelectQuery) -> Result<()> {
        for (field, value) in filter {
            if !self.is_filter_field(field) {
                debug!("model {}: ignoring filter field '{}'", self.name, field);
                continue;
            }
            if let Some(predicate) = filter_predicate(field, value) {
                select.and_where(predicate);
            }
        }
        Ok(())
    }
}

/// Equality for scalars, `IN` for lists; empty values do not filter
fn filter_predicate(field: &str, value: &Value) -> Option<Predicate> {
    match value {
        Value::Array(items) => {
            let values: Vec<SqlValue> = items.iter().filter_map(filter_value).collect();
            (!values.is_empty()).then(|| Predicate::is_in(field, values))
        }
        other => filter_value(other).map(|v| Predicate::eq(field, v)),
    }
}

fn filter_value(value: &Value) -> Option<SqlValue> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SqlValue::Integer(i)),
            None => n.as_f64().map(SqlValue::Real),
        },
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        _ => None,
    }
}
