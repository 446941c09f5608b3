//! The `model` datasource plugin
//!
//! Serves `{alias}/{ModelName}[/{customization}]` requests against a model table.
//! Each request runs three statements in order on one locked connection:
//!
//! 1. the unfiltered count (`recordsTotal`),
//! 2. the count after the filter form is applied (`recordsFiltered`),
//! 3. the searched, ordered and paged fetch (`data`).

use crate::database::{DatabaseConn, Predicate, SelectQuery};
use crate::datasource::plugin::{DatasourceError, DatasourcePlugin, DatasourceResult};
use crate::datasource::table::{ModelResolver, ModelTable};
use crate::datatables::{Column, DatatablesRequest, DatatablesResponse};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub struct ModelPlugin {
    db: Arc<Mutex<DatabaseConn>>,
    models: Arc<dyn ModelResolver>,
    column_search: bool,
}

impl ModelPlugin {
    /// Alias the plugin is registered under
    pub const ALIAS: &'static str = "model";

    pub fn new(db: Arc<Mutex<DatabaseConn>>, models: Arc<dyn ModelResolver>) -> Self {
        Self {
            db,
            models,
            column_search: false,
        }
    }

    /// Compose `columns[i][search][value]` terms into the query
    pub fn with_column_search(mut self, enabled: bool) -> Self {
        self.column_search = enabled;
        self
    }

    /// Resolve the model named by the second path segment
    pub fn model_from_request(
        &self,
        request: &DatatablesRequest,
    ) -> DatasourceResult<Arc<dyn ModelTable>> {
        let Some(name) = request.model_name() else {
            return Err(DatasourceError::no_table());
        };
        self.models
            .resolve(name)
            .ok_or_else(|| DatasourceError::model_not_found(name))
    }

    /// OR of case-insensitive substring matches over the searchable columns; true when
    /// `term` is empty
    pub fn global_search_predicate(columns: &[&Column], term: &str) -> Predicate {
        if term.is_empty() {
            return Predicate::True;
        }
        Predicate::Any(
            columns
                .iter()
                .filter(|c| c.is_searchable())
                .map(|c| Predicate::contains(c.db_data(), term))
                .collect(),
        )
    }

    /// AND of each searchable column's own search term; true when none is set
    pub fn column_search_predicate(columns: &[&Column]) -> Predicate {
        Predicate::All(
            columns
                .iter()
                .filter(|c| c.is_searchable() && !c.search_value().is_empty())
                .map(|c| Predicate::contains(c.db_data(), c.search_value()))
                .collect(),
        )
    }

    fn lock_db(&self) -> DatasourceResult<std::sync::MutexGuard<'_, DatabaseConn>> {
        self.db
            .lock()
            .map_err(|_| DatasourceError::internal("Database connection lock poisoned"))
    }
}

impl DatasourcePlugin for ModelPlugin {
    fn process(&self, request: &DatatablesRequest) -> DatasourceResult<DatatablesResponse> {
        let mut response = DatatablesResponse::new(request);
        let table = self.model_from_request(request)?;
        let mut select = table.base_select();

        if let Some(name) = request.customization_name() {
            if table.supports_customization(name) {
                table.customize_select(name, &mut select, request)?;
            } else {
                warn!("model {} has no customization '{}', ignoring", table.name(), name);
            }
        }

        // paging and ordering always come from the request
        select.reset_order().reset_limit().reset_offset();

        let db = self.lock_db()?;

        response.set_records_total(count(&db, &select)?);

        if table.supports_filter() {
            let filter = request.filter();
            table.apply_filter(&filter, &mut select)?;
            response.set_filter(filter);
        }

        response.set_records_filtered(count(&db, &select)?);

        let columns = known_columns(&db, &select, table.name(), request.columns())?;

        select.having(Self::global_search_predicate(&columns, &request.search()));
        if self.column_search {
            select.having(Self::column_search_predicate(&columns));
        } else {
            // per-column group stays in the statement as a vacuous `1` while disabled
            select.having(Predicate::True);
        }

        for column in &columns {
            if let Some(dir) = column.order_dir().to_sort() {
                select.order_by(column.db_data(), dir);
            }
        }

        select.offset(request.start() as u64);
        if let Some(limit) = request.limit() {
            select.limit(limit);
        }

        let query = select.to_sql_string();
        debug!("model {}: {}", table.name(), query);
        response.set_query(query);

        let (sql, params) = select.build();
        let rows = db
            .query_rows(&sql, &params)
            .map_err(|e| DatasourceError::query(e.to_string()))?;
        for row in rows {
            response.add_row(row);
        }

        Ok(response)
    }
}

fn count(db: &DatabaseConn, select: &SelectQuery) -> DatasourceResult<u64> {
    let (sql, params) = select.build_count();
    db.count(&sql, &params)
        .map_err(|e| DatasourceError::query(e.to_string()))
}

/// Request columns whose field is projected by `select`
///
/// Fields arrive from the client; anything the select does not project is skipped
/// so it never reaches the statement.
fn known_columns<'a>(
    db: &DatabaseConn,
    select: &SelectQuery,
    model: &str,
    columns: &'a [Column],
) -> DatasourceResult<Vec<&'a Column>> {
    let (sql, _) = select.build();
    let projected = db
        .column_names(&sql)
        .map_err(|e| DatasourceError::query(e.to_string()))?;

    Ok(columns
        .iter()
        .filter(|column| {
            let known = projected
                .iter()
                .any(|name| name.eq_ignore_ascii_case(column.db_data()));
            if !known {
                warn!(
                    "model {}: skipping unknown field '{}' for search and order",
                    model,
                    column.db_data()
                );
            }
            known
        })
        .collect())
}
