//! Response envelope in the widget's server-side processing format
//!
//! ```json
//! {
//!   "draw": 3,
//!   "recordsTotal": 23,
//!   "recordsFiltered": 23,
//!   "data": [{"id": 11, "name": "..."}],
//!   "error": null,
//!   "query": "SELECT ...",
//!   "filter": {}
//! }
//! ```

use crate::database::RowMap;
use crate::datatables::request::DatatablesRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire form of a successful request
///
/// Every key is always present, `null` when unset. Failures are answered with an
/// `ErrorEnvelope` instead, so `error` is always `null` here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub draw: i64,
    pub records_total: Option<u64>,
    pub records_filtered: Option<u64>,
    pub data: Vec<RowMap>,
    pub error: Option<String>,
    pub query: Option<String>,
    pub filter: Map<String, Value>,
}

/// Wire form of a failed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(rename = "error-exception")]
    pub error_exception: String,
    pub query: String,
}

/// Response under construction by a datasource plugin
#[derive(Debug, Clone)]
pub struct DatatablesResponse {
    draw: i64,
    request_filter: Map<String, Value>,
    data: Vec<RowMap>,
    records_total: Option<u64>,
    records_filtered: Option<u64>,
    query: Option<String>,
    filter: Option<Map<String, Value>>,
}

impl DatatablesResponse {
    pub fn new(request: &DatatablesRequest) -> Self {
        Self {
            draw: request.draw(),
            request_filter: request.filter(),
            data: Vec::new(),
            records_total: None,
            records_filtered: None,
            query: None,
            filter: None,
        }
    }

    pub fn add_row(&mut self, row: RowMap) {
        self.data.push(row);
    }

    pub fn set_records_total(&mut self, total: u64) {
        self.records_total = Some(total);
    }

    pub fn set_records_filtered(&mut self, filtered: u64) {
        self.records_filtered = Some(filtered);
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = Some(query.into());
    }

    /// Record the filter the datasource actually applied
    pub fn set_filter(&mut self, filter: Map<String, Value>) {
        self.filter = Some(filter);
    }

    pub fn draw(&self) -> i64 {
        self.draw
    }

    pub fn rows(&self) -> &[RowMap] {
        &self.data
    }

    /// Total count; the number of rows when the datasource did not count
    pub fn records_total(&self) -> u64 {
        self.records_total.unwrap_or(self.data.len() as u64)
    }

    /// Filtered count; the total when the datasource did not count
    pub fn records_filtered(&self) -> u64 {
        self.records_filtered
            .unwrap_or_else(|| self.records_total())
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Applied filter, falling back to the request's filter
    pub fn filter(&self) -> &Map<String, Value> {
        self.filter.as_ref().unwrap_or(&self.request_filter)
    }

    pub fn to_envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope {
            draw: self.draw,
            records_total: Some(self.records_total()),
            records_filtered: Some(self.records_filtered()),
            data: self.data.clone(),
            error: None,
            query: self.query.clone(),
            filter: self.filter().clone(),
        }
    }

    pub fn into_envelope(self) -> ResponseEnvelope {
        let records_total = self.records_total();
        let records_filtered = self.records_filtered();
        let filter = self.filter.unwrap_or(self.request_filter);
        ResponseEnvelope {
            draw: self.draw,
            records_total: Some(records_total),
            records_filtered: Some(records_filtered),
            data: self.data,
            error: None,
            query: self.query,
            filter,
        }
    }
}

impl Serialize for DatatablesResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_envelope().serialize(serializer)
    }
}
