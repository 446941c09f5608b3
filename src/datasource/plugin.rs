//! Datasource plugin trait and its error type
//!
//! A datasource plugin turns a normalized `DatatablesRequest` into a
//! `DatatablesResponse`. Plugins are synchronous: the HTTP layer runs them on the
//! blocking pool since every request performs several sequential SQLite executions.

use crate::datatables::{DatatablesRequest, DatatablesResponse, ErrorEnvelope};
use serde::{Deserialize, Serialize};

/// Result type for datasource plugins
pub type DatasourceResult<T> = Result<T, DatasourceError>;

/// Failure category, reported to the client as `error-exception`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or unknown model
    InvalidTable,
    /// No plugin registered under the requested alias
    UnknownPlugin,
    /// Request could not be read
    BadRequest,
    /// SQL preparation or execution failed
    Query,
    /// Unexpected server error
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidTable => "InvalidTable",
            ErrorKind::UnknownPlugin => "UnknownPlugin",
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Query => "Query",
            ErrorKind::Internal => "Internal",
        }
    }
}

/// Error type for datasource plugins
#[derive(Debug, Clone)]
pub struct DatasourceError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// HTTP status to answer with; 500 when unset
    pub code: Option<u16>,
}

impl DatasourceError {
    /// Create a new error
    pub fn new(kind: ErrorKind, message: impl Into<String>, code: Option<u16>) -> Self {
        Self {
            kind,
            message: message.into(),
            code,
        }
    }

    /// The request path names no model
    pub fn no_table() -> Self {
        Self::new(ErrorKind::InvalidTable, "No table specified", Some(400))
    }

    /// The request path names a model nobody registered
    pub fn model_not_found(name: &str) -> Self {
        Self::new(
            ErrorKind::InvalidTable,
            format!("Model {} not found", name),
            Some(404),
        )
    }

    pub fn unknown_plugin(alias: &str) -> Self {
        Self::new(
            ErrorKind::UnknownPlugin,
            format!("Datasource plugin '{}' not found", alias),
            Some(404),
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message, Some(400))
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Query, message, None)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message, None)
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self.code {
            Some(code) if (400..600).contains(&code) => code,
            _ => 500,
        }
    }

    /// Convert to the JSON error body
    pub fn to_error_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.message.clone(),
            error_exception: self.kind.as_str().to_string(),
            query: String::new(),
        }
    }
}

impl std::fmt::Display for DatasourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DatasourceError {}

impl From<anyhow::Error> for DatasourceError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<rusqlite::Error> for DatasourceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::query(err.to_string())
    }
}

/// Handler for requests routed to one plugin alias
pub trait DatasourcePlugin: Send + Sync + 'static {
    /// Answer one widget request
    fn process(&self, request: &DatatablesRequest) -> DatasourceResult<DatatablesResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(DatasourceError::no_table().status_code(), 400);
        assert_eq!(DatasourceError::model_not_found("X").status_code(), 404);
        assert_eq!(DatasourceError::unknown_plugin("x").status_code(), 404);
        assert_eq!(DatasourceError::bad_request("bad").status_code(), 400);
        assert_eq!(DatasourceError::query("boom").status_code(), 500);
        assert_eq!(DatasourceError::internal("boom").status_code(), 500);

        let odd = DatasourceError::new(ErrorKind::Internal, "odd", Some(42));
        assert_eq!(odd.status_code(), 500);
    }

    #[test]
    fn test_messages() {
        assert_eq!(DatasourceError::no_table().message, "No table specified");
        assert_eq!(
            DatasourceError::model_not_found("NoSuchTable").message,
            "Model NoSuchTable not found"
        );
        assert_eq!(
            DatasourceError::no_table().to_string(),
            "InvalidTable: No table specified"
        );
    }

    #[test]
    fn test_error_envelope() {
        let envelope = DatasourceError::model_not_found("Foo").to_error_envelope();
        assert_eq!(envelope.error, "Model Foo not found");
        assert_eq!(envelope.error_exception, "InvalidTable");
        assert_eq!(envelope.query, "");
    }

    #[test]
    fn test_conversions() {
        let err: DatasourceError = anyhow::anyhow!("wrapped").into();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, "wrapped");

        let err: DatasourceError = rusqlite::Error::InvalidQuery.into();
        assert_eq!(err.kind, ErrorKind::Query);
        assert_eq!(err.status_code(), 500);
    }
}
