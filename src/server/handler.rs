//! HTTP handler for widget requests
//!
//! Reads the parameter tree (query string for `GET`; JSON or form body otherwise),
//! dispatches the request to the plugin named by the first path segment on the
//! blocking pool, and writes either the response envelope or an error body.

use crate::datasource::DatasourceError;
use crate::datatables::{nest_pairs, DatatablesRequest};
use crate::server::ServerState;
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Query, Request, State},
    http::{header, request::Parts, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

/// Largest request body accepted, in bytes
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

type Pairs = Vec<(String, String)>;

pub async fn datatables_handler(State(state): State<ServerState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let pretty = !is_xhr(&parts.headers);

    let request = match read_request(&state, parts, body).await {
        Ok(request) => request,
        Err(err) => return error_response(&err),
    };

    let registry = state.registry.clone();
    let result = tokio::task::spawn_blocking(move || registry.dispatch(&request)).await;

    match result {
        Ok(Ok(response)) => json_response(StatusCode::OK, &response, pretty),
        Ok(Err(err)) => error_response(&err),
        Err(join_err) => error_response(&DatasourceError::internal(format!(
            "Datasource task failed: {}",
            join_err
        ))),
    }
}

async fn read_request(
    state: &ServerState,
    parts: Parts,
    body: Body,
) -> Result<DatatablesRequest, DatasourceError> {
    let path = relative_path(parts.uri.path(), &state.config.mount_path).to_string();
    let method = parts.method.clone();

    let query = match Query::<Pairs>::try_from_uri(&parts.uri) {
        Ok(Query(pairs)) => nest_pairs(pairs),
        Err(rejection) => return Err(DatasourceError::bad_request(rejection.body_text())),
    };

    let body = if method == Method::GET {
        Value::Object(Map::new())
    } else {
        let bytes = axum::body::to_bytes(body, MAX_BODY_SIZE)
            .await
            .map_err(|e| DatasourceError::bad_request(format!("Failed to read body: {}", e)))?;
        read_body(parts, bytes).await?
    };

    debug!("{} {}{}", method, state.config.mount_path, path);
    Ok(DatatablesRequest::from_params(
        method.as_str(),
        &path,
        query,
        body,
    ))
}

/// Parse a non-`GET` body: JSON when declared as such, form-encoded otherwise
async fn read_body(parts: Parts, bytes: Bytes) -> Result<Value, DatasourceError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Object(Map::new()));
    }

    if is_json(&parts.headers) {
        return serde_json::from_slice(&bytes)
            .map_err(|e| DatasourceError::bad_request(format!("Invalid JSON body: {}", e)));
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    match Form::<Pairs>::from_request(req, &()).await {
        Ok(Form(pairs)) => Ok(nest_pairs(pairs)),
        Err(rejection) => Err(DatasourceError::bad_request(rejection.body_text())),
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let mime = v.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn is_xhr(headers: &HeaderMap) -> bool {
    headers
        .get_all("x-requested-with")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Path below `mount_path`; the full path when it does not start with it
pub fn relative_path<'a>(path: &'a str, mount_path: &str) -> &'a str {
    match path.strip_prefix(mount_path) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

fn json_response<T: Serialize>(status: StatusCode, value: &T, pretty: bool) -> Response {
    let body = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };

    match body {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"Failed to serialize response","error-exception":"Internal","query":""}"#,
            )
                .into_response()
        }
    }
}

fn error_response(err: &DatasourceError) -> Response {
    error!("datatables request failed: {}", err);
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_response(status, &err.to_error_envelope(), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("/datatables/model/Users", "/datatables"), "/model/Users");
        assert_eq!(relative_path("/datatables", "/datatables"), "");
        assert_eq!(relative_path("/datatablesX/model", "/datatables"), "/datatablesX/model");
        assert_eq!(relative_path("/model/Users", ""), "/model/Users");
    }

    #[test]
    fn test_is_xhr() {
        let mut headers = HeaderMap::new();
        assert!(!is_xhr(&headers));
        headers.insert("x-requested-with", HeaderValue::from_static("xmlhttprequest"));
        assert!(is_xhr(&headers));
    }

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        assert!(!is_json(&headers));
    }
}
