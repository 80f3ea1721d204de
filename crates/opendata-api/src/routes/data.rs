//! Data file routes.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, middleware, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::error::ApiError;
use crate::extract::AuthenticatedUser;
use crate::quota;
use crate::state::AppState;

/// Cache identity block of a data response.
#[derive(Debug, Serialize)]
pub struct DataMetadata {
    /// The requested path.
    pub path: String,
    /// SHA-256 hex of the served bytes.
    pub etag: String,
    /// When the content was last loaded or revalidated.
    pub fetched_at: DateTime<Utc>,
}

/// Response body for data requests.
#[derive(Debug, Serialize)]
pub struct DataResponse<'a> {
    /// The file content.
    pub data: &'a Value,
    /// Cache identity.
    pub metadata: DataMetadata,
}

/// GET /{*path}
#[instrument(skip(state, user, headers), fields(username = %user.username, path = %path))]
async fn get_data(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let document = state.data_cache.fetch(&path).await?;

    let presented = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());
    if presented.is_some_and(|candidate| candidate.trim().trim_matches('"') == document.etag) {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        response
            .headers_mut()
            .insert(header::ETAG, etag_value(&document.etag)?);
        return Ok(response);
    }

    let body = DataResponse {
        data: &*document.data,
        metadata: DataMetadata {
            path,
            etag: document.etag.clone(),
            fetched_at: document.fetched_at,
        },
    };
    let mut response = Json(body).into_response();
    response
        .headers_mut()
        .insert(header::ETAG, etag_value(&document.etag)?);
    Ok(response)
}

fn etag_value(etag: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!("\"{etag}\""))
        .map_err(|_| ApiError::Internal("etag is not a valid header value".to_string()))
}

/// Returns the router for the data context, wrapped in the rate limit
/// middleware.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/{*path}", get(get_data))
        .route_layer(middleware::from_fn_with_state(state, quota::enforce))
}
