//! OpenAPI document route.

use axum::http::header;
use axum::response::IntoResponse;

use crate::error::{ApiError, ApiResult};

/// Serves the generated `OpenAPI` document.
pub(crate) async fn get_openapi_json() -> ApiResult<impl IntoResponse> {
    let json = crate::openapi::openapi_json().map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize OpenAPI document");
        ApiError::internal("failed to render OpenAPI document")
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], json))
}
