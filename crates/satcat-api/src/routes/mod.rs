//! HTTP route handlers.

pub mod components;
pub mod openapi;
pub mod subsystems;

use std::str::FromStr;
use std::sync::Arc;

use axum::Router;

use satcat_core::Error as CoreError;

use crate::context::RequestId;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Catalog routes (components and subsystems).
pub fn catalog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(components::routes())
        .merge(subsystems::routes())
}

/// Parses an `{id}` path segment; a malformed id is a 400 with a JSON body.
fn parse_id<T>(raw: &str, request_id: &RequestId) -> ApiResult<T>
where
    T: FromStr<Err = CoreError>,
{
    raw.parse()
        .map_err(|e: CoreError| ApiError::from(e).with_request_id(request_id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use satcat_core::ComponentId;

    #[test]
    fn malformed_path_id_is_bad_request() {
        let request_id = RequestId("req-9".to_string());
        let err = parse_id::<ComponentId>("abc", &request_id).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.request_id(), Some("req-9"));
        assert!(err.message().contains("abc"));

        let id: ComponentId = parse_id("12", &request_id).unwrap();
        assert_eq!(id.get(), 12);
    }
}
