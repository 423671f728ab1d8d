//! API integration tests.
//!
//! Tests the complete request flow: HTTP → routes → catalog service → store.

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde::Deserialize;
use serde_json::json;
use tower::ServiceExt;

use satcat_api::config::{Config, CorsConfig};
use satcat_api::server::{Server, ServerBuilder};
use satcat_test_utils::TestContext;

fn test_router() -> axum::Router {
    ServerBuilder::new().debug(true).build().test_router()
}

fn sqlite_router(ctx: &TestContext) -> axum::Router {
    ServerBuilder::new()
        .debug(true)
        .catalog(ctx.service.clone())
        .build()
        .test_router()
}

#[derive(Debug, Deserialize)]
struct SubsystemRef {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ComponentBody {
    id: i64,
    name: String,
    part_number: Option<String>,
    wbs: Option<String>,
    make_buy: Option<String>,
    mass_kg: f64,
    quantity: i64,
    parent_id: Option<i64>,
    subsystem_id: Option<i64>,
    subsystem: Option<SubsystemRef>,
}

#[derive(Debug, Deserialize)]
struct TreeBody {
    id: i64,
    name: String,
    children: Vec<TreeBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: String,
    message: String,
    request_id: Option<String>,
}

mod helpers {
    use super::*;
    use serde::de::DeserializeOwned;

    pub fn make_request(
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Request<Body>> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");

        let body = match body {
            Some(v) => Body::from(serde_json::to_vec(&v).context("serialize request body")?),
            None => Body::empty(),
        };

        builder.body(body).context("build request")
    }

    pub async fn send(
        router: axum::Router,
        request: Request<Body>,
    ) -> Result<axum::response::Response> {
        let response = router.oneshot(request).await.map_err(|err| match err {})?;
        Ok(response)
    }

    async fn response_body(
        response: axum::response::Response,
    ) -> Result<(StatusCode, axum::body::Bytes)> {
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .context("read response body")?;
        Ok((status, body))
    }

    pub async fn call_json<T: DeserializeOwned>(
        router: axum::Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(StatusCode, T)> {
        let request = make_request(method, uri, body)?;
        let response = send(router, request).await?;
        let (status, body) = response_body(response).await?;
        let json = serde_json::from_slice(&body).with_context(|| {
            format!(
                "parse JSON response (status={status}): {}",
                String::from_utf8_lossy(&body)
            )
        })?;
        Ok((status, json))
    }

    pub async fn get_json<T: DeserializeOwned>(
        router: axum::Router,
        uri: &str,
    ) -> Result<(StatusCode, T)> {
        call_json(router, Method::GET, uri, None).await
    }

    pub async fn post_json<T: DeserializeOwned>(
        router: axum::Router,
        uri: &str,
        body: serde_json::Value,
    ) -> Result<(StatusCode, T)> {
        call_json(router, Method::POST, uri, Some(body)).await
    }

    pub async fn patch_json<T: DeserializeOwned>(
        router: axum::Router,
        uri: &str,
        body: serde_json::Value,
    ) -> Result<(StatusCode, T)> {
        call_json(router, Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(router: axum::Router, uri: &str) -> Result<StatusCode> {
        let request = make_request(Method::DELETE, uri, None)?;
        let response = send(router, request).await?;
        Ok(response.status())
    }

    /// Seeds the demo hierarchy and returns the catalog.
    pub async fn seed(router: axum::Router) -> Result<Vec<ComponentBody>> {
        let (status, body): (_, Vec<ComponentBody>) =
            call_json(router, Method::POST, "/components/seed", None).await?;
        assert_eq!(status, StatusCode::OK);
        Ok(body)
    }

    pub fn id_of(components: &[ComponentBody], name: &str) -> Result<i64> {
        components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .with_context(|| format!("no component named {name}"))
    }
}

// ============================================================================
// Component Tests
// ============================================================================

mod components {
    use super::*;

    #[tokio::test]
    async fn test_component_crud_lifecycle() -> Result<()> {
        let router = test_router();

        let (status, bus): (_, ComponentBody) = helpers::post_json(
            router.clone(),
            "/components",
            json!({ "name": "Bus", "wbs": "1", "make_buy": "M", "mass_kg": 40.0 }),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(bus.name, "Bus");
        assert_eq!(bus.make_buy.as_deref(), Some("M"));
        assert_eq!(bus.quantity, 1);
        assert_eq!(bus.parent_id, None);

        let (status, panel): (_, ComponentBody) = helpers::post_json(
            router.clone(),
            "/components",
            json!({ "name": "Panel", "parent_id": bus.id, "quantity": 4 }),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(panel.parent_id, Some(bus.id));

        let (status, got): (_, ComponentBody) =
            helpers::get_json(router.clone(), &format!("/components/{}", panel.id)).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(got.quantity, 4);

        let (status, patched): (_, ComponentBody) = helpers::patch_json(
            router.clone(),
            &format!("/components/{}", panel.id),
            json!({ "part_number": "PN-7", "mass_kg": 1.25 }),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched.part_number.as_deref(), Some("PN-7"));
        assert!((patched.mass_kg - 1.25).abs() < f64::EPSILON);
        assert_eq!(patched.quantity, 4);

        let status = helpers::delete(router.clone(), &format!("/components/{}", panel.id)).await?;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, err): (_, ErrorBody) =
            helpers::get_json(router, &format!("/components/{}", panel.id)).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "NOT_FOUND");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_bad_references_and_ranges() -> Result<()> {
        let router = test_router();

        let (status, err): (_, ErrorBody) =
            helpers::post_json(router.clone(), "/components", json!({ "name": "X", "parent_id": 99 }))
                .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(err.message.contains("99"), "message: {}", err.message);

        let (status, _): (_, ErrorBody) = helpers::post_json(
            router.clone(),
            "/components",
            json!({ "name": "X", "subsystem_id": 5 }),
        )
        .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, err): (_, ErrorBody) =
            helpers::post_json(router.clone(), "/components", json!({ "name": "X", "quantity": 0 }))
                .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "BAD_REQUEST");

        let (status, _): (_, ErrorBody) = helpers::post_json(
            router.clone(),
            "/components",
            json!({ "name": "X", "mass_kg": -1.0 }),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _): (_, ErrorBody) =
            helpers::post_json(router.clone(), "/components", json!({ "name": "" })).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _): (_, Vec<ComponentBody>) =
            helpers::get_json(router, "/components").await?;
        assert_eq!(status, StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_name_is_conflict() -> Result<()> {
        let router = test_router();
        let (status, _): (_, ComponentBody) =
            helpers::post_json(router.clone(), "/components", json!({ "name": "Bus" })).await?;
        assert_eq!(status, StatusCode::CREATED);

        let (status, err): (_, ErrorBody) =
            helpers::post_json(router.clone(), "/components", json!({ "name": "Bus" })).await?;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err.code, "CONFLICT");

        let (_, other): (_, ComponentBody) =
            helpers::post_json(router.clone(), "/components", json!({ "name": "Other" })).await?;
        let (status, _): (_, ErrorBody) = helpers::patch_json(
            router,
            &format!("/components/{}", other.id),
            json!({ "name": "Bus" }),
        )
        .await?;
        assert_eq!(status, StatusCode::CONFLICT);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_component_is_not_found() -> Result<()> {
        let (status, _): (_, ErrorBody) =
            helpers::patch_json(test_router(), "/components/42", json!({ "quantity": 2 })).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let status = helpers::delete(test_router(), "/components/42").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_path_id_is_bad_request() -> Result<()> {
        let request = Request::builder()
            .uri("/components/abc")
            .header("x-request-id", "trace-789")
            .body(Body::empty())
            .context("build request")?;
        let response = helpers::send(test_router(), request).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .context("read body")?;
        let err: ErrorBody = serde_json::from_slice(&body).context("parse error body")?;
        assert_eq!(err.code, "BAD_REQUEST");
        assert!(err.message.contains("abc"));
        assert_eq!(err.request_id.as_deref(), Some("trace-789"));

        let status = helpers::delete(test_router(), "/subsystems/x1").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_self_parent_and_cycles_are_rejected() -> Result<()> {
        let router = test_router();
        let seeded = helpers::seed(router.clone()).await?;
        let assembly = helpers::id_of(&seeded, "Battery Assembly")?;
        let cell = helpers::id_of(&seeded, "Li-Ion Cell")?;

        let (status, err): (_, ErrorBody) = helpers::patch_json(
            router.clone(),
            &format!("/components/{assembly}"),
            json!({ "parent_id": assembly }),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "BAD_REQUEST");

        let (status, _): (_, ErrorBody) = helpers::patch_json(
            router.clone(),
            &format!("/components/{assembly}"),
            json!({ "parent_id": cell }),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, unchanged): (_, ComponentBody) =
            helpers::get_json(router, &format!("/components/{assembly}")).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(unchanged.parent_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_patch_null_clears_nullable_fields() -> Result<()> {
        let router = test_router();
        let seeded = helpers::seed(router.clone()).await?;
        let panel = helpers::id_of(&seeded, "Solar Panel")?;

        let (status, updated): (_, ComponentBody) = helpers::patch_json(
            router.clone(),
            &format!("/components/{panel}"),
            json!({ "parent_id": null, "subsystem_id": null, "wbs": null }),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated.parent_id, None);
        assert_eq!(updated.subsystem_id, None);
        assert!(updated.subsystem.is_none());
        assert!(updated.wbs.is_none());
        assert_eq!(updated.quantity, 8);

        let (status, _): (_, ErrorBody) = helpers::patch_json(
            router,
            &format!("/components/{panel}"),
            json!({ "quantity": null }),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_roots_only_listing() -> Result<()> {
        let router = test_router();
        helpers::seed(router.clone()).await?;

        let (status, all): (_, Vec<ComponentBody>) =
            helpers::get_json(router.clone(), "/components").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.len(), 7);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));

        let (status, roots): (_, Vec<ComponentBody>) =
            helpers::get_json(router, "/components?roots_only=true").await?;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = roots.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Battery Assembly", "Solar Array"]);
        Ok(())
    }
}

// ============================================================================
// Hierarchy Tests
// ============================================================================

mod hierarchy {
    use super::*;

    fn child_names(node: &TreeBody) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_seed_builds_demo_tree() -> Result<()> {
        let router = test_router();
        let seeded = helpers::seed(router.clone()).await?;
        assert_eq!(seeded.len(), 7);

        let bracket = seeded
            .iter()
            .find(|c| c.name == "Battery Bracket")
            .context("bracket")?;
        assert_eq!(
            bracket.subsystem.as_ref().map(|s| s.name.as_str()),
            Some("Structures")
        );

        let (status, forest): (_, Vec<TreeBody>) =
            helpers::get_json(router.clone(), "/components/tree").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(forest.len(), 2);
        assert_eq!(child_names(&forest[0]), ["Li-Ion Battery", "Battery Bracket"]);
        assert_eq!(child_names(&forest[0].children[0]), ["Li-Ion Cell"]);
        assert_eq!(child_names(&forest[1]), ["Solar Panel", "Array Harness"]);

        let again = helpers::seed(router).await?;
        let ids: Vec<_> = again.iter().map(|c| c.id).collect();
        assert_eq!(ids, seeded.iter().map(|c| c.id).collect::<Vec<_>>());
        Ok(())
    }

    #[tokio::test]
    async fn test_subtree_and_reparenting() -> Result<()> {
        let router = test_router();
        let seeded = helpers::seed(router.clone()).await?;
        let bracket = helpers::id_of(&seeded, "Battery Bracket")?;
        let array = helpers::id_of(&seeded, "Solar Array")?;

        let (status, _): (_, ComponentBody) = helpers::patch_json(
            router.clone(),
            &format!("/components/{bracket}"),
            json!({ "parent_id": array }),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);

        let (status, subtree): (_, TreeBody) =
            helpers::get_json(router.clone(), &format!("/components/{array}/tree")).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(subtree.id, array);
        assert_eq!(
            child_names(&subtree),
            ["Battery Bracket", "Solar Panel", "Array Harness"]
        );

        let (status, err): (_, ErrorBody) =
            helpers::get_json(router, "/components/999/tree").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "NOT_FOUND");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_promotes_children_to_roots() -> Result<()> {
        let router = test_router();
        let seeded = helpers::seed(router.clone()).await?;
        let battery = helpers::id_of(&seeded, "Li-Ion Battery")?;

        let status = helpers::delete(router.clone(), &format!("/components/{battery}")).await?;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, roots): (_, Vec<ComponentBody>) =
            helpers::get_json(router, "/components?roots_only=true").await?;
        let names: Vec<_> = roots.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Battery Assembly", "Li-Ion Cell", "Solar Array"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_sqlite_backed_router_round_trip() -> Result<()> {
        let ctx = TestContext::sqlite();
        let router = sqlite_router(&ctx);
        let seeded = helpers::seed(router.clone()).await?;
        assert_eq!(seeded.len(), 7);

        let (status, forest): (_, Vec<TreeBody>) =
            helpers::get_json(router, "/components/tree").await?;
        assert_eq!(status, StatusCode::OK);
        let total: usize = forest.iter().map(count).sum();
        assert_eq!(total, 7);
        Ok(())
    }

    fn count(node: &TreeBody) -> usize {
        1 + node.children.iter().map(count).sum::<usize>()
    }
}

// ============================================================================
// Subsystem Tests
// ============================================================================

mod subsystems {
    use super::*;

    #[tokio::test]
    async fn test_subsystem_lifecycle() -> Result<()> {
        let router = test_router();

        let (status, avionics): (_, SubsystemRef) =
            helpers::post_json(router.clone(), "/subsystems", json!({ "name": "Avionics" })).await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(avionics.name, "Avionics");

        let (status, _): (_, ErrorBody) =
            helpers::post_json(router.clone(), "/subsystems", json!({ "name": "Avionics" })).await?;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _): (_, ErrorBody) =
            helpers::post_json(router.clone(), "/subsystems", json!({ "name": "" })).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, obc): (_, ComponentBody) = helpers::post_json(
            router.clone(),
            "/components",
            json!({ "name": "OBC", "subsystem_id": avionics.id }),
        )
        .await?;
        assert_eq!(obc.subsystem.as_ref().map(|s| s.id), Some(avionics.id));

        let status = helpers::delete(router.clone(), &format!("/subsystems/{}", avionics.id)).await?;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, obc): (_, ComponentBody) =
            helpers::get_json(router.clone(), &format!("/components/{}", obc.id)).await?;
        assert_eq!(obc.subsystem_id, None);

        let status = helpers::delete(router, &format!("/subsystems/{}", avionics.id)).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_subsystems_listed_by_name() -> Result<()> {
        let router = test_router();
        helpers::seed(router.clone()).await?;
        let (status, list): (_, Vec<SubsystemRef>) =
            helpers::get_json(router, "/subsystems").await?;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = list.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["EPS", "Structures"]);
        Ok(())
    }
}

// ============================================================================
// Export, Request ID and Server Tests
// ============================================================================

mod surface {
    use super::*;

    #[tokio::test]
    async fn test_excel_export_headers() -> Result<()> {
        let router = test_router();
        helpers::seed(router.clone()).await?;

        let request = helpers::make_request(Method::GET, "/components/export/excel", None)?;
        let response = helpers::send(router, request).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some(satcat_catalog::export::CONTENT_TYPE)
        );
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(disposition.contains("components.xlsx"), "{disposition}");

        let body = axum::body::to_bytes(response.into_body(), 4 * 1024 * 1024)
            .await
            .context("read workbook")?;
        assert!(body.starts_with(b"PK"));
        Ok(())
    }

    #[tokio::test]
    async fn test_request_id_is_echoed_on_success_and_error() -> Result<()> {
        let router = test_router();

        let request = Request::builder()
            .uri("/healthz")
            .header("x-request-id", "trace-123")
            .body(Body::empty())
            .context("build request")?;
        let response = helpers::send(router.clone(), request).await?;
        assert_eq!(
            response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
            Some("trace-123")
        );

        let request = Request::builder()
            .uri("/components/77")
            .header("x-request-id", "trace-456")
            .body(Body::empty())
            .context("build request")?;
        let response = helpers::send(router, request).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .context("read body")?;
        let err: ErrorBody = serde_json::from_slice(&body).context("parse error body")?;
        assert_eq!(err.request_id.as_deref(), Some("trace-456"));
        Ok(())
    }

    #[tokio::test]
    async fn test_cors_preflight_for_allowed_origin() -> Result<()> {
        let config = Config {
            debug: true,
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
                max_age_seconds: 600,
            },
            ..Config::default()
        };
        let router = Server::open(config)?.test_router();

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/components")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
            .body(Body::empty())
            .context("build request")?;
        let response = helpers::send(router, request).await?;
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:3000")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders_after_init() -> Result<()> {
        satcat_api::metrics::init_metrics();
        let router = test_router();
        helpers::seed(router.clone()).await?;

        let request = helpers::make_request(Method::GET, "/metrics", None)?;
        let response = helpers::send(router, request).await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }
}
