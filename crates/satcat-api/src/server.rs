//! API server implementation.
//!
//! Provides health, ready, metrics, `OpenAPI` and catalog endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower::ServiceBuilder;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use satcat_catalog::CatalogService;
use satcat_catalog::store::memory::MemoryStore;
use satcat_catalog::store::sqlite::SqliteStore;
use satcat_core::{Error, Result};

use crate::config::{Config, CorsConfig};
use crate::context::{REQUEST_ID_HEADER, RequestId};
use crate::error::ApiError;

/// Caps in-flight requests across the whole router.
///
/// `Router::layer` wraps every route separately, so the semaphore has to be
/// shared between the copies or each route would get its own budget.
fn limit_concurrency<S>(router: Router<S>, limit: Option<usize>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    match limit {
        Some(limit) => router.layer(GlobalConcurrencyLimitLayer::new(limit)),
        None => router,
    }
}

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Catalog service over the configured store.
    pub catalog: CatalogService,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Liveness check. Does not touch the store.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check: 200 once the store answers, 503 otherwise.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.catalog.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    message: Some("store unavailable".to_string()),
                }),
            )
        }
    }
}

async fn not_found(request_id: RequestId, uri: OriginalUri) -> ApiError {
    ApiError::not_found(format!("no route for {}", uri.0.path())).with_request_id(request_id.0)
}

async fn method_not_allowed(request_id: RequestId, method: Method, uri: OriginalUri) -> ApiError {
    ApiError::method_not_allowed(format!("{method} is not allowed on {}", uri.0.path()))
        .with_request_id(request_id.0)
}

async fn handle_timeout_error(err: tower::BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::service_unavailable("request timed out")
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ApiError::internal("internal error")
    }
}

// ============================================================================
// Server
// ============================================================================

/// The satcat API server.
#[derive(Debug)]
pub struct Server {
    config: Config,
    catalog: CatalogService,
}

impl Server {
    /// Opens the store named by `config` and creates a server over it.
    ///
    /// Uses SQLite at `database_path` when set. Without a path, an in-memory
    /// store is used, which is only allowed in debug mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened or migrated.
    pub fn open(config: Config) -> Result<Self> {
        let catalog = match &config.database_path {
            Some(path) => {
                let store = SqliteStore::open(path).map_err(|e| Error::Internal {
                    message: format!("failed to open database {}: {e}", path.display()),
                })?;
                tracing::info!(path = %path.display(), "Opened SQLite catalog");
                CatalogService::new(Arc::new(store))
            }
            None if config.debug => {
                tracing::warn!("No database path configured; using in-memory catalog");
                CatalogService::new(Arc::new(MemoryStore::new()))
            }
            None => {
                return Err(Error::InvalidInput(
                    "database_path (SATCAT_DATABASE_PATH) is required when debug is off"
                        .to_string(),
                ));
            }
        };
        let server = Self { config, catalog };
        server.validate_config()?;
        Ok(server)
    }

    /// Creates a new `ServerBuilder`.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self) -> Router {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            catalog: self.catalog.clone(),
        });

        let router = Router::new()
            .route("/healthz", get(health))
            .route("/ready", get(ready))
            .route("/metrics", get(crate::metrics::serve_metrics))
            .route(
                "/openapi.json",
                get(crate::routes::openapi::get_openapi_json),
            )
            .merge(crate::routes::catalog_routes())
            .method_not_allowed_fallback(method_not_allowed)
            .fallback(not_found);

        let router = limit_concurrency(router, self.config.concurrency_limit);

        let router = match self.config.request_timeout() {
            Some(timeout) => router.layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_timeout_error))
                    .layer(TimeoutLayer::new(timeout)),
            ),
            None => router,
        };

        // Request ID outermost so every response, including timeouts, echoes it.
        router
            .layer(self.build_cors_layer())
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(crate::metrics::metrics_middleware))
            .layer(middleware::from_fn(crate::context::request_id_middleware))
            .with_state(state)
    }

    /// Builds the CORS layer from configuration.
    fn build_cors_layer(&self) -> CorsLayer {
        let cors_config = &self.config.cors;
        let cors = Self::build_cors_base(cors_config);
        Self::apply_cors_allowed_origins(cors, cors_config)
    }

    fn build_cors_base(cors_config: &CorsConfig) -> CorsLayer {
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static(REQUEST_ID_HEADER),
            ])
            .expose_headers([
                header::CONTENT_TYPE,
                header::CONTENT_LENGTH,
                header::CONTENT_DISPOSITION,
                header::HeaderName::from_static(REQUEST_ID_HEADER),
            ])
            .max_age(Duration::from_secs(cors_config.max_age_seconds))
    }

    fn cors_allows_any_origin(cors_config: &CorsConfig) -> bool {
        cors_config.allowed_origins.len() == 1
            && cors_config
                .allowed_origins
                .first()
                .is_some_and(|origin| origin == "*")
    }

    fn parse_cors_origins(cors_config: &CorsConfig) -> Vec<HeaderValue> {
        let mut allowed = Vec::new();
        for origin in &cors_config.allowed_origins {
            match HeaderValue::from_str(origin) {
                Ok(value) => allowed.push(value),
                Err(_) => {
                    tracing::error!(
                        origin = %origin,
                        "Invalid CORS origin; expected a valid HeaderValue"
                    );
                }
            }
        }
        allowed
    }

    fn apply_cors_allowed_origins(cors: CorsLayer, cors_config: &CorsConfig) -> CorsLayer {
        if cors_config.allowed_origins.is_empty() {
            return cors;
        }

        if Self::cors_allows_any_origin(cors_config) {
            return cors.allow_origin(Any);
        }

        if cors_config
            .allowed_origins
            .iter()
            .any(|origin| origin == "*")
        {
            tracing::error!(
                origins = ?cors_config.allowed_origins,
                "Invalid CORS config: '*' must be the only allowed origin"
            );
            return cors;
        }

        let allowed = Self::parse_cors_origins(cors_config);

        if allowed.is_empty() {
            tracing::warn!("All configured CORS origins were invalid; disabling CORS");
            cors
        } else {
            tracing::info!(origins = ?cors_config.allowed_origins, "CORS configured");
            cors.allow_origin(AllowOrigin::list(allowed))
        }
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// Runs the idempotent demo seed first when `seed_on_start` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed fails or the server cannot bind to the port.
    pub async fn serve(&self) -> Result<()> {
        self.validate_config()?;

        crate::metrics::init_metrics();

        if self.config.seed_on_start {
            let components = self.catalog.seed().await.map_err(|e| Error::Internal {
                message: format!("startup seed failed: {e}"),
            })?;
            tracing::info!(components = components.len(), "Startup seed complete");
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.create_router();

        tracing::info!(http_port = self.config.http_port, "Starting satcat API server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal {
                message: format!("failed to bind to {addr}: {e}"),
            })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal {
                message: format!("server error: {e}"),
            })?;

        Ok(())
    }

    /// Creates a test router for the server.
    ///
    /// Lets integration tests drive the routes without binding a port.
    #[doc(hidden)]
    pub fn test_router(&self) -> Router {
        self.create_router()
    }

    fn validate_config(&self) -> Result<()> {
        if !self.config.debug
            && self
                .config
                .cors
                .allowed_origins
                .iter()
                .any(|origin| origin == "*")
        {
            return Err(Error::InvalidInput(
                "cors.allowed_origins cannot include '*' when debug=false".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a server around an explicit catalog.
#[derive(Debug)]
pub struct ServerBuilder {
    config: Config,
    catalog: Option<CatalogService>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    /// Creates a new server builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            catalog: None,
        }
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the HTTP port.
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Enables debug mode.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    /// Sets the catalog used by request handlers.
    ///
    /// Defaults to a fresh in-memory catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: CatalogService) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server {
            config: self.config,
            catalog: self
                .catalog
                .unwrap_or_else(|| CatalogService::new(Arc::new(MemoryStore::new()))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
