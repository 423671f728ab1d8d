//! # satcat-api
//!
//! HTTP layer for the satellite component catalog.
//!
//! This crate maps the catalog service onto JSON endpoints and carries the
//! ambient server concerns:
//!
//! - **Routing**: axum routes with `OpenAPI` annotations
//! - **Errors**: stable `{code, message, requestId}` bodies
//! - **Observability**: request IDs, tracing spans and Prometheus metrics
//!
//! Hierarchy rules and validation live in `satcat-catalog`; handlers only
//! translate between wire types and the service.
//!
//! ## Endpoints
//!
//! ```text
//!   GET    /healthz                  - Liveness check
//!   GET    /ready                    - Readiness check (store ping)
//!   GET    /metrics                  - Prometheus metrics
//!   GET    /openapi.json             - OpenAPI document
//!   POST   /components               - Create component
//!   GET    /components               - List components (?roots_only=true)
//!   GET    /components/tree          - Full forest
//!   POST   /components/seed          - Idempotent demo seed
//!   GET    /components/export/excel  - XLSX export
//!   GET    /components/{id}          - Get component
//!   PATCH  /components/{id}          - Partial update
//!   DELETE /components/{id}          - Delete (children promoted to roots)
//!   GET    /components/{id}/tree     - Subtree
//!   POST   /subsystems               - Create subsystem
//!   GET    /subsystems               - List subsystems
//!   DELETE /subsystems/{id}          - Delete subsystem
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use satcat_api::config::Config;
//! use satcat_api::server::Server;
//!
//! let server = Server::open(Config::from_env()?)?;
//! server.serve().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;
