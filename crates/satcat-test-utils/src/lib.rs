//! Shared test utilities for satcat tests.
//!
//! This crate provides:
//! - [`TestContext`]: a catalog service over a fresh in-memory or temporary SQLite store
//! - [`ComponentFactory`]: builders for component creation requests
//! - Tree assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use satcat_test_utils::{ComponentFactory, TestContext, assert_child_names};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let ctx = TestContext::new();
//!     let root = ctx.create(ComponentFactory::root("Bus")).await;
//!     // ... run test ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("satcat=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
