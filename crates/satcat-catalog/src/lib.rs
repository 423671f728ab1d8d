//! # satcat-catalog
//!
//! The component catalog: a hierarchical bill of materials grouped by
//! engineering subsystem.
//!
//! ## Layout
//!
//! - [`model`]: records and write requests with their field rules
//! - [`hierarchy`]: the pure two-pass assembler turning flat rows into trees
//! - [`store`]: the [`CatalogStore`] seam with SQLite and in-memory backends
//! - [`service`]: [`CatalogService`], which enforces the integrity rules the
//!   store cannot express (self-parenting, cycles, pre-write existence checks)
//! - [`seed`]: the fixed demo hierarchy
//! - [`export`]: spreadsheet rendering of the forest
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use satcat_catalog::model::NewComponent;
//! use satcat_catalog::store::memory::MemoryStore;
//! use satcat_catalog::CatalogService;
//!
//! # tokio_test_block(async {
//! let service = CatalogService::new(Arc::new(MemoryStore::new()));
//! let bus = service.create_component(NewComponent::named("Bus")).await?;
//! assert_eq!(bus.component.name, "Bus");
//! # Ok::<(), satcat_catalog::CatalogError>(())
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod hierarchy;
pub mod metrics;
pub mod model;
pub mod seed;
pub mod service;
pub mod store;

pub use error::{CatalogError, Result};
pub use hierarchy::{ComponentTreeNode, assemble_forest, assemble_subtree, flatten};
pub use model::{Component, ComponentPatch, ComponentView, MakeBuy, NewComponent, Subsystem};
pub use service::CatalogService;
pub use store::CatalogStore;
