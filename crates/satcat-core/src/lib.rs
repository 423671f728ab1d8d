//! # satcat-core
//!
//! Core primitives shared by every satcat crate:
//!
//! - **Identifiers**: Strongly-typed store-assigned IDs for components and subsystems
//! - **Error Types**: Infrastructure error definitions and result alias
//! - **Observability**: Logging initialization and span helpers
//!
//! Domain rules (hierarchy integrity, uniqueness) live in `satcat-catalog`;
//! this crate only carries what both the catalog and the HTTP layer need.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod observability;

pub use error::{Error, Result};
pub use id::{ComponentId, SubsystemId};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::{ComponentId, SubsystemId};
    pub use crate::observability::{LogFormat, catalog_span, init_logging};
}
