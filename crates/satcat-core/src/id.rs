//! Strongly-typed identifiers for catalog entities.
//!
//! Identities are integers assigned by the store (SQLite rowids, or a
//! monotonically increasing counter for the in-memory store). Wrapping them
//! keeps a component ID from being passed where a subsystem ID is expected.
//!
//! ```rust
//! use satcat_core::id::{ComponentId, SubsystemId};
//!
//! let component = ComponentId::new(7);
//! let subsystem = SubsystemId::new(7);
//! assert_eq!(component.get(), subsystem.get());
//! // let wrong: ComponentId = subsystem; // does not compile
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identity of a component in the bill of materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(i64);

impl ComponentId {
    /// Wraps a raw store identity.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw store identity.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ComponentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| Error::InvalidId {
                message: format!("invalid component ID '{s}': {e}"),
            })
    }
}

/// Identity of a subsystem grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubsystemId(i64);

impl SubsystemId {
    /// Wraps a raw store identity.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw store identity.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubsystemId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| Error::InvalidId {
                message: format!("invalid subsystem ID '{s}': {e}"),
            })
    }
}
