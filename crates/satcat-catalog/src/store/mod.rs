//! Persistence seam for the catalog.
//!
//! Each method is one unit of work: mutating methods run in a single
//! transaction (SQLite) or a single write-lock critical section (memory).
//! Stores enforce what a relational schema can express, namely name
//! uniqueness (reported as [`CatalogError::Conflict`]) and reference
//! existence, and re-check the ancestor chain on every parent change.
//! The remaining hierarchy rules live in [`crate::service::CatalogService`].
//!
//! [`CatalogError::Conflict`]: crate::error::CatalogError::Conflict

pub mod memory;
pub mod migrations;
pub mod sqlite;

use async_trait::async_trait;

use satcat_core::{ComponentId, SubsystemId};

use crate::error::Result;
use crate::model::{Component, NewComponent, Subsystem};
use crate::seed::SeedSet;

/// Storage backend for components and subsystems.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Lists components ordered by identity, optionally only those with no parent.
    async fn list_components(&self, roots_only: bool) -> Result<Vec<Component>>;

    /// Fetches one component.
    async fn get_component(&self, id: ComponentId) -> Result<Option<Component>>;

    /// Fetches a component by its unique name.
    async fn find_component_by_name(&self, name: &str) -> Result<Option<Component>>;

    /// Inserts a component and returns it with its assigned identity.
    ///
    /// A taken name is a conflict; a missing parent or subsystem is not-found.
    async fn insert_component(&self, new: &NewComponent) -> Result<Component>;

    /// Replaces every field of an existing component.
    ///
    /// When the parent changes, the new parent's ancestor chain is walked in
    /// the same unit of work as the write; reaching `component.id` is a
    /// [`CatalogError::Validation`] error and nothing is written.
    /// Returns `false` when no component has `component.id`.
    ///
    /// [`CatalogError::Validation`]: crate::error::CatalogError::Validation
    async fn update_component(&self, component: &Component) -> Result<bool>;

    /// Deletes a component, promoting its children to roots in the same
    /// unit of work. Returns `false` when the component did not exist.
    async fn delete_component(&self, id: ComponentId) -> Result<bool>;

    /// Lists subsystems ordered by name.
    async fn list_subsystems(&self) -> Result<Vec<Subsystem>>;

    /// Fetches one subsystem.
    async fn get_subsystem(&self, id: SubsystemId) -> Result<Option<Subsystem>>;

    /// Fetches a subsystem by its unique name.
    async fn find_subsystem_by_name(&self, name: &str) -> Result<Option<Subsystem>>;

    /// Inserts a subsystem.
    async fn insert_subsystem(&self, name: &str) -> Result<Subsystem>;

    /// Deletes a subsystem, clearing `subsystem_id` on every referencing
    /// component in the same unit of work. Returns `false` when absent.
    async fn delete_subsystem(&self, id: SubsystemId) -> Result<bool>;

    /// Inserts `seed` when the catalog holds no components.
    ///
    /// The emptiness check and the inserts form one unit of work. Seed
    /// subsystems that already exist are reused. Returns `true` when rows
    /// were written.
    async fn seed_if_empty(&self, seed: &SeedSet) -> Result<bool>;

    /// Verifies the backend is reachable.
    async fn ping(&self) -> Result<()>;
}
