//! The catalog operation surface.
//!
//! [`CatalogService`] validates requests, runs every existence and
//! uniqueness check before issuing a write, rejects self-parenting and
//! cycles, and hands tree construction to [`crate::hierarchy`]. The store
//! only ever sees writes that already passed these checks; a uniqueness
//! race lost at the store still surfaces as [`CatalogError::Conflict`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::Instrument;

use satcat_core::observability::catalog_span;
use satcat_core::{ComponentId, SubsystemId};

use crate::error::{CatalogError, Result};
use crate::export;
use crate::hierarchy::{self, ComponentTreeNode};
use crate::metrics::{record_mutation, record_tree_size};
use crate::model::{
    Component, ComponentPatch, ComponentView, NewComponent, Subsystem, validate_subsystem_name,
};
use crate::seed;
use crate::store::CatalogStore;

/// Catalog operations over a [`CatalogStore`].
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService").finish_non_exhaustive()
    }
}

impl CatalogService {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Creates a component.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Validation`] for out-of-range fields
    /// - [`CatalogError::NotFound`] for a missing parent or subsystem
    /// - [`CatalogError::Conflict`] when the name is taken
    pub async fn create_component(&self, new: NewComponent) -> Result<ComponentView> {
        async move {
            new.validate()?;
            if let Some(parent) = new.parent_id {
                self.require_component(parent, "parent component").await?;
            }
            if let Some(subsystem) = new.subsystem_id {
                self.require_subsystem(subsystem).await?;
            }
            if self.store.find_component_by_name(&new.name).await?.is_some() {
                return Err(name_taken(&new.name));
            }

            let component = self.store.insert_component(&new).await?;
            record_mutation("create_component");
            tracing::info!(
                component_id = %component.id,
                parent_id = ?component.parent_id,
                subsystem_id = ?component.subsystem_id,
                "created component"
            );
            self.view(component).await
        }
        .instrument(catalog_span("create_component"))
        .await
    }

    /// Lists components ordered by identity.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] when the store fails.
    pub async fn list_components(&self, roots_only: bool) -> Result<Vec<ComponentView>> {
        async move {
            let components = self.store.list_components(roots_only).await?;
            tracing::debug!(count = components.len(), roots_only, "listed components");
            self.views(components).await
        }
        .instrument(catalog_span("list_components"))
        .await
    }

    /// Fetches one component with its resolved subsystem.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when `id` does not exist.
    pub async fn get_component(&self, id: ComponentId) -> Result<ComponentView> {
        let component = self.require_component(id, "component").await?;
        self.view(component).await
    }

    /// Applies a partial update.
    ///
    /// Checks run in this order: target exists, field ranges, self-parent,
    /// parent exists, no cycle, subsystem exists, name free. A patch with no
    /// fields returns the stored record without writing.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] for a missing target, parent, or subsystem
    /// - [`CatalogError::Validation`] for out-of-range fields, an explicit
    ///   `null` on a required field, self-parenting, or a cycle
    /// - [`CatalogError::Conflict`] when renaming to a taken name
    pub async fn update_component(
        &self,
        id: ComponentId,
        patch: ComponentPatch,
    ) -> Result<ComponentView> {
        async move {
            let mut component = self.require_component(id, "component").await?;
            patch.validate()?;
            if patch.is_empty() {
                tracing::debug!(component_id = %id, "empty patch; nothing to write");
                return self.view(component).await;
            }

            if let Some(parent) = patch.new_parent() {
                if parent == id {
                    return Err(CatalogError::validation(format!(
                        "component {id} cannot be its own parent"
                    )));
                }
                self.require_component(parent, "parent component").await?;
                let all = self.store.list_components(false).await?;
                if hierarchy::would_create_cycle(&all, id, parent) {
                    return Err(CatalogError::cycle(id, parent));
                }
            }
            if let Some(subsystem) = patch.new_subsystem() {
                self.require_subsystem(subsystem).await?;
            }
            if let Some(name) = patch.new_name() {
                if let Some(holder) = self.store.find_component_by_name(name).await? {
                    if holder.id != id {
                        return Err(name_taken(name));
                    }
                }
            }

            patch.apply_to(&mut component);
            if !self.store.update_component(&component).await? {
                return Err(component_not_found(id));
            }
            record_mutation("update_component");
            tracing::info!(
                component_id = %id,
                parent_id = ?component.parent_id,
                subsystem_id = ?component.subsystem_id,
                "updated component"
            );
            self.view(component).await
        }
        .instrument(catalog_span("update_component"))
        .await
    }

    /// Deletes a component; its children become roots.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when `id` does not exist.
    pub async fn delete_component(&self, id: ComponentId) -> Result<()> {
        async move {
            if !self.store.delete_component(id).await? {
                return Err(component_not_found(id));
            }
            record_mutation("delete_component");
            tracing::info!(component_id = %id, "deleted component");
            Ok(())
        }
        .instrument(catalog_span("delete_component"))
        .await
    }

    /// Assembles the subtree rooted at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when `id` does not exist.
    pub async fn component_tree(&self, id: ComponentId) -> Result<ComponentTreeNode> {
        async move {
            let all = self.store.list_components(false).await?;
            let tree =
                hierarchy::assemble_subtree(&all, id).ok_or_else(|| component_not_found(id))?;
            let nodes = tree.size();
            record_tree_size("subtree", nodes);
            tracing::debug!(component_id = %id, nodes, "assembled subtree");
            Ok(tree)
        }
        .instrument(catalog_span("component_tree"))
        .await
    }

    /// Assembles every root with its descendants.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] when the store fails.
    pub async fn component_forest(&self) -> Result<Vec<ComponentTreeNode>> {
        async move {
            let all = self.store.list_components(false).await?;
            let forest = hierarchy::assemble_forest(&all);
            record_tree_size("forest", all.len());
            tracing::debug!(roots = forest.len(), nodes = all.len(), "assembled forest");
            Ok(forest)
        }
        .instrument(catalog_span("component_forest"))
        .await
    }

    /// Inserts the demo hierarchy when the catalog is empty and returns the
    /// full catalog either way.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] when the store fails.
    pub async fn seed(&self) -> Result<Vec<ComponentView>> {
        async move {
            if self.store.seed_if_empty(&seed::DEMO).await? {
                record_mutation("seed");
                tracing::info!(
                    components = seed::DEMO.components.len(),
                    "seeded demo hierarchy"
                );
            } else {
                tracing::debug!("catalog not empty, seed skipped");
            }
            let components = self.store.list_components(false).await?;
            self.views(components).await
        }
        .instrument(catalog_span("seed"))
        .await
    }

    /// Renders the forest as an XLSX workbook.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] when the store fails or
    /// [`CatalogError::Internal`] when rendering fails.
    pub async fn export_workbook(&self) -> Result<Vec<u8>> {
        async move {
            let all = self.store.list_components(false).await?;
            let subsystems = self.store.list_subsystems().await?;
            let forest = hierarchy::assemble_forest(&all);
            let bytes = export::render_workbook(&forest, &subsystems)?;
            tracing::info!(rows = all.len(), bytes = bytes.len(), "exported workbook");
            Ok(bytes)
        }
        .instrument(catalog_span("export_workbook"))
        .await
    }

    /// Creates a subsystem.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Validation`] for an empty or overlong name
    /// - [`CatalogError::Conflict`] when the name is taken
    pub async fn create_subsystem(&self, name: String) -> Result<Subsystem> {
        async move {
            validate_subsystem_name(&name)?;
            if self.store.find_subsystem_by_name(&name).await?.is_some() {
                return Err(CatalogError::conflict(format!(
                    "subsystem named '{name}' already exists"
                )));
            }
            let subsystem = self.store.insert_subsystem(&name).await?;
            record_mutation("create_subsystem");
            tracing::info!(subsystem_id = %subsystem.id, "created subsystem");
            Ok(subsystem)
        }
        .instrument(catalog_span("create_subsystem"))
        .await
    }

    /// Lists subsystems ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] when the store fails.
    pub async fn list_subsystems(&self) -> Result<Vec<Subsystem>> {
        self.store.list_subsystems().await
    }

    /// Deletes a subsystem; referencing components lose their subsystem.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when `id` does not exist.
    pub async fn delete_subsystem(&self, id: SubsystemId) -> Result<()> {
        async move {
            if !self.store.delete_subsystem(id).await? {
                return Err(subsystem_not_found(id));
            }
            record_mutation("delete_subsystem");
            tracing::info!(subsystem_id = %id, "deleted subsystem");
            Ok(())
        }
        .instrument(catalog_span("delete_subsystem"))
        .await
    }

    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] when it is not.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    async fn require_component(&self, id: ComponentId, what: &str) -> Result<Component> {
        self.store
            .get_component(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(format!("{what} {id} does not exist")))
    }

    async fn require_subsystem(&self, id: SubsystemId) -> Result<Subsystem> {
        self.store
            .get_subsystem(id)
            .await?
            .ok_or_else(|| subsystem_not_found(id))
    }

    async fn view(&self, component: Component) -> Result<ComponentView> {
        let subsystem = match component.subsystem_id {
            Some(id) => self.store.get_subsystem(id).await?,
            None => None,
        };
        Ok(ComponentView {
            component,
            subsystem,
        })
    }

    async fn views(&self, components: Vec<Component>) -> Result<Vec<ComponentView>> {
        let subsystems: HashMap<SubsystemId, Subsystem> = self
            .store
            .list_subsystems()
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        Ok(components
            .into_iter()
            .map(|component| {
                let subsystem = component
                    .subsystem_id
                    .and_then(|id| subsystems.get(&id).cloned());
                ComponentView {
                    component,
                    subsystem,
                }
            })
            .collect())
    }
}

fn component_not_found(id: ComponentId) -> CatalogError {
    CatalogError::not_found(format!("component {id} does not exist"))
}

fn subsystem_not_found(id: SubsystemId) -> CatalogError {
    CatalogError::not_found(format!("subsystem {id} does not exist"))
}

fn name_taken(name: &str) -> CatalogError {
    CatalogError::conflict(format!("component named '{name}' already exists"))
}
