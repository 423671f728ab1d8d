//! Test fixtures: a ready-made service and component request builders.

use std::sync::Arc;

use tempfile::TempDir;

use satcat_catalog::store::memory::MemoryStore;
use satcat_catalog::store::sqlite::SqliteStore;
use satcat_catalog::{CatalogService, CatalogStore, ComponentView, MakeBuy, NewComponent};
use satcat_core::{ComponentId, SubsystemId};

/// A catalog service over a fresh store.
///
/// The SQLite variant keeps its temporary directory alive for the lifetime
/// of the context.
pub struct TestContext {
    /// Service under test.
    pub service: CatalogService,
    _dir: Option<TempDir>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Creates a context over an in-memory store.
    pub fn new() -> Self {
        Self {
            service: CatalogService::new(Arc::new(MemoryStore::new())),
            _dir: None,
        }
    }

    /// Creates a context over a SQLite file in a temporary directory.
    pub fn sqlite() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = SqliteStore::open(dir.path().join("catalog.db")).expect("open sqlite store");
        Self {
            service: CatalogService::new(Arc::new(store)),
            _dir: Some(dir),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        self.service.store()
    }

    /// Creates a component, panicking on failure.
    pub async fn create(&self, new: NewComponent) -> ComponentView {
        let name = new.name.clone();
        self.service
            .create_component(new)
            .await
            .unwrap_or_else(|e| panic!("create {name}: {e}"))
    }

    /// Seeds the demo hierarchy and returns the catalog.
    pub async fn seeded(&self) -> Vec<ComponentView> {
        self.service.seed().await.expect("seed demo hierarchy")
    }

    /// Looks up a component identity by name, panicking when absent.
    pub async fn id_of(&self, name: &str) -> ComponentId {
        self.store()
            .find_component_by_name(name)
            .await
            .expect("query by name")
            .unwrap_or_else(|| panic!("no component named {name}"))
            .id
    }
}

/// Builders for component creation requests.
pub struct ComponentFactory;

impl ComponentFactory {
    /// A root component with schema defaults.
    pub fn root(name: &str) -> NewComponent {
        NewComponent::named(name)
    }

    /// A component under `parent`.
    pub fn child(name: &str, parent: ComponentId) -> NewComponent {
        let mut new = NewComponent::named(name);
        new.parent_id = Some(parent);
        new
    }

    /// A fully populated purchased part.
    pub fn bought_part(
        name: &str,
        parent: Option<ComponentId>,
        subsystem: Option<SubsystemId>,
    ) -> NewComponent {
        let mut new = NewComponent::named(name);
        new.part_number = Some(format!("PN-{}", name.to_uppercase().replace(' ', "-")));
        new.wbs = Some("1.1".to_string());
        new.make_buy = Some(MakeBuy::Buy);
        new.mass_kg = 1.5;
        new.cost_usd = 250.0;
        new.quantity = 2;
        new.parent_id = parent;
        new.subsystem_id = subsystem;
        new
    }
}
