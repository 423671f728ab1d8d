//! Opposite reparents racing through the service must never leave a cycle.
//!
//! A gated store holds the first two `list_components` calls at a barrier,
//! so both updates pass the service's cycle check against the same snapshot
//! before either write lands. The store's own check has to reject one.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Barrier;

use satcat_catalog::seed::SeedSet;
use satcat_catalog::store::memory::MemoryStore;
use satcat_catalog::store::sqlite::SqliteStore;
use satcat_catalog::{
    CatalogError, CatalogService, CatalogStore, Component, ComponentPatch, NewComponent,
    Result, Subsystem, flatten,
};
use satcat_core::{ComponentId, SubsystemId};

struct GatedStore {
    inner: Arc<dyn CatalogStore>,
    gate: Barrier,
    gated_calls: AtomicUsize,
}

impl GatedStore {
    fn new(inner: Arc<dyn CatalogStore>) -> Self {
        Self {
            inner,
            gate: Barrier::new(2),
            gated_calls: AtomicUsize::new(2),
        }
    }
}

#[async_trait]
impl CatalogStore for GatedStore {
    async fn list_components(&self, roots_only: bool) -> Result<Vec<Component>> {
        let rows = self.inner.list_components(roots_only).await?;
        let gated = self
            .gated_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gated {
            self.gate.wait().await;
        }
        Ok(rows)
    }

    async fn get_component(&self, id: ComponentId) -> Result<Option<Component>> {
        self.inner.get_component(id).await
    }

    async fn find_component_by_name(&self, name: &str) -> Result<Option<Component>> {
        self.inner.find_component_by_name(name).await
    }

    async fn insert_component(&self, new: &NewComponent) -> Result<Component> {
        self.inner.insert_component(new).await
    }

    async fn update_component(&self, component: &Component) -> Result<bool> {
        self.inner.update_component(component).await
    }

    async fn delete_component(&self, id: ComponentId) -> Result<bool> {
        self.inner.delete_component(id).await
    }

    async fn list_subsystems(&self) -> Result<Vec<Subsystem>> {
        self.inner.list_subsystems().await
    }

    async fn get_subsystem(&self, id: SubsystemId) -> Result<Option<Subsystem>> {
        self.inner.get_subsystem(id).await
    }

    async fn find_subsystem_by_name(&self, name: &str) -> Result<Option<Subsystem>> {
        self.inner.find_subsystem_by_name(name).await
    }

    async fn insert_subsystem(&self, name: &str) -> Result<Subsystem> {
        self.inner.insert_subsystem(name).await
    }

    async fn delete_subsystem(&self, id: SubsystemId) -> Result<bool> {
        self.inner.delete_subsystem(id).await
    }

    async fn seed_if_empty(&self, seed: &SeedSet) -> Result<bool> {
        self.inner.seed_if_empty(seed).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}

fn reparent(parent: ComponentId) -> ComponentPatch {
    ComponentPatch {
        parent_id: Some(Some(parent)),
        ..ComponentPatch::default()
    }
}

async fn race_opposite_reparents(backend: &str, inner: Arc<dyn CatalogStore>) {
    let service = CatalogService::new(Arc::new(GatedStore::new(inner)));
    let a = service
        .create_component(NewComponent::named("A"))
        .await
        .unwrap()
        .component
        .id;
    let b = service
        .create_component(NewComponent::named("B"))
        .await
        .unwrap()
        .component
        .id;

    let first = tokio::spawn({
        let service = service.clone();
        async move { service.update_component(a, reparent(b)).await }
    });
    let second = tokio::spawn({
        let service = service.clone();
        async move { service.update_component(b, reparent(a)).await }
    });
    let results = [first.await.unwrap(), second.await.unwrap()];

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1, "{backend}: exactly one reparent may win");
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(CatalogError::Validation { .. }))),
        "{backend}: the loser is rejected as a cycle"
    );

    let rows = service.store().list_components(false).await.unwrap();
    let forest = service.component_forest().await.unwrap();
    assert_eq!(flatten(&forest).len(), rows.len(), "{backend}: forest lost rows");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn opposite_reparents_on_memory_store_leave_a_forest() {
    race_opposite_reparents("memory", Arc::new(MemoryStore::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn opposite_reparents_on_sqlite_store_leave_a_forest() {
    let store = SqliteStore::open_in_memory().unwrap();
    race_opposite_reparents("sqlite", Arc::new(store)).await;
}
