//! In-memory store implementation for tests and debug mode.
//!
//! ## Limitations
//!
//! - **No persistence**: all state is lost when the process exits
//! - **Single-process only**: state is not shared across process boundaries

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use satcat_core::{ComponentId, SubsystemId};

use super::CatalogStore;
use crate::error::{CatalogError, Result};
use crate::model::{Component, NewComponent, Subsystem};
use crate::seed::SeedSet;

#[derive(Debug, Default)]
struct State {
    components: BTreeMap<ComponentId, Component>,
    subsystems: BTreeMap<SubsystemId, Subsystem>,
    last_component_id: i64,
    last_subsystem_id: i64,
}

impl State {
    fn next_component_id(&mut self) -> ComponentId {
        self.last_component_id += 1;
        ComponentId::new(self.last_component_id)
    }

    fn next_subsystem_id(&mut self) -> SubsystemId {
        self.last_subsystem_id += 1;
        SubsystemId::new(self.last_subsystem_id)
    }

    fn component_named(&self, name: &str) -> Option<&Component> {
        self.components.values().find(|c| c.name == name)
    }

    fn subsystem_named(&self, name: &str) -> Option<&Subsystem> {
        self.subsystems.values().find(|s| s.name == name)
    }

    /// Mirrors the UNIQUE and REFERENCES constraints of the SQLite schema.
    fn check_constraints(&self, component: &Component) -> Result<()> {
        if self
            .component_named(&component.name)
            .is_some_and(|other| other.id != component.id)
        {
            return Err(CatalogError::conflict("duplicate value for components.name"));
        }
        if let Some(parent) = component.parent_id {
            if !self.components.contains_key(&parent) {
                return Err(CatalogError::not_found(format!(
                    "parent component {parent} does not exist"
                )));
            }
        }
        if let Some(subsystem) = component.subsystem_id {
            if !self.subsystems.contains_key(&subsystem) {
                return Err(CatalogError::not_found(format!(
                    "subsystem {subsystem} does not exist"
                )));
            }
        }
        Ok(())
    }

    /// Rejects a parent change whose new ancestor chain reaches the
    /// component itself. Runs under the same write lock as the update.
    fn check_reparent(&self, component: &Component) -> Result<()> {
        let Some(new_parent) = component.parent_id else {
            return Ok(());
        };
        let unchanged = self
            .components
            .get(&component.id)
            .is_some_and(|stored| stored.parent_id == Some(new_parent));
        if unchanged {
            return Ok(());
        }
        let mut seen = HashSet::new();
        let mut cursor = Some(new_parent);
        while let Some(current) = cursor {
            if current == component.id {
                return Err(CatalogError::cycle(component.id, new_parent));
            }
            if !seen.insert(current) {
                break;
            }
            cursor = self.components.get(&current).and_then(|c| c.parent_id);
        }
        Ok(())
    }

    fn insert_component(&mut self, new: NewComponent) -> Result<Component> {
        let id = self.next_component_id();
        let component = new.into_component(id);
        if let Err(err) = self.check_constraints(&component) {
            self.last_component_id -= 1;
            return Err(err);
        }
        self.components.insert(id, component.clone());
        Ok(component)
    }

    fn ensure_subsystem(&mut self, name: &str) -> SubsystemId {
        if let Some(existing) = self.subsystem_named(name) {
            return existing.id;
        }
        let id = self.next_subsystem_id();
        self.subsystems.insert(
            id,
            Subsystem {
                id,
                name: name.to_string(),
            },
        );
        id
    }
}

/// Thread-safe in-memory catalog store.
///
/// ```rust
/// use satcat_catalog::store::memory::MemoryStore;
///
/// let store = MemoryStore::new();
/// // hand it to CatalogService::new(Arc::new(store))
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> CatalogError {
    CatalogError::storage("lock poisoned")
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_components(&self, roots_only: bool) -> Result<Vec<Component>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state
            .components
            .values()
            .filter(|c| !roots_only || c.parent_id.is_none())
            .cloned()
            .collect())
    }

    async fn get_component(&self, id: ComponentId) -> Result<Option<Component>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.components.get(&id).cloned())
    }

    async fn find_component_by_name(&self, name: &str) -> Result<Option<Component>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.component_named(name).cloned())
    }

    async fn insert_component(&self, new: &NewComponent) -> Result<Component> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.insert_component(new.clone())
    }

    async fn update_component(&self, component: &Component) -> Result<bool> {
        let mut state = self.state.write().map_err(poison_err)?;
        if !state.components.contains_key(&component.id) {
            return Ok(false);
        }
        state.check_constraints(component)?;
        state.check_reparent(component)?;
        state.components.insert(component.id, component.clone());
        Ok(true)
    }

    async fn delete_component(&self, id: ComponentId) -> Result<bool> {
        let mut state = self.state.write().map_err(poison_err)?;
        if state.components.remove(&id).is_none() {
            return Ok(false);
        }
        for child in state
            .components
            .values_mut()
            .filter(|c| c.parent_id == Some(id))
        {
            child.parent_id = None;
        }
        Ok(true)
    }

    async fn list_subsystems(&self) -> Result<Vec<Subsystem>> {
        let state = self.state.read().map_err(poison_err)?;
        let mut subsystems: Vec<Subsystem> = state.subsystems.values().cloned().collect();
        subsystems.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subsystems)
    }

    async fn get_subsystem(&self, id: SubsystemId) -> Result<Option<Subsystem>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.subsystems.get(&id).cloned())
    }

    async fn find_subsystem_by_name(&self, name: &str) -> Result<Option<Subsystem>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.subsystem_named(name).cloned())
    }

    async fn insert_subsystem(&self, name: &str) -> Result<Subsystem> {
        let mut state = self.state.write().map_err(poison_err)?;
        if state.subsystem_named(name).is_some() {
            return Err(CatalogError::conflict("duplicate value for subsystems.name"));
        }
        let id = state.next_subsystem_id();
        let subsystem = Subsystem {
            id,
            name: name.to_string(),
        };
        state.subsystems.insert(id, subsystem.clone());
        Ok(subsystem)
    }

    async fn delete_subsystem(&self, id: SubsystemId) -> Result<bool> {
        let mut state = self.state.write().map_err(poison_err)?;
        if state.subsystems.remove(&id).is_none() {
            return Ok(false);
        }
        for component in state
            .components
            .values_mut()
            .filter(|c| c.subsystem_id == Some(id))
        {
            component.subsystem_id = None;
        }
        Ok(true)
    }

    async fn seed_if_empty(&self, seed: &SeedSet) -> Result<bool> {
        let mut state = self.state.write().map_err(poison_err)?;
        if !state.components.is_empty() {
            return Ok(false);
        }

        // Build on a copy so a failing entry leaves the store untouched.
        let mut staged = State {
            components: BTreeMap::new(),
            subsystems: state.subsystems.clone(),
            last_component_id: state.last_component_id,
            last_subsystem_id: state.last_subsystem_id,
        };
        let subsystems: HashMap<&str, SubsystemId> = seed
            .subsystems
            .iter()
            .map(|name| (*name, staged.ensure_subsystem(name)))
            .collect();

        let mut inserted: HashMap<&str, ComponentId> = HashMap::new();
        for entry in seed.components {
            let mut new = NewComponent::named(entry.name);
            new.mass_kg = entry.mass_kg;
            new.cost_usd = entry.cost_usd;
            new.quantity = entry.quantity;
            new.subsystem_id = subsystems.get(entry.subsystem).copied();
            new.parent_id = match entry.parent {
                Some(parent) => Some(inserted.get(parent).copied().ok_or_else(|| {
                    CatalogError::internal(format!(
                        "seed entry {} precedes its parent {parent}",
                        entry.name
                    ))
                })?),
                None => None,
            };
            let component = staged.insert_component(new)?;
            inserted.insert(entry.name, component.id);
        }

        *state = staged;
        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        self.state.read().map_err(poison_err).map(|_| ())
    }
}
