//! SQLite-backed catalog store.
//!
//! One connection behind a mutex; every call runs on the blocking pool.
//! Mutations that touch more than one row run inside a transaction.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use satcat_core::{ComponentId, SubsystemId};

use super::{CatalogStore, migrations};
use crate::error::{CatalogError, Result};
use crate::model::{Component, MakeBuy, NewComponent, Subsystem};
use crate::seed::SeedSet;

const COMPONENT_COLUMNS: &str =
    "id, name, part_number, wbs, make_buy, mass_kg, cost_usd, quantity, parent_id, subsystem_id";

/// Durable catalog store over a single SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the file cannot be opened or a
    /// migration fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self::from_connection(conn)?;
        tracing::info!(path = %path.display(), "opened sqlite catalog");
        Ok(store)
    }

    /// Opens a private in-memory database with the full schema.
    ///
    /// # Errors
    ///
    /// Returns a storage error when a migration fails.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let applied = migrations::apply(&mut conn)?;
        if !applied.is_empty() {
            tracing::info!(count = applied.len(), "schema migrated");
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| CatalogError::storage("sqlite connection lock poisoned"))?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| CatalogError::storage(format!("{op} task failed: {e}")))?
    }
}

fn component_from_row(row: &Row<'_>) -> rusqlite::Result<Component> {
    let make_buy = row
        .get::<_, Option<String>>(4)?
        .map(|code| {
            MakeBuy::from_code(&code).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(CatalogError::storage(format!("unknown make_buy code '{code}'"))),
                )
            })
        })
        .transpose()?;

    Ok(Component {
        id: ComponentId::new(row.get(0)?),
        name: row.get(1)?,
        part_number: row.get(2)?,
        wbs: row.get(3)?,
        make_buy,
        mass_kg: row.get(5)?,
        cost_usd: row.get(6)?,
        quantity: row.get(7)?,
        parent_id: row.get::<_, Option<i64>>(8)?.map(ComponentId::new),
        subsystem_id: row.get::<_, Option<i64>>(9)?.map(SubsystemId::new),
    })
}

fn subsystem_from_row(row: &Row<'_>) -> rusqlite::Result<Subsystem> {
    Ok(Subsystem {
        id: SubsystemId::new(row.get(0)?),
        name: row.get(1)?,
    })
}

fn insert_component_row(conn: &Connection, new: &NewComponent) -> Result<Component> {
    conn.execute(
        "INSERT INTO components
            (name, part_number, wbs, make_buy, mass_kg, cost_usd, quantity, parent_id, subsystem_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            new.name,
            new.part_number,
            new.wbs,
            new.make_buy.map(MakeBuy::code),
            new.mass_kg,
            new.cost_usd,
            new.quantity,
            new.parent_id.map(ComponentId::get),
            new.subsystem_id.map(SubsystemId::get),
        ],
    )?;
    let id = ComponentId::new(conn.last_insert_rowid());
    Ok(new.clone().into_component(id))
}

/// True when `target` is `start` or one of its stored ancestors.
///
/// `UNION` drops repeated rows, so an existing loop ends the walk.
fn reaches_ancestor(conn: &Connection, start: ComponentId, target: ComponentId) -> Result<bool> {
    let found = conn.query_row(
        "WITH RECURSIVE ancestors(id) AS (
             SELECT ?1
             UNION
             SELECT c.parent_id FROM components c
             JOIN ancestors a ON c.id = a.id
             WHERE c.parent_id IS NOT NULL
         )
         SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = ?2)",
        params![start.get(), target.get()],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(found)
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn list_components(&self, roots_only: bool) -> Result<Vec<Component>> {
        self.with_conn("list_components", move |conn| {
            let filter = if roots_only {
                " WHERE parent_id IS NULL"
            } else {
                ""
            };
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMPONENT_COLUMNS} FROM components{filter} ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([], component_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn get_component(&self, id: ComponentId) -> Result<Option<Component>> {
        self.with_conn("get_component", move |conn| {
            let component = conn
                .query_row(
                    &format!("SELECT {COMPONENT_COLUMNS} FROM components WHERE id = ?1"),
                    params![id.get()],
                    component_from_row,
                )
                .optional()?;
            Ok(component)
        })
        .await
    }

    async fn find_component_by_name(&self, name: &str) -> Result<Option<Component>> {
        let name = name.to_string();
        self.with_conn("find_component_by_name", move |conn| {
            let component = conn
                .query_row(
                    &format!("SELECT {COMPONENT_COLUMNS} FROM components WHERE name = ?1"),
                    params![name],
                    component_from_row,
                )
                .optional()?;
            Ok(component)
        })
        .await
    }

    async fn insert_component(&self, new: &NewComponent) -> Result<Component> {
        let new = new.clone();
        self.with_conn("insert_component", move |conn| {
            insert_component_row(conn, &new)
        })
        .await
    }

    async fn update_component(&self, component: &Component) -> Result<bool> {
        let component = component.clone();
        self.with_conn("update_component", move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let stored_parent: Option<Option<i64>> = tx
                .query_row(
                    "SELECT parent_id FROM components WHERE id = ?1",
                    params![component.id.get()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(stored_parent) = stored_parent else {
                return Ok(false);
            };
            if let Some(new_parent) = component.parent_id {
                if stored_parent != Some(new_parent.get())
                    && reaches_ancestor(&tx, new_parent, component.id)?
                {
                    return Err(CatalogError::cycle(component.id, new_parent));
                }
            }
            let changed = tx.execute(
                "UPDATE components SET
                    name = ?2, part_number = ?3, wbs = ?4, make_buy = ?5,
                    mass_kg = ?6, cost_usd = ?7, quantity = ?8,
                    parent_id = ?9, subsystem_id = ?10
                 WHERE id = ?1",
                params![
                    component.id.get(),
                    component.name,
                    component.part_number,
                    component.wbs,
                    component.make_buy.map(MakeBuy::code),
                    component.mass_kg,
                    component.cost_usd,
                    component.quantity,
                    component.parent_id.map(ComponentId::get),
                    component.subsystem_id.map(SubsystemId::get),
                ],
            )?;
            tx.commit()?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_component(&self, id: ComponentId) -> Result<bool> {
        self.with_conn("delete_component", move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE components SET parent_id = NULL WHERE parent_id = ?1",
                params![id.get()],
            )?;
            let deleted = tx.execute("DELETE FROM components WHERE id = ?1", params![id.get()])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn list_subsystems(&self) -> Result<Vec<Subsystem>> {
        self.with_conn("list_subsystems", |conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM subsystems ORDER BY name, id")?;
            let rows = stmt
                .query_map([], subsystem_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn get_subsystem(&self, id: SubsystemId) -> Result<Option<Subsystem>> {
        self.with_conn("get_subsystem", move |conn| {
            let subsystem = conn
                .query_row(
                    "SELECT id, name FROM subsystems WHERE id = ?1",
                    params![id.get()],
                    subsystem_from_row,
                )
                .optional()?;
            Ok(subsystem)
        })
        .await
    }

    async fn find_subsystem_by_name(&self, name: &str) -> Result<Option<Subsystem>> {
        let name = name.to_string();
        self.with_conn("find_subsystem_by_name", move |conn| {
            let subsystem = conn
                .query_row(
                    "SELECT id, name FROM subsystems WHERE name = ?1",
                    params![name],
                    subsystem_from_row,
                )
                .optional()?;
            Ok(subsystem)
        })
        .await
    }

    async fn insert_subsystem(&self, name: &str) -> Result<Subsystem> {
        let name = name.to_string();
        self.with_conn("insert_subsystem", move |conn| {
            conn.execute("INSERT INTO subsystems (name) VALUES (?1)", params![name])?;
            Ok(Subsystem {
                id: SubsystemId::new(conn.last_insert_rowid()),
                name,
            })
        })
        .await
    }

    async fn delete_subsystem(&self, id: SubsystemId) -> Result<bool> {
        self.with_conn("delete_subsystem", move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE components SET subsystem_id = NULL WHERE subsystem_id = ?1",
                params![id.get()],
            )?;
            let deleted = tx.execute("DELETE FROM subsystems WHERE id = ?1", params![id.get()])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn seed_if_empty(&self, seed: &SeedSet) -> Result<bool> {
        let seed = *seed;
        self.with_conn("seed_if_empty", move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let populated: bool =
                tx.query_row("SELECT EXISTS (SELECT 1 FROM components)", [], |row| {
                    row.get(0)
                })?;
            if populated {
                return Ok(false);
            }

            let mut subsystems: HashMap<&str, SubsystemId> = HashMap::new();
            for name in seed.subsystems {
                tx.execute(
                    "INSERT INTO subsystems (name) VALUES (?1) ON CONFLICT (name) DO NOTHING",
                    params![name],
                )?;
                let id: i64 = tx.query_row(
                    "SELECT id FROM subsystems WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                subsystems.insert(*name, SubsystemId::new(id));
            }

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
                let component = insert_component_row(&tx, &new)?;
                inserted.insert(entry.name, component.id);
            }

            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.with_conn("ping", |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}
