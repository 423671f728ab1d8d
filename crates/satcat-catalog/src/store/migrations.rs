//! Versioned schema migrations for the SQLite store.
//!
//! Migrations run in order and each applied version is recorded in
//! `schema_migrations`. Every step is additive and tolerates a database
//! that already carries part of the change: tables and indexes use
//! `IF NOT EXISTS`, and a column that already exists is not added again.

use rusqlite::{Connection, OptionalExtension, Transaction, params};

use crate::error::Result;

/// One schema change.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Runs a batch of idempotent SQL statements.
    Sql(&'static str),
    /// Adds a column unless the table already has it.
    AddColumn {
        /// Table to alter.
        table: &'static str,
        /// Column name.
        column: &'static str,
        /// Column type and constraints.
        definition: &'static str,
    },
}

/// A versioned group of steps applied in one transaction.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Ordered version key.
    pub version: &'static str,
    /// Short description recorded alongside the version.
    pub description: &'static str,
    /// Steps in application order.
    pub steps: &'static [Step],
}

/// The full migration history, oldest first.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001",
        description: "create components table",
        steps: &[Step::Sql(
            "CREATE TABLE IF NOT EXISTS components (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                mass_kg REAL NOT NULL DEFAULT 0,
                cost_usd REAL NOT NULL DEFAULT 0,
                quantity INTEGER NOT NULL DEFAULT 1,
                parent_id INTEGER REFERENCES components(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS ix_components_parent_id ON components(parent_id);",
        )],
    },
    Migration {
        version: "0002",
        description: "add subsystems",
        steps: &[
            Step::Sql(
                "CREATE TABLE IF NOT EXISTS subsystems (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE
                );",
            ),
            Step::AddColumn {
                table: "components",
                column: "subsystem_id",
                definition: "INTEGER REFERENCES subsystems(id) ON DELETE SET NULL",
            },
            Step::Sql(
                "CREATE INDEX IF NOT EXISTS ix_components_subsystem_id ON components(subsystem_id);",
            ),
        ],
    },
    Migration {
        version: "0003",
        description: "add wbs",
        steps: &[Step::AddColumn {
            table: "components",
            column: "wbs",
            definition: "TEXT",
        }],
    },
    Migration {
        version: "0004",
        description: "add make_buy",
        steps: &[Step::AddColumn {
            table: "components",
            column: "make_buy",
            definition: "TEXT CHECK (make_buy IN ('M', 'B'))",
        }],
    },
    Migration {
        version: "0005",
        description: "add part_number",
        steps: &[Step::AddColumn {
            table: "components",
            column: "part_number",
            definition: "TEXT",
        }],
    },
];

/// Applies every migration not yet recorded, returning the versions applied.
///
/// # Errors
///
/// Returns a storage error when a statement fails; the failing migration
/// is rolled back and later ones are not attempted.
pub fn apply(conn: &mut Connection) -> Result<Vec<&'static str>> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );",
    )?;

    let mut applied = Vec::new();
    for migration in MIGRATIONS {
        let tx = conn.transaction()?;
        if is_recorded(&tx, migration.version)? {
            continue;
        }
        for step in migration.steps {
            run_step(&tx, step)?;
        }
        tx.execute(
            "INSERT INTO schema_migrations (version, description) VALUES (?1, ?2)",
            params![migration.version, migration.description],
        )?;
        tx.commit()?;
        tracing::info!(
            version = migration.version,
            description = migration.description,
            "applied schema migration"
        );
        applied.push(migration.version);
    }
    Ok(applied)
}

/// Returns the recorded versions in order.
///
/// # Errors
///
/// Returns a storage error when `schema_migrations` cannot be read.
pub fn recorded_versions(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(versions)
}

fn is_recorded(tx: &Transaction<'_>, version: &str) -> Result<bool> {
    let found = tx
        .query_row(
            "SELECT 1 FROM schema_migrations WHERE version = ?1",
            params![version],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn run_step(tx: &Transaction<'_>, step: &Step) -> Result<()> {
    match *step {
        Step::Sql(sql) => tx.execute_batch(sql)?,
        Step::AddColumn {
            table,
            column,
            definition,
        } => {
            if has_column(tx, table, column)? {
                tracing::debug!(table, column, "column already present, skipping");
            } else {
                tx.execute_batch(&format!(
                    "ALTER TABLE {table} ADD COLUMN {column} {definition};"
                ))?;
            }
        }
    }
    Ok(())
}

fn has_column(tx: &Transaction<'_>, table: &str, column: &str) -> Result<bool> {
    let mut stmt = tx.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names.iter().any(|name| name == column))
}
