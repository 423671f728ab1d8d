//! The fixed demo hierarchy used by the seed operation.
//!
//! ```text
//! Battery Assembly (EPS)
//! ├── Li-Ion Battery (EPS)
//! │   └── Li-Ion Cell ×200 (EPS)
//! └── Battery Bracket (Structures)
//! Solar Array (EPS)
//! ├── Solar Panel ×8 (EPS)
//! └── Array Harness (EPS)
//! ```

/// Subsystem holding the power components.
pub const EPS: &str = "EPS";

/// Subsystem holding the structural components.
pub const STRUCTURES: &str = "Structures";

/// One component of a seed set. Parents refer to earlier entries by name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedComponent {
    /// Component name.
    pub name: &'static str,
    /// Name of an earlier entry in the same set.
    pub parent: Option<&'static str>,
    /// Name of a subsystem listed in the same set.
    pub subsystem: &'static str,
    /// Unit mass in kilograms.
    pub mass_kg: f64,
    /// Unit cost in US dollars.
    pub cost_usd: f64,
    /// Number of units.
    pub quantity: i64,
}

/// Subsystems and components inserted together by the seed operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedSet {
    /// Subsystem names, created when missing.
    pub subsystems: &'static [&'static str],
    /// Components in insertion order, parents first.
    pub components: &'static [SeedComponent],
}

const fn part(
    name: &'static str,
    parent: Option<&'static str>,
    subsystem: &'static str,
    mass_kg: f64,
    cost_usd: f64,
    quantity: i64,
) -> SeedComponent {
    SeedComponent {
        name,
        parent,
        subsystem,
        mass_kg,
        cost_usd,
        quantity,
    }
}

/// The demo power-and-structures hierarchy.
pub const DEMO: SeedSet = SeedSet {
    subsystems: &[EPS, STRUCTURES],
    components: &[
        part("Battery Assembly", None, EPS, 12.5, 25_000.0, 1),
        part("Li-Ion Battery", Some("Battery Assembly"), EPS, 10.0, 18_000.0, 1),
        part("Battery Bracket", Some("Battery Assembly"), STRUCTURES, 2.5, 7_000.0, 1),
        part("Li-Ion Cell", Some("Li-Ion Battery"), EPS, 0.045, 35.0, 200),
        part("Solar Array", None, EPS, 25.0, 90_000.0, 1),
        part("Solar Panel", Some("Solar Array"), EPS, 2.0, 5_000.0, 8),
        part("Array Harness", Some("Solar Array"), EPS, 1.2, 1_500.0, 1),
    ],
};
