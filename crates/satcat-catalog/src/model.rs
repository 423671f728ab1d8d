//! Catalog records and the write requests that produce them.
//!
//! Field rules mirror the persisted schema: names up to
//! [`MAX_NAME_LEN`] characters, part numbers and WBS codes up to
//! [`MAX_CODE_LEN`], non-negative mass and cost, quantity of at least one.

use serde::{Deserialize, Serialize};

use satcat_core::{ComponentId, SubsystemId};

use crate::error::{CatalogError, Result};

/// Maximum length of component and subsystem names, in characters.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length of part numbers and WBS codes, in characters.
pub const MAX_CODE_LEN: usize = 50;

/// Whether a component is manufactured in-house or procured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MakeBuy {
    /// Built in-house.
    #[serde(rename = "M")]
    Make,
    /// Procured from a supplier.
    #[serde(rename = "B")]
    Buy,
}

impl MakeBuy {
    /// Returns the single-character persisted code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Make => "M",
            Self::Buy => "B",
        }
    }

    /// Parses a persisted code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Self::Make),
            "B" => Some(Self::Buy),
            _ => None,
        }
    }
}

/// A physical or logical item in the bill of materials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Store-assigned identity.
    pub id: ComponentId,
    /// Globally unique name.
    pub name: String,
    /// Optional manufacturer or internal part number.
    pub part_number: Option<String>,
    /// Optional work-breakdown-structure code.
    pub wbs: Option<String>,
    /// Optional make/buy flag.
    pub make_buy: Option<MakeBuy>,
    /// Unit mass in kilograms.
    pub mass_kg: f64,
    /// Unit cost in US dollars.
    pub cost_usd: f64,
    /// Number of units used by the parent.
    pub quantity: i64,
    /// Parent component, `None` for roots.
    pub parent_id: Option<ComponentId>,
    /// Owning subsystem.
    pub subsystem_id: Option<SubsystemId>,
}

/// A named grouping of components (e.g. "EPS", "Structures").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsystem {
    /// Store-assigned identity.
    pub id: SubsystemId,
    /// Globally unique name.
    pub name: String,
}

/// A component together with its resolved subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentView {
    /// The component record.
    #[serde(flatten)]
    pub component: Component,
    /// The subsystem referenced by `component.subsystem_id`, if any.
    pub subsystem: Option<Subsystem>,
}

/// Fields for a component creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComponent {
    /// Globally unique name.
    pub name: String,
    /// Optional part number.
    pub part_number: Option<String>,
    /// Optional WBS code.
    pub wbs: Option<String>,
    /// Optional make/buy flag.
    pub make_buy: Option<MakeBuy>,
    /// Unit mass in kilograms.
    pub mass_kg: f64,
    /// Unit cost in US dollars.
    pub cost_usd: f64,
    /// Number of units.
    pub quantity: i64,
    /// Optional parent component.
    pub parent_id: Option<ComponentId>,
    /// Optional owning subsystem.
    pub subsystem_id: Option<SubsystemId>,
}

impl NewComponent {
    /// Creates a request with the given name and schema defaults for every
    /// other field (zero mass and cost, quantity one, no references).
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            part_number: None,
            wbs: None,
            make_buy: None,
            mass_kg: 0.0,
            cost_usd: 0.0,
            quantity: 1,
            parent_id: None,
            subsystem_id: None,
        }
    }

    /// Checks field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for an empty or overlong name,
    /// overlong codes, negative or non-finite mass/cost, or quantity below one.
    pub fn validate(&self) -> Result<()> {
        validate_name("name", &self.name)?;
        validate_code("part_number", self.part_number.as_deref())?;
        validate_code("wbs", self.wbs.as_deref())?;
        validate_non_negative("mass_kg", self.mass_kg)?;
        validate_non_negative("cost_usd", self.cost_usd)?;
        validate_quantity(self.quantity)
    }

    /// Materializes the record once the store has assigned an identity.
    #[must_use]
    pub fn into_component(self, id: ComponentId) -> Component {
        Component {
            id,
            name: self.name,
            part_number: self.part_number,
            wbs: self.wbs,
            make_buy: self.make_buy,
            mass_kg: self.mass_kg,
            cost_usd: self.cost_usd,
            quantity: self.quantity,
            parent_id: self.parent_id,
            subsystem_id: self.subsystem_id,
        }
    }
}

/// A partial update to a component.
///
/// The outer `Option` says whether the field was present in the request;
/// the inner `Option` distinguishes an explicit `null` (clear) from a value.
/// Required fields reject an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(clippy::option_option)]
pub struct ComponentPatch {
    /// New name.
    pub name: Option<Option<String>>,
    /// New or cleared part number.
    pub part_number: Option<Option<String>>,
    /// New or cleared WBS code.
    pub wbs: Option<Option<String>>,
    /// New or cleared make/buy flag.
    pub make_buy: Option<Option<MakeBuy>>,
    /// New unit mass.
    pub mass_kg: Option<Option<f64>>,
    /// New unit cost.
    pub cost_usd: Option<Option<f64>>,
    /// New quantity.
    pub quantity: Option<Option<i64>>,
    /// New or cleared parent.
    pub parent_id: Option<Option<ComponentId>>,
    /// New or cleared subsystem.
    pub subsystem_id: Option<Option<SubsystemId>>,
}

impl ComponentPatch {
    /// Returns true when no field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns the new parent when the patch sets one (not when it clears it).
    #[must_use]
    pub fn new_parent(&self) -> Option<ComponentId> {
        self.parent_id.flatten()
    }

    /// Returns the new subsystem when the patch sets one.
    #[must_use]
    pub fn new_subsystem(&self) -> Option<SubsystemId> {
        self.subsystem_id.flatten()
    }

    /// Returns the new name when the patch sets one.
    #[must_use]
    pub fn new_name(&self) -> Option<&str> {
        self.name.as_ref().and_then(Option::as_deref)
    }

    /// Checks the ranges of every present field.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] when a present field is out of
    /// range or a required field is explicitly `null`.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            let name = required("name", name.as_deref())?;
            validate_name("name", name)?;
        }
        if let Some(part_number) = &self.part_number {
            validate_code("part_number", part_number.as_deref())?;
        }
        if let Some(wbs) = &self.wbs {
            validate_code("wbs", wbs.as_deref())?;
        }
        if let Some(mass_kg) = self.mass_kg {
            validate_non_negative("mass_kg", *required("mass_kg", mass_kg.as_ref())?)?;
        }
        if let Some(cost_usd) = self.cost_usd {
            validate_non_negative("cost_usd", *required("cost_usd", cost_usd.as_ref())?)?;
        }
        if let Some(quantity) = self.quantity {
            validate_quantity(*required("quantity", quantity.as_ref())?)?;
        }
        Ok(())
    }

    /// Applies every present field to `component`.
    ///
    /// Call [`ComponentPatch::validate`] first; an explicit `null` on a
    /// required field is ignored here.
    pub fn apply_to(&self, component: &mut Component) {
        if let Some(Some(name)) = &self.name {
            component.name.clone_from(name);
        }
        if let Some(part_number) = &self.part_number {
            component.part_number.clone_from(part_number);
        }
        if let Some(wbs) = &self.wbs {
            component.wbs.clone_from(wbs);
        }
        if let Some(make_buy) = self.make_buy {
            component.make_buy = make_buy;
        }
        if let Some(Some(mass_kg)) = self.mass_kg {
            component.mass_kg = mass_kg;
        }
        if let Some(Some(cost_usd)) = self.cost_usd {
            component.cost_usd = cost_usd;
        }
        if let Some(Some(quantity)) = self.quantity {
            component.quantity = quantity;
        }
        if let Some(parent_id) = self.parent_id {
            component.parent_id = parent_id;
        }
        if let Some(subsystem_id) = self.subsystem_id {
            component.subsystem_id = subsystem_id;
        }
    }
}

/// Checks a subsystem name.
///
/// # Errors
///
/// Returns [`CatalogError::Validation`] for an empty or overlong name.
pub fn validate_subsystem_name(name: &str) -> Result<()> {
    validate_name("name", name)
}

fn required<'a, T>(field: &str, value: Option<&'a T>) -> Result<&'a T>
where
    T: ?Sized,
{
    value.ok_or_else(|| CatalogError::validation(format!("{field} cannot be null")))
}

fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CatalogError::validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(CatalogError::validation(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_code(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(code) if code.chars().count() > MAX_CODE_LEN => Err(CatalogError::validation(
            format!("{field} must be at most {MAX_CODE_LEN} characters"),
        )),
        _ => Ok(()),
    }
}

fn validate_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CatalogError::validation(format!(
            "{field} must be a finite number >= 0 (got {value})"
        )));
    }
    Ok(())
}

fn validate_quantity(value: i64) -> Result<()> {
    if value < 1 {
        return Err(CatalogError::validation(format!(
            "quantity must be >= 1 (got {value})"
        )));
    }
    Ok(())
}
