//! Spreadsheet export of the component forest.
//!
//! One worksheet, one row per component in depth-first forest order, so a
//! reader can follow the hierarchy top to bottom using the `Level` column.

use std::collections::HashMap;

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use satcat_core::SubsystemId;

use crate::error::{CatalogError, Result};
use crate::hierarchy::ComponentTreeNode;
use crate::model::Subsystem;

/// Name of the single worksheet.
pub const SHEET_NAME: &str = "Components";

/// MIME type of the rendered workbook.
pub const CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Suggested download file name.
pub const FILE_NAME: &str = "components.xlsx";

/// Header row, in column order.
pub const HEADERS: [&str; 13] = [
    "ID",
    "Level",
    "Name",
    "Part Number",
    "WBS",
    "Make/Buy",
    "Subsystem",
    "Parent ID",
    "Quantity",
    "Mass (kg)",
    "Cost (USD)",
    "Total Mass (kg)",
    "Total Cost (USD)",
];

/// One exported line.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    /// Component identity.
    pub id: i64,
    /// Depth in the forest, roots at 0.
    pub level: usize,
    /// Component name.
    pub name: String,
    /// Part number or empty.
    pub part_number: String,
    /// WBS code or empty.
    pub wbs: String,
    /// `M`, `B` or empty.
    pub make_buy: String,
    /// Subsystem name or empty.
    pub subsystem: String,
    /// Parent identity as stored.
    pub parent_id: Option<i64>,
    /// Units.
    pub quantity: i64,
    /// Unit mass.
    pub mass_kg: f64,
    /// Unit cost.
    pub cost_usd: f64,
    /// `mass_kg * quantity`.
    pub total_mass_kg: f64,
    /// `cost_usd * quantity`.
    pub total_cost_usd: f64,
}

/// Flattens `forest` into export rows in depth-first pre-order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn export_rows(forest: &[ComponentTreeNode], subsystems: &[Subsystem]) -> Vec<ExportRow> {
    let names: HashMap<SubsystemId, &str> = subsystems
        .iter()
        .map(|s| (s.id, s.name.as_str()))
        .collect();

    let mut rows = Vec::new();
    for tree in forest {
        tree.walk(&mut |node, level| {
            rows.push(ExportRow {
                id: node.id.get(),
                level,
                name: node.name.clone(),
                part_number: node.part_number.clone().unwrap_or_default(),
                wbs: node.wbs.clone().unwrap_or_default(),
                make_buy: node.make_buy.map(|m| m.code().to_string()).unwrap_or_default(),
                subsystem: node
                    .subsystem_id
                    .and_then(|id| names.get(&id).copied())
                    .unwrap_or_default()
                    .to_string(),
                parent_id: node.parent_id.map(|p| p.get()),
                quantity: node.quantity,
                mass_kg: node.mass_kg,
                cost_usd: node.cost_usd,
                total_mass_kg: node.mass_kg * node.quantity as f64,
                total_cost_usd: node.cost_usd * node.quantity as f64,
            });
        });
    }
    rows
}

/// Renders `forest` as an XLSX workbook.
///
/// # Errors
///
/// Returns [`CatalogError::Internal`] when the workbook cannot be written.
pub fn render_workbook(forest: &[ComponentTreeNode], subsystems: &[Subsystem]) -> Result<Vec<u8>> {
    write_workbook(&export_rows(forest, subsystems))
        .map_err(|e| CatalogError::internal(format!("failed to render workbook: {e}")))
}

#[allow(clippy::cast_precision_loss)]
fn write_workbook(rows: &[ExportRow]) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let header = Format::new().set_bold();
    for (col, title) in (0_u16..).zip(HEADERS) {
        sheet.write_string_with_format(0, col, title, &header)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (row, line) in (1_u32..).zip(rows) {
        sheet.write_number(row, 0, line.id as f64)?;
        sheet.write_number(row, 1, line.level as f64)?;
        sheet.write_string(row, 2, &line.name)?;
        sheet.write_string(row, 3, &line.part_number)?;
        sheet.write_string(row, 4, &line.wbs)?;
        sheet.write_string(row, 5, &line.make_buy)?;
        sheet.write_string(row, 6, &line.subsystem)?;
        if let Some(parent) = line.parent_id {
            sheet.write_number(row, 7, parent as f64)?;
        }
        sheet.write_number(row, 8, line.quantity as f64)?;
        sheet.write_number(row, 9, line.mass_kg)?;
        sheet.write_number(row, 10, line.cost_usd)?;
        sheet.write_number(row, 11, line.total_mass_kg)?;
        sheet.write_number(row, 12, line.total_cost_usd)?;
    }
    sheet.set_column_width(2, 32)?;

    workbook.save_to_buffer()
}
