// src/packing/shipment.rs

//! Shipment builder helpers: each line either ships a carton prepared
//! earlier, or loose units of one product.

use crate::catalog::{CatalogIndex, fields};
use crate::resolver::resolve;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A carton already packed and weighed, available for shipping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedCarton {
    pub id: String,
    pub weight_g: Option<f64>,
}

impl PreparedCarton {
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            id: fields::text(obj.get("id"))?,
            weight_g: fields::decimal(obj.get("weight_g")),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipmentLineDraft {
    pub carton_id: String,
    pub product_code: String,
    pub quantity: String,
}

impl ShipmentLineDraft {
    pub fn carton(&self) -> Option<&str> {
        let id = self.carton_id.trim();
        (!id.is_empty()).then_some(id)
    }

    /// Selecting a prepared carton clears and disables the product fields.
    pub fn with_carton_applied(mut self) -> Self {
        if self.carton().is_some() {
            self.product_code.clear();
            self.quantity.clear();
        }
        self
    }
}

/// Estimated shipment weight in grams.
pub fn total_weight_g(
    index: &CatalogIndex,
    cartons: &[PreparedCarton],
    lines: &[ShipmentLineDraft],
) -> f64 {
    lines
        .iter()
        .map(|line| match line.carton() {
            Some(id) => cartons
                .iter()
                .find(|c| c.id == id)
                .and_then(|c| c.weight_g)
                .unwrap_or(0.0),
            None => match (resolve(index, &line.product_code), fields::quantity(&line.quantity)) {
                (Some(product), Some(qty)) => product.weight_g * f64::from(qty),
                _ => 0.0,
            },
        })
        .sum()
}

/// Carton ids chosen on lines other than `line_idx`; the selector on that
/// line must not offer them.
pub fn taken_cartons(lines: &[ShipmentLineDraft], line_idx: usize) -> BTreeSet<&str> {
    lines
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != line_idx)
        .filter_map(|(_, line)| line.carton())
        .collect()
}

/// A prepared carton selected on a line while another line already holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartonConflict {
    /// 1-based, as labelled in the form.
    pub line: usize,
    pub carton_id: String,
}

pub fn carton_conflicts(lines: &[ShipmentLineDraft]) -> Vec<CartonConflict> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let id = line.carton()?;
            taken_cartons(lines, i).contains(id).then(|| CartonConflict {
                line: i + 1,
                carton_id: id.to_string(),
            })
        })
        .collect()
}
