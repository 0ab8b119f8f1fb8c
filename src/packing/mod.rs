// src/packing/mod.rs

pub mod carton;
pub mod shipment;

pub use carton::{CartonFormat, CartonSelection, CartonSpec, CustomCartonFields, select_carton};

use crate::catalog::{CatalogEntry, CatalogIndex, fields};
use crate::resolver::resolve;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One product row of an order being prepared, exactly as typed or scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderLineDraft {
    pub product_code: String,
    pub quantity: String,
}

impl OrderLineDraft {
    /// Positive integer quantity, if the text holds one.
    pub fn quantity(&self) -> Option<u32> {
        fields::quantity(&self.quantity)
    }
}

/// Stock position of one product against every open line that references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockBalance {
    pub available: i64,
    pub planned: i64,
    pub remaining: i64,
}

impl StockBalance {
    fn new(available: i64, planned: i64) -> Self {
        Self {
            available,
            planned,
            remaining: available - planned,
        }
    }

    /// Planned quantity exceeds the snapshot stock. Flagged, never blocking.
    pub fn is_over_allocated(&self) -> bool {
        self.remaining < 0
    }
}

/// Most units of `product` one carton can hold, or `None` when nothing is known.
///
/// Volume and weight limits are each floored and clamped to at least 1; when
/// both are computable the smaller one binds.
pub fn compute_max_units(product: &CatalogEntry, carton: &CartonSpec) -> Option<u32> {
    let by_volume = match (carton.volume_cm3(), product.volume_cm3) {
        (Some(cv), Some(pv)) if pv > 0.0 => Some(units_within(cv, pv)),
        _ => None,
    };
    let by_weight = match carton.max_weight_g {
        Some(max) if product.weight_g > 0.0 => Some(units_within(max, product.weight_g)),
        _ => None,
    };

    match (by_volume, by_weight) {
        (Some(v), Some(w)) => Some(v.min(w)),
        (v, w) => v.or(w),
    }
}

fn units_within(capacity: f64, per_unit: f64) -> u32 {
    (capacity / per_unit).floor().max(1.0) as u32
}

/// Cartons needed for `quantity` units at `max_units` per carton.
pub fn carton_equivalent(quantity: Option<u32>, max_units: Option<u32>) -> Option<u32> {
    let qty = quantity.filter(|q| *q > 0)?;
    let per_carton = max_units.filter(|m| *m > 0)?;
    Some(qty.div_ceil(per_carton))
}

/// Planned quantity per identity key across the open lines.
#[derive(Debug)]
pub struct PlannedQuantities<'a> {
    by_identity: HashMap<&'a str, i64>,
}

impl<'a> PlannedQuantities<'a> {
    /// Tally lines already resolved against the catalog. Lines without a product
    /// or without a positive quantity add nothing.
    pub fn tally<'l>(
        lines: impl IntoIterator<Item = (&'l OrderLineDraft, Option<&'a CatalogEntry>)>,
    ) -> Self {
        let mut by_identity: HashMap<&'a str, i64> = HashMap::new();
        for (line, product) in lines {
            if let (Some(product), Some(qty)) = (product, line.quantity()) {
                *by_identity.entry(product.identity_key.as_str()).or_default() += i64::from(qty);
            }
        }
        Self { by_identity }
    }

    /// Stock position of `target`. `None` when its stock is unknown.
    pub fn balance(&self, target: &CatalogEntry) -> Option<StockBalance> {
        let available = target.available_stock?;
        let planned = self
            .by_identity
            .get(target.identity_key.as_str())
            .copied()
            .unwrap_or(0);
        Some(StockBalance::new(available, planned))
    }
}

/// Sum the quantities of every line resolving to the same product as `target`
/// and compare with its snapshot stock. `None` when stock is unknown.
pub fn compute_remaining_stock(
    index: &CatalogIndex,
    lines: &[OrderLineDraft],
    target: &CatalogEntry,
) -> Option<StockBalance> {
    PlannedQuantities::tally(lines.iter().map(|l| (l, resolve(index, &l.product_code))))
        .balance(target)
}

/// Everything displayed under one order line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineMetrics {
    /// 1-based, as labelled in the form.
    pub line: usize,
    pub code_value: Option<String>,
    pub max_units: Option<u32>,
    pub carton_equivalent: Option<u32>,
    pub stock: Option<StockBalance>,
    pub over_allocated: bool,
}

/// Recompute metrics for every line of the open form.
///
/// Lines are resolved once each; planned quantities are then aggregated per
/// identity key so the cost stays linear in the number of lines.
pub fn line_metrics(
    index: &CatalogIndex,
    lines: &[OrderLineDraft],
    carton: &CartonSpec,
) -> Vec<LineMetrics> {
    let resolved: Vec<Option<&CatalogEntry>> =
        lines.iter().map(|l| resolve(index, &l.product_code)).collect();

    let planned = PlannedQuantities::tally(lines.iter().zip(resolved.iter().copied()));

    let metrics: Vec<LineMetrics> = lines
        .iter()
        .zip(&resolved)
        .enumerate()
        .map(|(i, (line, product))| match product {
            None => LineMetrics {
                line: i + 1,
                code_value: None,
                max_units: None,
                carton_equivalent: None,
                stock: None,
                over_allocated: false,
            },
            Some(product) => {
                let max_units = compute_max_units(product, carton);
                let stock = planned.balance(product);
                LineMetrics {
                    line: i + 1,
                    code_value: Some(product.code_value.clone()),
                    max_units,
                    carton_equivalent: carton_equivalent(line.quantity(), max_units),
                    over_allocated: stock.is_some_and(|s| s.is_over_allocated()),
                    stock,
                }
            }
        })
        .collect();

    debug!(
        lines = lines.len(),
        resolved = resolved.iter().flatten().count(),
        "Line metrics recomputed"
    );
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> CatalogIndex {
        CatalogIndex::from_json(
            &json!([
                {"name": "Gants latex M", "sku": "GL-M-01", "weight_g": 50, "available_stock": 12},
                {"name": "Boite compresses", "barcode": "3401", "weight_g": 200,
                 "length_cm": 10, "width_cm": 10, "height_cm": 10, "available_stock": "100"},
                {"name": "Masque FFP2", "volume_cm3": 7000},
                {"name": "Lingettes", "sku": "LG-1"}
            ])
            .to_string(),
        )
    }

    fn line(product_code: &str, quantity: &str) -> OrderLineDraft {
        OrderLineDraft {
            product_code: product_code.into(),
            quantity: quantity.into(),
        }
    }

    fn carton() -> CartonSpec {
        CartonSpec::new(Some(30.0), Some(20.0), Some(10.0), Some(5000.0))
    }

    fn entry<'a>(index: &'a CatalogIndex, code: &str) -> &'a CatalogEntry {
        resolve(index, code).unwrap()
    }

    #[test]
    fn test_weight_only_fallback() {
        let index = catalog();
        assert_eq!(compute_max_units(entry(&index, "GL-M-01"), &carton()), Some(100));
    }

    #[test]
    fn test_binding_constraint_is_minimum() {
        let index = catalog();
        // volume: 6000 / 1000 = 6, weight: 5000 / 200 = 25
        assert_eq!(compute_max_units(entry(&index, "3401"), &carton()), Some(6));
        let light = CartonSpec::new(Some(30.0), Some(20.0), Some(10.0), Some(1000.0));
        assert_eq!(compute_max_units(entry(&index, "3401"), &light), Some(5));
    }

    #[test]
    fn test_oversized_unit_still_fits_one() {
        let index = catalog();
        assert_eq!(compute_max_units(entry(&index, "Masque FFP2"), &carton()), Some(1));
        let tiny = CartonSpec::new(None, None, None, Some(10.0));
        assert_eq!(compute_max_units(entry(&index, "GL-M-01"), &tiny), Some(1));
    }

    #[test]
    fn test_unknown_capacity() {
        let index = catalog();
        assert_eq!(compute_max_units(entry(&index, "LG-1"), &carton()), None);
        assert_eq!(
            compute_max_units(entry(&index, "GL-M-01"), &CartonSpec::default()),
            None
        );
        // dimensions without a weight limit give nothing for a volume-less product
        let open = CartonSpec::new(Some(30.0), Some(20.0), Some(10.0), None);
        assert_eq!(compute_max_units(entry(&index, "GL-M-01"), &open), None);
    }

    #[test]
    fn test_carton_equivalent() {
        assert_eq!(carton_equivalent(Some(15), Some(6)), Some(3));
        assert_eq!(carton_equivalent(Some(12), Some(6)), Some(2));
        assert_eq!(carton_equivalent(None, Some(6)), None);
        assert_eq!(carton_equivalent(Some(3), None), None);
    }

    #[test]
    fn test_remaining_stock_across_lines() {
        let index = catalog();
        let lines = vec![
            line("GL-M-01", "10"),
            line("gants latex m", "5"),
            line("3401", "7"),
        ];
        let balance = compute_remaining_stock(&index, &lines, entry(&index, "GL-M-01")).unwrap();
        assert_eq!(
            balance,
            StockBalance {
                available: 12,
                planned: 15,
                remaining: -3
            }
        );
        assert!(balance.is_over_allocated());
    }

    #[test]
    fn test_remaining_stock_ignores_bad_quantities() {
        let index = catalog();
        let lines = vec![
            line("GL-M-01", "4"),
            line("GL-M-01", "abc"),
            line("GL-M-01", "-3"),
            line("GL-M-01", "0"),
            line("GL-M-01", ""),
            line("inconnu", "50"),
        ];
        let balance = compute_remaining_stock(&index, &lines, entry(&index, "GL-M-01")).unwrap();
        assert_eq!((balance.planned, balance.remaining), (4, 8));
    }

    #[test]
    fn test_remaining_stock_unknown() {
        let index = catalog();
        let lines = vec![line("LG-1", "3")];
        assert_eq!(compute_remaining_stock(&index, &lines, entry(&index, "LG-1")), None);
    }

    #[test]
    fn test_line_metrics_for_form() {
        let index = catalog();
        let lines = vec![
            line("GL-M-01", "10"),
            line("nothing here", "1"),
            line("Gants latex M", "5"),
            line("3401", "13"),
            line("LG-1", "2"),
        ];
        let metrics = line_metrics(&index, &lines, &carton());
        assert_eq!(metrics.len(), 5);

        assert_eq!(metrics[0].line, 1);
        assert_eq!(metrics[0].code_value.as_deref(), Some("GL-M-01"));
        assert_eq!(metrics[0].max_units, Some(100));
        assert_eq!(metrics[0].carton_equivalent, Some(1));
        assert_eq!(metrics[0].stock.unwrap().remaining, -3);
        assert!(metrics[0].over_allocated);
        assert_eq!(metrics[2].stock, metrics[0].stock);

        assert_eq!(metrics[1].code_value, None);
        assert_eq!(metrics[1].stock, None);

        assert_eq!(metrics[3].carton_equivalent, Some(3));
        assert_eq!(metrics[3].stock.unwrap().remaining, 87);
        assert!(!metrics[3].over_allocated);

        assert_eq!(metrics[4].max_units, None);
        assert_eq!(metrics[4].stock, None);
    }

    #[test]
    fn test_line_metrics_agree_with_single_product_balance() {
        let index = catalog();
        let lines = vec![
            line("3401", "40"),
            line("Boite", "70"),
        ];
        let metrics = line_metrics(&index, &lines, &carton());
        let direct = compute_remaining_stock(&index, &lines, entry(&index, "3401"));
        assert_eq!(metrics[0].stock, direct);
        assert_eq!(metrics[1].stock.unwrap().remaining, -10);
    }

    #[test]
    fn test_oversized_quantity_is_over_allocated() {
        let index = catalog();
        let lines = vec![line("GL-M-01", "5000000000")];
        let balance = compute_remaining_stock(&index, &lines, entry(&index, "GL-M-01")).unwrap();
        assert_eq!(balance.planned, i64::from(u32::MAX));
        assert!(balance.remaining < 0);

        let metrics = line_metrics(&index, &lines, &carton());
        assert!(metrics[0].over_allocated);
        assert_eq!(metrics[0].stock, Some(balance));
    }
}
