// src/resolver.rs

use crate::catalog::{CatalogEntry, CatalogIndex};
use crate::text_normalize::normalize;
use serde::Serialize;
use tracing::debug;

/// Which rule of the fallback chain produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Name,
    Sku,
    Barcode,
    Ean,
    Prefix,
}

/// A successful resolution: the entry's position in the index and the rule that hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub position: usize,
    pub kind: MatchKind,
}

/// Resolve scanned or typed text to at most one catalog entry.
///
/// Rules, first hit wins: exact name, exact SKU, exact barcode, exact EAN,
/// then a name prefix that exactly one entry starts with. An ambiguous prefix
/// resolves to nothing.
pub fn resolve<'a>(index: &'a CatalogIndex, input: &str) -> Option<&'a CatalogEntry> {
    resolve_position(index, input).and_then(|r| index.get(r.position))
}

pub fn resolve_position(index: &CatalogIndex, input: &str) -> Option<Resolution> {
    let code = normalize(input);
    if code.is_empty() {
        return None;
    }

    let entries = index.entries();
    let exact: [(MatchKind, fn(&CatalogEntry) -> &str); 4] = [
        (MatchKind::Name, |e| e.name_key.as_str()),
        (MatchKind::Sku, |e| e.sku_key.as_str()),
        (MatchKind::Barcode, |e| e.barcode_key.as_str()),
        (MatchKind::Ean, |e| e.ean_key.as_str()),
    ];

    for (kind, key) in exact {
        if let Some(position) = entries.iter().position(|e| {
            let k = key(e);
            !k.is_empty() && k == code
        }) {
            debug!(input = %code, ?kind, position, "Resolved");
            return Some(Resolution { position, kind });
        }
    }

    let mut prefixed = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.name_key.starts_with(&code));
    let first = prefixed.next();
    if prefixed.next().is_some() {
        debug!(input = %code, "Ambiguous prefix, not resolving");
        return None;
    }

    first.map(|(position, _)| Resolution {
        position,
        kind: MatchKind::Prefix,
    })
}

/// One option offered while the user types in a product field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub value: String,
    /// Non-empty SKU and barcode joined by `" | "`.
    pub label: Option<String>,
}

/// Entries whose name starts with `query`, in catalog order, at most `limit`.
/// An empty query lists the first `limit` entries.
pub fn suggest(index: &CatalogIndex, query: &str, limit: usize) -> Vec<Suggestion> {
    let query = normalize(query);
    index
        .entries()
        .iter()
        .filter(|e| e.name_key.starts_with(&query))
        .take(limit)
        .map(|e| {
            let parts: Vec<&str> = [e.sku.as_deref(), e.barcode.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            Suggestion {
                value: e.name.clone(),
                label: (!parts.is_empty()).then(|| parts.join(" | ")),
            }
        })
        .collect()
}

/// Values pre-filled into receipt and stock forms once a product is recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDefaults {
    pub location_id: Option<i64>,
    pub storage_conditions: String,
}

impl From<&CatalogEntry> for ProductDefaults {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            location_id: entry.default_location_id,
            storage_conditions: entry.storage_conditions.clone().unwrap_or_default(),
        }
    }
}

pub fn defaults_for(index: &CatalogIndex, input: &str) -> Option<ProductDefaults> {
    resolve(index, input).map(ProductDefaults::from)
}
