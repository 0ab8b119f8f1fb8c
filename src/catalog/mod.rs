// src/catalog/mod.rs

pub mod fields;

use crate::text_normalize::{normalize, normalize_alnum};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::{info, warn};

/// One product row of the catalog snapshot, as sent by the backend.
///
/// Decoding never fails: every field is optional and malformed values are
/// dropped (see [`fields`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductRecord {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub ean: Option<String>,
    pub brand: Option<String>,
    pub weight_g: Option<f64>,
    pub volume_cm3: Option<f64>,
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub available_stock: Option<f64>,
    pub default_location_id: Option<i64>,
    pub storage_conditions: Option<String>,
}

impl ProductRecord {
    /// Read a record from a JSON value. Non-objects yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            name: fields::text(obj.get("name")),
            sku: fields::text(obj.get("sku")),
            barcode: fields::text(obj.get("barcode")),
            ean: fields::text(obj.get("ean")),
            brand: fields::text(obj.get("brand")),
            weight_g: fields::decimal(obj.get("weight_g")),
            volume_cm3: fields::decimal(obj.get("volume_cm3")),
            length_cm: fields::decimal(obj.get("length_cm")),
            width_cm: fields::decimal(obj.get("width_cm")),
            height_cm: fields::decimal(obj.get("height_cm")),
            available_stock: fields::decimal(obj.get("available_stock")),
            default_location_id: fields::integer(obj.get("default_location_id")),
            storage_conditions: fields::text(obj.get("storage_conditions")),
        })
    }
}

/// A catalog product with its precomputed lookup keys and derived measures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub ean: Option<String>,

    /// `normalize(name)`, for exact and prefix lookups.
    pub name_key: String,
    /// `normalize_alnum(name)`, for OCR token matching.
    pub name_alnum: String,
    pub sku_key: String,
    pub barcode_key: String,
    pub ean_key: String,

    /// Deduplication key across order lines: sku > barcode > ean > name.
    pub identity_key: String,
    /// Canonical identifier written back into form fields on a match.
    pub code_value: String,

    pub weight_g: f64,
    pub volume_cm3: Option<f64>,
    pub available_stock: Option<i64>,

    pub default_location_id: Option<i64>,
    pub storage_conditions: Option<String>,
}

impl CatalogEntry {
    /// Build an entry, or `None` when the record has no usable name.
    pub fn from_record(record: ProductRecord) -> Option<Self> {
        let name = record.name?;
        let name_key = normalize(&name);
        if name_key.is_empty() {
            return None;
        }

        let key_of = |v: &Option<String>| v.as_deref().map(normalize).unwrap_or_default();
        let sku_key = key_of(&record.sku);
        let barcode_key = key_of(&record.barcode);
        let ean_key = key_of(&record.ean);

        let identity_key = [&sku_key, &barcode_key, &ean_key, &name_key]
            .into_iter()
            .find(|k| !k.is_empty())
            .cloned()
            .unwrap_or_default();

        let code_value = [&record.sku, &record.barcode, &record.ean]
            .into_iter()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| name.clone());

        let volume_cm3 = fields::positive(record.volume_cm3).or_else(|| {
            match (
                fields::positive(record.length_cm),
                fields::positive(record.width_cm),
                fields::positive(record.height_cm),
            ) {
                (Some(l), Some(w), Some(h)) => Some(l * w * h),
                _ => None,
            }
        });

        Some(Self {
            name_alnum: normalize_alnum(&name),
            name,
            brand: record.brand,
            sku: record.sku,
            barcode: record.barcode,
            ean: record.ean,
            name_key,
            sku_key,
            barcode_key,
            ean_key,
            identity_key,
            code_value,
            weight_g: fields::positive(record.weight_g).unwrap_or(0.0),
            volume_cm3,
            available_stock: record.available_stock.map(|v| v.floor() as i64),
            default_location_id: record.default_location_id,
            storage_conditions: record.storage_conditions,
        })
    }
}

/// Read-only index over one catalog snapshot.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    entries: Vec<CatalogEntry>,
    snapshot_id: String,
    loaded_at: OffsetDateTime,
}

impl CatalogIndex {
    /// Index a list of records. Records without a name are skipped.
    pub fn build(records: Vec<ProductRecord>) -> Self {
        let total = records.len();
        let entries: Vec<CatalogEntry> =
            records.into_iter().filter_map(CatalogEntry::from_record).collect();

        let mut hasher = Sha256::new();
        for entry in &entries {
            hasher.update(entry.identity_key.as_bytes());
            hasher.update([0u8]);
        }
        let snapshot_id = format!("{:x}", hasher.finalize());
        let short_id = &snapshot_id[..12];

        info!(
            kept = entries.len(),
            excluded = total - entries.len(),
            snapshot = %short_id,
            "Catalog index built"
        );

        Self {
            entries,
            snapshot_id,
            loaded_at: OffsetDateTime::now_utc(),
        }
    }

    /// Index a raw JSON snapshot.
    ///
    /// Accepts a bare array or an object with a `results` array. Anything else
    /// gives an empty index. The snapshot id is the SHA-256 of the raw bytes.
    pub fn from_json(raw: &str) -> Self {
        let parsed: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Catalog snapshot is not valid JSON, using empty catalog");
                Value::Array(Vec::new())
            }
        };
        let records = records_from_value(&parsed);

        let mut index = Self::build(records);
        index.snapshot_id = format!("{:x}", Sha256::digest(raw.as_bytes()));
        index
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<&CatalogEntry> {
        self.entries.get(position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hex fingerprint of the snapshot this index was built from.
    pub fn snapshot_id(&self) -> &str {
        &self.snapshot_id
    }

    /// When the snapshot was indexed. Stock figures are as of this instant.
    pub fn loaded_at(&self) -> OffsetDateTime {
        self.loaded_at
    }
}

/// Rows of a backend list payload: a bare array, or a paginated
/// `{"results": [...]}` object.
pub fn snapshot_items(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => match obj.get("results") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    }
}

pub fn records_from_value(value: &Value) -> Vec<ProductRecord> {
    snapshot_items(value)
        .iter()
        .filter_map(ProductRecord::from_value)
        .collect()
}
