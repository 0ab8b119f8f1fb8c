use crate::catalog::{fields, snapshot_items};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Physical envelope of a carton. Absent or non-positive measures are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CartonSpec {
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub max_weight_g: Option<f64>,
}

impl CartonSpec {
    pub fn new(
        length_cm: Option<f64>,
        width_cm: Option<f64>,
        height_cm: Option<f64>,
        max_weight_g: Option<f64>,
    ) -> Self {
        Self {
            length_cm: fields::positive(length_cm),
            width_cm: fields::positive(width_cm),
            height_cm: fields::positive(height_cm),
            max_weight_g: fields::positive(max_weight_g),
        }
    }

    /// Inner volume, when all three dimensions are known.
    pub fn volume_cm3(&self) -> Option<f64> {
        Some(self.length_cm? * self.width_cm? * self.height_cm?)
    }

    pub fn is_complete(&self) -> bool {
        self.volume_cm3().is_some() && self.max_weight_g.is_some()
    }
}

/// A packing format offered in the carton selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartonFormat {
    pub id: String,
    pub spec: CartonSpec,
}

impl CartonFormat {
    /// Read a format from JSON. Entries without an id are unusable and yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            id: fields::text(obj.get("id"))?,
            spec: CartonSpec::new(
                fields::decimal(obj.get("length_cm")),
                fields::decimal(obj.get("width_cm")),
                fields::decimal(obj.get("height_cm")),
                fields::decimal(obj.get("max_weight_g")),
            ),
        })
    }
}

/// Decode a format list, skipping bad rows.
pub fn formats_from_value(value: &Value) -> Vec<CartonFormat> {
    snapshot_items(value)
        .iter()
        .filter_map(CartonFormat::from_value)
        .collect()
}

/// The four free-text fields shown when "custom" is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomCartonFields {
    pub length_cm: String,
    pub width_cm: String,
    pub height_cm: String,
    pub max_weight_g: String,
}

impl CustomCartonFields {
    pub fn spec(&self) -> CartonSpec {
        CartonSpec::new(
            fields::decimal_from_text(&self.length_cm),
            fields::decimal_from_text(&self.width_cm),
            fields::decimal_from_text(&self.height_cm),
            fields::decimal_from_text(&self.max_weight_g),
        )
    }
}

/// State of the carton format selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartonSelection {
    Format(String),
    Custom,
}

impl CartonSelection {
    /// Selector value as submitted by the form: `"custom"` or blank means custom.
    pub fn from_value(raw: &str) -> Self {
        match raw.trim() {
            "" | "custom" => Self::Custom,
            id => Self::Format(id.to_string()),
        }
    }
}

/// Carton dimensions for the current selector state.
///
/// A known format id supplies its own dimensions; anything else falls back to
/// the custom fields.
pub fn select_carton(
    formats: &[CartonFormat],
    selection: &CartonSelection,
    custom: &CustomCartonFields,
) -> CartonSpec {
    if let CartonSelection::Format(id) = selection {
        if let Some(format) = formats.iter().find(|f| &f.id == id) {
            return format.spec;
        }
    }
    custom.spec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn formats() -> Vec<CartonFormat> {
        formats_from_value(&json!([
            {"id": 1, "length_cm": 30, "width_cm": 20, "height_cm": 10, "max_weight_g": 5000},
            {"id": "2", "length_cm": "40,5", "width_cm": 30, "height_cm": 0, "max_weight_g": null},
            {"length_cm": 10}
        ]))
    }

    #[test]
    fn test_formats_decode() {
        let f = formats();
        assert_eq!(f.len(), 2);
        assert_eq!(f[0].id, "1");
        assert_eq!(f[0].spec.volume_cm3(), Some(6000.0));
        assert!(f[0].spec.is_complete());
        assert_eq!(f[1].spec.length_cm, Some(40.5));
        assert_eq!(f[1].spec.height_cm, None);
        assert_eq!(f[1].spec.volume_cm3(), None);
    }

    #[test]
    fn test_select_known_format() {
        let spec = select_carton(
            &formats(),
            &CartonSelection::from_value("1"),
            &CustomCartonFields::default(),
        );
        assert_eq!(spec.max_weight_g, Some(5000.0));
    }

    #[test]
    fn test_select_falls_back_to_custom() {
        let custom = CustomCartonFields {
            length_cm: "50".into(),
            width_cm: "40".into(),
            height_cm: "30".into(),
            max_weight_g: "abc".into(),
        };
        for raw in ["custom", "", "99"] {
            let spec = select_carton(&formats(), &CartonSelection::from_value(raw), &custom);
            assert_eq!(spec.volume_cm3(), Some(60000.0));
            assert_eq!(spec.max_weight_g, None);
        }
    }
}
