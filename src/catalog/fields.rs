// src/catalog/fields.rs

//! Lenient field parsers for catalog, carton and form input.
//!
//! Upstream data is loosely typed: numbers arrive as JSON numbers, as strings
//! with a comma decimal separator, or as garbage. None of these parsers fail;
//! anything unusable becomes `None`.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").expect("decimal pattern")
});

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?)(\d+)").expect("integer pattern"));

/// Parse a leading decimal from free text. `"12,5"` and `"12.5 cm"` both give 12.5.
pub fn decimal_from_text(raw: &str) -> Option<f64> {
    let text = raw.replacen(',', ".", 1);
    let cap = DECIMAL_RE.captures(&text)?;
    cap[1].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric JSON field: a number or a numeric string.
pub fn decimal(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => decimal_from_text(s),
        _ => None,
    }
}

/// Text JSON field. Numbers are accepted (barcodes are often sent unquoted);
/// blank strings count as absent.
pub fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer JSON field used for foreign keys such as location ids.
pub fn integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Quantity typed into an order line.
///
/// Reads the leading integer (`"12 u."` is 12, `"1.5"` is 1) and only accepts
/// strictly positive values. Out-of-range values saturate at `u32::MAX` so an
/// absurd quantity still counts against stock.
pub fn quantity(raw: &str) -> Option<u32> {
    let cap = INTEGER_RE.captures(raw)?;
    let digits = cap[2].trim_start_matches('0');
    if digits.is_empty() || &cap[1] == "-" {
        return None;
    }
    let parsed: u64 = digits.parse().unwrap_or(u64::MAX);
    Some(u32::try_from(parsed).unwrap_or(u32::MAX))
}

/// Keep a measurement only when it is strictly positive.
pub fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decimal_variants() {
        assert_eq!(decimal(Some(&json!(50))), Some(50.0));
        assert_eq!(decimal(Some(&json!("12,5"))), Some(12.5));
        assert_eq!(decimal(Some(&json!(" 30 cm"))), Some(30.0));
        assert_eq!(decimal(Some(&json!(".5"))), Some(0.5));
        assert_eq!(decimal(Some(&json!("abc"))), None);
        assert_eq!(decimal(Some(&json!(null))), None);
        assert_eq!(decimal(Some(&json!([1, 2]))), None);
        assert_eq!(decimal(None), None);
    }

    #[test]
    fn test_text_variants() {
        assert_eq!(text(Some(&json!("  GL-M-01 "))), Some("GL-M-01".to_string()));
        assert_eq!(text(Some(&json!(3760001234567u64))), Some("3760001234567".to_string()));
        assert_eq!(text(Some(&json!("   "))), None);
        assert_eq!(text(Some(&json!(false))), None);
    }

    #[test]
    fn test_quantity_rules() {
        assert_eq!(quantity("10"), Some(10));
        assert_eq!(quantity(" 12 u."), Some(12));
        assert_eq!(quantity("1.5"), Some(1));
        assert_eq!(quantity("0"), None);
        assert_eq!(quantity("-4"), None);
        assert_eq!(quantity(""), None);
        assert_eq!(quantity("dix"), None);
        assert_eq!(quantity("-0"), None);
        assert_eq!(quantity("007"), Some(7));
        assert_eq!(quantity("+3"), Some(3));
    }

    #[test]
    fn test_quantity_saturates() {
        assert_eq!(quantity("4294967295"), Some(u32::MAX));
        assert_eq!(quantity("5000000000"), Some(u32::MAX));
        assert_eq!(quantity("99999999999999999999999 pcs"), Some(u32::MAX));
    }

    #[test]
    fn test_integer() {
        assert_eq!(integer(Some(&json!(7))), Some(7));
        assert_eq!(integer(Some(&json!(" 7 "))), Some(7));
        assert_eq!(integer(Some(&json!("A7"))), None);
    }
}
