//! Tolerant numeric fields.
//!
//! Backend payloads carry costs, funding and weights as JSON numbers, decimal
//! strings (`"1000.00"`), `null`, empty strings, or omit them entirely. None
//! of these shapes is an error: they all resolve to a number, with zero as the
//! fallback. [`Amount`] additionally remembers *why* it fell back so callers
//! can report data-quality warnings without blocking anything.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A monetary or weight figure as received from the backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Amount {
    /// A usable finite number.
    Value(f64),
    /// Absent, `null` or blank.
    #[default]
    Missing,
    /// Present but not numeric; holds the raw text.
    Malformed(String),
}

impl Amount {
    /// Numeric value, zero when missing or malformed.
    pub fn value(&self) -> f64 {
        match self {
            Amount::Value(v) => *v,
            Amount::Missing | Amount::Malformed(_) => 0.0,
        }
    }

    /// Whether the field was present but could not be read as a number.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Amount::Malformed(_))
    }

    /// Interpret an arbitrary JSON value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Amount::Missing,
            Value::Number(n) => match n.as_f64() {
                Some(v) if v.is_finite() => Amount::Value(v),
                _ => Amount::Malformed(n.to_string()),
            },
            Value::String(s) => parse_text(s),
            other => Amount::Malformed(other.to_string()),
        }
    }
}

impl From<f64> for Amount {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Amount::Value(v)
        } else {
            Amount::Malformed(v.to_string())
        }
    }
}

fn parse_text(s: &str) -> Amount {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Amount::Missing;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Amount::Value(v),
        _ => Amount::Malformed(s.to_string()),
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Amount::from_json(&value))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Amount::Value(v) => serializer.serialize_f64(*v),
            Amount::Missing => serializer.serialize_none(),
            Amount::Malformed(raw) => serializer.serialize_str(raw),
        }
    }
}

/// Serde helpers for plain `f64` / `Option<f64>` / collection fields that
/// must tolerate the same payload shapes as [`Amount`].
pub mod lenient {
    use std::collections::BTreeMap;

    use super::Amount;
    use serde::{Deserialize, Deserializer};

    /// Deserialize a number, falling back to zero.
    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Amount::deserialize(deserializer)?.value())
    }

    /// Deserialize an optional number; missing or malformed becomes `None`.
    pub fn opt_number<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        Ok(match Amount::deserialize(deserializer)? {
            Amount::Value(v) => Some(v),
            Amount::Missing | Amount::Malformed(_) => None,
        })
    }

    /// Deserialize a map of numbers keyed by `K`; `null` is an empty map and
    /// unreadable values are zero.
    pub fn number_map<'de, D, K>(deserializer: D) -> Result<BTreeMap<K, f64>, D::Error>
    where
        D: Deserializer<'de>,
        K: Deserialize<'de> + Ord,
    {
        let raw = Option::<BTreeMap<K, Amount>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(raw.into_iter().map(|(k, v)| (k, v.value())).collect())
    }

    /// Deserialize a value where `null` means "use the default".
    pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Line {
        #[serde(default)]
        cost: Amount,
        #[serde(default, deserialize_with = "lenient::number")]
        weight: f64,
        #[serde(default, deserialize_with = "lenient::opt_number")]
        override_weight: Option<f64>,
        #[serde(default, deserialize_with = "lenient::null_default")]
        tags: Vec<String>,
    }

    #[test]
    fn test_amount_accepts_numbers_and_decimal_strings() {
        assert_eq!(Amount::from_json(&json!(1000)), Amount::Value(1000.0));
        assert_eq!(Amount::from_json(&json!("1000.50")), Amount::Value(1000.5));
        assert_eq!(Amount::from_json(&json!(" 12 ")), Amount::Value(12.0));
    }

    #[test]
    fn test_amount_missing_and_malformed_are_zero() {
        assert_eq!(Amount::from_json(&json!(null)), Amount::Missing);
        assert_eq!(Amount::from_json(&json!("")), Amount::Missing);

        let malformed = Amount::from_json(&json!("n/a"));
        assert!(malformed.is_malformed());
        assert_eq!(malformed.value(), 0.0);

        assert!(Amount::from_json(&json!({"x": 1})).is_malformed());
        assert!(Amount::from(f64::NAN).is_malformed());
    }

    #[test]
    fn test_lenient_fields() {
        let line: Line = serde_json::from_value(json!({
            "cost": "250.00",
            "weight": "30.00",
            "override_weight": null,
            "tags": null
        }))
        .unwrap();
        assert_eq!(line.cost.value(), 250.0);
        assert_eq!(line.weight, 30.0);
        assert_eq!(line.override_weight, None);
        assert!(line.tags.is_empty());

        let empty: Line = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.cost, Amount::Missing);
        assert_eq!(empty.weight, 0.0);
    }

    #[test]
    fn test_amount_serializes_back() {
        assert_eq!(serde_json::to_value(Amount::Value(5.0)).unwrap(), json!(5.0));
        assert_eq!(serde_json::to_value(Amount::Missing).unwrap(), json!(null));
        assert_eq!(
            serde_json::to_value(Amount::Malformed("abc".into())).unwrap(),
            json!("abc")
        );
    }
}
