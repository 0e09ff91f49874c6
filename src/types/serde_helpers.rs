//! Custom serde helpers for HOTCOIN's loosely-typed numeric fields.
//!
//! Amounts and prices arrive as decimal strings on most endpoints, as JSON
//! numbers on a few, and as `""` when a value is not applicable.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, de};

fn parse_decimal<E: de::Error>(value: serde_json::Value) -> Result<Option<Decimal>, E> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => s.trim().parse().map(Some).map_err(de::Error::custom),
        serde_json::Value::Number(n) => n
            .to_string()
            .parse()
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map(Some)
            .map_err(de::Error::custom),
        other => Err(de::Error::custom(format!(
            "expected a decimal string or number, got {other}"
        ))),
    }
}

/// Deserialize a decimal given as a string or a number.
///
/// # Example
///
/// ```rust
/// use serde::Deserialize;
/// use rust_decimal::Decimal;
/// use hotcoin_api_client::types::serde_helpers::decimal;
///
/// #[derive(Deserialize)]
/// struct Fill {
///     #[serde(deserialize_with = "decimal::deserialize")]
///     price: Decimal,
/// }
///
/// let fill: Fill = serde_json::from_str(r#"{"price":"42000.5"}"#).unwrap();
/// assert_eq!(fill.price.to_string(), "42000.5");
///
/// let fill: Fill = serde_json::from_str(r#"{"price":42000.5}"#).unwrap();
/// assert_eq!(fill.price.to_string(), "42000.5");
/// ```
pub mod decimal {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        parse_decimal(value)?.ok_or_else(|| de::Error::custom("missing decimal value"))
    }
}

/// Deserialize an optional decimal; `null` and `""` become `None`.
///
/// Pair with `#[serde(default)]` so an absent field is also `None`.
pub mod optional_decimal {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        parse_decimal(value)
    }
}

/// Deserialize an integer that may be sent as a string, e.g. order ids.
pub mod string_or_i64 {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| de::Error::custom(format!("{n} is not an i64"))),
            serde_json::Value::String(s) => s.trim().parse().map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "expected an integer or integer string, got {other}"
            ))),
        }
    }
}
