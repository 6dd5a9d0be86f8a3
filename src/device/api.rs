//! Response bodies of the device's control API, decoded once at the boundary.
//!
//! The firmware reports numbers as JSON strings (`"volume": "20"`), so the
//! integer fields accept either representation.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::PowerState;

/// `GET /levels/room`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LevelsBody {
    #[serde(default, deserialize_with = "lenient_int")]
    pub volume: Option<i64>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub mute: Option<bool>,
}

/// `GET /power`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PowerBody {
    #[serde(default)]
    pub system: Option<PowerState>,
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_int))
}

/// Nonzero means set.
fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_int(deserializer)?.map(|n| n != 0))
}
