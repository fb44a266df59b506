use chrono::Utc;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Whether `time` lies within `drift_ms` of `now` in either direction.
pub fn within_drift(time: i64, now: i64, drift_ms: i64) -> bool {
    time.abs_diff(now) <= drift_ms.unsigned_abs()
}

/// Deserialize an optional epoch-ms timestamp that may arrive as an integer,
/// a float or a numeric string. Anything else becomes `None`.
pub fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(millis_from_value))
}

pub fn millis_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
