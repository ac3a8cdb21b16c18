//! Lenient field extraction from parsed JSON rows.
//!
//! Dashboard exports disagree on key spelling (`Revenue`, `revenue`, `gmv`)
//! and sometimes ship numbers as strings. Extraction tries a list of aliases
//! case-insensitively and treats anything absent or unparseable as missing.

use serde_json::{Map, Value};

pub fn object_rows(value: &Value) -> Vec<&Map<String, Value>> {
    if let Some(rows) = value.as_array() {
        return rows.iter().filter_map(Value::as_object).collect();
    }
    if let Some(object) = value.as_object() {
        for key in ["data", "items", "rows", "records"] {
            if let Some(Value::Array(rows)) = get_case_insensitive(object, key) {
                return rows.iter().filter_map(Value::as_object).collect();
            }
        }
    }
    Vec::new()
}

pub fn number_from_keys(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    for key in keys {
        let Some(value) = get_case_insensitive(object, key) else {
            continue;
        };
        if let Some(number) = to_f64(value) {
            return Some(number);
        }
    }
    None
}

/// Missing numeric fields count as zero for aggregation.
pub fn number_or_zero(object: &Map<String, Value>, keys: &[&str]) -> f64 {
    number_from_keys(object, keys).unwrap_or(0.0)
}

pub fn text_from_keys(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match get_case_insensitive(object, key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

pub fn get_case_insensitive<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

pub fn to_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let sanitized = s.trim().replace([',', '%', '_', '$'], "");
            sanitized.parse::<f64>().ok()
        }
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

pub fn normalize_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

pub fn normalize_ratio(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Payment splits arrive either as ratios (0.42) or percentages (42).
pub fn ratio_from_maybe_percent(value: f64) -> f64 {
    if value > 1.0 {
        normalize_ratio(value / 100.0)
    } else {
        normalize_ratio(value)
    }
}

pub fn non_negative(value: f64) -> f64 {
    value.max(0.0)
}
