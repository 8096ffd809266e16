//! Value helpers shared by filters, sorting and aggregation
//!
//! Documents are plain `serde_json::Value` objects. Timestamps are stored in
//! one canonical RFC3339 form (`timestamp_value`), so comparing them as text
//! is chronological.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Looks up a dotted path (`location.address`) in a document.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Parses a timestamp in any of the formats accepted on input.
///
/// Accepts RFC3339, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD,HH:MM`
/// and `YYYY-MM-DD HH:MM:SS`. Dates without a zone are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d,%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Reads a stored value as a timestamp.
pub fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// Canonical stored form of a timestamp.
pub fn timestamp_value(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values.
///
/// Missing sorts before everything. Across types the order is
/// null < number < string < object < array < bool. Strings compare as text.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_present(a, b),
    }
}

fn compare_present(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (xi, yi) in x.iter().zip(y.iter()) {
                let ord = compare_present(xi, yi);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Null, Value::Null) | (Value::Object(_), Value::Object(_)) => Ordering::Equal,
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Equality used by filters and unique indexes: numbers compare by value,
/// everything else exactly.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_present(a, b) == Ordering::Equal,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_path_nested() {
        let doc = json!({"location": {"address": "Miami"}});
        assert_eq!(get_path(&doc, "location.address"), Some(&json!("Miami")));
        assert_eq!(get_path(&doc, "location.city"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2021-04-25,09:00").unwrap();
        let b = parse_timestamp("2021-04-25T09:00:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("2021-04-25").is_some());
        assert!(parse_timestamp("next tuesday").is_none());
    }

    #[test]
    fn test_compare_numbers_and_missing() {
        assert_eq!(
            compare_values(Some(&json!(2)), Some(&json!(10.5))),
            Ordering::Less
        );
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
    }

    #[test]
    fn test_canonical_timestamps_sort_chronologically() {
        let earlier = timestamp_value(parse_timestamp("2021-06-19,10:00").unwrap());
        let later = timestamp_value(parse_timestamp("2021-07-20T09:00:00Z").unwrap());
        assert_eq!(
            compare_values(Some(&earlier), Some(&later)),
            Ordering::Less
        );
    }

    #[test]
    fn test_date_like_strings_are_not_equal() {
        assert!(!values_equal(&json!("2021-04-25"), &json!("2021-04-25T00:00:00Z")));
        assert!(!values_equal(&json!("2021-04-25"), &json!("2021-04-25 00:00:00")));
        assert_ne!(
            compare_values(Some(&json!("2021-04-25")), Some(&json!("2021-04-25 00:00:00"))),
            Ordering::Equal
        );
    }

    #[test]
    fn test_values_equal_int_float() {
        assert!(values_equal(&json!(5), &json!(5.0)));
        assert!(!values_equal(&json!(5), &json!("5")));
    }
}
