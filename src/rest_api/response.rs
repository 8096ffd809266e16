//! # Response Formatting
//!
//! The success envelope: `{status: "success", results?, total?, data}`.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Success envelope
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            results: None,
            total: None,
            data,
        }
    }

    pub fn with_results(self, results: usize) -> Self {
        Self {
            results: Some(results),
            ..self
        }
    }

    pub fn with_total(self, total: usize) -> Self {
        Self {
            total: Some(total),
            ..self
        }
    }
}

impl Envelope<Value> {
    /// `data` holding a single named value: `{"tour": {...}}`
    pub fn named(name: &str, value: impl Serialize) -> Self {
        let mut data = serde_json::Map::new();
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        data.insert(name.to_string(), value);
        Self::success(Value::Object(data))
    }

    /// `data` holding a named list, with `results` set to its length.
    pub fn list(name: &str, items: Vec<Value>) -> Self {
        let count = items.len();
        Self::named(name, items).with_results(count)
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_envelope() {
        let envelope = Envelope::list("tours", vec![json!({"name": "a"}), json!({"name": "b"})]);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["results"], 2);
        assert_eq!(json["data"]["tours"][1]["name"], "b");
        assert!(json.get("total").is_none());
    }

    #[test]
    fn test_total_envelope() {
        let envelope = Envelope::named("plan", Vec::<Value>::new()).with_total(0);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["total"], 0);
        assert!(json.get("results").is_none());
        assert_eq!(json["data"]["plan"], json!([]));
    }
}
