//! Tour validation
//!
//! Validation runs against the full candidate document and reports every
//! failing field at once. Text numbers (`"397"`) are accepted for number
//! fields and numbers for text fields; anything else of the wrong type is a
//! type error for that field. `null` counts as missing.
//!
//! `_id`, `__v` and `createdAt` are owned by the server and never taken
//! from a request body. Fields the schema does not declare are dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::tour::{Difficulty, Tour, DEFAULT_RATINGS_AVERAGE};
use crate::store::value::{as_timestamp, parse_timestamp};
use crate::store::{ID_FIELD, VERSION_FIELD};

pub const NAME_MAX_LENGTH: usize = 40;
pub const NAME_MIN_LENGTH: usize = 10;

const CREATED_AT_FIELD: &str = "createdAt";

/// Fields a request body may not set
const SERVER_FIELDS: [&str; 3] = [ID_FIELD, VERSION_FIELD, CREATED_AT_FIELD];

/// One failing field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every constraint a candidate tour violates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid input data. {}", join_messages(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// A failure on a single field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field: field.into(),
                message: message.into(),
            }],
        }
    }

    /// Message for `field`, if it failed.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(". ")
}

/// Validates a request body for a new tour created at `now`.
pub fn validate_new(body: &Value, now: DateTime<Utc>) -> Result<Tour, ValidationError> {
    let fields = body_fields(body)?;
    validate_fields(&fields, now)
}

/// Validates `patch` applied on top of the stored document `existing`.
///
/// The merged document must satisfy every constraint, so a new
/// `priceDiscount` is checked against the stored `price` when the patch
/// does not change it.
pub fn validate_update(existing: &Value, patch: &Value) -> Result<Tour, ValidationError> {
    let mut merged = existing.as_object().cloned().unwrap_or_default();
    for field in SERVER_FIELDS {
        merged.remove(field);
    }
    merged.extend(body_fields(patch)?);

    let created_at = existing
        .get(CREATED_AT_FIELD)
        .and_then(as_timestamp)
        .unwrap_or_else(Utc::now);
    validate_fields(&merged, created_at)
}

fn body_fields(body: &Value) -> Result<Map<String, Value>, ValidationError> {
    let Value::Object(fields) = body else {
        return Err(ValidationError::single(
            "body",
            "Request body must be a JSON object",
        ));
    };
    Ok(fields
        .iter()
        .filter(|(k, _)| !SERVER_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect())
}

fn validate_fields(
    fields: &Map<String, Value>,
    created_at: DateTime<Utc>,
) -> Result<Tour, ValidationError> {
    let mut check = Checker {
        fields,
        errors: Vec::new(),
    };

    let name = check.text("name", Some("A tour must have a NAME"));
    if let Some(name) = &name {
        let length = name.chars().count();
        if length > NAME_MAX_LENGTH {
            check.fail("name", "A tour name must have less or equal to 40 characters");
        } else if length < NAME_MIN_LENGTH {
            check.fail("name", "A tour name must have 10 or more characters");
        }
    }

    let duration = check.number("duration", Some("A tour must have a duration"));
    let max_group_size = check.number("maxGroupSize", Some("A tour must have a group size"));

    let difficulty = check
        .text("difficulty", Some("A tour must have a difficulty level"))
        .and_then(|raw| match raw.parse::<Difficulty>() {
            Ok(d) => Some(d),
            Err(()) => {
                check.fail("difficulty", "Difficulty is either: easy, medium, difficult");
                None
            }
        });

    let ratings_average = check
        .number("ratingsAverage", None)
        .or_else(|| Number::from_f64(DEFAULT_RATINGS_AVERAGE));
    if let Some(rating) = ratings_average.as_ref().and_then(Number::as_f64) {
        if rating < 1.0 {
            check.fail("ratingsAverage", "Rating must be above 1.0");
        } else if rating > 5.0 {
            check.fail("ratingsAverage", "Rating must be below 5.0");
        }
    }
    let ratings_quantity = check.number("ratingsQuantity", None).unwrap_or_else(|| 0.into());

    let price = check.number("price", Some("A tour must have a PRICE"));
    let price_discount = check.number("priceDiscount", None);
    if let (Some(discount), Some(price)) = (&price_discount, &price) {
        let below = match (discount.as_f64(), price.as_f64()) {
            (Some(d), Some(p)) => d < p,
            _ => false,
        };
        if !below {
            check.fail("priceDiscount", "Discount must be less than or equal to price");
        }
    }

    let summary = check.text("summary", Some("A tour must have a description"));
    let description = check.text("description", None);
    let image_cover = check.text("imageCover", Some("A tour must have a cover image"));
    let images = check.texts("images");
    let start_dates = check.dates("startDates");

    match (
        name,
        duration,
        max_group_size,
        difficulty,
        ratings_average,
        price,
        summary,
        image_cover,
    ) {
        (
            Some(name),
            Some(duration),
            Some(max_group_size),
            Some(difficulty),
            Some(ratings_average),
            Some(price),
            Some(summary),
            Some(image_cover),
        ) if check.errors.is_empty() => Ok(Tour {
            name,
            duration,
            max_group_size,
            difficulty,
            ratings_average,
            ratings_quantity,
            price,
            price_discount,
            summary,
            description,
            image_cover,
            images,
            created_at,
            start_dates,
        }),
        _ => Err(ValidationError {
            errors: check.errors,
        }),
    }
}

/// Reads typed fields and collects failures
struct Checker<'a> {
    fields: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Checker<'a> {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        if self.errors.iter().any(|e| e.field == field) {
            return;
        }
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn type_error(&mut self, field: &str, value: &Value) {
        let shown = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.fail(field, format!("Invalid {}: {}", field, shown));
    }

    fn present(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    fn missing(&mut self, field: &str, required: Option<&str>) {
        if let Some(message) = required {
            self.fail(field, message);
        }
    }

    /// Trimmed text. An empty string is missing.
    fn text(&mut self, field: &str, required: Option<&str>) -> Option<String> {
        let value = match self.present(field) {
            None => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
            Some(other) => {
                self.type_error(field, other);
                return None;
            }
        };
        match value {
            Some(s) if !s.is_empty() => Some(s),
            _ => {
                self.missing(field, required);
                None
            }
        }
    }

    fn number(&mut self, field: &str, required: Option<&str>) -> Option<Number> {
        let Some(value) = self.present(field) else {
            self.missing(field, required);
            return None;
        };
        let number = to_number(value);
        if number.is_none() {
            self.type_error(field, value);
        }
        number
    }

    /// A list of text values. A lone value counts as a one-element list.
    fn texts(&mut self, field: &str) -> Vec<String> {
        let Some(value) = self.present(field) else {
            return Vec::new();
        };
        let items = match value {
            Value::Array(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(s) => out.push(s.clone()),
                Value::Number(_) | Value::Bool(_) => out.push(item.to_string()),
                _ => {
                    self.type_error(field, item);
                    return Vec::new();
                }
            }
        }
        out
    }

    fn dates(&mut self, field: &str) -> Vec<DateTime<Utc>> {
        let Some(value) = self.present(field) else {
            return Vec::new();
        };
        let items = match value {
            Value::Array(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let parsed = match item {
                Value::String(s) => parse_timestamp(s),
                other => as_timestamp(other),
            };
            match parsed {
                Some(ts) => out.push(ts),
                None => {
                    self.type_error(field, item);
                    return Vec::new();
                }
            }
        }
        out
    }
}

fn to_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(i) = s.parse::<i64>() {
                return Some(i.into());
            }
            s.parse::<f64>().ok().and_then(Number::from_f64)
        }
        _ => None,
    }
}
