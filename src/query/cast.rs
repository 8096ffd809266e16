//! Casting query-string text to typed filter values
//!
//! Without a schema, values are coerced leniently: integers, floats and
//! booleans are recognised, everything else stays a string. With a schema,
//! a value is cast to the declared type of its field and a value that does
//! not fit is a cast error.

use serde_json::{Number, Value};

use super::errors::{QueryError, QueryResult};
use crate::store::value::{parse_timestamp, timestamp_value};

/// Declared type of a document field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Date,
    Id,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "String",
            FieldKind::Number => "Number",
            FieldKind::Boolean => "Boolean",
            FieldKind::Date => "Date",
            FieldKind::Id => "ObjectId",
        }
    }
}

/// Field type information a collection exposes to the query builder
pub trait FieldTypes: Send + Sync {
    /// Declared type of `path`; array fields report their element type.
    fn kind_of(&self, path: &str) -> Option<FieldKind>;

    /// Fields left out of results unless a projection asks for them.
    fn hidden_fields(&self) -> &[&'static str] {
        &[]
    }
}

/// Lenient coercion used when no type is known.
pub fn coerce(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Casts `raw` to `kind`, failing if the text does not fit.
pub fn cast(field: &str, raw: &str, kind: FieldKind) -> QueryResult<Value> {
    let fail = || QueryError::Cast {
        field: field.to_string(),
        kind: kind.name(),
        value: raw.to_string(),
    };

    match kind {
        FieldKind::String | FieldKind::Id => Ok(Value::String(raw.to_string())),
        FieldKind::Number => {
            let trimmed = raw.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(fail)
        }
        FieldKind::Boolean => match raw.trim() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(fail()),
        },
        FieldKind::Date => parse_timestamp(raw).map(timestamp_value).ok_or_else(fail),
    }
}

/// Casts with the schema when one is given, coerces leniently otherwise.
pub fn cast_for(schema: Option<&dyn FieldTypes>, field: &str, raw: &str) -> QueryResult<Value> {
    match schema.and_then(|s| s.kind_of(field)) {
        Some(kind) => cast(field, raw, kind),
        None => Ok(coerce(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce() {
        assert_eq!(coerce("5"), json!(5));
        assert_eq!(coerce("4.7"), json!(4.7));
        assert_eq!(coerce("true"), json!(true));
        assert_eq!(coerce("easy"), json!("easy"));
    }

    #[test]
    fn test_cast_number() {
        assert_eq!(cast("price", "397", FieldKind::Number).unwrap(), json!(397));
        assert!(matches!(
            cast("price", "cheap", FieldKind::Number),
            Err(QueryError::Cast { kind: "Number", .. })
        ));
    }

    #[test]
    fn test_cast_string_keeps_digits() {
        assert_eq!(
            cast("name", "12345", FieldKind::String).unwrap(),
            json!("12345")
        );
    }

    #[test]
    fn test_cast_date_normalizes() {
        assert_eq!(
            cast("startDates", "2021-06-19", FieldKind::Date).unwrap(),
            json!("2021-06-19T00:00:00.000Z")
        );
    }
}
