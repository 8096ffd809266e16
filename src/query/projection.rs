//! Field projection
//!
//! `fields=name,price` keeps only those fields plus `_id`;
//! `fields=-description,-images` drops those fields and keeps the rest.
//! Inclusion and exclusion cannot be mixed, except that `-_id` may appear
//! in an inclusion list.

use serde_json::{Map, Value};

use super::errors::{QueryError, QueryResult};
use crate::store::ID_FIELD;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    /// Return documents unchanged
    #[default]
    All,
    /// Keep only `fields` (and `_id` when `with_id`)
    Include { fields: Vec<String>, with_id: bool },
    /// Drop `fields`
    Exclude(Vec<String>),
}

impl Projection {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Include {
            fields: fields.into_iter().map(Into::into).collect(),
            with_id: true,
        }
    }

    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Exclude(fields.into_iter().map(Into::into).collect())
    }

    /// Parses a `fields` query value.
    pub fn parse(value: &str) -> QueryResult<Self> {
        let mut included = Vec::new();
        let mut excluded = Vec::new();
        let mut with_id = true;

        for part in value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
        {
            match part.strip_prefix('-') {
                Some(ID_FIELD) => with_id = false,
                Some(field) if !field.is_empty() => excluded.push(field.to_string()),
                Some(_) => {}
                None => included.push(part.to_string()),
            }
        }

        match (included.is_empty(), excluded.is_empty()) {
            (false, false) => Err(QueryError::InvalidQuery(
                "fields cannot mix inclusion and exclusion".to_string(),
            )),
            (false, true) => Ok(Projection::Include {
                fields: included,
                with_id,
            }),
            (true, _) => {
                if !with_id {
                    excluded.push(ID_FIELD.to_string());
                }
                if excluded.is_empty() {
                    Ok(Projection::All)
                } else {
                    Ok(Projection::Exclude(excluded))
                }
            }
        }
    }

    /// Applies the projection to one document.
    pub fn apply(&self, doc: Value) -> Value {
        let Value::Object(source) = doc else {
            return doc;
        };
        match self {
            Projection::All => Value::Object(source),
            Projection::Include { fields, with_id } => {
                let mut out = Map::new();
                if *with_id {
                    if let Some(id) = source.get(ID_FIELD) {
                        out.insert(ID_FIELD.to_string(), id.clone());
                    }
                }
                for field in fields {
                    copy_path(&source, &mut out, field);
                }
                Value::Object(out)
            }
            Projection::Exclude(fields) => Value::Object(
                source
                    .into_iter()
                    .filter(|(k, _)| !fields.contains(k))
                    .collect(),
            ),
        }
    }

    /// Renders the projection in native syntax: `{"name": 1, "price": 1}`.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        match self {
            Projection::All => {}
            Projection::Include { fields, with_id } => {
                for field in fields {
                    doc.insert(field.clone(), Value::from(1));
                }
                if !with_id {
                    doc.insert(ID_FIELD.to_string(), Value::from(0));
                }
            }
            Projection::Exclude(fields) => {
                for field in fields {
                    doc.insert(field.clone(), Value::from(0));
                }
            }
        }
        Value::Object(doc)
    }
}

/// Copies `path` (possibly dotted) from `source` into `out`.
fn copy_path(source: &Map<String, Value>, out: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            if let Some(value) = source.get(path) {
                out.insert(path.to_string(), value.clone());
            }
        }
        Some((head, rest)) => {
            let Some(Value::Object(inner)) = source.get(head) else {
                return;
            };
            let slot = out
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(slot) = slot {
                copy_path(inner, slot, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tour() -> Value {
        json!({
            "_id": "1",
            "name": "The Forest Hiker",
            "price": 397,
            "summary": "Breathtaking hike",
            "__v": 0
        })
    }

    #[test]
    fn test_include_keeps_id() {
        let projected = Projection::parse("name,price").unwrap().apply(tour());
        assert_eq!(projected, json!({"_id": "1", "name": "The Forest Hiker", "price": 397}));
    }

    #[test]
    fn test_include_without_id() {
        let projected = Projection::parse("name,-_id").unwrap().apply(tour());
        assert_eq!(projected, json!({"name": "The Forest Hiker"}));
    }

    #[test]
    fn test_exclude() {
        let projected = Projection::parse("-__v,-summary").unwrap().apply(tour());
        assert_eq!(
            projected,
            json!({"_id": "1", "name": "The Forest Hiker", "price": 397})
        );
    }

    #[test]
    fn test_mixing_is_rejected() {
        assert!(Projection::parse("name,-price").is_err());
    }

    #[test]
    fn test_nested_include() {
        let doc = json!({"_id": "1", "location": {"address": "Miami", "type": "Point"}});
        let projected = Projection::include(["location.address"]).apply(doc);
        assert_eq!(projected, json!({"_id": "1", "location": {"address": "Miami"}}));
    }

    #[test]
    fn test_to_document() {
        assert_eq!(
            Projection::parse("name,price").unwrap().to_document(),
            json!({"name": 1, "price": 1})
        );
        assert_eq!(Projection::exclude(["__v"]).to_document(), json!({"__v": 0}));
    }
}
