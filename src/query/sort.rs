//! Multi-key sorting
//!
//! Sort keys come from a comma-separated list where a leading `-` means
//! descending: `-ratingsAverage,price`.

use serde_json::{Map, Value};

use crate::store::value::{compare_values, get_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One key of a multi-key sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Parses `-price,name` into sort keys. Spaces also separate keys.
pub fn parse_sort(value: &str) -> Vec<SortKey> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "-")
        .map(|part| match part.strip_prefix('-') {
            Some(field) => SortKey::descending(field),
            None => SortKey::ascending(part.trim_start_matches('+')),
        })
        .collect()
}

/// Sorts documents by `keys` in priority order.
///
/// The sort is stable, so documents equal on every key keep their
/// insertion order.
pub fn sort_documents(documents: &mut [Value], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    documents.sort_by(|a, b| {
        for key in keys {
            let ord = compare_values(get_path(a, &key.field), get_path(b, &key.field));
            let ord = match key.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord.is_ne() {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
}

/// Renders sort keys in native syntax: `{"price": -1, "name": 1}`.
pub fn sort_document(keys: &[SortKey]) -> Value {
    let mut doc = Map::new();
    for key in keys {
        let dir = match key.direction {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        };
        doc.insert(key.field.clone(), Value::from(dir));
    }
    Value::Object(doc)
}
