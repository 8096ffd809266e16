//! # Aggregation Pipeline
//!
//! A typed pipeline of stages executed in order over a set of documents.
//! Every stage renders to native syntax, so a pipeline can be inspected as
//! `[{"$match": ...}, {"$group": ...}, ...]` without running it.

use std::collections::HashMap;

use chrono::Datelike;
use serde_json::{json, Map, Number, Value};

use crate::query::sort::sort_document;
use crate::query::{sort_documents, FilterSet, Projection, SortKey};
use crate::store::value::{as_timestamp, compare_values, get_path};
use crate::store::ID_FIELD;

/// What documents are grouped by
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// One group for every document
    Null,
    /// Value of a field
    Field(String),
    /// Upper-cased string value of a field
    ToUpper(String),
    /// Calendar month (1-12, UTC) of a timestamp field
    Month(String),
}

impl GroupKey {
    fn evaluate(&self, doc: &Value) -> Value {
        match self {
            GroupKey::Null => Value::Null,
            GroupKey::Field(field) => get_path(doc, field).cloned().unwrap_or(Value::Null),
            GroupKey::ToUpper(field) => match get_path(doc, field) {
                Some(Value::String(s)) => Value::String(s.to_uppercase()),
                Some(Value::Null) | None => Value::String(String::new()),
                Some(other) => Value::String(other.to_string().to_uppercase()),
            },
            GroupKey::Month(field) => get_path(doc, field)
                .and_then(as_timestamp)
                .map(|ts| Value::from(ts.month()))
                .unwrap_or(Value::Null),
        }
    }

    fn to_document(&self) -> Value {
        match self {
            GroupKey::Null => Value::Null,
            GroupKey::Field(field) => Value::String(field_ref(field)),
            GroupKey::ToUpper(field) => json!({ "$toUpper": field_ref(field) }),
            GroupKey::Month(field) => json!({ "$month": field_ref(field) }),
        }
    }
}

/// Per-group accumulator
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Adds a constant per document (`Sum(1)` counts)
    Sum(i64),
    /// Sums a numeric field
    SumField(String),
    Avg(String),
    Min(String),
    Max(String),
    /// Collects a field's values in document order
    Push(String),
}

impl Accumulator {
    fn to_document(&self) -> Value {
        match self {
            Accumulator::Sum(n) => json!({ "$sum": n }),
            Accumulator::SumField(f) => json!({ "$sum": field_ref(f) }),
            Accumulator::Avg(f) => json!({ "$avg": field_ref(f) }),
            Accumulator::Min(f) => json!({ "$min": field_ref(f) }),
            Accumulator::Max(f) => json!({ "$max": field_ref(f) }),
            Accumulator::Push(f) => json!({ "$push": field_ref(f) }),
        }
    }

    fn evaluate(&self, members: &[&Value]) -> Value {
        match self {
            Accumulator::Sum(n) => Value::from(n.saturating_mul(members.len() as i64)),
            Accumulator::SumField(f) => sum(numbers(members, f)),
            Accumulator::Avg(f) => {
                let values: Vec<&Number> = numbers(members, f).collect();
                if values.is_empty() {
                    return Value::Null;
                }
                let total: f64 = values.iter().filter_map(|n| n.as_f64()).sum();
                float(total / values.len() as f64)
            }
            Accumulator::Min(f) => present(members, f)
                .min_by(|a, b| compare_values(Some(*a), Some(*b)))
                .cloned()
                .unwrap_or(Value::Null),
            Accumulator::Max(f) => present(members, f)
                .max_by(|a, b| compare_values(Some(*a), Some(*b)))
                .cloned()
                .unwrap_or(Value::Null),
            Accumulator::Push(f) => Value::Array(
                members
                    .iter()
                    .filter_map(|doc| get_path(doc, f).cloned())
                    .collect(),
            ),
        }
    }
}

/// Value of a new field added by [`Stage::AddFields`]
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Copy of another field (`"$_id"`)
    Field(String),
    Literal(Value),
}

impl Expr {
    fn evaluate(&self, doc: &Value) -> Value {
        match self {
            Expr::Field(field) => get_path(doc, field).cloned().unwrap_or(Value::Null),
            Expr::Literal(value) => value.clone(),
        }
    }

    fn to_document(&self) -> Value {
        match self {
            Expr::Field(field) => Value::String(field_ref(field)),
            Expr::Literal(value) => json!({ "$literal": value }),
        }
    }
}

/// One pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(FilterSet),
    /// One output document per element of an array field
    Unwind(String),
    Group {
        key: GroupKey,
        accumulators: Vec<(String, Accumulator)>,
    },
    AddFields(Vec<(String, Expr)>),
    Project(Projection),
    Sort(Vec<SortKey>),
    Limit(usize),
}

impl Stage {
    fn apply(&self, docs: Vec<Value>) -> Vec<Value> {
        match self {
            Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
            Stage::Unwind(field) => docs.into_iter().flat_map(|d| unwind(d, field)).collect(),
            Stage::Group { key, accumulators } => group(&docs, key, accumulators),
            Stage::AddFields(fields) => docs
                .into_iter()
                .map(|doc| {
                    let additions: Vec<(String, Value)> = fields
                        .iter()
                        .map(|(name, expr)| (name.clone(), expr.evaluate(&doc)))
                        .collect();
                    let Value::Object(mut map) = doc else {
                        return doc;
                    };
                    map.extend(additions);
                    Value::Object(map)
                })
                .collect(),
            Stage::Project(projection) => docs.into_iter().map(|d| projection.apply(d)).collect(),
            Stage::Sort(keys) => {
                let mut docs = docs;
                sort_documents(&mut docs, keys);
                docs
            }
            Stage::Limit(n) => docs.into_iter().take(*n).collect(),
        }
    }

    fn to_document(&self) -> Value {
        match self {
            Stage::Match(filter) => json!({ "$match": filter.to_document() }),
            Stage::Unwind(field) => json!({ "$unwind": field_ref(field) }),
            Stage::Group { key, accumulators } => {
                let mut spec = Map::new();
                spec.insert(ID_FIELD.to_string(), key.to_document());
                for (name, acc) in accumulators {
                    spec.insert(name.clone(), acc.to_document());
                }
                json!({ "$group": spec })
            }
            Stage::AddFields(fields) => {
                let spec: Map<String, Value> = fields
                    .iter()
                    .map(|(name, expr)| (name.clone(), expr.to_document()))
                    .collect();
                json!({ "$addFields": spec })
            }
            Stage::Project(projection) => json!({ "$project": projection.to_document() }),
            Stage::Sort(keys) => json!({ "$sort": sort_document(keys) }),
            Stage::Limit(n) => json!({ "$limit": n }),
        }
    }
}

/// An ordered list of stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs every stage in order.
    pub fn run(&self, documents: Vec<Value>) -> Vec<Value> {
        self.stages
            .iter()
            .fold(documents, |docs, stage| stage.apply(docs))
    }

    /// Renders the pipeline in native syntax.
    pub fn to_document(&self) -> Value {
        Value::Array(self.stages.iter().map(Stage::to_document).collect())
    }
}

fn field_ref(field: &str) -> String {
    format!("${}", field)
}

fn unwind(doc: Value, field: &str) -> Vec<Value> {
    let items = match get_path(&doc, field) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => return Vec::new(),
        Some(_) => return vec![doc],
    };
    items
        .into_iter()
        .map(|item| {
            let mut copy = doc.clone();
            if let Some(slot) = path_mut(&mut copy, field) {
                *slot = item;
            }
            copy
        })
        .collect()
}

fn path_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

/// Groups keep the order in which their key was first seen.
fn group(docs: &[Value], key: &GroupKey, accumulators: &[(String, Accumulator)]) -> Vec<Value> {
    let mut order: Vec<Value> = Vec::new();
    let mut members: HashMap<String, Vec<&Value>> = HashMap::new();

    for doc in docs {
        let value = key.evaluate(doc);
        let slot = value.to_string();
        if !members.contains_key(&slot) {
            order.push(value);
        }
        members.entry(slot).or_default().push(doc);
    }

    order
        .into_iter()
        .map(|value| {
            let slot = value.to_string();
            let group = members.get(&slot).map(Vec::as_slice).unwrap_or(&[]);
            let mut out = Map::new();
            out.insert(ID_FIELD.to_string(), value);
            for (name, acc) in accumulators {
                out.insert(name.clone(), acc.evaluate(group));
            }
            Value::Object(out)
        })
        .collect()
}

fn present<'a>(members: &'a [&'a Value], field: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    members
        .iter()
        .filter_map(move |doc| get_path(doc, field))
        .filter(|v| !v.is_null())
}

fn numbers<'a>(members: &'a [&'a Value], field: &'a str) -> impl Iterator<Item = &'a Number> + 'a {
    members
        .iter()
        .filter_map(move |doc| get_path(doc, field))
        .filter_map(|v| match v {
            Value::Number(n) => Some(n),
            _ => None,
        })
}

fn sum<'a>(values: impl Iterator<Item = &'a Number>) -> Value {
    let mut int_total: i64 = 0;
    let mut float_total: f64 = 0.0;
    let mut all_int = true;
    for n in values {
        match n.as_i64() {
            Some(i) if all_int => int_total = int_total.saturating_add(i),
            _ => {
                if all_int {
                    float_total = int_total as f64;
                    all_int = false;
                }
                float_total += n.as_f64().unwrap_or(0.0);
            }
        }
    }
    if all_int {
        Value::from(int_total)
    } else {
        float(float_total)
    }
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterExpr;

    fn tours() -> Vec<Value> {
        vec![
            json!({"name": "A", "difficulty": "easy", "price": 397, "ratingsQuantity": 37,
                   "startDates": ["2021-04-25T09:00:00.000Z", "2021-07-20T09:00:00.000Z"]}),
            json!({"name": "B", "difficulty": "medium", "price": 1997, "ratingsQuantity": 23,
                   "startDates": ["2021-06-19T09:00:00.000Z"]}),
            json!({"name": "C", "difficulty": "easy", "price": 497, "ratingsQuantity": 12,
                   "startDates": []}),
        ]
    }

    #[test]
    fn test_group_with_accumulators() {
        let pipeline = Pipeline::new().stage(Stage::Group {
            key: GroupKey::ToUpper("difficulty".into()),
            accumulators: vec![
                ("numTours".into(), Accumulator::Sum(1)),
                ("numRatings".into(), Accumulator::SumField("ratingsQuantity".into())),
                ("avgPrice".into(), Accumulator::Avg("price".into())),
                ("minPrice".into(), Accumulator::Min("price".into())),
                ("maxPrice".into(), Accumulator::Max("price".into())),
            ],
        });

        let out = pipeline.run(tours());
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0],
            json!({"_id": "EASY", "numTours": 2, "numRatings": 49, "avgPrice": 447.0,
                   "minPrice": 397, "maxPrice": 497})
        );
        assert_eq!(out[0].as_object().unwrap().keys().next().unwrap(), "_id");
    }

    #[test]
    fn test_unwind_drops_empty_arrays() {
        let out = Pipeline::new()
            .stage(Stage::Unwind("startDates".into()))
            .run(tours());
        assert_eq!(out.len(), 3);
        assert_eq!(out[1]["startDates"], "2021-07-20T09:00:00.000Z");
    }

    #[test]
    fn test_month_group_and_reshape() {
        let pipeline = Pipeline::new()
            .stage(Stage::Unwind("startDates".into()))
            .stage(Stage::Group {
                key: GroupKey::Month("startDates".into()),
                accumulators: vec![
                    ("numTourStarts".into(), Accumulator::Sum(1)),
                    ("tours".into(), Accumulator::Push("name".into())),
                ],
            })
            .stage(Stage::AddFields(vec![("month".into(), Expr::Field("_id".into()))]))
            .stage(Stage::Project(Projection::exclude(["_id"])))
            .stage(Stage::Sort(vec![SortKey::descending("month")]))
            .stage(Stage::Limit(2));

        let out = pipeline.run(tours());
        assert_eq!(
            out,
            vec![
                json!({"numTourStarts": 1, "tours": ["A"], "month": 7}),
                json!({"numTourStarts": 1, "tours": ["B"], "month": 6}),
            ]
        );
    }

    #[test]
    fn test_match_stage() {
        let out = Pipeline::new()
            .stage(Stage::Match(
                FilterSet::new().and(FilterExpr::gte("price", json!(1000))),
            ))
            .run(tours());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "B");
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        let pipeline = Pipeline::new().stage(Stage::Group {
            key: GroupKey::Null,
            accumulators: vec![("n".into(), Accumulator::Sum(1))],
        });
        assert!(pipeline.run(Vec::new()).is_empty());
    }

    #[test]
    fn test_to_document() {
        let pipeline = Pipeline::new()
            .stage(Stage::Unwind("startDates".into()))
            .stage(Stage::Group {
                key: GroupKey::Month("startDates".into()),
                accumulators: vec![("tours".into(), Accumulator::Push("name".into()))],
            })
            .stage(Stage::Limit(12));

        assert_eq!(
            pipeline.to_document(),
            json!([
                {"$unwind": "$startDates"},
                {"$group": {"_id": {"$month": "$startDates"}, "tours": {"$push": "$name"}}},
                {"$limit": 12}
            ])
        );
    }
}
