//! In-memory document collection
//!
//! Documents are JSON objects kept in insertion order, each carrying a
//! server-assigned `_id` and a version marker `__v`. Reads share the lock,
//! writes are serialized. When a snapshot is attached every successful write
//! is persisted before it becomes visible.

use std::sync::RwLock;

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::snapshot::SnapshotFile;
use super::value::{get_path, values_equal};
use crate::aggregate::Pipeline;
use crate::query::ComposedQuery;

/// Identifier field of every document
pub const ID_FIELD: &str = "_id";

/// Version marker field of every document
pub const VERSION_FIELD: &str = "__v";

/// Checks that `id` is a well-formed document identifier.
pub fn check_id(id: &str) -> StoreResult<()> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| StoreError::InvalidId(id.to_string()))
}

fn id_of(doc: &Value) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// A named collection of JSON documents
pub struct Collection {
    name: String,
    unique_fields: Vec<String>,
    documents: RwLock<Vec<Value>>,
    snapshot: Option<SnapshotFile>,
}

impl Collection {
    /// Creates an empty collection that lives only in memory.
    pub fn in_memory(name: impl Into<String>, unique_fields: &[&str]) -> Self {
        Self {
            name: name.into(),
            unique_fields: unique_fields.iter().map(|f| f.to_string()).collect(),
            documents: RwLock::new(Vec::new()),
            snapshot: None,
        }
    }

    /// Opens a collection backed by `snapshot`, loading its documents.
    pub fn open(
        name: impl Into<String>,
        unique_fields: &[&str],
        snapshot: SnapshotFile,
    ) -> StoreResult<Self> {
        let documents = snapshot.load()?;
        let name = name.into();
        debug!(
            collection = %name,
            documents = documents.len(),
            path = %snapshot.path().display(),
            "loaded collection snapshot"
        );
        Ok(Self {
            name,
            unique_fields: unique_fields.iter().map(|f| f.to_string()).collect(),
            documents: RwLock::new(documents),
            snapshot: Some(snapshot),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of documents
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Executes a composed query: filter, sort, skip, limit, then project.
    pub fn find(&self, query: &ComposedQuery) -> StoreResult<Vec<Value>> {
        Ok(self.find_counted(query)?.1)
    }

    /// Like [`Collection::find`], also returning how many documents matched
    /// the filter before skip and limit. Both come from one read.
    pub fn find_counted(&self, query: &ComposedQuery) -> StoreResult<(usize, Vec<Value>)> {
        let mut matched: Vec<Value> = {
            let docs = self.read()?;
            docs.iter()
                .filter(|d| query.filter.matches(d))
                .cloned()
                .collect()
        };
        let total = matched.len();

        crate::query::sort_documents(&mut matched, &query.sort);

        let limit = query.limit.unwrap_or(usize::MAX);
        let page = matched
            .into_iter()
            .skip(query.skip)
            .take(limit)
            .map(|doc| query.projection.apply(doc))
            .collect();
        Ok((total, page))
    }

    /// Fetches one document by id. Malformed ids are rejected.
    pub fn find_by_id(&self, id: &str) -> StoreResult<Option<Value>> {
        check_id(id)?;
        let docs = self.read()?;
        Ok(docs.iter().find(|d| id_of(d) == Some(id)).cloned())
    }

    /// Inserts a document, assigning `_id` and `__v`.
    pub fn insert(&self, doc: Value) -> StoreResult<Value> {
        let mut inserted = self.insert_many(vec![doc])?;
        inserted.pop().ok_or(StoreError::NotAnObject)
    }

    /// Inserts several documents. Either all are inserted or none.
    pub fn insert_many(&self, docs: Vec<Value>) -> StoreResult<Vec<Value>> {
        let mut prepared = Vec::with_capacity(docs.len());
        for doc in docs {
            let Value::Object(body) = doc else {
                return Err(StoreError::NotAnObject);
            };
            let mut fields = Map::with_capacity(body.len() + 2);
            fields.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
            fields.extend(
                body.into_iter()
                    .filter(|(k, _)| k != ID_FIELD && k != VERSION_FIELD),
            );
            fields.insert(VERSION_FIELD.to_string(), Value::from(0));
            prepared.push(Value::Object(fields));
        }

        let mut docs = self.write()?;
        let mut next = docs.clone();
        for doc in &prepared {
            self.check_unique(&next, doc)?;
            next.push(doc.clone());
        }
        self.persist(&next)?;
        *docs = next;

        debug!(collection = %self.name, inserted = prepared.len(), "inserted documents");
        Ok(prepared)
    }

    /// Replaces the document with `id`, keeping its `_id` and `__v`.
    ///
    /// Returns `None` if no such document exists.
    pub fn replace_by_id(&self, id: &str, replacement: Value) -> StoreResult<Option<Value>> {
        check_id(id)?;
        let Value::Object(body) = replacement else {
            return Err(StoreError::NotAnObject);
        };

        let mut docs = self.write()?;
        let Some(pos) = docs.iter().position(|d| id_of(d) == Some(id)) else {
            return Ok(None);
        };

        let version = docs[pos]
            .get(VERSION_FIELD)
            .cloned()
            .unwrap_or_else(|| Value::from(0));
        let mut fields = Map::with_capacity(body.len() + 2);
        fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        fields.extend(
            body.into_iter()
                .filter(|(k, _)| k != ID_FIELD && k != VERSION_FIELD),
        );
        fields.insert(VERSION_FIELD.to_string(), version);
        let updated = Value::Object(fields);

        let mut next = docs.clone();
        next.remove(pos);
        self.check_unique(&next, &updated)?;
        next.insert(pos, updated.clone());
        self.persist(&next)?;
        *docs = next;

        Ok(Some(updated))
    }

    /// Removes the document with `id`, returning it if it existed.
    pub fn delete_by_id(&self, id: &str) -> StoreResult<Option<Value>> {
        check_id(id)?;
        let mut docs = self.write()?;
        let Some(pos) = docs.iter().position(|d| id_of(d) == Some(id)) else {
            return Ok(None);
        };

        let mut next = docs.clone();
        let removed = next.remove(pos);
        self.persist(&next)?;
        *docs = next;

        Ok(Some(removed))
    }

    /// Removes every document, returning how many were removed.
    pub fn delete_all(&self) -> StoreResult<usize> {
        let mut docs = self.write()?;
        let removed = docs.len();
        self.persist(&[])?;
        docs.clear();
        Ok(removed)
    }

    /// Runs an aggregation pipeline over a consistent view of the collection.
    pub fn aggregate(&self, pipeline: &Pipeline) -> StoreResult<Vec<Value>> {
        let docs = self.read()?.clone();
        Ok(pipeline.run(docs))
    }

    fn check_unique(&self, existing: &[Value], candidate: &Value) -> StoreResult<()> {
        let candidate_id = id_of(candidate);
        for field in &self.unique_fields {
            let Some(value) = get_path(candidate, field) else {
                continue;
            };
            let clash = existing.iter().any(|doc| {
                id_of(doc) != candidate_id
                    && get_path(doc, field).is_some_and(|other| values_equal(other, value))
            });
            if clash {
                return Err(StoreError::DuplicateKey {
                    field: field.clone(),
                    value: display_value(value),
                });
            }
        }
        Ok(())
    }

    fn persist(&self, docs: &[Value]) -> StoreResult<()> {
        match &self.snapshot {
            Some(snapshot) => snapshot.save(docs),
            None => Ok(()),
        }
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Vec<Value>>> {
        self.documents.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Vec<Value>>> {
        self.documents.write().map_err(|_| StoreError::LockPoisoned)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FilterExpr, FilterSet, Projection, SortKey};
    use serde_json::json;
    use tempfile::TempDir;

    fn collection() -> Collection {
        Collection::in_memory("tours", &["name"])
    }

    #[test]
    fn test_insert_assigns_id_and_version() {
        let coll = collection();
        let doc = coll.insert(json!({"name": "The Forest Hiker"})).unwrap();

        let id = doc["_id"].as_str().unwrap();
        assert!(check_id(id).is_ok());
        assert_eq!(doc["__v"], 0);
        assert_eq!(coll.len().unwrap(), 1);
    }

    #[test]
    fn test_unique_index_rejects_duplicate() {
        let coll = collection();
        coll.insert(json!({"name": "The Forest Hiker"})).unwrap();
        let err = coll.insert(json!({"name": "The Forest Hiker"})).unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey { ref field, .. } if field == "name"));
        assert_eq!(coll.len().unwrap(), 1);
    }

    #[test]
    fn test_unique_index_compares_names_exactly() {
        let coll = collection();
        coll.insert(json!({"name": "2021-04-25"})).unwrap();
        coll.insert(json!({"name": "2021-04-25T00:00:00Z"})).unwrap();
        assert_eq!(coll.len().unwrap(), 2);
    }

    #[test]
    fn test_equality_filter_is_exact_for_date_like_text() {
        let coll = collection();
        coll.insert(json!({"name": "a", "summary": "2021-04-25"})).unwrap();
        coll.insert(json!({"name": "b", "summary": "2021-04-25 00:00:00"})).unwrap();

        let query = ComposedQuery {
            filter: FilterSet::new().and(FilterExpr::eq("summary", json!("2021-04-25"))),
            ..ComposedQuery::default()
        };
        let found = coll.find(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], "a");
    }

    #[test]
    fn test_find_counted_reports_total_before_paging() {
        let coll = collection();
        for name in ["a", "b", "c"] {
            coll.insert(json!({"name": name})).unwrap();
        }
        let query = ComposedQuery {
            skip: 2,
            limit: Some(5),
            ..ComposedQuery::default()
        };
        let (total, page) = coll.find_counted(&query).unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_insert_many_is_all_or_nothing() {
        let coll = collection();
        let result = coll.insert_many(vec![
            json!({"name": "The Sea Explorer"}),
            json!({"name": "The Sea Explorer"}),
        ]);

        assert!(result.is_err());
        assert!(coll.is_empty().unwrap());
    }

    #[test]
    fn test_find_by_id_rejects_malformed_id() {
        let coll = collection();
        assert!(matches!(
            coll.find_by_id("not-an-id"),
            Err(StoreError::InvalidId(_))
        ));
        assert!(coll
            .find_by_id(&Uuid::new_v4().to_string())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_replace_keeps_id_and_checks_unique() {
        let coll = collection();
        let a = coll.insert(json!({"name": "The Snow Adventurer"})).unwrap();
        coll.insert(json!({"name": "The City Wanderer"})).unwrap();
        let id = a["_id"].as_str().unwrap();

        let updated = coll
            .replace_by_id(id, json!({"name": "The Snow Adventurer", "price": 997}))
            .unwrap()
            .unwrap();
        assert_eq!(updated["_id"], id);
        assert_eq!(updated["price"], 997);

        let clash = coll.replace_by_id(id, json!({"name": "The City Wanderer"}));
        assert!(matches!(clash, Err(StoreError::DuplicateKey { .. })));
    }

    #[test]
    fn test_delete_by_id() {
        let coll = collection();
        let doc = coll.insert(json!({"name": "The Park Camper"})).unwrap();
        let id = doc["_id"].as_str().unwrap();

        assert!(coll.delete_by_id(id).unwrap().is_some());
        assert!(coll.delete_by_id(id).unwrap().is_none());
        assert!(coll.is_empty().unwrap());
    }

    #[test]
    fn test_find_applies_composed_query() {
        let coll = collection();
        for (name, price) in [("a", 100), ("b", 300), ("c", 200), ("d", 400)] {
            coll.insert(json!({"name": name, "price": price})).unwrap();
        }

        let query = ComposedQuery {
            filter: FilterSet::new().and(FilterExpr::gte("price", json!(200))),
            sort: vec![SortKey::descending("price")],
            projection: Projection::include(["name"]),
            skip: 1,
            limit: Some(1),
            page_requested: false,
        };

        let found = coll.find(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], "b");
        assert!(found[0].get("price").is_none());
        assert!(found[0].get("_id").is_some());
    }

    #[test]
    fn test_snapshot_backed_collection_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(tmp.path(), "tours");

        let coll = Collection::open("tours", &["name"], snapshot.clone()).unwrap();
        coll.insert(json!({"name": "The Northern Lights"})).unwrap();
        drop(coll);

        let reopened = Collection::open("tours", &["name"], snapshot).unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
    }
}
