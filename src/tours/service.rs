//! Tour operations
//!
//! Reads go through the query builder, writes through validation, reports
//! through the fixed aggregation pipelines. Every document leaving the
//! service carries `durationWeeks` when it carries `duration`.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::errors::{TourError, TourResult};
use crate::aggregate::{monthly_plan, tour_stats, MonthlyPlanRange, TOP_RATED_THRESHOLD};
use crate::model::{
    validate_new, validate_update, with_duration_weeks, TOURS_COLLECTION, TOUR_SCHEMA,
    UNIQUE_FIELDS,
};
use crate::query::{QueryBuilder, QueryString};
use crate::store::{Collection, Database, StoreResult, VERSION_FIELD};

/// Tour catalog operations over one collection
#[derive(Clone)]
pub struct TourService {
    collection: Arc<Collection>,
    monthly_plan_range: MonthlyPlanRange,
}

impl TourService {
    pub fn new(collection: Arc<Collection>) -> Self {
        Self {
            collection,
            monthly_plan_range: MonthlyPlanRange::default(),
        }
    }

    /// Opens the tours collection of `database`.
    pub fn open(database: &Database) -> StoreResult<Self> {
        let collection = database.collection(TOURS_COLLECTION, &UNIQUE_FIELDS)?;
        Ok(Self::new(Arc::new(collection)))
    }

    /// Selects which start dates the monthly plan counts.
    pub fn with_monthly_plan_range(self, range: MonthlyPlanRange) -> Self {
        Self {
            monthly_plan_range: range,
            ..self
        }
    }

    pub fn monthly_plan_range(&self) -> MonthlyPlanRange {
        self.monthly_plan_range
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Lists tours matching the query string.
    pub fn list(&self, query_string: &QueryString) -> TourResult<Vec<Value>> {
        let query = QueryBuilder::new(query_string)
            .with_schema(&TOUR_SCHEMA)
            .filter()?
            .sort()
            .limit_fields()?
            .paginate()
            .build();
        debug!(query = %query.to_document(), "composed tour query");

        let (total, tours) = self.collection.find_counted(&query)?;
        if query.page_requested && query.page_out_of_range(total) {
            return Err(TourError::PageNotFound);
        }
        Ok(tours.into_iter().map(with_duration_weeks).collect())
    }

    pub fn get(&self, id: &str) -> TourResult<Value> {
        self.collection
            .find_by_id(id)?
            .map(single_view)
            .ok_or_else(|| TourError::NotFound(id.to_string()))
    }

    pub fn create(&self, body: &Value) -> TourResult<Value> {
        let tour = validate_new(body, Utc::now())?;
        let stored = self.collection.insert(tour.to_document())?;
        info!(id = %stored["_id"], name = %tour.name, "tour created");
        Ok(single_view(stored))
    }

    /// Applies a partial update; the merged tour is validated again.
    pub fn update(&self, id: &str, patch: &Value) -> TourResult<Value> {
        let existing = self
            .collection
            .find_by_id(id)?
            .ok_or_else(|| TourError::NotFound(id.to_string()))?;
        let tour = validate_update(&existing, patch)?;
        let updated = self
            .collection
            .replace_by_id(id, tour.to_document())?
            .ok_or_else(|| TourError::NotFound(id.to_string()))?;
        info!(id, "tour updated");
        Ok(single_view(updated))
    }

    pub fn delete(&self, id: &str) -> TourResult<()> {
        match self.collection.delete_by_id(id)? {
            Some(_) => {
                info!(id, "tour deleted");
                Ok(())
            }
            None => Err(TourError::NotFound(id.to_string())),
        }
    }

    /// Statistics per difficulty over top-rated tours.
    pub fn stats(&self) -> TourResult<Vec<Value>> {
        Ok(self.collection.aggregate(&tour_stats(TOP_RATED_THRESHOLD))?)
    }

    /// Tour starts per month of `year`.
    pub fn monthly_plan(&self, year: &str) -> TourResult<Vec<Value>> {
        let invalid = || TourError::InvalidYear(year.to_string());
        let parsed: i32 = year.trim().parse().map_err(|_| invalid())?;
        let pipeline = monthly_plan(parsed, self.monthly_plan_range).ok_or_else(invalid)?;
        Ok(self.collection.aggregate(&pipeline)?)
    }

    /// Validates and inserts many tours. Nothing is inserted if any fails.
    pub fn import(&self, bodies: &[Value]) -> TourResult<usize> {
        let now = Utc::now();
        let mut documents = Vec::with_capacity(bodies.len());
        for (index, body) in bodies.iter().enumerate() {
            let tour = validate_new(body, now).inspect_err(|e| {
                warn!(index, error = %e, "rejected tour in import");
            })?;
            documents.push(tour.to_document());
        }
        let inserted = self.collection.insert_many(documents)?;
        info!(count = inserted.len(), "tours imported");
        Ok(inserted.len())
    }

    /// Removes every tour.
    pub fn delete_all(&self) -> TourResult<usize> {
        let removed = self.collection.delete_all()?;
        info!(count = removed, "tours deleted");
        Ok(removed)
    }
}

/// A tour as returned by get, create and update: everything but `__v`.
fn single_view(doc: Value) -> Value {
    let doc = match doc {
        Value::Object(mut fields) => {
            fields.remove(VERSION_FIELD);
            Value::Object(fields)
        }
        other => other,
    };
    with_duration_weeks(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> TourService {
        TourService::new(Arc::new(Collection::in_memory(
            TOURS_COLLECTION,
            &UNIQUE_FIELDS,
        )))
    }

    fn body(name: &str, price: i64, rating: f64) -> Value {
        json!({
            "name": name,
            "duration": 7,
            "maxGroupSize": 10,
            "difficulty": "medium",
            "ratingsAverage": rating,
            "price": price,
            "summary": "Exploring the jaw-dropping US east coast",
            "imageCover": "tour-2-cover.jpg",
            "startDates": ["2021-06-19,10:00"]
        })
    }

    fn qs(raw: &str) -> QueryString {
        QueryString::parse(raw).unwrap()
    }

    #[test]
    fn test_create_then_get() {
        let svc = service();
        let created = svc.create(&body("The Sea Explorer", 497, 4.8)).unwrap();
        let id = created["_id"].as_str().unwrap();

        let fetched = svc.get(id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched["durationWeeks"], 1.0);
        assert!(fetched.get("createdAt").is_some());
        assert!(fetched.get("__v").is_none());
    }

    #[test]
    fn test_list_hides_version_and_created_at() {
        let svc = service();
        svc.create(&body("The Sea Explorer", 497, 4.8)).unwrap();

        let tours = svc.list(&qs("")).unwrap();
        assert_eq!(tours.len(), 1);
        assert!(tours[0].get("__v").is_none());
        assert!(tours[0].get("createdAt").is_none());
        assert_eq!(tours[0]["durationWeeks"], 1.0);
    }

    #[test]
    fn test_list_defaults_to_newest_first() {
        let svc = service();
        svc.create(&body("The First Created", 497, 4.8)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        svc.create(&body("The Second Created", 397, 4.7)).unwrap();

        let names: Vec<_> = svc
            .list(&qs(""))
            .unwrap()
            .into_iter()
            .map(|t| t["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("The Second Created"), json!("The First Created")]);
    }

    #[test]
    fn test_list_page_out_of_range() {
        let svc = service();
        svc.create(&body("The Sea Explorer", 497, 4.8)).unwrap();

        assert_eq!(svc.list(&qs("page=1&limit=1")).unwrap().len(), 1);
        assert!(matches!(
            svc.list(&qs("page=2&limit=1")),
            Err(TourError::PageNotFound)
        ));
    }

    #[test]
    fn test_update_and_delete() {
        let svc = service();
        let created = svc.create(&body("The Sea Explorer", 497, 4.8)).unwrap();
        let id = created["_id"].as_str().unwrap();

        let updated = svc.update(id, &json!({"price": 597})).unwrap();
        assert_eq!(updated["price"], 597);
        assert_eq!(updated["createdAt"], created["createdAt"]);

        svc.delete(id).unwrap();
        assert!(matches!(svc.get(id), Err(TourError::NotFound(_))));
        assert!(matches!(svc.delete(id), Err(TourError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_name() {
        let svc = service();
        svc.create(&body("The Sea Explorer", 497, 4.8)).unwrap();
        assert!(matches!(
            svc.create(&body("The Sea Explorer", 297, 4.1)),
            Err(TourError::Store(_))
        ));
    }

    #[test]
    fn test_monthly_plan_rejects_bad_year() {
        assert!(matches!(
            service().monthly_plan("twenty"),
            Err(TourError::InvalidYear(_))
        ));
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let svc = service();
        let err = svc.import(&[body("The Sea Explorer", 497, 4.8), json!({"name": "Broken"})]);
        assert!(matches!(err, Err(TourError::Validation(_))));
        assert!(svc.collection().is_empty().unwrap());

        let count = svc
            .import(&[body("The Sea Explorer", 497, 4.8), body("The Forest Hiker", 397, 4.7)])
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(svc.stats().unwrap()[0]["numTours"], 2);
        assert_eq!(svc.delete_all().unwrap(), 2);
    }
}
