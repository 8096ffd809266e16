//! The two fixed tour reports
//!
//! Both constructors only build a [`Pipeline`]; the store runs it.

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use super::pipeline::{Accumulator, Expr, GroupKey, Pipeline, Stage};
use crate::query::{FilterExpr, FilterSet, Projection, SortKey};
use crate::store::value::timestamp_value;
use crate::store::ID_FIELD;

/// Rating from which a tour counts as top rated
pub const TOP_RATED_THRESHOLD: f64 = 4.5;

/// Months reported by the monthly plan
pub const MONTHS_PER_PLAN: usize = 12;

/// Statistics per difficulty over tours rated at least `min_rating`.
///
/// Produces one row per upper-cased difficulty with `numTours`,
/// `numRatings`, `avgRating`, `avgPrice`, `minPrice` and `maxPrice`,
/// cheapest average first.
pub fn tour_stats(min_rating: f64) -> Pipeline {
    Pipeline::new()
        .stage(Stage::Match(
            FilterSet::new().and(FilterExpr::gte("ratingsAverage", json!(min_rating))),
        ))
        .stage(Stage::Group {
            key: GroupKey::ToUpper("difficulty".into()),
            accumulators: vec![
                ("numTours".into(), Accumulator::Sum(1)),
                ("numRatings".into(), Accumulator::SumField("ratingsQuantity".into())),
                ("avgRating".into(), Accumulator::Avg("ratingsAverage".into())),
                ("avgPrice".into(), Accumulator::Avg("price".into())),
                ("minPrice".into(), Accumulator::Min("price".into())),
                ("maxPrice".into(), Accumulator::Max("price".into())),
            ],
        })
        .stage(Stage::Sort(vec![SortKey::ascending("avgPrice")]))
}

/// Which start dates of the requested year the monthly plan considers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonthlyPlanRange {
    /// Every start date up to and including `<year>-12-31T00:00:00Z`,
    /// earlier years included
    #[default]
    UpperBoundOnly,
    /// Start dates from `<year>-01-01T00:00:00Z` to `<year>-12-31T00:00:00Z`
    FullYear,
}

/// Tour starts per calendar month, busiest month first, at most twelve rows.
///
/// Returns `None` when `year` is outside the representable calendar.
pub fn monthly_plan(year: i32, range: MonthlyPlanRange) -> Option<Pipeline> {
    let last_day = midnight(year, 12, 31)?;
    let mut bounds = FilterSet::new();
    if range == MonthlyPlanRange::FullYear {
        bounds = bounds.and(FilterExpr::gte("startDates", midnight(year, 1, 1)?));
    }
    bounds = bounds.and(FilterExpr::lte("startDates", last_day));

    Some(
        Pipeline::new()
            .stage(Stage::Unwind("startDates".into()))
            .stage(Stage::Match(bounds))
            .stage(Stage::Group {
                key: GroupKey::Month("startDates".into()),
                accumulators: vec![
                    ("numTourStarts".into(), Accumulator::Sum(1)),
                    ("tours".into(), Accumulator::Push("name".into())),
                ],
            })
            .stage(Stage::AddFields(vec![(
                "month".into(),
                Expr::Field(ID_FIELD.into()),
            )]))
            .stage(Stage::Project(Projection::exclude([ID_FIELD])))
            .stage(Stage::Sort(vec![SortKey::descending("numTourStarts")]))
            .stage(Stage::Limit(MONTHS_PER_PLAN)),
    )
}

fn midnight(year: i32, month: u32, day: u32) -> Option<Value> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let naive = date.and_hms_opt(0, 0, 0)?;
    Some(timestamp_value(Utc.from_utc_datetime(&naive)))
}
