//! Field types of the tours collection

use crate::query::{FieldKind, FieldTypes};

/// Name of the tours collection
pub const TOURS_COLLECTION: &str = "tours";

/// Fields backed by a unique index
pub const UNIQUE_FIELDS: [&str; 1] = ["name"];

/// Fields left out of list results unless asked for
pub const HIDDEN_FIELDS: [&str; 1] = ["createdAt"];

/// Type information for tour documents
#[derive(Debug, Clone, Copy, Default)]
pub struct TourSchema;

/// Shared schema instance handed to the query builder
pub static TOUR_SCHEMA: TourSchema = TourSchema;

impl FieldTypes for TourSchema {
    fn kind_of(&self, path: &str) -> Option<FieldKind> {
        let kind = match path {
            "_id" => FieldKind::Id,
            "name" | "difficulty" | "summary" | "description" | "imageCover" | "images" => {
                FieldKind::String
            }
            "duration" | "maxGroupSize" | "ratingsAverage" | "ratingsQuantity" | "price"
            | "priceDiscount" | "__v" => FieldKind::Number,
            "createdAt" | "startDates" => FieldKind::Date,
            _ => return None,
        };
        Some(kind)
    }

    fn hidden_fields(&self) -> &[&'static str] {
        &HIDDEN_FIELDS
    }
}
