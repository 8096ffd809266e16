//! Tour record

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Field holding the derived duration in weeks
pub const DURATION_WEEKS_FIELD: &str = "durationWeeks";

pub const DEFAULT_RATINGS_AVERAGE: f64 = 4.5;

/// Tour difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Difficult];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or(())
    }
}

/// A validated tour, without the store-assigned `_id` and `__v`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub name: String,
    pub duration: Number,
    pub max_group_size: Number,
    pub difficulty: Difficulty,
    pub ratings_average: Number,
    pub ratings_quantity: Number,
    pub price: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<Number>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp_list")]
    pub start_dates: Vec<DateTime<Utc>>,
}

impl Tour {
    /// Duration in weeks.
    pub fn duration_weeks(&self) -> Option<f64> {
        self.duration.as_f64().map(|d| d / 7.0)
    }

    /// Stored form of the tour.
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Adds `durationWeeks` to a stored tour document that carries `duration`.
pub fn with_duration_weeks(doc: Value) -> Value {
    let Value::Object(mut fields) = doc else {
        return doc;
    };
    let weeks = fields
        .get("duration")
        .and_then(Value::as_f64)
        .and_then(|d| Number::from_f64(d / 7.0));
    if let Some(weeks) = weeks {
        fields.insert(DURATION_WEEKS_FIELD.to_string(), Value::Number(weeks));
    }
    Value::Object(fields)
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::store::value::parse_timestamp;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid date '{}'", raw)))
    }
}

mod timestamp_list {
    use chrono::{DateTime, Utc};
    use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    use crate::store::value::parse_timestamp;

    pub fn serialize<S: Serializer>(list: &[DateTime<Utc>], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(list.len()))?;
        for ts in list {
            seq.serialize_element(&ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<DateTime<Utc>>, D::Error> {
        Vec::<String>::deserialize(d)?
            .into_iter()
            .map(|raw| {
                parse_timestamp(&raw)
                    .ok_or_else(|| de::Error::custom(format!("invalid date '{}'", raw)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn tour() -> Tour {
        Tour {
            name: "The Forest Hiker".into(),
            duration: 5.into(),
            max_group_size: 25.into(),
            difficulty: Difficulty::Easy,
            ratings_average: Number::from_f64(4.7).unwrap(),
            ratings_quantity: 37.into(),
            price: 397.into(),
            price_discount: None,
            summary: "Breathtaking hike through the Canadian Banff National Park".into(),
            description: None,
            image_cover: "tour-1-cover.jpg".into(),
            images: vec!["tour-1-1.jpg".into()],
            created_at: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            start_dates: vec![Utc.with_ymd_and_hms(2021, 4, 25, 9, 0, 0).unwrap()],
        }
    }

    #[test]
    fn test_document_shape() {
        let doc = tour().to_document();
        assert_eq!(doc["maxGroupSize"], 25);
        assert_eq!(doc["difficulty"], "easy");
        assert_eq!(doc["createdAt"], "2021-01-01T00:00:00.000Z");
        assert_eq!(doc["startDates"], json!(["2021-04-25T09:00:00.000Z"]));
        assert!(doc.get("priceDiscount").is_none());
        assert!(doc.get("description").is_none());
    }

    #[test]
    fn test_document_round_trips() {
        let original = tour();
        let back: Tour = serde_json::from_value(original.to_document()).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_duration_weeks() {
        let doc = with_duration_weeks(json!({"duration": 14}));
        assert_eq!(doc["durationWeeks"], 2.0);

        let doc = with_duration_weeks(json!({"name": "no duration"}));
        assert!(doc.get("durationWeeks").is_none());

        assert_eq!(tour().duration_weeks(), Some(5.0 / 7.0));
    }

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!("medium".parse::<Difficulty>(), Ok(Difficulty::Medium));
        assert!("extreme".parse::<Difficulty>().is_err());
        assert!("Easy".parse::<Difficulty>().is_err());
    }
}
