use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Number of leading characters of `created_at` that form the calendar day.
const DAY_PREFIX_LEN: usize = 10;

/// One row of the `surveys` table.
///
/// Only `created_at` and `rating` are interpreted; every other column is kept
/// in `extra` and written back unchanged when the record is serialized.
/// `rating` is `None` only when the column is absent, so an explicit `null` or
/// a non-numeric value survives the round trip as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRecord {
    #[serde(alias = "createdAt")]
    pub created_at: String,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Distinguishes `"rating": null` (`Some(Null)`) from a missing column (`None`).
pub(crate) fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

impl SurveyRecord {
    /// `YYYY-MM-DD` portion of the timestamp, or the whole string if it is shorter.
    pub fn day_key(&self) -> &str {
        match self.created_at.char_indices().nth(DAY_PREFIX_LEN) {
            Some((idx, _)) => &self.created_at[..idx],
            None => &self.created_at,
        }
    }

    pub fn rating_value(&self) -> f64 {
        rating_value(self.rating.as_ref())
    }
}

/// Rating as a float; a missing or non-numeric rating is NaN so it poisons any
/// sum it joins.
pub fn rating_value(rating: Option<&Value>) -> f64 {
    rating.and_then(Value::as_f64).unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_unknown_columns_on_round_trip() {
        let row = json!({
            "id": 7,
            "created_at": "2024-01-01T10:00:00.123+00:00",
            "rating": 4,
            "comment": "great",
        });

        let record: SurveyRecord = serde_json::from_value(row.clone()).unwrap();
        assert_eq!(record.day_key(), "2024-01-01");
        assert_eq!(record.rating_value(), 4.0);
        assert_eq!(record.extra.get("comment"), Some(&json!("great")));

        // integer ratings stay integers
        assert_eq!(serde_json::to_value(&record).unwrap(), row);
    }

    #[test]
    fn accepts_camel_case_timestamp() {
        let record: SurveyRecord =
            serde_json::from_value(json!({"createdAt": "2024-02-03T00:00:00Z", "rating": 2.5}))
                .unwrap();
        assert_eq!(record.created_at, "2024-02-03T00:00:00Z");
        assert_eq!(record.rating_value(), 2.5);
    }

    #[test]
    fn missing_rating_is_nan() {
        let record: SurveyRecord =
            serde_json::from_value(json!({"created_at": "2024-01-01T00:00:00Z"})).unwrap();
        assert!(record.rating.is_none());
        assert!(record.rating_value().is_nan());

        let record: SurveyRecord =
            serde_json::from_value(json!({"created_at": "2024-01-01T00:00:00Z", "rating": null}))
                .unwrap();
        assert_eq!(record.rating, Some(Value::Null));
        assert!(record.rating_value().is_nan());
    }

    #[test]
    fn short_timestamp_is_used_whole() {
        let record: SurveyRecord =
            serde_json::from_value(json!({"created_at": "2024-01", "rating": 1})).unwrap();
        assert_eq!(record.day_key(), "2024-01");
    }

    #[test]
    fn passes_through_odd_rating_shapes() {
        let rows = [
            json!({"id": 1, "created_at": "2024-01-01T00:00:00Z", "note": "x"}),
            json!({"id": 2, "created_at": "2024-01-01T00:00:00Z", "rating": null}),
            json!({"id": 3, "created_at": "2024-01-01T00:00:00Z", "rating": "5"}),
        ];

        for row in rows {
            let record: SurveyRecord = serde_json::from_value(row.clone()).unwrap();
            assert!(record.rating_value().is_nan());
            assert_eq!(serde_json::to_value(&record).unwrap(), row);
        }
    }
}
