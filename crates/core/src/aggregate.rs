use crate::domain::survey::SurveyRecord;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Per-day totals for one calendar date.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBucket {
    pub count: u64,
    #[serde(serialize_with = "serialize_total")]
    pub total_rating: f64,
    pub avg_rating: String,
}

/// Buckets keyed by `YYYY-MM-DD`, in order of first appearance.
///
/// Serializes as a plain JSON object so callers can embed it directly in a
/// response body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyRollup {
    days: Vec<(String, DailyBucket)>,
    total_count: usize,
}

impl DailyRollup {
    pub fn get(&self, date: &str) -> Option<&DailyBucket> {
        self.days
            .iter()
            .find(|(d, _)| d == date)
            .map(|(_, bucket)| bucket)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DailyBucket)> {
        self.days.iter().map(|(d, b)| (d.as_str(), b))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Number of records that went into the rollup.
    pub fn total_count(&self) -> usize {
        self.total_count
    }
}

impl Serialize for DailyRollup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for (date, bucket) in &self.days {
            map.serialize_entry(date, bucket)?;
        }
        map.end()
    }
}

/// Largest magnitude at which every integer is exactly representable in an f64.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Whole-number totals are written as JSON integers (`6`, not `6.0`).
fn serialize_total<S: Serializer>(total: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if total.is_finite() && total.fract() == 0.0 && total.abs() <= MAX_EXACT_INT {
        serializer.serialize_i64(*total as i64)
    } else {
        serializer.serialize_f64(*total)
    }
}

/// Groups records by the day prefix of `created_at`.
pub fn aggregate_by_day(records: &[SurveyRecord]) -> DailyRollup {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut sums: Vec<(&str, u64, f64)> = Vec::new();

    for record in records {
        let date = record.day_key();
        let slot = *index.entry(date).or_insert_with(|| {
            sums.push((date, 0, 0.0));
            sums.len() - 1
        });
        let (_, count, total) = &mut sums[slot];
        *count += 1;
        *total += record.rating_value();
    }

    let days = sums
        .into_iter()
        .map(|(date, count, total_rating)| {
            let bucket = DailyBucket {
                count,
                total_rating,
                avg_rating: format_rating(total_rating / count as f64),
            };
            (date.to_string(), bucket)
        })
        .collect();

    DailyRollup {
        days,
        total_count: records.len(),
    }
}

/// Mean of `ratings` rounded to two decimals; `0` when there is nothing to average.
pub fn average(ratings: &[f64]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    round2(ratings.iter().sum::<f64>() / ratings.len() as f64)
}

/// Rounds half away from zero at the second decimal of the binary value.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_rating(value: f64) -> String {
    format!("{:.2}", round2(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(created_at: &str, rating: serde_json::Value) -> SurveyRecord {
        serde_json::from_value(json!({"created_at": created_at, "rating": rating})).unwrap()
    }

    #[test]
    fn groups_by_day_prefix() {
        let records = vec![
            record("2024-01-01T10:00:00Z", json!(4)),
            record("2024-01-01T12:00:00Z", json!(2)),
            record("2024-01-02T09:00:00Z", json!(5)),
        ];

        let rollup = aggregate_by_day(&records);
        assert_eq!(rollup.total_count(), 3);
        assert_eq!(rollup.len(), 2);
        assert_eq!(
            rollup.get("2024-01-01"),
            Some(&DailyBucket {
                count: 2,
                total_rating: 6.0,
                avg_rating: "3.00".to_string(),
            })
        );
        assert_eq!(
            rollup.get("2024-01-02"),
            Some(&DailyBucket {
                count: 1,
                total_rating: 5.0,
                avg_rating: "5.00".to_string(),
            })
        );

        assert_eq!(
            serde_json::to_value(&rollup).unwrap(),
            json!({
                "2024-01-01": {"count": 2, "totalRating": 6, "avgRating": "3.00"},
                "2024-01-02": {"count": 1, "totalRating": 5, "avgRating": "5.00"},
            })
        );
        assert_eq!(
            serde_json::to_string(&rollup).unwrap(),
            r#"{"2024-01-01":{"count":2,"totalRating":6,"avgRating":"3.00"},"2024-01-02":{"count":1,"totalRating":5,"avgRating":"5.00"}}"#
        );
    }

    #[test]
    fn fractional_totals_stay_floats() {
        let records = vec![
            record("2024-01-01T10:00:00Z", json!(2.5)),
            record("2024-01-01T11:00:00Z", json!(-1)),
        ];
        let body = serde_json::to_value(aggregate_by_day(&records)).unwrap();
        assert_eq!(body["2024-01-01"]["totalRating"], json!(1.5));
        assert_eq!(body["2024-01-01"]["avgRating"], "0.75");
    }

    #[test]
    fn same_day_records_share_one_bucket() {
        let ratings = [1, 2, 3, 4, 5, 5, 4];
        let records: Vec<_> = ratings
            .iter()
            .enumerate()
            .map(|(i, r)| record(&format!("2024-03-09T{:02}:00:00Z", i), json!(r)))
            .collect();

        let rollup = aggregate_by_day(&records);
        assert_eq!(rollup.len(), 1);
        let bucket = rollup.get("2024-03-09").unwrap();
        assert_eq!(bucket.count, ratings.len() as u64);
        assert_eq!(bucket.total_rating, 24.0);
        assert_eq!(bucket.avg_rating, "3.43");
    }

    #[test]
    fn empty_input_yields_empty_rollup() {
        let rollup = aggregate_by_day(&[]);
        assert!(rollup.is_empty());
        assert_eq!(rollup.total_count(), 0);
        assert_eq!(serde_json::to_string(&rollup).unwrap(), "{}");
    }

    #[test]
    fn keeps_first_appearance_order() {
        let records = vec![
            record("2024-01-03T00:00:00Z", json!(1)),
            record("2024-01-01T00:00:00Z", json!(1)),
            record("2024-01-03T05:00:00Z", json!(3)),
            record("2024-01-02T00:00:00Z", json!(1)),
        ];

        let rollup = aggregate_by_day(&records);
        let dates: Vec<_> = rollup.iter().map(|(d, _)| d).collect();
        assert_eq!(dates, ["2024-01-03", "2024-01-01", "2024-01-02"]);
        assert_eq!(rollup.get("2024-01-03").unwrap().count, 2);

        let body = serde_json::to_string(&rollup).unwrap();
        let first = body.find("2024-01-03").unwrap();
        let second = body.find("2024-01-01").unwrap();
        assert!(first < second);
    }

    #[test]
    fn missing_rating_poisons_its_day_only() {
        let records = vec![
            record("2024-01-01T10:00:00Z", json!(null)),
            record("2024-01-01T11:00:00Z", json!(3)),
            record("2024-01-02T11:00:00Z", json!(3)),
        ];

        let rollup = aggregate_by_day(&records);
        let poisoned = rollup.get("2024-01-01").unwrap();
        assert_eq!(poisoned.count, 2);
        assert!(poisoned.total_rating.is_nan());
        assert_eq!(poisoned.avg_rating, "NaN");
        assert_eq!(rollup.get("2024-01-02").unwrap().avg_rating, "3.00");

        let body = serde_json::to_value(&rollup).unwrap();
        assert_eq!(body["2024-01-01"]["totalRating"], json!(null));
    }

    #[test]
    fn average_of_nothing_is_zero() {
        assert_eq!(average(&[]), 0.0);
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        assert_eq!(average(&[5.0, 3.0]), 4.0);
        assert_eq!(average(&[1.0, 2.0, 2.0]), 1.67);
        assert_eq!(average(&[4.0, 5.0, 5.0]), 4.67);
    }

    #[test]
    fn exact_ties_round_away_from_zero() {
        // 17 / 8 == 2.125 exactly
        assert_eq!(format_rating(17.0 / 8.0), "2.13");
        assert_eq!(format_rating(1.0 / 8.0), "0.13");
        assert_eq!(format_rating(4.0), "4.00");
    }
}
