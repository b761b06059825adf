use crate::domain::survey::{present, rating_value, SurveyRecord};
use crate::storage::{Query, Store};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const CREATED_AT: &str = "created_at";

/// Read-only queries against the surveys table.
#[derive(Clone)]
pub struct SurveyRepository {
    store: Arc<dyn Store>,
    table: String,
}

#[derive(Debug, Deserialize)]
struct RatingRow {
    #[serde(default, deserialize_with = "present")]
    rating: Option<Value>,
}

impl SurveyRepository {
    pub fn new(store: Arc<dyn Store>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    pub fn store_name(&self) -> &'static str {
        self.store.store_name()
    }

    /// Exact number of rows in the table. A store that omits the count yields 0.
    pub async fn count(&self) -> anyhow::Result<u64> {
        let query = Query::from(&self.table).count_exact().head();
        let res = self
            .store
            .execute(&query)
            .await
            .with_context(|| format!("count {} failed", self.table))?;
        Ok(res.count.unwrap_or(0))
    }

    /// Newest `limit` rows, newest first.
    pub async fn recent(&self, limit: usize) -> anyhow::Result<Vec<SurveyRecord>> {
        let query = Query::from(&self.table)
            .order(CREATED_AT, false)
            .limit(limit);
        let mut records = self.fetch_records(&query).await?;
        records.truncate(limit);
        Ok(records)
    }

    /// Every rating in the table, as floats (NaN where it is null or not a number).
    pub async fn ratings(&self) -> anyhow::Result<Vec<f64>> {
        let query = Query::from(&self.table).select("rating");
        let res = self
            .store
            .execute(&query)
            .await
            .with_context(|| format!("select ratings from {} failed", self.table))?;

        let rows = serde_json::from_value::<Vec<RatingRow>>(Value::Array(res.data))
            .context("failed to decode rating rows")?;
        Ok(rows.iter().map(|r| rating_value(r.rating.as_ref())).collect())
    }

    /// Rows created at or after `since`, oldest first.
    pub async fn since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<SurveyRecord>> {
        let query = Query::from(&self.table)
            .select("created_at,rating")
            .gte(CREATED_AT, since.to_rfc3339_opts(SecondsFormat::Millis, true))
            .order(CREATED_AT, true);
        self.fetch_records(&query).await
    }

    async fn fetch_records(&self, query: &Query) -> anyhow::Result<Vec<SurveyRecord>> {
        let res = self
            .store
            .execute(query)
            .await
            .with_context(|| format!("select from {} failed", self.table))?;

        serde_json::from_value::<Vec<SurveyRecord>>(Value::Array(res.data))
            .context("failed to decode survey rows")
    }
}
