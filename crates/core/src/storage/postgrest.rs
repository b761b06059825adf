use crate::config::Settings;
use crate::storage::{Query, QueryResponse, Store};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_RANGE};
use serde_json::Value;
use std::time::Duration;

const REST_PATH: &str = "/rest/v1";

/// Store backed by a Supabase/PostgREST HTTP endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_supabase_url()?;
        let api_key = settings.require_supabase_service_role_key()?;
        Self::new(
            base_url,
            api_key,
            Duration::from_secs(settings.store_timeout_secs),
        )
    }

    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build store http client")?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, table: &str) -> String {
        format!("{}{REST_PATH}/{table}", self.base_url.trim_end_matches('/'))
    }

    fn headers(&self, query: &Query) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if query.count_exact {
            headers.insert("prefer", HeaderValue::from_static("count=exact"));
        }
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl Store for PostgrestStore {
    fn store_name(&self) -> &'static str {
        "postgrest"
    }

    async fn execute(&self, query: &Query) -> Result<QueryResponse> {
        let t0 = std::time::Instant::now();
        let url = self.url(&query.table);
        let headers = self.headers(query)?;

        let req = if query.head {
            self.http.head(url)
        } else {
            self.http.get(url)
        };
        let res = req
            .headers(headers)
            .query(&query.to_params())
            .send()
            .await
            .with_context(|| format!("store request for {} failed", query.table))?;

        let status = res.status();
        let count = res
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        let text = res
            .text()
            .await
            .context("failed to read store response")?;

        if !status.is_success() {
            anyhow::bail!(error_message(status, &text));
        }

        let data = if query.head {
            Vec::new()
        } else {
            serde_json::from_str::<Vec<Value>>(&text)
                .with_context(|| format!("store response is not a JSON array: {text}"))?
        };

        tracing::debug!(
            table = %query.table,
            rows = data.len(),
            ?count,
            elapsed_ms = t0.elapsed().as_millis(),
            "store query"
        );

        Ok(QueryResponse { data, count })
    }
}

/// Total from a `Content-Range` header such as `0-9/42` or `*/42`.
fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.trim().is_empty());

    match message {
        Some(m) => m,
        None if body.trim().is_empty() => format!("store HTTP {status}"),
        None => format!("store HTTP {status}: {body}"),
    }
}
