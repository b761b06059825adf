use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use survey_core::aggregate::{self, DailyRollup};
use survey_core::domain::survey::SurveyRecord;
use survey_core::storage::surveys::SurveyRepository;

use crate::error::ApiError;

const STATS_RECENT_LIMIT: usize = 10;
const DEFAULT_RECENT_LIMIT: usize = 20;
const DAILY_WINDOW_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AppState {
    pub surveys: SurveyRepository,
}

pub fn router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .route("/api/surveys/recent", get(recent_surveys))
        .route("/api/surveys/daily", get(daily_surveys))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: now_iso(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    success: bool,
    total_surveys: u64,
    average_rating: f64,
    recent_surveys: Vec<SurveyRecord>,
    last_updated: String,
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let (total_surveys, recent_surveys, ratings) = tokio::try_join!(
        state.surveys.count(),
        state.surveys.recent(STATS_RECENT_LIMIT),
        state.surveys.ratings(),
    )?;

    Ok(Json(StatsResponse {
        success: true,
        total_surveys,
        average_rating: aggregate::average(&ratings),
        recent_surveys,
        last_updated: now_iso(),
    }))
}

#[derive(Debug, Deserialize)]
struct RecentParams {
    limit: Option<String>,
}

#[derive(Debug, Serialize)]
struct RecentResponse {
    success: bool,
    surveys: Vec<SurveyRecord>,
    count: usize,
}

async fn recent_surveys(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<RecentResponse>, ApiError> {
    let limit = parse_limit(params.limit.as_deref());
    let surveys = state.surveys.recent(limit).await?;

    Ok(Json(RecentResponse {
        success: true,
        count: surveys.len(),
        surveys,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DailyResponse {
    success: bool,
    daily_data: DailyRollup,
    total_count: usize,
}

async fn daily_surveys(State(state): State<AppState>) -> Result<Json<DailyResponse>, ApiError> {
    let since = Utc::now() - chrono::Duration::days(DAILY_WINDOW_DAYS);
    let records = state.surveys.since(since).await?;
    let rollup = aggregate::aggregate_by_day(&records);

    Ok(Json(DailyResponse {
        success: true,
        total_count: rollup.total_count(),
        daily_data: rollup,
    }))
}

/// Leading integer of `raw`; anything missing, unparsable or not positive falls
/// back to the default. Values too large for `usize` saturate.
fn parse_limit(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_RECENT_LIMIT;
    };
    let s = raw.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    let digits = &digits[..end];
    if digits.is_empty() || negative {
        return DEFAULT_RECENT_LIMIT;
    }

    match digits.parse::<usize>() {
        Ok(0) => DEFAULT_RECENT_LIMIT,
        Ok(n) => n,
        // all ascii digits, so the only failure left is overflow
        Err(_) => usize::MAX,
    }
}
