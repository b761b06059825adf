use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Any failure while serving a request. Always rendered as a 500.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        sentry_anyhow::capture_anyhow(&self.0);
        tracing::error!(error = %format!("{:#}", self.0), "request failed");

        // the client sees the store's own message, not our context chain
        let mut error = self.0.root_cause().to_string();
        if error.trim().is_empty() {
            error = "store query failed".to_string();
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                success: false,
                error,
            }),
        )
            .into_response()
    }
}
