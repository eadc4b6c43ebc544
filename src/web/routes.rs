use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use crate::analysis::{AnalysisResult, AnalyzeError};
use super::state::AppState;

#[derive(Deserialize)]
pub struct AnalyzeParams {
    /// Video id or any YouTube URL pointing at it.
    pub video: String,
}

pub struct ApiError(AnalyzeError);

impl From<AnalyzeError> for ApiError {
    fn from(e: AnalyzeError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            AnalyzeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AnalyzeError::NotFound(_) => StatusCode::NOT_FOUND,
            AnalyzeError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AnalyzeError::ClassificationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Top-level message only; the source chain stays in the logs.
        let message = self.0.to_string();
        if status.is_server_error() {
            error!("Analysis failed: {:#}", anyhow::Error::new(self.0));
        } else {
            warn!("Analysis rejected: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub async fn analyze(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let result = state.analyzer.analyze(&params.video).await?;
    Ok(Json(result))
}

pub async fn health() -> &'static str {
    "ok"
}
