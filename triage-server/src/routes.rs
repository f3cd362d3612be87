use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::error;

use triage_core::analyzer::Analyzer;
use triage_core::error::AnalyzeError;
use triage_core::incident::{sample_response, AnalysisResponse};
use triage_core::profile::ProfileStore;
use triage_core::transport::AlertQuery;

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<Analyzer>,
    profiles: ProfileStore,
}

/// All upstream calls happen server-side, so browsers only ever talk to this
/// origin; the permissive CORS layer and fixed timeout cover the rest of the
/// old forwarding-proxy contract.
pub fn router(analyzer: Analyzer, profiles: ProfileStore) -> Router {
    let state = AppState {
        analyzer: Arc::new(analyzer),
        profiles,
    };

    Router::new()
        .route("/api/analyze", post(handle_analyze))
        .route("/api/profile", get(handle_profile_get))
        .route("/api/profile", put(handle_profile_put))
        .route("/api/profile", delete(handle_profile_delete))
        .route("/api/banner", get(handle_banner_get))
        .route("/api/banner/dismiss", post(handle_banner_dismiss))
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub count: Option<u32>,
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default)]
    pub use_sample: bool,
}

/// Dialog rules for the analysis parameters; the pipeline itself does not
/// enforce them.
pub fn validate_request(request: &AnalyzeRequest) -> Result<(), &'static str> {
    if request.count == Some(0) {
        return Err("'count' must be a positive integer");
    }
    if request.from.is_some() && request.to.is_none() {
        return Err("'to' is required whenever 'from' is provided");
    }
    Ok(())
}

async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, (StatusCode, Json<serde_json::Value>)> {
    if let Err(message) = validate_request(&request) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": message })),
        ));
    }

    if request.use_sample {
        return Ok(Json(sample_response()));
    }

    let query = AlertQuery {
        count: request.count,
        from: request.from,
        to: request.to,
    };

    match state.analyzer.analyze(&query).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            error!(%err, "analysis run failed");
            Err((
                error_status(&err),
                Json(json!({ "error": err.user_message() })),
            ))
        }
    }
}

fn error_status(err: &AnalyzeError) -> StatusCode {
    match err {
        AnalyzeError::MalformedResponse { .. }
        | AnalyzeError::Transport { .. }
        | AnalyzeError::Http { .. }
        | AnalyzeError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        AnalyzeError::ClassificationUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct BannerResponse {
    pub dismissed: bool,
}

async fn handle_profile_get(
    State(state): State<AppState>,
) -> Result<Json<triage_core::profile::UserProfile>, StatusCode> {
    match state.profiles.load() {
        Ok(Some(profile)) => Ok(Json(profile)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn handle_profile_put(
    State(state): State<AppState>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<triage_core::profile::UserProfile>, StatusCode> {
    if request.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    state
        .profiles
        .save(&request.name, &request.email)
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn handle_profile_delete(State(state): State<AppState>) -> StatusCode {
    match state.profiles.clear() {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn handle_banner_get(
    State(state): State<AppState>,
) -> Result<Json<BannerResponse>, StatusCode> {
    state
        .profiles
        .banner_dismissed()
        .map(|dismissed| Json(BannerResponse { dismissed }))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn handle_banner_dismiss(State(state): State<AppState>) -> StatusCode {
    match state.profiles.set_banner_dismissed(true) {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
