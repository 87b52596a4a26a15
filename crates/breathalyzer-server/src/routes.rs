use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use breathalyzer_core::{
    BacInput, CooldownStatus, LeaderboardEntry, Page, SessionHandle, StationStatus,
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InitializeSessionRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitBacRequest {
    pub bac: BacInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitBacResponse {
    pub status: String,
    pub name: String,
    pub bac: f64,
    pub rank: usize,
    pub timestamp: DateTime<Utc>,
}

impl From<LeaderboardEntry> for SubmitBacResponse {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            status: "success".to_string(),
            name: entry.name,
            bac: entry.bac,
            rank: entry.rank,
            timestamp: entry.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// Rows shown by the kiosk's top list when `n` is not given.
pub const DEFAULT_TOP_N: usize = 20;

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub n: Option<usize>,
}

/// Polled by the frontend before showing the name form.
pub async fn can_cache_handler(
    State(state): State<AppState>,
) -> Result<Json<CooldownStatus>, AppError> {
    let status = state.blocking(|station| station.cooldown(Utc::now())).await?;
    Ok(Json(status))
}

pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<StationStatus>, AppError> {
    let status = state.blocking(|station| station.status(Utc::now())).await?;
    Ok(Json(status))
}

pub async fn initialize_session_handler(
    State(state): State<AppState>,
    payload: Result<Json<InitializeSessionRequest>, JsonRejection>,
) -> Result<Json<SessionHandle>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::MalformedPayload(e.body_text()))?;
    let handle = state
        .blocking(move |station| station.start_session(&request.name, Utc::now()))
        .await?;
    Ok(Json(handle))
}

/// Polled by the sensor. Plain text so the device can compare bytes.
pub async fn should_start_blow_handler(State(state): State<AppState>) -> Response {
    let answer = if state.station.should_start(Utc::now()) {
        "TRUE"
    } else {
        "FALSE"
    };
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain"), (CACHE_CONTROL, "no-store")],
        answer,
    )
        .into_response()
}

pub async fn submit_bac_handler(
    State(state): State<AppState>,
    payload: Result<Json<SubmitBacRequest>, JsonRejection>,
) -> Result<Json<SubmitBacResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::MalformedPayload(e.body_text()))?;
    let entry = state
        .blocking(move |station| station.submit(&request.bac, Utc::now()))
        .await?;
    Ok(Json(entry.into()))
}

pub async fn most_recent_handler(State(state): State<AppState>) -> Response {
    match state.station.most_recent() {
        Some(entry) => (StatusCode::OK, Json(entry)).into_response(),
        None => {
            let body = json!({ "message": "No recent blows" });
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

pub async fn leaderboard_handler(
    State(state): State<AppState>,
    params: Result<Query<LeaderboardParams>, QueryRejection>,
) -> Result<Json<Page>, AppError> {
    let Query(params) =
        params.map_err(|_| AppError::MalformedPayload("bad offset/limit".to_string()))?;
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT as i64);

    let page = state
        .blocking(move |station| station.page(offset, limit))
        .await?;
    Ok(Json(page))
}

/// Top rows with live ranks; `n` is clamped into `1..=MAX_PAGE_LIMIT`.
pub async fn top_handler(
    State(state): State<AppState>,
    params: Result<Query<TopParams>, QueryRejection>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let Query(params) = params.map_err(|_| AppError::MalformedPayload("bad n".to_string()))?;
    let n = params.n.unwrap_or(DEFAULT_TOP_N).clamp(1, MAX_PAGE_LIMIT);

    let rows = state.blocking(move |station| station.top_n(n)).await?;
    Ok(Json(rows))
}
