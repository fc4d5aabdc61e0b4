use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::RequestId;
use crate::models::{format_confidence, HotelName, Reason, Recommendation, UserId};
use crate::services::{
    recommendations::{EngineStats, DEFAULT_RECOMMENDATION_COUNT, DEFAULT_TOP_HOTEL_COUNT},
    EngineSnapshot,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct CountQuery {
    pub n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationItem {
    pub rank: usize,
    pub hotel: HotelName,
    pub confidence: f64,
    pub confidence_display: String,
    pub reason: Reason,
    pub reason_text: &'static str,
}

impl RecommendationItem {
    fn ranked(rank: usize, recommendation: Recommendation) -> Self {
        Self {
            rank,
            hotel: recommendation.hotel_name,
            confidence: recommendation.confidence,
            confidence_display: format_confidence(recommendation.confidence),
            reason: recommendation.reason,
            reason_text: recommendation.reason.description(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub user_code: UserId,
    pub recommendations: Vec<RecommendationItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TopHotelItem {
    pub hotel: HotelName,
    pub total_spend: f64,
}

#[derive(Debug, Serialize)]
pub struct EngineStatusResponse {
    #[serde(flatten)]
    pub stats: EngineStats,
    pub known_users: usize,
    pub built_at: DateTime<Utc>,
}

impl From<&EngineSnapshot> for EngineStatusResponse {
    fn from(snapshot: &EngineSnapshot) -> Self {
        Self {
            stats: snapshot.engine.stats(),
            known_users: snapshot.known_users.len(),
            built_at: snapshot.built_at,
        }
    }
}

// Validation

/// Parses raw user input into a user code
pub fn parse_user_code(raw: &str) -> AppResult<UserId> {
    raw.trim()
        .parse::<i64>()
        .map(UserId)
        .map_err(|_| AppError::InvalidInput("Please enter a valid numeric user code".to_string()))
}

fn resolve_user(snapshot: &EngineSnapshot, raw: &str) -> AppResult<UserId> {
    let user = parse_user_code(raw)?;
    if !snapshot.is_known_user(user) {
        return Err(AppError::NotFound(
            "Invalid user code. Please enter a valid user code".to_string(),
        ));
    }
    Ok(user)
}

fn requested_count(query: &CountQuery, default: usize) -> AppResult<usize> {
    match query.n {
        Some(0) => Err(AppError::InvalidInput("n must be at least 1".to_string())),
        Some(n) => Ok(n),
        None => Ok(default),
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Ranked hotel recommendations for one user
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_code): Path<String>,
    Query(query): Query<CountQuery>,
) -> AppResult<Json<RecommendationsResponse>> {
    let n = requested_count(&query, DEFAULT_RECOMMENDATION_COUNT)?;
    let snapshot = state.snapshot().await;
    let user = resolve_user(&snapshot, &user_code)?;

    let recommendations: Vec<RecommendationItem> = snapshot
        .engine
        .get_recommendations(user, n)
        .into_iter()
        .enumerate()
        .map(|(i, rec)| RecommendationItem::ranked(i + 1, rec))
        .collect();

    tracing::info!(
        request_id = %request_id,
        user = %user,
        requested = n,
        returned = recommendations.len(),
        "Recommendations served"
    );

    let message = recommendations
        .is_empty()
        .then(|| "No recommendations found for this user.".to_string());

    Ok(Json(RecommendationsResponse {
        user_code: user,
        recommendations,
        message,
    }))
}

/// A user's highest-spend hotels
pub async fn get_top_hotels(
    State(state): State<AppState>,
    Path(user_code): Path<String>,
    Query(query): Query<CountQuery>,
) -> AppResult<Json<Vec<TopHotelItem>>> {
    let n = requested_count(&query, DEFAULT_TOP_HOTEL_COUNT)?;
    let snapshot = state.snapshot().await;
    let user = resolve_user(&snapshot, &user_code)?;

    let hotels = snapshot
        .engine
        .get_user_top_hotels(user, n)
        .into_iter()
        .map(|(hotel, total_spend)| TopHotelItem { hotel, total_spend })
        .collect();

    Ok(Json(hotels))
}

/// Size and age of the snapshot currently serving requests
pub async fn engine_status(State(state): State<AppState>) -> Json<EngineStatusResponse> {
    let snapshot = state.snapshot().await;
    Json(EngineStatusResponse::from(snapshot.as_ref()))
}

/// Reloads stay records and swaps in a freshly built engine
pub async fn refresh_engine(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<EngineStatusResponse>> {
    tracing::info!(request_id = %request_id, "Engine refresh requested");

    let snapshot = state.refresh().await.inspect_err(|e| {
        tracing::error!(request_id = %request_id, error = %e, "Engine refresh failed");
    })?;

    Ok(Json(EngineStatusResponse::from(snapshot.as_ref())))
}
