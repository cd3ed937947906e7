//! Thin HTTP surface for the presentation layer. Routing/auth/templating
//! beyond these endpoints live outside this service.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ledger::{Ledger, PlaceBetResult};
use crate::odds::decimal_to_american;
use crate::service::FootballService;
use crate::types::{BetOutcome, ThreeWayOdds};

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<FootballService>,
    pub ledger: Ledger,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/matches", get(get_matches))
        .route("/matches/refresh", post(refresh_matches))
        .route("/matches/:id/odds", get(get_match_odds))
        .route("/matches/:id/market", get(get_market_report))
        .route("/matches/:id/settle", post(settle_match))
        .route("/standings", get(get_standings))
        .route("/standings/refresh", post(refresh_standings))
        .route("/bets", post(place_bet))
        .route("/users/:user/points", get(get_points))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request/response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PlaceBetRequest {
    pub user: String,
    pub match_id: i64,
    pub outcome: String,
    pub amount: f64,
}

#[derive(Serialize)]
pub struct AmericanOdds {
    pub home_win: Option<i64>,
    pub away_win: Option<i64>,
    pub draw: Option<i64>,
}

/// Three-way prices or an absence signal — "not found yet" is never an error.
#[derive(Serialize)]
pub struct OddsResponse {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odds: Option<ThreeWayOdds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub american: Option<AmericanOdds>,
}

#[derive(Serialize)]
pub struct BetRejectedResponse {
    pub accepted: bool,
    pub reason: &'static str,
    pub message: String,
}

#[derive(Serialize)]
pub struct PointsResponse {
    pub user: String,
    pub points: f64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_matches(State(state): State<ApiState>) -> Result<Response, AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let matches = state.service.repo().list_upcoming(&now).await?;
    Ok(Json(matches).into_response())
}

async fn refresh_matches(State(state): State<ApiState>) -> Result<Response, AppError> {
    let stats = state.service.update_matches().await?;
    Ok(Json(stats).into_response())
}

async fn get_match_odds(
    State(state): State<ApiState>,
    Path(match_id): Path<i64>,
) -> Result<Response, AppError> {
    let response = match state.service.get_odds_for_match(match_id).await? {
        Ok(odds) => OddsResponse {
            available: true,
            reason: None,
            american: Some(AmericanOdds {
                home_win: decimal_to_american(odds.home_win),
                away_win: decimal_to_american(odds.away_win),
                draw: decimal_to_american(odds.draw),
            }),
            odds: Some(odds),
        },
        Err(unavailable) => OddsResponse {
            available: false,
            reason: Some(unavailable.code()),
            odds: None,
            american: None,
        },
    };
    Ok(Json(response).into_response())
}

async fn get_market_report(
    State(state): State<ApiState>,
    Path(match_id): Path<i64>,
) -> Result<Response, AppError> {
    match state.service.market_report(match_id).await? {
        Ok(report) => Ok(Json(report).into_response()),
        Err(unavailable) => Ok(Json(serde_json::json!({
            "available": false,
            "reason": unavailable.code(),
        }))
        .into_response()),
    }
}

async fn settle_match(
    State(state): State<ApiState>,
    Path(match_id): Path<i64>,
) -> Result<Response, AppError> {
    let summary = state.ledger.settle_match(match_id).await?;
    Ok(Json(summary).into_response())
}

async fn get_standings(State(state): State<ApiState>) -> Result<Response, AppError> {
    let table = state.service.repo().standings().await?;
    Ok(Json(table).into_response())
}

async fn refresh_standings(State(state): State<ApiState>) -> Result<Response, AppError> {
    let rows = state.service.refresh_standings().await?;
    Ok(Json(serde_json::json!({ "rows": rows })).into_response())
}

async fn place_bet(
    State(state): State<ApiState>,
    Json(req): Json<PlaceBetRequest>,
) -> Result<Response, AppError> {
    let Some(outcome) = BetOutcome::parse(&req.outcome) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "accepted": false,
                "message": format!("unknown outcome {:?}", req.outcome),
            })),
        )
            .into_response());
    };

    match state
        .ledger
        .place_bet(&req.user, req.match_id, outcome, req.amount)
        .await?
    {
        PlaceBetResult::Placed(bet) => Ok(Json(serde_json::json!({
            "accepted": true,
            "bet": bet,
        }))
        .into_response()),
        PlaceBetResult::Rejected(rejection) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(BetRejectedResponse {
                accepted: false,
                reason: rejection.code(),
                message: rejection.to_string(),
            }),
        )
            .into_response()),
    }
}

async fn get_points(
    State(state): State<ApiState>,
    Path(user): Path<String>,
) -> Result<Response, AppError> {
    match state.ledger.balance(&user).await? {
        Some(points) => Ok(Json(PointsResponse { user, points }).into_response()),
        None => Err(AppError::NotFound(format!("user {user}"))),
    }
}
