use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Stake validation failures. Returned as values, not errors — the caller
/// renders them as a rejection message, never a 5xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BetRejection {
    #[error("market closed: match is no longer open for betting")]
    MarketClosed,

    #[error("duplicate bet: one wager per user per match")]
    DuplicateBet,

    #[error("invalid amount: stake must be positive")]
    InvalidAmount,

    #[error("insufficient balance for this stake")]
    InsufficientBalance,
}

impl BetRejection {
    pub fn code(&self) -> &'static str {
        match self {
            BetRejection::MarketClosed => "MarketClosed",
            BetRejection::DuplicateBet => "DuplicateBet",
            BetRejection::InvalidAmount => "InvalidAmount",
            BetRejection::InsufficientBalance => "InsufficientBalance",
        }
    }
}

/// Why odds could not be produced for a match right now. All variants are
/// recoverable — the UI shows "odds unavailable" and a later refresh may
/// succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OddsUnavailable {
    #[error("upstream odds provider unavailable")]
    UpstreamUnavailable,

    #[error("no odds-provider event matched this fixture")]
    NoMatchingEvent,

    #[error("bookmaker does not carry the full three-way market")]
    IncompleteMarket,
}

impl OddsUnavailable {
    pub fn code(&self) -> &'static str {
        match self {
            OddsUnavailable::UpstreamUnavailable => "UpstreamUnavailable",
            OddsUnavailable::NoMatchingEvent => "NoMatchingEvent",
            OddsUnavailable::IncompleteMarket => "IncompleteMarket",
        }
    }
}
