use crate::error::{AppError, Result};

pub const FOOTBALL_API_URL: &str = "https://api.football-data.org/v4";
pub const ODDS_API_URL: &str = "https://api.the-odds-api.com/v4";

/// Competition code used for fixture and standings queries.
pub const DEFAULT_COMPETITION: &str = "PL";

/// Odds-provider sport key for the same competition.
pub const DEFAULT_SPORT_KEY: &str = "soccer_epl";

/// Bookmaker whose h2h market feeds staking odds (single-bookmaker mode).
pub const DEFAULT_BOOKMAKER: &str = "fanduel";

/// How far ahead to ask the fixture provider for matches (days).
pub const FIXTURE_WINDOW_DAYS: i64 = 30;

/// Event lookup window around kickoff: [kickoff - 30min, kickoff + 60min].
/// Bounds false positives from same-named teams playing at other times.
pub const EVENT_WINDOW_BEFORE_MINS: i64 = 30;
pub const EVENT_WINDOW_AFTER_MINS: i64 = 60;

/// Upstream HTTP timeout (seconds). One best-effort attempt, no retry.
pub const UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Points granted to a user on first sighting.
pub const INITIAL_POINT_GRANT: f64 = 5.0;

/// Notional bankroll for the arbitrage stake-split calculation.
pub const ARB_BANKROLL: f64 = 1000.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub football_api_url: String,
    pub football_api_key: String,
    pub odds_api_url: String,
    pub odds_api_key: String,
    pub competition: String,
    pub sport_key: String,
    /// Bookmaker key for the nominated single-bookmaker market (BOOKMAKER).
    pub bookmaker: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            football_api_url: std::env::var("FOOTBALL_API_URL")
                .unwrap_or_else(|_| FOOTBALL_API_URL.to_string()),
            football_api_key: std::env::var("FOOTBALL_DATA_API_KEY")
                .map_err(|_| AppError::Config("FOOTBALL_DATA_API_KEY must be set".to_string()))?,
            odds_api_url: std::env::var("ODDS_API_URL")
                .unwrap_or_else(|_| ODDS_API_URL.to_string()),
            odds_api_key: std::env::var("ODDS_API_KEY")
                .map_err(|_| AppError::Config("ODDS_API_KEY must be set".to_string()))?,
            competition: std::env::var("COMPETITION")
                .unwrap_or_else(|_| DEFAULT_COMPETITION.to_string()),
            sport_key: std::env::var("SPORT_KEY")
                .unwrap_or_else(|_| DEFAULT_SPORT_KEY.to_string()),
            bookmaker: std::env::var("BOOKMAKER")
                .unwrap_or_else(|_| DEFAULT_BOOKMAKER.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "pitchbook.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
        })
    }
}
