//! Database row types used by sqlx for typed queries.

use serde::Serialize;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TeamRow {
    pub id: i64,
    pub name: String,
    pub short_name: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MatchRow {
    pub id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    /// Kickoff as RFC 3339 UTC.
    pub kickoff: String,
    pub venue: String,
    pub status: String,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub competition: String,
    pub matchweek: i64,
    pub odds_event_id: Option<String>,
}

/// Match joined with team names, for the API and the odds pipeline.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MatchDetailRow {
    pub id: i64,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: String,
    pub venue: String,
    pub status: String,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub competition: String,
    pub matchweek: i64,
    pub odds_event_id: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MatchOddsRow {
    pub match_id: i64,
    pub home_win: Option<f64>,
    pub away_win: Option<f64>,
    pub draw: Option<f64>,
    pub last_updated: String,
}

impl MatchOddsRow {
    /// All three legs present — the only state usable for staking/settlement.
    pub fn complete(&self) -> Option<crate::types::ThreeWayOdds> {
        Some(crate::types::ThreeWayOdds {
            home_win: self.home_win?,
            away_win: self.away_win?,
            draw: self.draw?,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct StandingRow {
    pub team: String,
    pub position: i64,
    pub played: i64,
    pub won: i64,
    pub draw: i64,
    pub lost: i64,
    pub goals_for: i64,
    pub goals_against: i64,
    pub goal_difference: i64,
    pub points: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BetRow {
    pub id: i64,
    pub user_id: String,
    pub match_id: i64,
    pub outcome: String,
    pub stake: f64,
    pub potential_winnings: f64,
    pub settled: bool,
    pub won: Option<bool>,
    pub created_at: String,
}
