use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Match lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    Cancelled,
    Postponed,
}

impl MatchStatus {
    /// Map a fixture-provider status code onto our lifecycle. Unknown codes
    /// degrade to `scheduled` so one malformed fixture never aborts a batch.
    pub fn from_provider(code: &str) -> Self {
        match code {
            "SCHEDULED" | "TIMED" => MatchStatus::Scheduled,
            "LIVE" | "IN_PLAY" | "IN_PROGRESS" | "PAUSED" => MatchStatus::Live,
            "FINISHED" => MatchStatus::Finished,
            "POSTPONED" => MatchStatus::Postponed,
            "SUSPENDED" | "CANCELLED" => MatchStatus::Cancelled,
            _ => MatchStatus::Scheduled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
            MatchStatus::Cancelled => "cancelled",
            MatchStatus::Postponed => "postponed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "live" => MatchStatus::Live,
            "finished" => MatchStatus::Finished,
            "cancelled" => MatchStatus::Cancelled,
            "postponed" => MatchStatus::Postponed,
            _ => MatchStatus::Scheduled,
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Bet outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetOutcome {
    HomeWin,
    AwayWin,
    Draw,
}

impl BetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetOutcome::HomeWin => "home_win",
            BetOutcome::AwayWin => "away_win",
            BetOutcome::Draw => "draw",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "home_win" => Some(BetOutcome::HomeWin),
            "away_win" => Some(BetOutcome::AwayWin),
            "draw" => Some(BetOutcome::Draw),
            _ => None,
        }
    }

    /// Derive the result of a finished match from its scores.
    pub fn from_scores(home: i64, away: i64) -> Self {
        if home > away {
            BetOutcome::HomeWin
        } else if home < away {
            BetOutcome::AwayWin
        } else {
            BetOutcome::Draw
        }
    }
}

impl std::fmt::Display for BetOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Normalized odds
// ---------------------------------------------------------------------------

/// The three-way (home/away/draw) decimal prices for one match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreeWayOdds {
    pub home_win: f64,
    pub away_win: f64,
    pub draw: f64,
}

impl ThreeWayOdds {
    pub fn price_for(&self, outcome: BetOutcome) -> f64 {
        match outcome {
            BetOutcome::HomeWin => self.home_win,
            BetOutcome::AwayWin => self.away_win,
            BetOutcome::Draw => self.draw,
        }
    }
}

/// One leg of a best-odds aggregate: the highest price seen for an outcome
/// and the bookmaker quoting it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestPrice {
    pub price: f64,
    pub bookmaker: String,
}

/// Best available cross-bookmaker prices for the three-way market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestOdds {
    pub home_win: BestPrice,
    pub away_win: BestPrice,
    pub draw: BestPrice,
    /// How many bookmakers carried the full three-way market.
    pub books_considered: usize,
}

/// Two-way arbitrage signal over the best home/away prices. Draw is excluded
/// from this calculation by design.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageReport {
    pub exists: bool,
    /// Combined implied probability as a percentage (e.g. 96.4 or 133.3).
    pub total_probability_pct: f64,
    /// Stake split for the notional bankroll; None when no arbitrage exists.
    pub home_stake: Option<f64>,
    pub away_stake: Option<f64>,
    pub guaranteed_profit: Option<f64>,
}

// ---------------------------------------------------------------------------
// Fixture provider DTOs (football-data.org v4 shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FixturesPage {
    #[serde(default)]
    pub matches: Vec<FixtureDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureDto {
    pub utc_date: String,
    pub status: String,
    #[serde(default)]
    pub matchday: Option<i64>,
    #[serde(default)]
    pub venue: Option<String>,
    pub home_team: TeamDto,
    pub away_team: TeamDto,
    #[serde(default)]
    pub score: ScoreDto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDto {
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub crest: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDto {
    #[serde(default)]
    pub full_time: FullTimeDto,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FullTimeDto {
    pub home: Option<i64>,
    pub away: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandingsPage {
    #[serde(default)]
    pub standings: Vec<StandingsGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandingsGroup {
    #[serde(default)]
    pub table: Vec<StandingDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingDto {
    pub position: i64,
    pub team: TeamDto,
    pub played_games: i64,
    pub won: i64,
    pub draw: i64,
    pub lost: i64,
    pub points: i64,
    pub goals_for: i64,
    pub goals_against: i64,
    pub goal_difference: i64,
}

// ---------------------------------------------------------------------------
// Odds provider DTOs (the-odds-api.com v4 shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OddsEventDto {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub commence_time: String,
}

/// Full odds feed for one event: the provider's own team labels are
/// authoritative when mapping h2h outcomes.
#[derive(Debug, Clone, Deserialize)]
pub struct OddsFeedDto {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<BookmakerDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookmakerDto {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub markets: Vec<MarketDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDto {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<OutcomeDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeDto {
    pub name: String,
    pub price: f64,
}
