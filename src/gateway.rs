use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::config::{Config, FIXTURE_WINDOW_DAYS, UPSTREAM_TIMEOUT_SECS};
use crate::error::Result;
use crate::matcher::event_window;
use crate::types::{FixtureDto, FixturesPage, OddsEventDto, OddsFeedDto, StandingDto, StandingsPage};

/// Typed client over the two upstream data sources: the fixture/score
/// provider (X-Auth-Token header) and the odds provider (apiKey query param).
///
/// Every call is one best-effort GET with a bounded timeout and no retry.
/// Upstream failure degrades to an empty/None result — callers must treat
/// that as "try again later", not as "no data exists".
pub struct Gateway {
    client: reqwest::Client,
    cfg: Config,
}

impl Gateway {
    pub fn new(cfg: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, cfg })
    }

    /// Fixtures for [today, today + window_days]. Empty on upstream failure.
    pub async fn fetch_upcoming_fixtures(&self, window_days: Option<i64>) -> Vec<FixtureDto> {
        let days = window_days.unwrap_or(FIXTURE_WINDOW_DAYS);
        let from = Utc::now().date_naive();
        let to = from + ChronoDuration::days(days);
        let url = format!(
            "{}/competitions/{}/matches",
            self.cfg.football_api_url, self.cfg.competition
        );

        let result: Result<FixturesPage> = async {
            let resp = self
                .client
                .get(&url)
                .header("X-Auth-Token", &self.cfg.football_api_key)
                .query(&[
                    ("dateFrom", from.format("%Y-%m-%d").to_string()),
                    ("dateTo", to.format("%Y-%m-%d").to_string()),
                ])
                .send()
                .await?
                .error_for_status()?;
            Ok(resp.json::<FixturesPage>().await?)
        }
        .await;

        match result {
            Ok(page) => {
                debug!(fixtures = page.matches.len(), "fetched fixtures");
                page.matches
            }
            Err(e) => {
                warn!(error = %e, "UpstreamUnavailable: fixture provider fetch failed");
                Vec::new()
            }
        }
    }

    /// Current standings snapshot (first table). Empty on upstream failure.
    pub async fn fetch_standings(&self) -> Vec<StandingDto> {
        let url = format!(
            "{}/competitions/{}/standings",
            self.cfg.football_api_url, self.cfg.competition
        );

        let result: Result<StandingsPage> = async {
            let resp = self
                .client
                .get(&url)
                .header("X-Auth-Token", &self.cfg.football_api_key)
                .send()
                .await?
                .error_for_status()?;
            Ok(resp.json::<StandingsPage>().await?)
        }
        .await;

        match result {
            Ok(page) => page
                .standings
                .into_iter()
                .next()
                .map(|g| g.table)
                .unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "UpstreamUnavailable: standings fetch failed");
                Vec::new()
            }
        }
    }

    /// Odds-provider events inside the kickoff window. Empty on failure.
    pub async fn fetch_events(&self, kickoff: DateTime<Utc>) -> Vec<OddsEventDto> {
        let (from, to) = event_window(kickoff);
        let from_param = from.to_rfc3339_opts(SecondsFormat::Secs, true);
        let to_param = to.to_rfc3339_opts(SecondsFormat::Secs, true);
        let url = format!("{}/sports/{}/events", self.cfg.odds_api_url, self.cfg.sport_key);

        let result: Result<Vec<OddsEventDto>> = async {
            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("apiKey", self.cfg.odds_api_key.as_str()),
                    ("dateFormat", "iso"),
                    ("commenceTimeFrom", from_param.as_str()),
                    ("commenceTimeTo", to_param.as_str()),
                ])
                .send()
                .await?
                .error_for_status()?;
            Ok(resp.json::<Vec<OddsEventDto>>().await?)
        }
        .await;

        match result {
            Ok(events) => {
                debug!(events = events.len(), "fetched odds events");
                events
            }
            Err(e) => {
                warn!(error = %e, "UpstreamUnavailable: odds event fetch failed");
                Vec::new()
            }
        }
    }

    /// Full bookmaker/market/outcome feed for one event. None on failure.
    pub async fn fetch_event_odds(&self, event_id: &str) -> Option<OddsFeedDto> {
        let url = format!(
            "{}/sports/{}/events/{}/odds",
            self.cfg.odds_api_url, self.cfg.sport_key, event_id
        );

        let result: Result<OddsFeedDto> = async {
            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("apiKey", self.cfg.odds_api_key.as_str()),
                    ("regions", "us"),
                    ("markets", "h2h"),
                    ("oddsFormat", "decimal"),
                ])
                .send()
                .await?
                .error_for_status()?;
            Ok(resp.json::<OddsFeedDto>().await?)
        }
        .await;

        match result {
            Ok(feed) => Some(feed),
            Err(e) => {
                warn!(event_id, error = %e, "UpstreamUnavailable: event odds fetch failed");
                None
            }
        }
    }
}
