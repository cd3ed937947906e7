//! Refresh orchestration: gateway → matcher → normalizer → repository.
//!
//! All refresh operations are explicit, on-demand calls — nothing here runs
//! on a timer or as a side effect of serving a page.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::repo::{MatchFields, Repo};
use crate::error::{AppError, OddsUnavailable, Result};
use crate::gateway::Gateway;
use crate::matcher::resolve_event_id;
use crate::odds::{best_three_way, extract_three_way, two_way_arbitrage};
use crate::types::{ArbitrageReport, BestOdds, FixtureDto, MatchStatus, ThreeWayOdds};

#[derive(Debug, Default, Serialize)]
pub struct RefreshStats {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Aggregate-mode market analytics for one match: best cross-bookmaker
/// prices plus the two-way arbitrage signal. Derived, never persisted.
#[derive(Debug, Serialize)]
pub struct MarketReport {
    pub match_id: i64,
    pub best_odds: BestOdds,
    pub arbitrage: ArbitrageReport,
}

pub struct FootballService {
    gateway: Gateway,
    repo: Repo,
    bookmaker: String,
}

impl FootballService {
    pub fn new(gateway: Gateway, repo: Repo, bookmaker: String) -> Self {
        Self { gateway, repo, bookmaker }
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    /// Pull upcoming fixtures and upsert teams + matches. A malformed
    /// fixture is logged and skipped; the rest of the batch continues.
    pub async fn update_matches(&self) -> Result<RefreshStats> {
        let fixtures = self.gateway.fetch_upcoming_fixtures(None).await;
        let mut stats = RefreshStats::default();

        for fixture in &fixtures {
            stats.processed += 1;
            match self.apply_fixture(fixture).await {
                Ok(true) => stats.created += 1,
                Ok(false) => stats.updated += 1,
                Err(e) => {
                    warn!(
                        home = %fixture.home_team.name,
                        away = %fixture.away_team.name,
                        error = %e,
                        "skipping malformed fixture"
                    );
                    stats.skipped += 1;
                }
            }
        }

        info!(
            processed = stats.processed,
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            "match refresh complete"
        );
        Ok(stats)
    }

    async fn apply_fixture(&self, fixture: &FixtureDto) -> Result<bool> {
        let kickoff = DateTime::parse_from_rfc3339(&fixture.utc_date)
            .map_err(|e| AppError::InvalidState(format!("bad utcDate {:?}: {e}", fixture.utc_date)))?
            .with_timezone(&Utc)
            .to_rfc3339();

        // A fixture without a matchday is malformed; reject it before
        // anything persists rather than inventing a matchweek.
        let matchweek = fixture
            .matchday
            .ok_or_else(|| AppError::InvalidState("fixture missing matchday".to_string()))?;

        let home_id = self
            .repo
            .upsert_team(
                &fixture.home_team.name,
                fixture.home_team.short_name.as_deref().unwrap_or(&fixture.home_team.name),
                fixture.home_team.crest.as_deref(),
            )
            .await?;
        let away_id = self
            .repo
            .upsert_team(
                &fixture.away_team.name,
                fixture.away_team.short_name.as_deref().unwrap_or(&fixture.away_team.name),
                fixture.away_team.crest.as_deref(),
            )
            .await?;

        let fields = MatchFields {
            venue: fixture.venue.clone().unwrap_or_default(),
            status: MatchStatus::from_provider(&fixture.status),
            home_score: fixture.score.full_time.home,
            away_score: fixture.score.full_time.away,
            competition: "Premier League".to_string(),
            matchweek,
        };

        let (_, created) = self.repo.upsert_match(home_id, away_id, &kickoff, &fields).await?;
        Ok(created)
    }

    /// Pull the standings table and replace the snapshot. Returns the number
    /// of rows in the new snapshot (0 when the upstream was unavailable).
    pub async fn refresh_standings(&self) -> Result<usize> {
        let table = self.gateway.fetch_standings().await;
        if table.is_empty() {
            return Ok(0);
        }

        let mut entries = Vec::with_capacity(table.len());
        for standing in table {
            let team_id = self
                .repo
                .upsert_team(
                    &standing.team.name,
                    standing.team.short_name.as_deref().unwrap_or(&standing.team.name),
                    standing.team.crest.as_deref(),
                )
                .await?;
            entries.push((team_id, standing));
        }

        let written = self.repo.replace_standings(&entries).await?;
        info!(rows = written, "standings snapshot replaced");
        Ok(written)
    }

    /// Resolve the odds-provider event for a match, reusing a previously
    /// recorded event id when one exists.
    async fn resolve_event(
        &self,
        match_id: i64,
    ) -> Result<std::result::Result<String, OddsUnavailable>> {
        let detail = self
            .repo
            .get_match_detail(match_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("match {match_id}")))?;

        if let Some(event_id) = detail.odds_event_id {
            return Ok(Ok(event_id));
        }

        let kickoff = DateTime::parse_from_rfc3339(&detail.kickoff)
            .map_err(|e| AppError::InvalidState(format!("bad kickoff {:?}: {e}", detail.kickoff)))?
            .with_timezone(&Utc);

        let events = self.gateway.fetch_events(kickoff).await;
        match resolve_event_id(&detail.home_team, &detail.away_team, &events) {
            Some(id) => Ok(Ok(id)),
            None => {
                warn!(
                    match_id,
                    home = %detail.home_team,
                    away = %detail.away_team,
                    candidates = events.len(),
                    "NoMatchingEvent: odds unavailable for now"
                );
                Ok(Err(OddsUnavailable::NoMatchingEvent))
            }
        }
    }

    /// Fetch, normalize, and store fresh odds for a match. The inner error
    /// is the recoverable "odds unavailable" signal; the outer one is
    /// infrastructure failure.
    pub async fn refresh_odds(
        &self,
        match_id: i64,
    ) -> Result<std::result::Result<ThreeWayOdds, OddsUnavailable>> {
        let event_id = match self.resolve_event(match_id).await? {
            Ok(id) => id,
            Err(unavailable) => return Ok(Err(unavailable)),
        };

        let Some(feed) = self.gateway.fetch_event_odds(&event_id).await else {
            return Ok(Err(OddsUnavailable::UpstreamUnavailable));
        };

        match extract_three_way(&feed, &self.bookmaker) {
            Ok(odds) => {
                self.repo.store_odds(match_id, &odds, Some(&event_id)).await?;
                info!(match_id, event_id = %event_id, "odds refreshed");
                Ok(Ok(odds))
            }
            Err(unavailable) => {
                warn!(match_id, bookmaker = %self.bookmaker, "IncompleteMarket: skipping bookmaker");
                Ok(Err(unavailable))
            }
        }
    }

    /// Stored odds when complete, otherwise one refresh attempt. Absence is
    /// a signal, not an error.
    pub async fn get_odds_for_match(
        &self,
        match_id: i64,
    ) -> Result<std::result::Result<ThreeWayOdds, OddsUnavailable>> {
        if let Some(stored) = self.repo.get_odds(match_id).await? {
            if let Some(odds) = stored.complete() {
                return Ok(Ok(odds));
            }
        }
        self.refresh_odds(match_id).await
    }

    /// Aggregate-mode analytics: best cross-bookmaker three-way prices and
    /// the two-way arbitrage check over the best home/away legs.
    pub async fn market_report(
        &self,
        match_id: i64,
    ) -> Result<std::result::Result<MarketReport, OddsUnavailable>> {
        let event_id = match self.resolve_event(match_id).await? {
            Ok(id) => id,
            Err(unavailable) => return Ok(Err(unavailable)),
        };

        let Some(feed) = self.gateway.fetch_event_odds(&event_id).await else {
            return Ok(Err(OddsUnavailable::UpstreamUnavailable));
        };

        let Some(best) = best_three_way(&feed) else {
            return Ok(Err(OddsUnavailable::IncompleteMarket));
        };

        let arbitrage = two_way_arbitrage(best.home_win.price, best.away_win.price);
        Ok(Ok(MarketReport { match_id, best_odds: best, arbitrage }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::{ScoreDto, TeamDto};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn service() -> FootballService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        crate::db::MIGRATOR.run(&pool).await.expect("migrations");

        // No test here touches the network; the gateway is only constructed.
        let cfg = Config {
            football_api_url: "http://127.0.0.1:0".to_string(),
            football_api_key: "test".to_string(),
            odds_api_url: "http://127.0.0.1:0".to_string(),
            odds_api_key: "test".to_string(),
            competition: "PL".to_string(),
            sport_key: "soccer_epl".to_string(),
            bookmaker: "fanduel".to_string(),
            log_level: "info".to_string(),
            db_path: ":memory:".to_string(),
            api_port: 0,
        };
        let gateway = Gateway::new(cfg).expect("http client");
        FootballService::new(gateway, Repo::new(pool), "fanduel".to_string())
    }

    fn team(name: &str) -> TeamDto {
        TeamDto { name: name.to_string(), short_name: None, crest: None }
    }

    fn fixture_dto(matchday: Option<i64>) -> FixtureDto {
        FixtureDto {
            utc_date: "2026-09-01T15:00:00Z".to_string(),
            status: "SCHEDULED".to_string(),
            matchday,
            venue: None,
            home_team: team("Arsenal"),
            away_team: team("Chelsea"),
            score: ScoreDto::default(),
        }
    }

    #[tokio::test]
    async fn fixture_with_matchday_creates_match_once() {
        let svc = service().await;
        assert!(svc.apply_fixture(&fixture_dto(Some(3))).await.unwrap());
        assert!(!svc.apply_fixture(&fixture_dto(Some(3))).await.unwrap());
    }

    #[tokio::test]
    async fn fixture_missing_matchday_is_malformed() {
        let svc = service().await;
        let err = svc.apply_fixture(&fixture_dto(None)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        // Rejected before anything persists — no teams, no match.
        let teams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams")
            .fetch_one(svc.repo().pool())
            .await
            .unwrap();
        assert_eq!(teams, 0);
        let matches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matches")
            .fetch_one(svc.repo().pool())
            .await
            .unwrap();
        assert_eq!(matches, 0);
    }
}
