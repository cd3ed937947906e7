use chrono::Utc;

use crate::db::models::{MatchDetailRow, MatchOddsRow, MatchRow, StandingRow, TeamRow};
use crate::error::Result;
use crate::types::{MatchStatus, StandingDto, ThreeWayOdds};

/// Upstream-driven fields applied on every match upsert.
#[derive(Debug, Clone)]
pub struct MatchFields {
    pub venue: String,
    pub status: MatchStatus,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub competition: String,
    pub matchweek: i64,
}

/// Match/standings repository. All writes are idempotent on natural keys:
/// team name, and the (home, away, kickoff) tuple for matches.
#[derive(Clone)]
pub struct Repo {
    pool: sqlx::SqlitePool,
}

impl Repo {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    /// Create or update a team by name. The logo is written only when the
    /// incoming value differs from the stored one.
    pub async fn upsert_team(
        &self,
        name: &str,
        short_name: &str,
        logo_url: Option<&str>,
    ) -> Result<i64> {
        let existing = sqlx::query_as::<_, TeamRow>(
            "SELECT id, name, short_name, logo_url FROM teams WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(team) = existing {
            if logo_url.is_some() && team.logo_url.as_deref() != logo_url {
                sqlx::query("UPDATE teams SET logo_url = ? WHERE id = ?")
                    .bind(logo_url)
                    .bind(team.id)
                    .execute(&self.pool)
                    .await?;
            }
            return Ok(team.id);
        }

        let result = sqlx::query("INSERT INTO teams (name, short_name, logo_url) VALUES (?, ?, ?)")
            .bind(name)
            .bind(short_name)
            .bind(logo_url)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Create or update a match on its (home, away, kickoff) key.
    /// Returns (match_id, was_created). Re-running with identical input
    /// changes nothing.
    pub async fn upsert_match(
        &self,
        home_team_id: i64,
        away_team_id: i64,
        kickoff: &str,
        fields: &MatchFields,
    ) -> Result<(i64, bool)> {
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM matches WHERE home_team_id = ? AND away_team_id = ? AND kickoff = ?",
        )
        .bind(home_team_id)
        .bind(away_team_id)
        .bind(kickoff)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(id) = existing {
            sqlx::query(
                r#"
                UPDATE matches
                SET venue = ?, status = ?, home_score = ?, away_score = ?,
                    competition = ?, matchweek = ?
                WHERE id = ?
                "#,
            )
            .bind(&fields.venue)
            .bind(fields.status.as_str())
            .bind(fields.home_score)
            .bind(fields.away_score)
            .bind(&fields.competition)
            .bind(fields.matchweek)
            .bind(id)
            .execute(&self.pool)
            .await?;
            return Ok((id, false));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO matches (
                home_team_id, away_team_id, kickoff, venue, status,
                home_score, away_score, competition, matchweek
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(home_team_id)
        .bind(away_team_id)
        .bind(kickoff)
        .bind(&fields.venue)
        .bind(fields.status.as_str())
        .bind(fields.home_score)
        .bind(fields.away_score)
        .bind(&fields.competition)
        .bind(fields.matchweek)
        .execute(&self.pool)
        .await?;
        Ok((result.last_insert_rowid(), true))
    }

    /// Replace the standings snapshot wholesale in one transaction.
    /// `entries` pairs a resolved team id with its provider row.
    pub async fn replace_standings(&self, entries: &[(i64, StandingDto)]) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM league_table").execute(&mut *tx).await?;
        for (team_id, s) in entries {
            sqlx::query(
                r#"
                INSERT INTO league_table (
                    team_id, position, played, won, draw, lost,
                    goals_for, goals_against, goal_difference, points, last_updated
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(team_id)
            .bind(s.position)
            .bind(s.played_games)
            .bind(s.won)
            .bind(s.draw)
            .bind(s.lost)
            .bind(s.goals_for)
            .bind(s.goals_against)
            .bind(s.goal_difference)
            .bind(s.points)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(entries.len())
    }

    /// Overwrite the match's odds row wholesale — never merged field-by-field
    /// across refetches. Also records the resolved provider event id.
    pub async fn store_odds(
        &self,
        match_id: i64,
        odds: &ThreeWayOdds,
        event_id: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO match_odds (match_id, home_win, away_win, draw, last_updated)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(match_id) DO UPDATE SET
                home_win = excluded.home_win,
                away_win = excluded.away_win,
                draw = excluded.draw,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(match_id)
        .bind(odds.home_win)
        .bind(odds.away_win)
        .bind(odds.draw)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if event_id.is_some() {
            sqlx::query("UPDATE matches SET odds_event_id = ? WHERE id = ?")
                .bind(event_id)
                .bind(match_id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    pub async fn get_odds(&self, match_id: i64) -> Result<Option<MatchOddsRow>> {
        Ok(sqlx::query_as::<_, MatchOddsRow>(
            "SELECT match_id, home_win, away_win, draw, last_updated FROM match_odds WHERE match_id = ?",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn get_match(&self, id: i64) -> Result<Option<MatchRow>> {
        Ok(sqlx::query_as::<_, MatchRow>("SELECT * FROM matches WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_match_detail(&self, id: i64) -> Result<Option<MatchDetailRow>> {
        Ok(sqlx::query_as::<_, MatchDetailRow>(
            r#"
            SELECT m.id, h.name AS home_team, a.name AS away_team, m.kickoff,
                   m.venue, m.status, m.home_score, m.away_score,
                   m.competition, m.matchweek, m.odds_event_id
            FROM matches m
            JOIN teams h ON h.id = m.home_team_id
            JOIN teams a ON a.id = m.away_team_id
            WHERE m.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Scheduled matches with a future kickoff, soonest first.
    pub async fn list_upcoming(&self, now_rfc3339: &str) -> Result<Vec<MatchDetailRow>> {
        Ok(sqlx::query_as::<_, MatchDetailRow>(
            r#"
            SELECT m.id, h.name AS home_team, a.name AS away_team, m.kickoff,
                   m.venue, m.status, m.home_score, m.away_score,
                   m.competition, m.matchweek, m.odds_event_id
            FROM matches m
            JOIN teams h ON h.id = m.home_team_id
            JOIN teams a ON a.id = m.away_team_id
            WHERE m.status = 'scheduled' AND m.kickoff >= ?
            ORDER BY m.kickoff ASC
            "#,
        )
        .bind(now_rfc3339)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn standings(&self) -> Result<Vec<StandingRow>> {
        Ok(sqlx::query_as::<_, StandingRow>(
            r#"
            SELECT t.name AS team, l.position, l.played, l.won, l.draw, l.lost,
                   l.goals_for, l.goals_against, l.goal_difference, l.points
            FROM league_table l
            JOIN teams t ON t.id = l.team_id
            ORDER BY l.position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
