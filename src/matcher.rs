use chrono::{DateTime, Duration, Utc};

use crate::config::{EVENT_WINDOW_AFTER_MINS, EVENT_WINDOW_BEFORE_MINS};
use crate::types::OddsEventDto;

/// Query window around kickoff used to pre-filter candidate events upstream.
pub fn event_window(kickoff: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        kickoff - Duration::minutes(EVENT_WINDOW_BEFORE_MINS),
        kickoff + Duration::minutes(EVENT_WINDOW_AFTER_MINS),
    )
}

/// Fuzzy name comparison on lowercased, trimmed names: bidirectional
/// containment first ("Chelsea" vs "Chelsea FC"), then a token-wise prefix
/// fallback so truncated words still match ("Man United" vs
/// "Manchester United", where neither full string contains the other).
fn teams_match(ours: &str, theirs: &str) -> bool {
    let a = ours.trim().to_lowercase();
    let b = theirs.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(&b) || b.contains(&a) {
        return true;
    }
    tokens_prefix_match(&a, &b)
}

/// Aligned-token comparison: equal word counts, and each word pair shares a
/// prefix relation. Rejects "Manchester United" vs "Manchester City".
fn tokens_prefix_match(a: &str, b: &str) -> bool {
    let av: Vec<&str> = a.split_whitespace().collect();
    let bv: Vec<&str> = b.split_whitespace().collect();
    if av.len() != bv.len() {
        return false;
    }
    av.iter()
        .zip(&bv)
        .all(|(x, y)| x.starts_with(y) || y.starts_with(x))
}

/// Resolve our match to an odds-provider event id. An event qualifies only
/// when BOTH the home and away comparisons succeed; the first qualifying
/// candidate wins — no scoring among multiple matches. Simultaneous
/// same-named fixtures are therefore not disambiguated; the time-window
/// pre-filter is what keeps that case rare.
///
/// Returns None when nothing qualifies: odds are unavailable right now,
/// which is not an error.
pub fn resolve_event_id(home: &str, away: &str, candidates: &[OddsEventDto]) -> Option<String> {
    candidates
        .iter()
        .find(|ev| teams_match(home, &ev.home_team) && teams_match(away, &ev.away_team))
        .map(|ev| ev.id.clone())
}
