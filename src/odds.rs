//! Odds normalizer: pulls the three-way (home/away/draw) market out of a
//! bookmaker feed, converts odds formats, and computes the cross-bookmaker
//! best-odds / arbitrage analytics.

use tracing::debug;

use crate::config::ARB_BANKROLL;
use crate::error::OddsUnavailable;
use crate::types::{ArbitrageReport, BestOdds, BestPrice, BookmakerDto, OddsFeedDto, ThreeWayOdds};

const H2H_MARKET: &str = "h2h";
const DRAW_LABEL: &str = "draw";

/// Map one bookmaker's h2h outcomes onto home/away/draw. Labels are compared
/// case-insensitively against the FEED's own team names — the provider's
/// naming is authoritative here, not our internal match record.
fn three_way_from_book(feed: &OddsFeedDto, book: &BookmakerDto) -> Option<ThreeWayOdds> {
    let market = book.markets.iter().find(|m| m.key == H2H_MARKET)?;

    let mut home = None;
    let mut away = None;
    let mut draw = None;
    for outcome in &market.outcomes {
        let name = outcome.name.to_lowercase();
        if name == feed.home_team.to_lowercase() {
            home = Some(outcome.price);
        } else if name == feed.away_team.to_lowercase() {
            away = Some(outcome.price);
        } else if name == DRAW_LABEL {
            draw = Some(outcome.price);
        }
    }

    Some(ThreeWayOdds {
        home_win: home?,
        away_win: away?,
        draw: draw?,
    })
}

/// Single-bookmaker mode: the nominated bookmaker's three-way prices.
/// `IncompleteMarket` when the bookmaker is absent or missing any leg.
pub fn extract_three_way(
    feed: &OddsFeedDto,
    bookmaker_key: &str,
) -> Result<ThreeWayOdds, OddsUnavailable> {
    let book = feed
        .bookmakers
        .iter()
        .find(|b| b.key == bookmaker_key)
        .ok_or(OddsUnavailable::IncompleteMarket)?;

    three_way_from_book(feed, book).ok_or(OddsUnavailable::IncompleteMarket)
}

/// Aggregate mode: running per-outcome maxima across every bookmaker that
/// carries the full three-way market, with bookmaker attribution. Bookmakers
/// missing any leg are skipped.
pub fn best_three_way(feed: &OddsFeedDto) -> Option<BestOdds> {
    let mut best: Option<BestOdds> = None;
    let mut considered = 0usize;

    for book in &feed.bookmakers {
        let Some(odds) = three_way_from_book(feed, book) else {
            debug!(bookmaker = %book.key, "skipping bookmaker without full three-way market");
            continue;
        };
        considered += 1;

        let attribution = if book.title.is_empty() { &book.key } else { &book.title };
        match best.as_mut() {
            None => {
                best = Some(BestOdds {
                    home_win: BestPrice { price: odds.home_win, bookmaker: attribution.clone() },
                    away_win: BestPrice { price: odds.away_win, bookmaker: attribution.clone() },
                    draw: BestPrice { price: odds.draw, bookmaker: attribution.clone() },
                    books_considered: 0,
                });
            }
            Some(b) => {
                if odds.home_win > b.home_win.price {
                    b.home_win = BestPrice { price: odds.home_win, bookmaker: attribution.clone() };
                }
                if odds.away_win > b.away_win.price {
                    b.away_win = BestPrice { price: odds.away_win, bookmaker: attribution.clone() };
                }
                if odds.draw > b.draw.price {
                    b.draw = BestPrice { price: odds.draw, bookmaker: attribution.clone() };
                }
            }
        }
    }

    best.map(|mut b| {
        b.books_considered = considered;
        b
    })
}

/// Decimal → American convention. None for prices at or below 1.0, which
/// have no American representation.
pub fn decimal_to_american(d: f64) -> Option<i64> {
    if d <= 1.0 {
        return None;
    }
    if d >= 2.0 {
        Some(((d - 1.0) * 100.0).round() as i64)
    } else {
        Some((-100.0 / (d - 1.0)).round() as i64)
    }
}

/// A price at or below 1.0 implies a probability of at least one; clamp it
/// to exactly one so a junk quote can never yield an infinite or negative
/// probability sum.
fn implied_probability(odds: f64) -> f64 {
    if odds > 1.0 {
        1.0 / odds
    } else {
        1.0
    }
}

/// Two-way arbitrage over the best home/away prices. Draw is intentionally
/// excluded. When the implied probabilities sum below 1, stakes are split
/// proportionally over a fixed notional bankroll.
pub fn two_way_arbitrage(home_odds: f64, away_odds: f64) -> ArbitrageReport {
    let p_home = implied_probability(home_odds);
    let p_away = implied_probability(away_odds);
    let total = p_home + p_away;

    if total < 1.0 {
        let home_stake = ARB_BANKROLL * p_home / total;
        let away_stake = ARB_BANKROLL * p_away / total;
        // Both legs pay the same by construction; quote the home leg.
        let profit = home_stake * home_odds - ARB_BANKROLL;
        ArbitrageReport {
            exists: true,
            total_probability_pct: total * 100.0,
            home_stake: Some(home_stake),
            away_stake: Some(away_stake),
            guaranteed_profit: Some(profit),
        }
    } else {
        ArbitrageReport {
            exists: false,
            total_probability_pct: total * 100.0,
            home_stake: None,
            away_stake: None,
            guaranteed_profit: None,
        }
    }
}
