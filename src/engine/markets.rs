//! Candidate-bet enumeration for one event.
//!
//! Every event yields the same six candidates: both moneylines, both sides
//! of the spread, and the total over/under. No filtering happens here; the
//! selector downstream ranks whatever this module produces.

use tracing::warn;

use crate::db::models::{Market, Side, UpcomingEvent};
use crate::engine::odds;
use crate::engine::statistical::{PROB_CEIL, PROB_FLOOR};
use crate::engine::totals;

/// Probability shift per spread point. A linear heuristic, tunable rather
/// than a law: one point of spread moves the cover probability by 0.1.
pub const SPREAD_POINT_WEIGHT: f64 = 0.1;

/// One possible wager on an event, with our probability estimate and the
/// expected value against the posted price. Lives only for the duration
/// of a ranking pass.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub market: Market,
    pub side: Side,
    pub odds: i32,
    /// Spread or total line; `None` for moneylines
    pub line: Option<f64>,
    pub probability: f64,
    pub expected_value: f64,
}

fn candidate(
    market: Market,
    side: Side,
    price: i32,
    line: Option<f64>,
    probability: f64,
) -> Option<Candidate> {
    match odds::expected_value(probability, price) {
        Ok(expected_value) => Some(Candidate {
            market,
            side,
            odds: price,
            line,
            probability,
            expected_value,
        }),
        Err(e) => {
            warn!("Skipping {} {} candidate: {e}", market.as_str(), side.as_str());
            None
        }
    }
}

/// Build the six candidates for one event from the blended home-win
/// probability. Odds of zero (invalid by contract) drop that candidate
/// with a warning instead of failing the event.
pub fn enumerate_candidates(event: &UpcomingEvent, home_win_prob: f64) -> Vec<Candidate> {
    let odds = &event.odds;

    // Spread cover: favorites give points (negative spread) and cover less
    // often than they win; underdogs the reverse.
    let home_cover =
        (home_win_prob + odds.home_spread * SPREAD_POINT_WEIGHT).clamp(PROB_FLOOR, PROB_CEIL);
    let over = totals::prob_over(&event.home, &event.away, odds.total_line);

    [
        candidate(
            Market::Moneyline,
            Side::Home,
            odds.home_moneyline,
            None,
            home_win_prob,
        ),
        candidate(
            Market::Moneyline,
            Side::Away,
            odds.away_moneyline,
            None,
            1.0 - home_win_prob,
        ),
        candidate(
            Market::Spread,
            Side::Home,
            odds.home_spread_odds,
            Some(odds.home_spread),
            home_cover,
        ),
        candidate(
            Market::Spread,
            Side::Away,
            odds.away_spread_odds,
            Some(-odds.home_spread),
            1.0 - home_cover,
        ),
        candidate(
            Market::Total,
            Side::Over,
            odds.over_odds,
            Some(odds.total_line),
            over,
        ),
        candidate(
            Market::Total,
            Side::Under,
            odds.under_odds,
            Some(odds.total_line),
            1.0 - over,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}
