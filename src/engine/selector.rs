//! Picks the single best bet per event and ranks events across a run.
//!
//! Sorting is stable and descending by expected value, so ties resolve to
//! enumeration order (moneyline, spread, total) within an event and to
//! provider order across events. Deterministic by construction.

use std::cmp::Ordering;

use crate::db::models::UpcomingEvent;
use crate::engine::markets::Candidate;

/// Bounds on how many picks a single run may publish.
pub const MIN_PICKS: usize = 1;
pub const MAX_PICKS: usize = 3;

/// Bounds on the displayed confidence percentage.
pub const MIN_CONFIDENCE: u8 = 51;
pub const MAX_CONFIDENCE: u8 = 99;

/// One event together with its highest-EV candidate.
#[derive(Debug, Clone)]
pub struct ScoredEvent {
    pub event: UpcomingEvent,
    pub best: Candidate,
}

fn by_ev_desc(a: f64, b: f64) -> Ordering {
    // NaN cannot occur for finite odds/probabilities; treat it as worst
    // if it ever does.
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// The highest-EV candidate for one event, `None` when the event produced
/// no valid candidates.
pub fn best_candidate(candidates: &[Candidate]) -> Option<Candidate> {
    let mut ordered: Vec<&Candidate> = candidates.iter().collect();
    ordered.sort_by(|a, b| by_ev_desc(a.expected_value, b.expected_value));
    ordered.first().map(|c| (*c).clone())
}

/// Rank events by their best bet's EV and keep the top `requested`,
/// clamped to [1, 3]. Each event contributes at most one pick.
pub fn select_top(
    mut scored: Vec<ScoredEvent>,
    requested: usize,
) -> Vec<ScoredEvent> {
    let keep = requested.clamp(MIN_PICKS, MAX_PICKS);
    scored.sort_by(|a, b| by_ev_desc(a.best.expected_value, b.best.expected_value));
    scored.truncate(keep);
    scored
}

/// Displayed confidence: the probability as a rounded percentage, clamped
/// so a pick never reads below a coin flip or as a certainty.
pub fn confidence(probability: f64) -> u8 {
    let pct = (probability * 100.0).round();
    (pct as i64).clamp(i64::from(MIN_CONFIDENCE), i64::from(MAX_CONFIDENCE)) as u8
}
