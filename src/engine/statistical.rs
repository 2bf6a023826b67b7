//! Hand-tuned pre-game home-win probability model.
//!
//! A weighted sum of five season-statistics components on top of a 50/50
//! baseline. Each component is clamped before weighting so a single degenerate
//! input (a 20-point net rating, a seven-man injury report) cannot dominate
//! the estimate, and the final probability is clamped to [0.05, 0.95]: the
//! model never claims near-certainty.

use crate::db::models::TeamSnapshot;

/// Bounds for every probability this engine produces.
pub const PROB_FLOOR: f64 = 0.05;
pub const PROB_CEIL: f64 = 0.95;

/// Fallback statistics used whenever the provider leaves a field empty.
/// Single source of truth: feature extraction everywhere reads from here.
pub struct DefaultTeamProfile {
    pub points_per_game: f64,
    pub points_allowed_per_game: f64,
    /// Home advantage in points
    pub home_advantage: f64,
}

pub const DEFAULT_TEAM_PROFILE: DefaultTeamProfile = DefaultTeamProfile {
    points_per_game: 110.0,
    points_allowed_per_game: 110.0,
    home_advantage: 3.5,
};

/// Points scored per game, defaulted.
pub fn points_for(team: &TeamSnapshot) -> f64 {
    team.points_for
        .unwrap_or(DEFAULT_TEAM_PROFILE.points_per_game)
}

/// Points allowed per game, defaulted.
pub fn points_against(team: &TeamSnapshot) -> f64 {
    team.points_against
        .unwrap_or(DEFAULT_TEAM_PROFILE.points_allowed_per_game)
}

/// Home advantage in points, defaulted.
pub fn home_advantage(team: &TeamSnapshot) -> f64 {
    team.home_advantage
        .unwrap_or(DEFAULT_TEAM_PROFILE.home_advantage)
}

// Component weights. The win-percentage and net-rating edges carry most of
// the signal; injuries and home court are smaller nudges.
const WIN_PCT_WEIGHT: f64 = 0.25;
const RECENT_FORM_WEIGHT: f64 = 0.20;
const HOME_ADVANTAGE_WEIGHT: f64 = 0.025;
const INJURY_WEIGHT: f64 = 0.05;
const NET_RATING_WEIGHT: f64 = 0.30;

/// Net-rating differences beyond ±30 points are treated as ±30.
const NET_RATING_SCALE: f64 = 30.0;
/// Injury-count differences beyond ±3 starters are treated as ±3.
const INJURY_DIFF_CAP: f64 = 3.0;
/// Home advantage beyond 6 points is treated as 6.
const HOME_ADVANTAGE_CAP: f64 = 6.0;

/// Estimate the probability that the home team wins, from season statistics
/// alone. Always within [0.05, 0.95].
pub fn home_win_probability(home: &TeamSnapshot, away: &TeamSnapshot) -> f64 {
    let win_pct_term = (home.win_pct() - away.win_pct()) * WIN_PCT_WEIGHT;

    // Last-5 form; a missing history counts as a neutral 3-2 split.
    let recent_diff = f64::from(home.recent_wins()) - f64::from(away.recent_wins());
    let recent_term = (recent_diff / 5.0).clamp(-1.0, 1.0) * RECENT_FORM_WEIGHT;

    let advantage_term =
        home_advantage(home).clamp(0.0, HOME_ADVANTAGE_CAP) * HOME_ADVANTAGE_WEIGHT;

    let injury_diff = f64::from(away.injured_starters) - f64::from(home.injured_starters);
    let injury_term = injury_diff.clamp(-INJURY_DIFF_CAP, INJURY_DIFF_CAP) * INJURY_WEIGHT;

    let home_net = points_for(home) - points_against(home);
    let away_net = points_for(away) - points_against(away);
    let rating_term =
        ((home_net - away_net) / NET_RATING_SCALE).clamp(-1.0, 1.0) * NET_RATING_WEIGHT;

    let p = 0.5 + win_pct_term + recent_term + advantage_term + injury_term + rating_term;
    p.clamp(PROB_FLOOR, PROB_CEIL)
}
