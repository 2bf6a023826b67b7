//! Over/under probability from a normal approximation of the combined score.
//!
//! The expected total averages each side's scoring rate against the other's
//! defensive rate. Game-to-game variance is modelled with a fixed standard
//! deviation rather than a fitted one.

use crate::db::models::TeamSnapshot;
use crate::engine::statistical::{points_against, points_for};

/// Standard deviation of the combined final score, in points.
pub const TOTAL_STD_DEV: f64 = 12.0;

/// Expected combined final score for the matchup.
pub fn expected_total(home: &TeamSnapshot, away: &TeamSnapshot) -> f64 {
    let home_side = (points_for(home) + points_against(away)) / 2.0;
    let away_side = (points_for(away) + points_against(home)) / 2.0;
    home_side + away_side
}

/// Probability the combined score exceeds the posted line.
pub fn prob_over(home: &TeamSnapshot, away: &TeamSnapshot, line: f64) -> f64 {
    let z = (line - expected_total(home, away)) / TOTAL_STD_DEV;
    1.0 - normal_cdf(z)
}

/// Probability the combined score stays under the posted line.
pub fn prob_under(home: &TeamSnapshot, away: &TeamSnapshot, line: f64) -> f64 {
    1.0 - prob_over(home, away, line)
}

/// Standard normal CDF via the error function.
fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Abramowitz & Stegun 7.1.26 polynomial approximation, max error ~1.5e-7.
fn erf(x: f64) -> f64 {
    const P: f64 = 0.327_591_1;
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}
