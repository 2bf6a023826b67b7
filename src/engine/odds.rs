/// American-odds conversions and expected value.
///
/// American odds are signed integers: positive values are the profit on a
/// 100-unit stake, negative values are the stake required to profit 100.
/// A price of 0 carries no meaning and is rejected.
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OddsError {
    #[error("invalid odds: 0 is not a valid American price")]
    InvalidOdds,
}

/// The win probability a given American price encodes.
///
/// Positive odds: `100 / (odds + 100)`. Negative odds: `|odds| / (|odds| + 100)`.
pub fn implied_probability(odds: i32) -> Result<f64, OddsError> {
    if odds == 0 {
        return Err(OddsError::InvalidOdds);
    }
    let p = if odds > 0 {
        100.0 / (f64::from(odds) + 100.0)
    } else {
        let abs = f64::from(odds.abs());
        abs / (abs + 100.0)
    };
    Ok(p)
}

/// Net profit per unit staked when the bet wins.
pub fn payout_per_unit(odds: i32) -> Result<f64, OddsError> {
    if odds == 0 {
        return Err(OddsError::InvalidOdds);
    }
    let payout = if odds > 0 {
        f64::from(odds) / 100.0
    } else {
        100.0 / f64::from(odds.abs())
    };
    Ok(payout)
}

/// Expected net profit per unit staked, given our probability estimate and
/// the posted price.
///
/// `EV = p * payout − (1 − p)`. Positive EV means the price underestimates
/// the true probability.
pub fn expected_value(probability: f64, odds: i32) -> Result<f64, OddsError> {
    debug_assert!(
        (0.0..=1.0).contains(&probability),
        "probability out of range"
    );
    let payout = payout_per_unit(odds)?;
    Ok(probability * payout - (1.0 - probability))
}
