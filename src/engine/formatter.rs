//! Renders a selected candidate into the strings carried on a pick.

use crate::db::models::{Market, Side, UpcomingEvent};
use crate::engine::markets::Candidate;
use crate::engine::odds;
use crate::engine::totals;

/// Short prediction line, e.g. "Celtics ML (-150)" or "Over 221.5 (-110)".
pub fn prediction(event: &UpcomingEvent, bet: &Candidate) -> String {
    let odds = format_odds(bet.odds);
    match (bet.market, bet.side) {
        (Market::Moneyline, Side::Home) => format!("{} ML ({odds})", event.home.name),
        (Market::Moneyline, _) => format!("{} ML ({odds})", event.away.name),
        (Market::Spread, Side::Home) => format!(
            "{} {} ({odds})",
            event.home.name,
            format_line(bet.line.unwrap_or(0.0))
        ),
        (Market::Spread, _) => format!(
            "{} {} ({odds})",
            event.away.name,
            format_line(bet.line.unwrap_or(0.0))
        ),
        (Market::Total, Side::Over) => {
            format!("Over {} ({odds})", bet.line.unwrap_or(0.0))
        }
        (Market::Total, _) => format!("Under {} ({odds})", bet.line.unwrap_or(0.0)),
    }
}

/// Natural-language justification built from the structured fields the
/// scoring pass produced.
pub fn reasoning(event: &UpcomingEvent, bet: &Candidate) -> String {
    let model_pct = bet.probability * 100.0;
    let implied_pct = odds::implied_probability(bet.odds)
        .map(|p| p * 100.0)
        .unwrap_or(0.0);
    let edge = format!(
        "model {model_pct:.0}% vs implied {implied_pct:.0}%, EV {:+.2} per unit",
        bet.expected_value
    );

    let home = &event.home;
    let away = &event.away;
    let records = format!(
        "{} ({}-{}) vs {} ({}-{})",
        home.name, home.wins, home.losses, away.name, away.wins, away.losses
    );

    match bet.market {
        Market::Moneyline | Market::Spread => {
            format!("{records}: {edge}.")
        }
        Market::Total => {
            let expected = totals::expected_total(home, away);
            format!(
                "{records}: combined scoring projects to {expected:.1} against a line of {}; {edge}.",
                bet.line.unwrap_or(0.0)
            )
        }
    }
}

fn format_odds(odds: i32) -> String {
    format!("{odds:+}")
}

fn format_line(line: f64) -> String {
    format!("{line:+}")
}
