use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one past game from a team's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Win,
    Loss,
}

/// Per-team statistics as supplied by the stats provider.
///
/// Immutable for the duration of a scoring pass. Any field the provider
/// could not fill is `None` and falls back to the default team profile
/// during feature extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    /// Average points scored per game
    pub points_for: Option<f64>,
    /// Average points allowed per game
    pub points_against: Option<f64>,
    /// Results of the last 5 games, most recent first
    pub recent_results: Option<Vec<GameResult>>,
    /// Number of starters currently listed as injured
    pub injured_starters: u32,
    /// Home advantage expressed in points (only meaningful for the home side)
    pub home_advantage: Option<f64>,
}

impl TeamSnapshot {
    /// Win percentage over the season, 0.5 for a team with no games played.
    pub fn win_pct(&self) -> f64 {
        let games = self.wins + self.losses;
        if games == 0 {
            0.5
        } else {
            f64::from(self.wins) / f64::from(games)
        }
    }

    /// Wins among the last 5 games. Defaults to a neutral 3 when history
    /// is unavailable.
    pub fn recent_wins(&self) -> u32 {
        match &self.recent_results {
            Some(results) => results.iter().filter(|r| **r == GameResult::Win).count() as u32,
            None => 3,
        }
    }
}

/// Posted market odds for one event. All odds are American-style signed
/// integers; zero is invalid and rejected during enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventOdds {
    pub home_moneyline: i32,
    pub away_moneyline: i32,
    /// Home spread in points (negative when home is favored)
    pub home_spread: f64,
    pub home_spread_odds: i32,
    pub away_spread_odds: i32,
    /// Posted total (over/under) line
    pub total_line: f64,
    pub over_odds: i32,
    pub under_odds: i32,
}

/// An upcoming event eligible for pick generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingEvent {
    pub event_id: String,
    pub starts_at: DateTime<Utc>,
    pub home: TeamSnapshot,
    pub away: TeamSnapshot,
    pub odds: EventOdds,
}

/// A finished game used as a training row. Team stats are the pre-game
/// snapshots; scores are final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedGame {
    pub event_id: String,
    pub home: TeamSnapshot,
    pub away: TeamSnapshot,
    pub home_score: u32,
    pub away_score: u32,
}

impl CompletedGame {
    pub fn home_won(&self) -> bool {
        self.home_score > self.away_score
    }
}

/// Which market a candidate bet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Moneyline,
    Spread,
    Total,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Moneyline => "moneyline",
            Market::Spread => "spread",
            Market::Total => "total",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "spread" => Market::Spread,
            "total" => Market::Total,
            _ => Market::Moneyline,
        }
    }
}

/// Which side of a market a candidate bet takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
    Over,
    Under,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
            Side::Over => "over",
            Side::Under => "under",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "away" => Side::Away,
            "over" => Side::Over,
            "under" => Side::Under,
            _ => Side::Home,
        }
    }
}

/// Settlement state of a published pick. `Pending` until the external
/// result resolver grades it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickResult {
    Pending,
    Won,
    Lost,
    Push,
}

impl PickResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickResult::Pending => "pending",
            PickResult::Won => "won",
            PickResult::Lost => "lost",
            PickResult::Push => "push",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "won" => PickResult::Won,
            "lost" => PickResult::Lost,
            "push" => PickResult::Push,
            _ => PickResult::Pending,
        }
    }
}

/// The externally visible output: one selected bet for one event.
///
/// Created once by the selection pass; only the `result` field is mutated
/// afterwards, and only through `Database::update_pick_result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    pub id: Option<i64>,
    pub event_id: String,
    pub home_team: String,
    pub away_team: String,
    pub market: Market,
    pub side: Side,
    pub odds: i32,
    /// Spread or total line; `None` for moneyline picks
    pub line: Option<f64>,
    /// Display confidence, integer percent in [51, 99]
    pub confidence: u8,
    /// e.g. "Celtics ML (-150)"
    pub prediction: String,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
    pub result: PickResult,
}
