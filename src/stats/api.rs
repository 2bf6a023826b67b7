use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use tracing::{debug, warn};

use super::StatsProvider;
use crate::db::models::{CompletedGame, EventOdds, GameResult, TeamSnapshot, UpcomingEvent};

/// Stats provider backed by a JSON odds-feed API.
pub struct OddsFeedApi {
    http: Client,
    api_key: String,
    /// Base URL for overriding in tests
    base_url: String,
}

impl OddsFeedApi {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(OddsFeedApi {
            http,
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or("https://api.oddsfeed.example.com/v1")
                .to_string(),
        })
    }
}

#[async_trait]
impl StatsProvider for OddsFeedApi {
    fn name(&self) -> &str {
        "OddsFeedApi"
    }

    async fn fetch_upcoming_events(&self, date: NaiveDate) -> Result<Vec<UpcomingEvent>> {
        let url = format!(
            "{}/events/upcoming?date={}&key={}",
            self.base_url, date, self.api_key
        );
        debug!("Fetching upcoming events from {}", url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Upcoming-events request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("Odds feed error: {}", resp.status());
        }
        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse upcoming-events response")?;
        Ok(parse_upcoming_response(&raw))
    }

    async fn fetch_completed_games(&self, limit: usize) -> Result<Vec<CompletedGame>> {
        let url = format!(
            "{}/games/completed?limit={}&order=desc&key={}",
            self.base_url, limit, self.api_key
        );
        debug!("Fetching completed games from {}", url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Completed-games request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("Odds feed error: {}", resp.status());
        }
        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse completed-games response")?;
        Ok(parse_completed_response(&raw))
    }
}

fn parse_team(raw: &serde_json::Value) -> Option<TeamSnapshot> {
    let name = raw["name"].as_str()?.to_string();
    let recent_results = raw["lastFive"].as_str().map(|s| {
        s.chars()
            .filter_map(|c| match c.to_ascii_uppercase() {
                'W' => Some(GameResult::Win),
                'L' => Some(GameResult::Loss),
                _ => None,
            })
            .collect::<Vec<_>>()
    });
    Some(TeamSnapshot {
        name,
        wins: raw["wins"].as_u64().unwrap_or(0) as u32,
        losses: raw["losses"].as_u64().unwrap_or(0) as u32,
        points_for: raw["pointsForPerGame"].as_f64(),
        points_against: raw["pointsAgainstPerGame"].as_f64(),
        recent_results,
        injured_starters: raw["injuredStarters"].as_u64().unwrap_or(0) as u32,
        home_advantage: raw["homeAdvantage"].as_f64(),
    })
}

fn parse_odds(raw: &serde_json::Value) -> Option<EventOdds> {
    let price = |field: &str| -> Option<i32> {
        let v = raw[field].as_i64()? as i32;
        // American odds of 0 are meaningless; treat as missing
        if v == 0 {
            None
        } else {
            Some(v)
        }
    };
    let line = |field: &str| -> Option<f64> { raw[field].as_f64().filter(|v| v.is_finite()) };
    Some(EventOdds {
        home_moneyline: price("homeMoneyline")?,
        away_moneyline: price("awayMoneyline")?,
        home_spread: line("homeSpread")?,
        home_spread_odds: price("homeSpreadOdds")?,
        away_spread_odds: price("awaySpreadOdds")?,
        total_line: line("totalLine")?,
        over_odds: price("overOdds")?,
        under_odds: price("underOdds")?,
    })
}

fn parse_upcoming_response(raw: &serde_json::Value) -> Vec<UpcomingEvent> {
    let events = match raw["events"].as_array() {
        Some(a) => a,
        None => return vec![],
    };

    events
        .iter()
        .filter_map(|ev| {
            let event_id = ev["id"].as_str()?.to_string();
            let starts_at = ev["startsAt"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            let home = parse_team(&ev["home"])?;
            let away = parse_team(&ev["away"])?;
            let odds = match parse_odds(&ev["odds"]) {
                Some(o) => o,
                None => {
                    warn!("Event {} has missing or zero odds, skipping", event_id);
                    return None;
                }
            };
            Some(UpcomingEvent {
                event_id,
                starts_at,
                home,
                away,
                odds,
            })
        })
        .collect()
}

fn parse_completed_response(raw: &serde_json::Value) -> Vec<CompletedGame> {
    let games = match raw["games"].as_array() {
        Some(a) => a,
        None => return vec![],
    };

    games
        .iter()
        .filter_map(|g| {
            let event_id = g["id"].as_str()?.to_string();
            let home = parse_team(&g["home"])?;
            let away = parse_team(&g["away"])?;
            let home_score = g["homeScore"].as_u64()? as u32;
            let away_score = g["awayScore"].as_u64()? as u32;
            Some(CompletedGame {
                event_id,
                home,
                away,
                home_score,
                away_score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn team_json(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "wins": 12,
            "losses": 8,
            "pointsForPerGame": 113.4,
            "pointsAgainstPerGame": 109.1,
            "lastFive": "WWLWL",
            "injuredStarters": 1,
            "homeAdvantage": 3.0
        })
    }

    fn odds_json() -> serde_json::Value {
        json!({
            "homeMoneyline": -150,
            "awayMoneyline": 130,
            "homeSpread": -3.5,
            "homeSpreadOdds": -110,
            "awaySpreadOdds": -110,
            "totalLine": 221.5,
            "overOdds": -110,
            "underOdds": -105
        })
    }

    #[test]
    fn parses_upcoming_events() {
        let raw = json!({
            "events": [{
                "id": "nba-001",
                "startsAt": "2026-03-01T23:30:00Z",
                "home": team_json("Celtics"),
                "away": team_json("Bulls"),
                "odds": odds_json()
            }]
        });
        let events = parse_upcoming_response(&raw);
        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(ev.event_id, "nba-001");
        assert_eq!(ev.home.name, "Celtics");
        assert_eq!(ev.home.wins, 12);
        assert_eq!(ev.home.recent_results.as_ref().unwrap().len(), 5);
        assert_eq!(ev.home.recent_wins(), 3);
        assert_eq!(ev.odds.home_moneyline, -150);
        assert_eq!(ev.odds.total_line, 221.5);
    }

    #[test]
    fn zero_odds_skip_the_event() {
        let mut odds = odds_json();
        odds["homeMoneyline"] = json!(0);
        let raw = json!({
            "events": [{
                "id": "nba-002",
                "startsAt": "2026-03-01T23:30:00Z",
                "home": team_json("Celtics"),
                "away": team_json("Bulls"),
                "odds": odds
            }]
        });
        assert!(parse_upcoming_response(&raw).is_empty());
    }

    #[test]
    fn missing_team_stats_become_defaults() {
        let raw = json!({
            "events": [{
                "id": "nba-003",
                "startsAt": "2026-03-01T23:30:00Z",
                "home": { "name": "Celtics" },
                "away": { "name": "Bulls" },
                "odds": odds_json()
            }]
        });
        let events = parse_upcoming_response(&raw);
        assert_eq!(events.len(), 1);
        let home = &events[0].home;
        assert!(home.points_for.is_none());
        assert!(home.recent_results.is_none());
        // Defaults kick in downstream
        assert_eq!(home.recent_wins(), 3);
    }

    #[test]
    fn empty_payload_yields_no_events() {
        assert!(parse_upcoming_response(&json!({})).is_empty());
        assert!(parse_completed_response(&json!({"games": []})).is_empty());
    }

    #[test]
    fn parses_completed_games() {
        let raw = json!({
            "games": [{
                "id": "nba-900",
                "home": team_json("Celtics"),
                "away": team_json("Bulls"),
                "homeScore": 112,
                "awayScore": 104
            }]
        });
        let games = parse_completed_response(&raw);
        assert_eq!(games.len(), 1);
        assert!(games[0].home_won());
    }

    #[test]
    fn malformed_rows_are_dropped_not_fatal() {
        let raw = json!({
            "games": [
                { "id": "good", "home": team_json("A"), "away": team_json("B"),
                  "homeScore": 100, "awayScore": 99 },
                { "id": "missing-scores", "home": team_json("A"), "away": team_json("B") }
            ]
        });
        assert_eq!(parse_completed_response(&raw).len(), 1);
    }
}
