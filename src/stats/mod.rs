pub mod api;

pub use api::OddsFeedApi;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::models::{CompletedGame, UpcomingEvent};

/// Trait that every stats/odds provider must implement.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Upcoming events for the given date, with team statistics and
    /// posted odds attached.
    async fn fetch_upcoming_events(&self, date: NaiveDate) -> Result<Vec<UpcomingEvent>>;

    /// Completed games with final scores, most recent first. Training
    /// input only.
    async fn fetch_completed_games(&self, limit: usize) -> Result<Vec<CompletedGame>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
