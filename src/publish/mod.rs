//! Outward publishing of a finished pick slate.
//!
//! The scoring core hands over fully populated `Pick` records; rendering
//! and delivery live here. `LogPublisher` emits the rendered summary via
//! tracing, which stands in for any real delivery channel.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::db::models::Pick;

/// Hard ceiling on the rendered summary, matching short social posts.
pub const SUMMARY_MAX_CHARS: usize = 280;

/// Trait that every pick publisher must implement.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver the day's picks. Failures are the caller's to log; picks
    /// are already persisted by the time this runs.
    async fn publish(&self, picks: &[Pick]) -> Result<()>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Render the full summary; falls back to a compact rendering when the
/// full one exceeds the ceiling.
pub fn render_summary(picks: &[Pick]) -> String {
    let full = render_full(picks);
    if full.chars().count() <= SUMMARY_MAX_CHARS {
        return full;
    }
    render_compact(picks)
}

fn render_full(picks: &[Pick]) -> String {
    let mut out = String::from("🎯 Today's picks\n");
    for (i, pick) in picks.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} vs {} — {} ({}% conf)\n",
            i + 1,
            pick.home_team,
            pick.away_team,
            pick.prediction,
            pick.confidence
        ));
    }
    out.push_str("#sportspicks #bettingmodel");
    out
}

fn render_compact(picks: &[Pick]) -> String {
    let mut out = String::from("🎯 Picks: ");
    let lines: Vec<String> = picks
        .iter()
        .map(|p| format!("{} ({}%)", p.prediction, p.confidence))
        .collect();
    out.push_str(&lines.join(" | "));
    // Last resort: hard truncate on a char boundary
    if out.chars().count() > SUMMARY_MAX_CHARS {
        out = out.chars().take(SUMMARY_MAX_CHARS).collect();
    }
    out
}

/// Publisher that writes the summary to the log stream.
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    fn name(&self) -> &str {
        "log"
    }

    async fn publish(&self, picks: &[Pick]) -> Result<()> {
        if picks.is_empty() {
            info!("No picks to publish today");
            return Ok(());
        }
        info!("\n{}", render_summary(picks));
        Ok(())
    }
}
