use anyhow::Result;
use chrono::{NaiveDate, Utc};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::db::models::{CompletedGame, Pick, PickResult, UpcomingEvent};
use crate::db::Database;
use crate::engine::predictive::{PredictiveModel, TrainError};
use crate::engine::selector::ScoredEvent;
use crate::engine::{blend, formatter, markets, selector};
use crate::publish::Publisher;
use crate::stats::StatsProvider;

/// How many completed games a training refresh requests from the provider.
const TRAINING_FETCH_LIMIT: usize = 1000;

/// The core pick-generation engine. Scores each upcoming event, keeps the
/// best bet per event, ranks events, and publishes the top of the slate.
pub struct PicksEngine {
    db: Database,
    provider: Arc<dyn StatsProvider>,
    model: Arc<PredictiveModel>,
    publisher: Arc<dyn Publisher>,
}

impl PicksEngine {
    pub fn new(
        db: Database,
        provider: Arc<dyn StatsProvider>,
        model: Arc<PredictiveModel>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        PicksEngine {
            db,
            provider,
            model,
            publisher,
        }
    }

    /// Score one event: persist snapshots best-effort, blend the win
    /// probability, enumerate candidates, keep the best. Returns `None`
    /// when no valid candidate exists; an event never aborts the run.
    fn score_event(&self, event: UpcomingEvent) -> Option<ScoredEvent> {
        if let Err(e) = self.db.save_team_snapshot(&event.home) {
            warn!("Failed to save home snapshot for {}: {e:#}", event.event_id);
        }
        if let Err(e) = self.db.save_team_snapshot(&event.away) {
            warn!("Failed to save away snapshot for {}: {e:#}", event.event_id);
        }
        if let Err(e) = self.db.save_event_snapshot(&event) {
            warn!("Failed to save event snapshot for {}: {e:#}", event.event_id);
        }

        let home_win_prob = blend::home_win_probability(&self.model, &event.home, &event.away);
        let candidates = markets::enumerate_candidates(&event, home_win_prob);
        let best = match selector::best_candidate(&candidates) {
            Some(best) => best,
            None => {
                warn!("Event {} produced no valid candidates, skipping", event.event_id);
                return None;
            }
        };
        debug!(
            "Scored {} vs {}: p_home={:.3}, best {} {} EV {:+.3}",
            event.home.name,
            event.away.name,
            home_win_prob,
            best.market.as_str(),
            best.side.as_str(),
            best.expected_value
        );
        Some(ScoredEvent { event, best })
    }

    /// Generate up to `requested` picks (clamped to [1, 3]) for the date.
    ///
    /// Events are scored concurrently and joined before the cross-event
    /// ranking. Only a provider failure propagates; everything else
    /// degrades per event.
    pub async fn generate_picks(&self, date: NaiveDate, requested: usize) -> Result<Vec<Pick>> {
        let events = self.provider.fetch_upcoming_events(date).await?;
        info!(
            "Fetched {} upcoming event(s) for {} from {}",
            events.len(),
            date,
            self.provider.name()
        );

        let score_futures: Vec<_> = events
            .into_iter()
            .map(|event| async move { self.score_event(event) })
            .collect();
        let scored: Vec<ScoredEvent> = join_all(score_futures)
            .await
            .into_iter()
            .flatten()
            .collect();

        let selected = selector::select_top(scored, requested);
        let picks: Vec<Pick> = selected.iter().map(build_pick).collect();
        for pick in &picks {
            info!(
                "Pick: {} ({}% confidence) — {}",
                pick.prediction, pick.confidence, pick.reasoning
            );
        }
        Ok(picks)
    }

    /// Generate, persist, and publish one slate of picks.
    pub async fn run_once(&self, date: NaiveDate, requested: usize) -> Result<Vec<Pick>> {
        let mut picks = self.generate_picks(date, requested).await?;
        for pick in &mut picks {
            match self.db.insert_pick(pick) {
                Ok(id) => pick.id = Some(id),
                Err(e) => warn!("Failed to persist pick '{}': {e:#}", pick.prediction),
            }
        }
        if let Err(e) = self.publisher.publish(&picks).await {
            warn!("Publishing via {} failed: {e:#}", self.publisher.name());
        }
        match self.db.get_record() {
            Ok(record) => info!(
                "Record to date: {}-{} ({} pick(s) pending)",
                record.won,
                record.graded - record.won,
                record.pending
            ),
            Err(e) => warn!("Failed to read pick record: {e:#}"),
        }
        Ok(picks)
    }

    /// Kick off a background training run when the model is stale.
    /// Fire-and-forget: every failure is logged, none propagate.
    pub fn maybe_spawn_training(&self) {
        if !self.model.needs_training() {
            return;
        }
        info!("Model is stale or untrained; scheduling a training run");
        let provider = Arc::clone(&self.provider);
        let model = Arc::clone(&self.model);
        tokio::spawn(run_training(provider, model));
    }

    /// Train inline when the model is stale; used by one-shot runs where a
    /// spawned task would be dropped at process exit. Never propagates.
    pub async fn train_if_stale(&self) {
        if !self.model.needs_training() {
            return;
        }
        run_training(Arc::clone(&self.provider), Arc::clone(&self.model)).await;
    }
}

async fn run_training(provider: Arc<dyn StatsProvider>, model: Arc<PredictiveModel>) {
    let games: Vec<CompletedGame> = match provider.fetch_completed_games(TRAINING_FETCH_LIMIT).await
    {
        Ok(games) => games,
        Err(e) => {
            warn!("Training data fetch failed: {e:#}");
            return;
        }
    };
    let outcome = tokio::task::spawn_blocking(move || model.train(&games)).await;
    match outcome {
        Ok(Ok(report)) => info!("Training finished over {} games", report.rows),
        Ok(Err(TrainError::AlreadyTraining)) => {
            debug!("Training already in progress, skipping")
        }
        Ok(Err(e)) => warn!("Training skipped: {e}"),
        Err(e) => error!("Training task panicked: {e}"),
    }
}

fn build_pick(scored: &ScoredEvent) -> Pick {
    let event = &scored.event;
    let bet = &scored.best;
    Pick {
        id: None,
        event_id: event.event_id.clone(),
        home_team: event.home.name.clone(),
        away_team: event.away.name.clone(),
        market: bet.market,
        side: bet.side,
        odds: bet.odds,
        line: bet.line,
        confidence: selector::confidence(bet.probability),
        prediction: formatter::prediction(event, bet),
        reasoning: formatter::reasoning(event, bet),
        created_at: Utc::now(),
        result: PickResult::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        CompletedGame, EventOdds, GameResult, Market, Side, TeamSnapshot, UpcomingEvent,
    };
    use crate::store::DbModelStore;
    use async_trait::async_trait;

    struct MockProvider {
        events: Vec<UpcomingEvent>,
        games: Vec<CompletedGame>,
        fail: bool,
    }

    #[async_trait]
    impl StatsProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }
        async fn fetch_upcoming_events(&self, _date: NaiveDate) -> Result<Vec<UpcomingEvent>> {
            if self.fail {
                anyhow::bail!("provider down");
            }
            Ok(self.events.clone())
        }
        async fn fetch_completed_games(&self, limit: usize) -> Result<Vec<CompletedGame>> {
            Ok(self.games.iter().take(limit).cloned().collect())
        }
    }

    struct NullPublisher;

    #[async_trait]
    impl Publisher for NullPublisher {
        fn name(&self) -> &str {
            "null"
        }
        async fn publish(&self, _picks: &[Pick]) -> Result<()> {
            Ok(())
        }
    }

    fn balanced_team(name: &str) -> TeamSnapshot {
        TeamSnapshot {
            name: name.into(),
            wins: 10,
            losses: 10,
            points_for: Some(110.0),
            points_against: Some(110.0),
            recent_results: None,
            injured_starters: 0,
            home_advantage: Some(0.0),
        }
    }

    fn pickem_event(id: &str) -> UpcomingEvent {
        UpcomingEvent {
            event_id: id.into(),
            starts_at: Utc::now(),
            home: balanced_team("Home"),
            away: balanced_team("Away"),
            odds: EventOdds {
                home_moneyline: -110,
                away_moneyline: -110,
                home_spread: 0.0,
                home_spread_odds: -110,
                away_spread_odds: -110,
                // Combined expected score for two 110/110 teams
                total_line: 220.0,
                over_odds: -110,
                under_odds: -110,
            },
        }
    }

    fn engine_with(events: Vec<UpcomingEvent>, fail: bool) -> (PicksEngine, Database) {
        let db = Database::open_in_memory().unwrap();
        let model = Arc::new(PredictiveModel::load_or_init(vec![Box::new(
            DbModelStore::new(db.clone()),
        )]));
        let provider = Arc::new(MockProvider {
            events,
            games: vec![],
            fail,
        });
        let engine = PicksEngine::new(db.clone(), provider, model, Arc::new(NullPublisher));
        (engine, db)
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[tokio::test]
    async fn pick_em_event_yields_near_zero_ev_and_floor_confidence() {
        // Scenario: equal teams, pick-em spread, -110 both sides, total at
        // the expected combined score. Nothing has an edge.
        let (engine, _db) = engine_with(vec![pickem_event("e1")], false);
        let picks = engine.generate_picks(today(), 1).await.unwrap();
        assert_eq!(picks.len(), 1);
        let pick = &picks[0];
        assert!(
            (51..=55).contains(&pick.confidence),
            "confidence {} out of expected band",
            pick.confidence
        );
        // Best EV at a fair coin and -110 juice is about -0.045
        assert!(pick.reasoning.contains("EV -0.05"));
    }

    #[tokio::test]
    async fn strong_home_edge_selects_home_moneyline() {
        // Scenario: statistical inputs force p_home to 0.80 against +150
        // home odds (implied 40%) — a heavily mispriced favorite.
        let mut event = pickem_event("edge");
        event.home = TeamSnapshot {
            name: "Home".into(),
            wins: 37,
            losses: 13,
            points_for: Some(115.0),
            points_against: Some(105.0),
            recent_results: Some(vec![GameResult::Win; 5]),
            injured_starters: 0,
            home_advantage: Some(0.0),
        };
        event.away = TeamSnapshot {
            name: "Away".into(),
            wins: 13,
            losses: 37,
            points_for: Some(105.0),
            points_against: Some(105.0),
            recent_results: Some(vec![
                GameResult::Win,
                GameResult::Win,
                GameResult::Win,
                GameResult::Loss,
                GameResult::Loss,
            ]),
            injured_starters: 0,
            home_advantage: None,
        };
        event.odds.home_moneyline = 150;
        event.odds.away_moneyline = -200;
        event.odds.home_spread = -2.0;
        // Expected total for these teams: (115+105)/2 + (105+105)/2 = 215
        event.odds.total_line = 215.0;

        let (engine, _db) = engine_with(vec![event], false);
        let picks = engine.generate_picks(today(), 1).await.unwrap();
        assert_eq!(picks.len(), 1);
        let pick = &picks[0];
        assert_eq!(pick.market, Market::Moneyline);
        assert_eq!(pick.side, Side::Home);
        assert_eq!(pick.odds, 150);
        assert_eq!(pick.confidence, 80);
        // EV = 0.8 * 1.5 - 0.2 = 1.0 per unit
        assert!(pick.reasoning.contains("EV +1.00"));
    }

    #[tokio::test]
    async fn requesting_more_picks_than_events_returns_one_per_event() {
        let (engine, _db) = engine_with(vec![pickem_event("a"), pickem_event("b")], false);
        let picks = engine.generate_picks(today(), 5).await.unwrap();
        assert_eq!(picks.len(), 2);
        assert_ne!(picks[0].event_id, picks[1].event_id);
    }

    #[tokio::test]
    async fn requested_zero_still_returns_one_pick() {
        let (engine, _db) = engine_with(vec![pickem_event("a"), pickem_event("b")], false);
        let picks = engine.generate_picks(today(), 0).await.unwrap();
        assert_eq!(picks.len(), 1);
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let (engine, _db) = engine_with(vec![], true);
        assert!(engine.generate_picks(today(), 3).await.is_err());
    }

    #[tokio::test]
    async fn run_once_persists_picks_before_returning() {
        let (engine, db) = engine_with(vec![pickem_event("a")], false);
        let picks = engine.run_once(today(), 1).await.unwrap();
        assert_eq!(picks.len(), 1);
        assert!(picks[0].id.is_some());
        let stored = db.list_recent_picks(10).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].event_id, "a");
        assert_eq!(stored[0].result, crate::db::models::PickResult::Pending);
    }
}
