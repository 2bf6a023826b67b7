//! Trained win-probability model and its training lifecycle.
//!
//! The network weights sit behind a `RwLock` and are replaced wholesale when
//! a training run finishes: predictions in flight read the old parameter set,
//! never a half-updated one. An atomic Idle/Training flag makes a second
//! train request a no-op while one is running.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::models::{CompletedGame, TeamSnapshot};
use crate::engine::network::{Network, TrainConfig, TrainReport, INPUT_DIM};
use crate::engine::statistical::{points_against, points_for};
use crate::store::{self, ModelStore, TrainedWeights};

/// Name under which weights are persisted in every store.
pub const MODEL_NAME: &str = "home_win_mlp";

/// Retrain once weights are older than this.
const STALE_AFTER_DAYS: i64 = 7;
/// Training rows are capped at the most recent games.
const MAX_TRAINING_GAMES: usize = 1000;
/// Spread of the neutral fallback jitter around 0.5.
const NEUTRAL_JITTER: f64 = 0.1;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("model produced a non-finite output")]
    NonFinite,
    #[error("model weights are unavailable")]
    Unavailable,
}

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("a training run is already in progress")]
    AlreadyTraining,
    #[error("no completed games eligible for training")]
    NoTrainingData,
    #[error("training diverged; previous weights kept")]
    Diverged,
}

struct ModelState {
    network: Network,
    last_trained_at: Option<DateTime<Utc>>,
}

/// Shared, injectable predictive-model service.
pub struct PredictiveModel {
    state: RwLock<ModelState>,
    training: AtomicBool,
    stores: Vec<Box<dyn ModelStore>>,
}

/// Resets the in-progress flag on every exit path from `train`.
struct TrainingGuard<'a>(&'a AtomicBool);

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Feature vector shared by prediction and training: win percentages,
/// scoring rates (scaled to keep inputs near unit magnitude), and a
/// constant home indicator.
pub fn features(home: &TeamSnapshot, away: &TeamSnapshot) -> [f64; INPUT_DIM] {
    [
        home.win_pct(),
        away.win_pct(),
        points_for(home) / 100.0,
        points_for(away) / 100.0,
        points_against(home) / 100.0,
        points_against(away) / 100.0,
        1.0,
    ]
}

impl PredictiveModel {
    /// Construct from persisted weights if any store has them, otherwise
    /// start fresh and untrained. Never fails: a broken store degrades to
    /// the fresh path.
    pub fn load_or_init(stores: Vec<Box<dyn ModelStore>>) -> Self {
        let state = match store::load_first(&stores, MODEL_NAME) {
            Some(weights) => ModelState {
                network: weights.network,
                last_trained_at: Some(weights.last_trained_at),
            },
            None => {
                info!("No persisted weights found; starting with a fresh untrained model");
                ModelState {
                    network: Network::new(&mut rand::thread_rng()),
                    last_trained_at: None,
                }
            }
        };
        PredictiveModel {
            state: RwLock::new(state),
            training: AtomicBool::new(false),
            stores,
        }
    }

    /// True when the model has never been trained or its weights are older
    /// than the staleness window.
    pub fn needs_training(&self) -> bool {
        match self.state.read() {
            Ok(state) => match state.last_trained_at {
                Some(at) => Utc::now() - at > Duration::days(STALE_AFTER_DAYS),
                None => true,
            },
            Err(_) => true,
        }
    }

    pub fn last_trained_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().ok().and_then(|s| s.last_trained_at)
    }

    /// Home-win probability from the trained network, surfacing internal
    /// failures to the caller so fallback policy stays at the call site.
    pub fn try_predict(
        &self,
        home: &TeamSnapshot,
        away: &TeamSnapshot,
    ) -> Result<f64, PredictError> {
        let state = self.state.read().map_err(|_| PredictError::Unavailable)?;
        let p = state.network.predict(&features(home, away));
        if p.is_finite() {
            Ok(p)
        } else {
            Err(PredictError::NonFinite)
        }
    }

    /// Home-win probability from the trained network. Never errors: any
    /// internal failure degrades to a jittered neutral value so callers
    /// always receive a usable probability.
    pub fn predict(&self, home: &TeamSnapshot, away: &TeamSnapshot) -> f64 {
        match self.try_predict(home, away) {
            Ok(p) => p,
            Err(e) => {
                warn!("Prediction failed ({e}); returning jittered neutral");
                0.5 + rand::thread_rng().gen_range(-NEUTRAL_JITTER..NEUTRAL_JITTER)
            }
        }
    }

    /// Train on completed games and swap the new weights in atomically.
    ///
    /// A call while another run is in flight returns `AlreadyTraining`
    /// immediately; callers treat that as a no-op. Weights are persisted
    /// primary-then-secondary; a double persistence failure leaves the
    /// trained weights in memory and is not an error.
    pub fn train(&self, games: &[CompletedGame]) -> Result<TrainReport, TrainError> {
        if self
            .training
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TrainError::AlreadyTraining);
        }
        let _guard = TrainingGuard(&self.training);

        let recent = &games[..games.len().min(MAX_TRAINING_GAMES)];
        let mut rows = Vec::with_capacity(recent.len());
        let mut labels = Vec::with_capacity(recent.len());
        for game in recent {
            rows.push(features(&game.home, &game.away).to_vec());
            labels.push(if game.home_won() { 1.0 } else { 0.0 });
        }
        if rows.is_empty() {
            return Err(TrainError::NoTrainingData);
        }

        // Train a copy off-lock so in-flight predictions keep working
        // against the current weights.
        let mut candidate = match self.state.read() {
            Ok(state) => state.network.clone(),
            Err(_) => Network::new(&mut rand::thread_rng()),
        };
        let mut rng = rand::thread_rng();
        let report = candidate
            .fit(&rows, &labels, &TrainConfig::default(), &mut rng)
            .ok_or(TrainError::Diverged)?;

        let trained_at = Utc::now();
        let weights = TrainedWeights {
            last_trained_at: trained_at,
            network: candidate.clone(),
        };
        store::save_tiered(&self.stores, MODEL_NAME, &weights);

        if let Ok(mut state) = self.state.write() {
            state.network = candidate;
            state.last_trained_at = Some(trained_at);
        }
        info!(
            "Model trained on {} games (train loss {:.4}, validation loss {})",
            report.rows,
            report.train_loss,
            report
                .validation_loss
                .map(|l| format!("{l:.4}"))
                .unwrap_or_else(|| "n/a".into()),
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::store::DbModelStore;

    fn team(name: &str, wins: u32, losses: u32) -> TeamSnapshot {
        TeamSnapshot {
            name: name.into(),
            wins,
            losses,
            points_for: None,
            points_against: None,
            recent_results: None,
            injured_starters: 0,
            home_advantage: None,
        }
    }

    fn game(home_wins: u32, home_won: bool) -> CompletedGame {
        CompletedGame {
            event_id: "g".into(),
            home: team("H", home_wins, 20 - home_wins.min(20)),
            away: team("A", 10, 10),
            home_score: if home_won { 100 } else { 90 },
            away_score: 95,
        }
    }

    fn fresh_model() -> PredictiveModel {
        let db = Database::open_in_memory().unwrap();
        PredictiveModel::load_or_init(vec![Box::new(DbModelStore::new(db))])
    }

    #[test]
    fn fresh_model_needs_training() {
        let model = fresh_model();
        assert!(model.needs_training());
        assert!(model.last_trained_at().is_none());
    }

    #[test]
    fn predict_always_returns_probability() {
        let model = fresh_model();
        let p = model.predict(&team("H", 12, 8), &team("A", 8, 12));
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn training_sets_timestamp_and_clears_staleness() {
        let model = fresh_model();
        let games: Vec<CompletedGame> = (0..40).map(|i| game(i % 20, i % 3 != 0)).collect();
        model.train(&games).unwrap();
        assert!(!model.needs_training());
        assert!(model.last_trained_at().is_some());
    }

    #[test]
    fn training_with_no_games_is_a_noop() {
        let model = fresh_model();
        let err = model.train(&[]).unwrap_err();
        assert!(matches!(err, TrainError::NoTrainingData));
        assert!(model.last_trained_at().is_none());
    }

    #[test]
    fn overlapping_training_is_rejected() {
        let model = fresh_model();
        model.training.store(true, Ordering::SeqCst);
        let games = vec![game(10, true)];
        let err = model.train(&games).unwrap_err();
        assert!(matches!(err, TrainError::AlreadyTraining));
        assert!(model.last_trained_at().is_none());
        model.training.store(false, Ordering::SeqCst);
    }

    #[test]
    fn trained_weights_survive_reload() {
        let db = Database::open_in_memory().unwrap();
        let model =
            PredictiveModel::load_or_init(vec![Box::new(DbModelStore::new(db.clone()))]);
        let games: Vec<CompletedGame> = (0..40).map(|i| game(i % 20, i % 2 == 0)).collect();
        model.train(&games).unwrap();

        let reloaded = PredictiveModel::load_or_init(vec![Box::new(DbModelStore::new(db))]);
        assert!(!reloaded.needs_training());
        assert_eq!(reloaded.last_trained_at(), model.last_trained_at());
    }
}
