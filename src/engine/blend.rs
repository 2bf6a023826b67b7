//! Combines the statistical and trained probability estimates.
//!
//! The trained model carries most of the weight when it is fresh; the
//! statistical model is the safety net whenever the trained model is stale
//! or failing. The 70/30 split is a deliberate design constant, not a
//! fitted value.

use tracing::{debug, warn};

use crate::db::models::TeamSnapshot;
use crate::engine::predictive::PredictiveModel;
use crate::engine::statistical::{self, PROB_CEIL, PROB_FLOOR};

const PREDICTIVE_WEIGHT: f64 = 0.7;
const STATISTICAL_WEIGHT: f64 = 0.3;

/// Calibrated home-win probability for one matchup. Always in [0.05, 0.95].
pub fn home_win_probability(
    model: &PredictiveModel,
    home: &TeamSnapshot,
    away: &TeamSnapshot,
) -> f64 {
    let statistical = statistical::home_win_probability(home, away);

    if model.needs_training() {
        debug!("Trained model is stale or untrained; using statistical estimate alone");
        return statistical;
    }

    match model.try_predict(home, away) {
        Ok(predictive) => (PREDICTIVE_WEIGHT * predictive + STATISTICAL_WEIGHT * statistical)
            .clamp(PROB_FLOOR, PROB_CEIL),
        Err(e) => {
            warn!("Trained model prediction failed ({e}); using statistical estimate alone");
            statistical
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CompletedGame;
    use crate::db::Database;
    use crate::store::DbModelStore;
    use approx::assert_relative_eq;

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

    fn untrained_model() -> PredictiveModel {
        let db = Database::open_in_memory().unwrap();
        PredictiveModel::load_or_init(vec![Box::new(DbModelStore::new(db))])
    }

    fn trained_model() -> PredictiveModel {
        let model = untrained_model();
        let games: Vec<CompletedGame> = (0..60)
            .map(|i| CompletedGame {
                event_id: format!("g{i}"),
                home: team("H", 8 + i % 10, 10),
                away: team("A", 10, 10),
                home_score: if i % 2 == 0 { 105 } else { 95 },
                away_score: 100,
            })
            .collect();
        model.train(&games).unwrap();
        model
    }

    #[test]
    fn untrained_model_falls_back_to_statistical_exactly() {
        let model = untrained_model();
        let home = team("Home", 15, 5);
        let away = team("Away", 5, 15);
        let blended = home_win_probability(&model, &home, &away);
        let statistical = statistical::home_win_probability(&home, &away);
        assert_relative_eq!(blended, statistical, epsilon = 1e-12);
    }

    #[test]
    fn trained_model_blends_seventy_thirty() {
        let model = trained_model();
        let home = team("Home", 12, 8);
        let away = team("Away", 8, 12);
        let blended = home_win_probability(&model, &home, &away);
        let statistical = statistical::home_win_probability(&home, &away);
        let predictive = model.try_predict(&home, &away).unwrap();
        let expected = (0.7 * predictive + 0.3 * statistical).clamp(PROB_FLOOR, PROB_CEIL);
        assert_relative_eq!(blended, expected, epsilon = 1e-12);
    }

    #[test]
    fn blend_stays_in_bounds() {
        let model = trained_model();
        for (hw, aw) in [(20u32, 0u32), (0, 20), (10, 10), (19, 1)] {
            let p = home_win_probability(&model, &team("H", hw, 20 - hw), &team("A", aw, 20 - aw));
            assert!((PROB_FLOOR..=PROB_CEIL).contains(&p), "out of bounds: {p}");
        }
    }
}
