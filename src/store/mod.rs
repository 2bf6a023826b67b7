//! Persistence backends for trained model weights.
//!
//! Weight saves try a primary store first and fall back to a secondary;
//! when both fail the freshly trained weights simply stay in memory,
//! which is logged but is not an error.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::db::Database;
use crate::engine::network::Network;

/// Serialized envelope for a trained parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedWeights {
    pub last_trained_at: DateTime<Utc>,
    pub network: Network,
}

pub trait ModelStore: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Load weights previously saved under `model`, `None` when absent.
    fn load(&self, model: &str) -> Result<Option<TrainedWeights>>;

    /// Persist weights under `model`, overwriting any previous save.
    fn save(&self, model: &str, weights: &TrainedWeights) -> Result<()>;
}

/// Primary store: one JSON file per model under a configurable directory.
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileModelStore { dir: dir.into() }
    }

    fn path_for(&self, model: &str) -> PathBuf {
        self.dir.join(format!("{model}.json"))
    }
}

impl ModelStore for FileModelStore {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self, model: &str) -> Result<Option<TrainedWeights>> {
        let path = self.path_for(model);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let weights = serde_json::from_str(&raw)
            .with_context(|| format!("corrupt weight file {}", path.display()))?;
        Ok(Some(weights))
    }

    fn save(&self, model: &str, weights: &TrainedWeights) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path_for(model);
        let raw = serde_json::to_string(weights)?;
        std::fs::write(&path, raw)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Secondary store: a row in the repository's `model_weights` table.
pub struct DbModelStore {
    db: Database,
}

impl DbModelStore {
    pub fn new(db: Database) -> Self {
        DbModelStore { db }
    }
}

impl ModelStore for DbModelStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn load(&self, model: &str) -> Result<Option<TrainedWeights>> {
        match self.db.load_model_weights(model)? {
            Some(payload) => {
                let weights =
                    serde_json::from_str(&payload).context("corrupt weight row in sqlite")?;
                Ok(Some(weights))
            }
            None => Ok(None),
        }
    }

    fn save(&self, model: &str, weights: &TrainedWeights) -> Result<()> {
        let payload = serde_json::to_string(weights)?;
        self.db.save_model_weights(model, &payload)
    }
}

/// Load the first available copy of `model`, scanning stores in order.
pub fn load_first(stores: &[Box<dyn ModelStore>], model: &str) -> Option<TrainedWeights> {
    for store in stores {
        match store.load(model) {
            Ok(Some(weights)) => {
                info!(
                    "Loaded model '{}' from {} store (trained {})",
                    model,
                    store.name(),
                    weights.last_trained_at
                );
                return Some(weights);
            }
            Ok(None) => {}
            Err(e) => warn!("Model load from {} store failed: {e:#}", store.name()),
        }
    }
    None
}

/// Save through the first store that accepts the write. Returns whether
/// any store persisted the weights.
pub fn save_tiered(stores: &[Box<dyn ModelStore>], model: &str, weights: &TrainedWeights) -> bool {
    for store in stores {
        match store.save(model, weights) {
            Ok(()) => {
                info!("Persisted model '{}' to {} store", model, store.name());
                return true;
            }
            Err(e) => warn!("Model save to {} store failed: {e:#}", store.name()),
        }
    }
    warn!("All weight stores failed for '{model}'; keeping weights in memory only");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn weights() -> TrainedWeights {
        let mut rng = StdRng::seed_from_u64(5);
        TrainedWeights {
            last_trained_at: Utc::now(),
            network: Network::new(&mut rng),
        }
    }

    #[test]
    fn db_store_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let store = DbModelStore::new(db);
        assert!(store.load("m").unwrap().is_none());
        let w = weights();
        store.save("m", &w).unwrap();
        let loaded = store.load("m").unwrap().unwrap();
        assert_eq!(loaded.last_trained_at, w.last_trained_at);
    }

    #[test]
    fn tiered_save_falls_back_to_secondary() {
        struct FailingStore;
        impl ModelStore for FailingStore {
            fn name(&self) -> &str {
                "failing"
            }
            fn load(&self, _: &str) -> Result<Option<TrainedWeights>> {
                anyhow::bail!("down")
            }
            fn save(&self, _: &str, _: &TrainedWeights) -> Result<()> {
                anyhow::bail!("down")
            }
        }

        let db = Database::open_in_memory().unwrap();
        let stores: Vec<Box<dyn ModelStore>> =
            vec![Box::new(FailingStore), Box::new(DbModelStore::new(db))];
        assert!(save_tiered(&stores, "m", &weights()));
        assert!(load_first(&stores, "m").is_some());
    }

    #[test]
    fn tiered_save_tolerates_total_failure() {
        struct FailingStore;
        impl ModelStore for FailingStore {
            fn name(&self) -> &str {
                "failing"
            }
            fn load(&self, _: &str) -> Result<Option<TrainedWeights>> {
                anyhow::bail!("down")
            }
            fn save(&self, _: &str, _: &TrainedWeights) -> Result<()> {
                anyhow::bail!("down")
            }
        }
        let stores: Vec<Box<dyn ModelStore>> = vec![Box::new(FailingStore)];
        assert!(!save_tiered(&stores, "m", &weights()));
        assert!(load_first(&stores, "m").is_none());
    }
}
