use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod config;
mod db;
mod engine;
mod publish;
mod stats;
mod store;

use config::Config;
use db::Database;
use engine::predictive::PredictiveModel;
use engine::PicksEngine;
use publish::LogPublisher;
use stats::{OddsFeedApi, StatsProvider};
use store::{DbModelStore, FileModelStore, ModelStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    // Weight stores: file primary, sqlite secondary
    let stores: Vec<Box<dyn ModelStore>> = vec![
        Box::new(FileModelStore::new(&config.model_dir)),
        Box::new(DbModelStore::new(db.clone())),
    ];
    let model = Arc::new(PredictiveModel::load_or_init(stores));
    match model.last_trained_at() {
        Some(at) => info!("Predictive model loaded (last trained {})", at),
        None => info!("Predictive model starting untrained"),
    }

    // Stats/odds provider
    let provider: Arc<dyn StatsProvider> = Arc::new(OddsFeedApi::new(
        &config.stats_api_key,
        Some(&config.stats_api_url),
    )?);
    info!("Stats provider configured: {}", provider.name());

    let engine = PicksEngine::new(
        db.clone(),
        Arc::clone(&provider),
        Arc::clone(&model),
        Arc::new(LogPublisher),
    );

    if config.once {
        engine.train_if_stale().await;
        let today = chrono::Utc::now().date_naive();
        let picks = engine.run_once(today, config.picks_per_run).await?;
        info!("Generated {} pick(s)", picks.len());
        return Ok(());
    }

    // Main loop: pick generation on one cadence, training checks on another
    let mut run_interval = tokio::time::interval(Duration::from_secs(config.run_interval_secs));
    let mut training_interval =
        tokio::time::interval(Duration::from_secs(config.training_check_secs));
    run_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    training_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(
        "Entering main loop (picks every {}s, training checks every {}s)",
        config.run_interval_secs, config.training_check_secs
    );

    loop {
        tokio::select! {
            _ = run_interval.tick() => {
                let today = chrono::Utc::now().date_naive();
                match engine.run_once(today, config.picks_per_run).await {
                    Ok(picks) => info!("Run complete: {} pick(s) published", picks.len()),
                    Err(e) => error!("Pick generation run failed: {e:#}"),
                }
            }
            _ = training_interval.tick() => {
                engine.maybe_spawn_training();
            }
        }
    }
}
