use clap::Parser;

/// Sports pick generation bot
#[derive(Parser, Debug, Clone)]
#[command(name = "picksmith", version, about)]
pub struct Config {
    /// Generate one slate of picks and exit instead of looping
    #[arg(long, env = "RUN_ONCE", default_value = "false")]
    pub once: bool,

    /// Number of picks to publish per run (clamped to 1-3)
    #[arg(long, env = "PICKS_PER_RUN", default_value = "3")]
    pub picks_per_run: usize,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "picksmith.db")]
    pub database_path: String,

    /// Directory for persisted model weights (primary store)
    #[arg(long, env = "MODEL_DIR", default_value = "models")]
    pub model_dir: String,

    /// Stats/odds API base URL
    #[arg(
        long,
        env = "STATS_API_URL",
        default_value = "https://api.oddsfeed.example.com/v1"
    )]
    pub stats_api_url: String,

    /// Stats/odds API key
    #[arg(long, env = "STATS_API_KEY", default_value = "demo")]
    pub stats_api_key: String,

    /// Seconds between pick-generation runs
    #[arg(long, env = "RUN_INTERVAL_SECS", default_value = "86400")]
    pub run_interval_secs: u64,

    /// Seconds between model staleness checks
    #[arg(long, env = "TRAINING_CHECK_SECS", default_value = "3600")]
    pub training_check_secs: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.picks_per_run == 0 || self.picks_per_run > 10 {
            anyhow::bail!("picks_per_run must be between 1 and 10");
        }
        if self.run_interval_secs == 0 {
            anyhow::bail!("run_interval_secs must be positive");
        }
        if self.training_check_secs == 0 {
            anyhow::bail!("training_check_secs must be positive");
        }
        if self.stats_api_key.trim().is_empty() {
            anyhow::bail!("STATS_API_KEY must not be empty");
        }
        Ok(())
    }
}
