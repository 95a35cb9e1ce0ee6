use std::time::Duration;

use anyhow::Context;

/// Scheduler configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// How often expired recycle-bin entries are purged.
    pub cleanup_interval: Duration,
    /// How often the first deletion warning is sent.
    pub warning_interval: Duration,
    /// How often the final deletion warning is sent.
    pub final_warning_interval: Duration,
}

impl WorkerConfig {
    /// | Env Var                       | Default          |
    /// |-------------------------------|------------------|
    /// | `DATABASE_URL`                | (required)       |
    /// | `CLEANUP_INTERVAL_SECS`       | `86400` (daily)  |
    /// | `WARNING_INTERVAL_SECS`       | `86400` (daily)  |
    /// | `FINAL_WARNING_INTERVAL_SECS` | `21600` (6 h)    |
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        Ok(Self {
            database_url,
            cleanup_interval: interval_from_env("CLEANUP_INTERVAL_SECS", 86_400)?,
            warning_interval: interval_from_env("WARNING_INTERVAL_SECS", 86_400)?,
            final_warning_interval: interval_from_env("FINAL_WARNING_INTERVAL_SECS", 21_600)?,
        })
    }
}

fn interval_from_env(name: &str, default_secs: u64) -> anyhow::Result<Duration> {
    let secs = match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .with_context(|| format!("{name} must be a valid u64"))?,
        Err(_) => default_secs,
    };
    anyhow::ensure!(secs > 0, "{name} must be greater than 0");
    Ok(Duration::from_secs(secs))
}
