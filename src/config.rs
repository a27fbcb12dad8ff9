//! Organizer configuration
//!
//! Defaults are tuned for the desktop app. Every value can be overridden
//! through environment variables (a `.env` file is honoured during development).

use std::path::PathBuf;
use std::time::Duration;

/// How long a completed ghost entry stays visible before it is removed
pub const DEFAULT_GHOST_SETTLE_MS: u64 = 1500;
/// Grace period between marking a job completed and clearing its record
pub const DEFAULT_JOB_CLEAR_DELAY_MS: u64 = 2000;
/// Capacity of the advisory thought channel
pub const DEFAULT_THOUGHT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct OrganizerConfig {
    /// Settle delay for completed ghost entries
    pub ghost_settle_delay: Duration,
    /// Delay before a completed job record is cleared
    pub job_clear_delay: Duration,
    /// Bounded capacity of the thought event channel
    pub thought_capacity: usize,
    /// Whether a run waits for the user to choose a strategy before scanning
    pub require_instruction: bool,
    /// Directory holding the job ledger
    pub job_dir: PathBuf,
}

impl OrganizerConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        // During development the CWD is the project root; check it first
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_path("../.env");
        }

        let mut config = Self::default();

        if let Some(ms) = env_parse::<u64>("SENTINEL_GHOST_SETTLE_MS") {
            config.ghost_settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("SENTINEL_JOB_CLEAR_DELAY_MS") {
            config.job_clear_delay = Duration::from_millis(ms);
        }
        if let Some(capacity) = env_parse::<usize>("SENTINEL_THOUGHT_CAPACITY") {
            config.thought_capacity = capacity.max(1);
        }
        if let Some(required) = env_parse::<bool>("SENTINEL_REQUIRE_INSTRUCTION") {
            config.require_instruction = required;
        }
        if let Ok(dir) = std::env::var("SENTINEL_JOB_DIR") {
            if !dir.is_empty() {
                config.job_dir = PathBuf::from(dir);
            }
        }

        config
    }

    /// Default ledger directory (~/.config/sentinel/)
    pub fn default_job_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sentinel")
    }
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            ghost_settle_delay: Duration::from_millis(DEFAULT_GHOST_SETTLE_MS),
            job_clear_delay: Duration::from_millis(DEFAULT_JOB_CLEAR_DELAY_MS),
            thought_capacity: DEFAULT_THOUGHT_CAPACITY,
            require_instruction: false,
            job_dir: Self::default_job_dir(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = %key, value = %raw, "Ignoring unparseable config override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrganizerConfig::default();
        assert_eq!(config.ghost_settle_delay, Duration::from_millis(1500));
        assert_eq!(config.job_clear_delay, Duration::from_millis(2000));
        assert_eq!(config.thought_capacity, 256);
        assert!(!config.require_instruction);
        assert!(config.job_dir.ends_with("sentinel"));
    }
}
