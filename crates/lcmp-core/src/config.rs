use std::str::FromStr;
use std::time::Duration;

use crate::naming::NamingRules;
use crate::pool::PoolConfig;

pub const DEFAULT_MAX_WORKERS: usize = 10;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Upper bound on concurrent detail fetches per environment.
    pub max_workers: usize,
    /// Hard cap on every network call; an expired call counts as a failed fetch.
    pub call_timeout: Duration,
    /// Fetch and diff attached policies for matched pairs.
    pub compare_policies: bool,
    pub naming: NamingRules,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            compare_policies: true,
            naming: NamingRules::default(),
        }
    }
}

impl CompareConfig {
    /// Defaults overridden by `LCMP_MAX_WORKERS` and `LCMP_CALL_TIMEOUT_MS`.
    /// Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(workers) = env_parse::<usize>("LCMP_MAX_WORKERS") {
            config.max_workers = workers.max(1);
        }
        if let Some(ms) = env_parse::<u64>("LCMP_CALL_TIMEOUT_MS") {
            config.call_timeout = Duration::from_millis(ms);
        }
        config
    }

    pub fn with_naming(mut self, naming: NamingRules) -> Self {
        self.naming = naming;
        self
    }

    pub fn pool(&self) -> PoolConfig {
        PoolConfig {
            max_workers: self.max_workers.max(1),
            task_timeout: self.call_timeout,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
