//! Cache tuning knobs

use loyalty_core::{Error, Result};
use std::time::Duration;

const STALE_TIME_ENV: &str = "LOYALTY_CACHE_STALE_SECS";
const GC_TIME_ENV: &str = "LOYALTY_CACHE_GC_SECS";

/// How long fetched data stays fresh and how long unobserved entries linger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Data older than this is refetched on the next subscription
    pub stale_time: Duration,
    /// Entries without observers are evicted after this long
    pub gc_time: Duration,
}

impl CacheConfig {
    pub fn new(stale_time: Duration, gc_time: Duration) -> Self {
        Self { stale_time, gc_time }
    }

    /// Defaults overridden by `LOYALTY_CACHE_STALE_SECS` / `LOYALTY_CACHE_GC_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(secs) = lookup(STALE_TIME_ENV) {
            config.stale_time = parse_secs(STALE_TIME_ENV, &secs)?;
        }
        if let Some(secs) = lookup(GC_TIME_ENV) {
            config.gc_time = parse_secs(GC_TIME_ENV, &secs)?;
        }
        Ok(config)
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| Error::ConfigError(format!("{name}={raw:?}: {e}")))
}

impl Default for CacheConfig {
    fn default() -> Self {
        // 30 second freshness for loyalty data, 5 minute GC window
        Self::new(Duration::from_secs(30), Duration::from_secs(300))
    }
}
