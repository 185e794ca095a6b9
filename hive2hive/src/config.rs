use hive2hive_base::{err, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path as FsPath;
use std::time::Duration;

/// Session-wide tunables (top-level spec's "(expansion) Configuration"):
/// DHT put/get timeout and retry count, the `AsyncWrapper` worker pool
/// size, and the default TTL for new DHT entries. Loaded from TOML the same
/// way the original transaction subsystem's `Config` would have been.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dht_timeout_ms: u64,
    pub dht_retries: u32,
    pub worker_pool_size: usize,
    pub default_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dht_timeout_ms: 5_000,
            dht_retries: 3,
            worker_pool_size: 4,
            default_ttl_secs: 3_600,
        }
    }
}

impl Config {
    pub fn load(path: &FsPath) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| err(format!("reading config: {e}")))?;
        toml::from_str(&text).map_err(|e| err(format!("parsing config: {e}")))
    }

    pub fn dht_timeout(&self) -> Duration {
        Duration::from_millis(self.dht_timeout_ms)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.worker_pool_size, 4);
        assert!(config.dht_timeout() > Duration::from_millis(0));
    }
}
