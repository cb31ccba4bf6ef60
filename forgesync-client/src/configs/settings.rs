use std::error::Error;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    /// Base URL of the remote device registry collection
    pub base_url: String,
    /// Per-request timeout; a stalled request must not starve a poll cycle
    pub timeout_secs: u64,
}

impl Store {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poller {
    pub interval_ms: u64,
}

impl Poller {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub store: Store,
    pub poller: Poller,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let mut settings: Settings = toml::from_str(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../",
            "configs/default.toml"
        )))?;

        if let Ok(url) = std::env::var("FORGESYNC_STORE_URL") {
            settings.store.base_url = url;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_parse() {
        let settings = Settings::new().unwrap();
        assert!(!settings.store.base_url.is_empty());
        assert_eq!(settings.poller.interval(), Duration::from_millis(2000));
        assert_eq!(settings.store.timeout(), Duration::from_secs(5));
    }
}
