use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub sync_interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}
