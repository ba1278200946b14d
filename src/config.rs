use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Endpoints
    pub servers_stream_url: String,
    pub single_server_url: String,
    pub pins_url: String,

    // Fetch retry policy
    pub fetch_retry_attempts: usize,
    pub fetch_retry_delay_ms: u64,

    // Worker batching
    pub batch_interval_ms: u64,
    pub batch_size: usize,

    // Filter input debounce
    pub filter_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            servers_stream_url: "https://servers-frontend.fivem.net/api/servers/streamRedir/".to_string(),
            single_server_url: "https://servers-frontend.fivem.net/api/servers/single/".to_string(),
            pins_url: "https://runtime.fivem.net/pins.json".to_string(),
            fetch_retry_attempts: 10,
            fetch_retry_delay_ms: 2000,
            batch_interval_ms: 250,
            batch_size: 250,
            filter_debounce_ms: 150,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            servers_stream_url: env::var("SERVERS_STREAM_URL")
                .unwrap_or(defaults.servers_stream_url),

            single_server_url: env::var("SINGLE_SERVER_URL")
                .unwrap_or(defaults.single_server_url),

            pins_url: env::var("PINS_URL")
                .unwrap_or(defaults.pins_url),

            fetch_retry_attempts: env::var("FETCH_RETRY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_retry_attempts),

            fetch_retry_delay_ms: env::var("FETCH_RETRY_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_retry_delay_ms),

            batch_interval_ms: env::var("BATCH_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.batch_interval_ms),

            batch_size: env::var("BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&v: &usize| v > 0)
                .unwrap_or(defaults.batch_size),

            filter_debounce_ms: env::var("FILTER_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.filter_debounce_ms),
        }
    }

    pub fn fetch_retry_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_retry_delay_ms)
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.filter_debounce_ms)
    }

    pub fn single_server_endpoint(&self, address: &str) -> String {
        format!("{}{}", self.single_server_url, address)
    }
}
