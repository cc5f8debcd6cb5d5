use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_PEER_TABLE_BASE_URL: &str = "https://www.screener.in";
pub const DEFAULT_PEER_TABLE_SELECTOR: &str = "#peers table a[href*='/company/']";

/// Endpoints and limits for the market data and peer-table providers
#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub base_url: String,
    /// Requests per minute shared by all calls of one client
    pub rate_limit_per_minute: usize,
    pub timeout: Duration,
    pub peer_table_base_url: String,
    pub peer_table_selector: String,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limit_per_minute: 120,
            timeout: Duration::from_secs(30),
            peer_table_base_url: DEFAULT_PEER_TABLE_BASE_URL.to_string(),
            peer_table_selector: DEFAULT_PEER_TABLE_SELECTOR.to_string(),
        }
    }
}

impl MarketDataConfig {
    /// Defaults overridden by `MARKET_DATA_*` / `PEER_TABLE_*` variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("MARKET_DATA_BASE_URL").unwrap_or(defaults.base_url),
            rate_limit_per_minute: env::var("MARKET_DATA_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_per_minute),
            timeout: env::var("MARKET_DATA_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            peer_table_base_url: env::var("PEER_TABLE_BASE_URL").unwrap_or(defaults.peer_table_base_url),
            peer_table_selector: env::var("PEER_TABLE_SELECTOR").unwrap_or(defaults.peer_table_selector),
        }
    }
}
