use peer_discovery::{ResolverConfig, ScoringConfig};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Tunables for one analysis pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub resolver: ResolverConfig,
    pub scoring: ScoringConfig,
    /// Limit on any single collaborator call
    pub call_timeout: Duration,
    /// Limit on a whole `analyze` request
    pub request_deadline: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            scoring: ScoringConfig::default(),
            call_timeout: Duration::from_secs(15),
            request_deadline: Duration::from_secs(120),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl PipelineConfig {
    /// Defaults overridden by environment variables; unparseable values are ignored
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            resolver: ResolverConfig {
                min_candidates: env_or("PEER_MIN_CANDIDATES", defaults.resolver.min_candidates),
                max_unfiltered: env_or("PEER_MAX_UNFILTERED", defaults.resolver.max_unfiltered),
            },
            scoring: ScoringConfig {
                keyword_count: env_or("KEYWORD_COUNT", defaults.scoring.keyword_count),
                min_description_chars: env_or("MIN_DESCRIPTION_CHARS", defaults.scoring.min_description_chars),
                top_n: env_or("PEER_TOP_N", defaults.scoring.top_n),
                embedding_weight: env_or("EMBEDDING_WEIGHT", defaults.scoring.embedding_weight).clamp(0.0, 1.0),
            },
            call_timeout: Duration::from_secs(env_or("CALL_TIMEOUT_SECS", defaults.call_timeout.as_secs())),
            request_deadline: Duration::from_secs(env_or(
                "REQUEST_DEADLINE_SECS",
                defaults.request_deadline.as_secs(),
            )),
        }
    }
}
