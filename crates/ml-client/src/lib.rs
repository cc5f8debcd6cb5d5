pub mod embeddings;
pub mod error;
pub mod keywords;

pub use embeddings::{cosine_similarity, EmbeddingClient};
pub use error::{MLError, MLResult};
pub use keywords::{normalize_keywords, KeywordClient};

use std::time::Duration;

/// Configuration for the text-analysis services
#[derive(Debug, Clone)]
pub struct MLConfig {
    pub keywords_url: String,
    /// Embedding similarity is optional; no URL means it is not used
    pub embeddings_url: Option<String>,
    pub timeout: Duration,
}

impl Default for MLConfig {
    fn default() -> Self {
        Self {
            keywords_url: std::env::var("ML_KEYWORDS_URL")
                .unwrap_or_else(|_| "http://localhost:8005".to_string()),
            embeddings_url: std::env::var("ML_EMBEDDINGS_URL").ok().filter(|u| !u.is_empty()),
            timeout: std::env::var("ML_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(10)),
        }
    }
}

/// Text-analysis clients used by peer scoring
#[derive(Clone)]
pub struct MLClient {
    pub keywords: KeywordClient,
    pub embeddings: Option<EmbeddingClient>,
}

impl MLClient {
    pub fn new(config: MLConfig) -> Self {
        Self {
            keywords: KeywordClient::new(config.keywords_url.clone(), config.timeout),
            embeddings: config
                .embeddings_url
                .clone()
                .map(|url| EmbeddingClient::new(url, config.timeout)),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MLConfig::default())
    }
}
