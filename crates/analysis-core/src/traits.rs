use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{AnalysisError, AnalysisResult, CompanyProfile, FetchFailure, PriceSeries};

/// Daily close history lookup
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchFailure>;
}

/// Company metadata lookup (sector, industry, market cap, business summary)
#[async_trait]
pub trait CompanyProfileProvider: Send + Sync {
    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, FetchFailure>;
}

/// Symbols related to a subject by an external similarity graph, best first
#[async_trait]
pub trait RecommendationProvider: Send + Sync {
    async fn recommended_symbols(&self, symbol: &str) -> Result<Vec<String>, FetchFailure>;
}

/// Company identifiers listed in a peer-comparison table
#[async_trait]
pub trait PeerTableSource: Send + Sync {
    async fn peer_symbols(&self, symbol: &str) -> Result<Vec<String>, FetchFailure>;
}

/// Free text to a small keyword set
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    async fn extract_keywords(&self, text: &str, count: usize) -> Result<Vec<String>, FetchFailure>;
}

/// Free text to a dense vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, FetchFailure>;
}

/// Storage for completed analyses
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn save(&self, result: &AnalysisResult) -> Result<(), AnalysisError>;
    async fn recent(&self, limit: usize) -> Result<Vec<AnalysisResult>, AnalysisError>;
}
