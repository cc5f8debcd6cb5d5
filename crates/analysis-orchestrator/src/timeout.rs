//! Per-call deadlines for collaborators.
//!
//! [`Timed`] wraps a provider and turns a call that overruns its budget into
//! `FetchFailure::Timeout`, so a hung provider is handled like any other
//! failed lookup.

use analysis_core::{
    CompanyProfile, CompanyProfileProvider, EmbeddingProvider, FetchFailure, KeywordExtractor, PeerTableSource,
    PriceHistoryProvider, PriceSeries, RecommendationProvider,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, FetchFailure>
where
    F: Future<Output = Result<T, FetchFailure>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(FetchFailure::Timeout(limit.as_millis() as u64)),
    }
}

pub struct Timed<P: ?Sized> {
    inner: Arc<P>,
    limit: Duration,
}

impl<P: ?Sized> Timed<P> {
    pub fn new(inner: Arc<P>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl PriceHistoryProvider for Timed<dyn PriceHistoryProvider> {
    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchFailure> {
        with_timeout(self.limit, self.inner.price_history(symbol, start, end)).await
    }
}

#[async_trait]
impl CompanyProfileProvider for Timed<dyn CompanyProfileProvider> {
    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, FetchFailure> {
        with_timeout(self.limit, self.inner.company_profile(symbol)).await
    }
}

#[async_trait]
impl RecommendationProvider for Timed<dyn RecommendationProvider> {
    async fn recommended_symbols(&self, symbol: &str) -> Result<Vec<String>, FetchFailure> {
        with_timeout(self.limit, self.inner.recommended_symbols(symbol)).await
    }
}

#[async_trait]
impl PeerTableSource for Timed<dyn PeerTableSource> {
    async fn peer_symbols(&self, symbol: &str) -> Result<Vec<String>, FetchFailure> {
        with_timeout(self.limit, self.inner.peer_symbols(symbol)).await
    }
}

#[async_trait]
impl KeywordExtractor for Timed<dyn KeywordExtractor> {
    async fn extract_keywords(&self, text: &str, count: usize) -> Result<Vec<String>, FetchFailure> {
        with_timeout(self.limit, self.inner.extract_keywords(text, count)).await
    }
}

#[async_trait]
impl EmbeddingProvider for Timed<dyn EmbeddingProvider> {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, FetchFailure> {
        with_timeout(self.limit, self.inner.embed(text)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowProfiles;

    #[async_trait]
    impl CompanyProfileProvider for SlowProfiles {
        async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, FetchFailure> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CompanyProfile::bare(symbol))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_becomes_timeout() {
        let inner: Arc<dyn CompanyProfileProvider> = Arc::new(SlowProfiles);
        let timed = Timed::new(inner, Duration::from_secs(5));

        let result = timed.company_profile("TCS.NS").await;

        assert_eq!(result, Err(FetchFailure::Timeout(5000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_budget_reports_milliseconds() {
        let inner: Arc<dyn CompanyProfileProvider> = Arc::new(SlowProfiles);
        let timed = Timed::new(inner, Duration::from_millis(250));

        let err = timed.company_profile("TCS.NS").await.unwrap_err();

        assert_eq!(err, FetchFailure::Timeout(250));
        assert_eq!(err.to_string(), "Timed out after 250ms");
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let result = with_timeout(Duration::from_secs(5), async { Ok::<_, FetchFailure>(42) }).await;
        assert_eq!(result, Ok(42));
    }
}
