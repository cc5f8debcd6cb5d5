use analysis_core::{normalize_symbol, EmbeddingProvider, KeywordExtractor};
use futures_util::future::join_all;
use ml_client::normalize_keywords;
use std::collections::HashMap;

/// Per-batch text signals keyed by normalized ticker.
///
/// Built once after all extraction calls have completed, then only read.
#[derive(Debug, Clone, Default)]
pub struct KeywordCache {
    keywords: HashMap<String, Vec<String>>,
    embeddings: HashMap<String, Vec<f64>>,
}

impl KeywordCache {
    /// Extract keywords (and embeddings, when a provider is given) for each
    /// `(ticker, text)` pair. Each ticker is looked up at most once; a failed
    /// lookup leaves that ticker without keywords.
    pub async fn build(
        extractor: &dyn KeywordExtractor,
        embedder: Option<&dyn EmbeddingProvider>,
        texts: &[(String, String)],
        keyword_count: usize,
    ) -> Self {
        let mut unique: Vec<(String, &str)> = Vec::new();
        for (ticker, text) in texts {
            let key = normalize_symbol(ticker);
            if !unique.iter().any(|(k, _)| *k == key) {
                unique.push((key, text.as_str()));
            }
        }

        let keyword_lookups = join_all(unique.iter().map(|(ticker, text)| async move {
            match extractor.extract_keywords(text, keyword_count).await {
                Ok(keywords) => Some((ticker.clone(), normalize_keywords(keywords, keyword_count))),
                Err(e) => {
                    tracing::warn!("Keyword extraction failed for {}: {}", ticker, e);
                    None
                }
            }
        }));

        let embedding_lookups = join_all(unique.iter().map(|(ticker, text)| async move {
            let embedder = embedder?;
            match embedder.embed(text).await {
                Ok(vector) if !vector.is_empty() => Some((ticker.clone(), vector)),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Embedding failed for {}: {}", ticker, e);
                    None
                }
            }
        }));

        let (keywords, embeddings) = tokio::join!(keyword_lookups, embedding_lookups);

        let cache = Self {
            keywords: keywords.into_iter().flatten().filter(|(_, k)| !k.is_empty()).collect(),
            embeddings: embeddings.into_iter().flatten().collect(),
        };
        tracing::debug!(
            "Keyword cache holds {} keyword sets and {} embeddings",
            cache.keywords.len(),
            cache.embeddings.len()
        );
        cache
    }

    /// Keywords for `ticker`; empty when extraction failed or was never attempted
    pub fn keywords(&self, ticker: &str) -> &[String] {
        self.keywords
            .get(&normalize_symbol(ticker))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn embedding(&self, ticker: &str) -> Option<&[f64]> {
        self.embeddings.get(&normalize_symbol(ticker)).map(Vec::as_slice)
    }

    pub fn insert_keywords(&mut self, ticker: &str, keywords: Vec<String>) {
        self.keywords.insert(normalize_symbol(ticker), keywords);
    }

    pub fn insert_embedding(&mut self, ticker: &str, embedding: Vec<f64>) {
        self.embeddings.insert(normalize_symbol(ticker), embedding);
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::FetchFailure;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeywordExtractor for CountingExtractor {
        async fn extract_keywords(&self, text: &str, count: usize) -> Result<Vec<String>, FetchFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("unavailable") {
                return Err(FetchFailure::Transport("service down".to_string()));
            }
            Ok(text.split_whitespace().take(count).map(str::to_string).collect())
        }
    }

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f64>, FetchFailure> {
            Ok(vec![text.len() as f64, 1.0])
        }
    }

    fn texts(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(t, x)| (t.to_string(), x.to_string())).collect()
    }

    #[tokio::test]
    async fn test_extracts_once_per_normalized_ticker() {
        let extractor = CountingExtractor {
            calls: AtomicUsize::new(0),
        };
        let input = texts(&[
            ("TCS.NS", "Software Consulting Cloud"),
            ("tcs.ns", "Software Consulting Cloud"),
            ("INFY.NS", "Consulting Outsourcing"),
        ]);

        let cache = KeywordCache::build(&extractor, None, &input, 5).await;

        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.keywords("TCS.NS"), ["software", "consulting", "cloud"]);
        assert_eq!(cache.keywords("infy.ns"), ["consulting", "outsourcing"]);
        assert_eq!(cache.embedding("TCS.NS"), None);
    }

    #[tokio::test]
    async fn test_failed_extraction_leaves_no_keywords() {
        let extractor = CountingExtractor {
            calls: AtomicUsize::new(0),
        };
        let input = texts(&[("WIPRO.NS", "service unavailable"), ("INFY.NS", "Consulting")]);

        let cache = KeywordCache::build(&extractor, None, &input, 5).await;

        assert!(cache.keywords("WIPRO.NS").is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_embeddings_collected_when_provider_present() {
        let extractor = CountingExtractor {
            calls: AtomicUsize::new(0),
        };
        let input = texts(&[("TCS.NS", "abc")]);

        let cache = KeywordCache::build(&extractor, Some(&FixedEmbedder), &input, 5).await;

        assert_eq!(cache.embedding("tcs.ns"), Some(&[3.0, 1.0][..]));
    }

    #[test]
    fn test_missing_ticker_is_empty() {
        let mut cache = KeywordCache::default();
        assert!(cache.is_empty());
        cache.insert_keywords("tcs", vec!["software".to_string()]);
        assert_eq!(cache.keywords("TCS"), ["software"]);
        assert!(cache.keywords("INFY").is_empty());
    }
}
