//! Similarity Scorer
//!
//! Scores each candidate against the subject on a 0-100 scale. When both
//! business descriptions are long enough the score comes from keyword overlap
//! (optionally blended with embedding similarity); otherwise a coarse
//! industry/sector rule applies.

use analysis_core::{
    CompanyProfile, ConfidenceTier, EmbeddingProvider, KeywordExtractor, PeerCandidate, ScoreMethod, ScoredPeer,
};
use ml_client::cosine_similarity;
use std::sync::Arc;

use crate::keywords::KeywordCache;
use crate::same_label;

/// Score floor when the descriptions share nothing, or nothing is known
pub const BASELINE_SCORE: f64 = 10.0;
/// Base of the textual blend once any overlap exists
pub const TEXT_MATCH_BASE: f64 = 30.0;
/// Weight of textual similarity on top of the base
pub const TEXT_MATCH_WEIGHT: f64 = 0.7;
pub const INDUSTRY_MATCH_SCORE: f64 = 45.0;
pub const SECTOR_MATCH_SCORE: f64 = 25.0;

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Keywords extracted per company; also the overlap denominator
    pub keyword_count: usize,
    /// Minimum description length (characters) for textual scoring
    pub min_description_chars: usize,
    /// Peers kept after ranking
    pub top_n: usize,
    /// Share of embedding similarity in the textual score (0 disables it)
    pub embedding_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_count: 5,
            min_description_chars: 200,
            top_n: 5,
            embedding_weight: 0.0,
        }
    }
}

/// Pure scoring rules over already-extracted text signals
#[derive(Debug, Clone, Default)]
pub struct SimilarityScorer {
    config: ScoringConfig,
}

impl SimilarityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Whether a description is long enough to drive textual scoring
    pub fn is_reliable(&self, summary: Option<&str>) -> bool {
        summary
            .map(|s| s.trim().chars().count() >= self.config.min_description_chars)
            .unwrap_or(false)
    }

    /// Percentage of the keyword budget shared by both sets, with the shared keywords
    pub fn keyword_overlap(&self, subject: &[String], candidate: &[String]) -> (f64, Vec<String>) {
        let shared: Vec<String> = subject.iter().filter(|k| candidate.contains(k)).cloned().collect();
        if self.config.keyword_count == 0 {
            return (0.0, shared);
        }
        let overlap = (shared.len() as f64 / self.config.keyword_count as f64 * 100.0).min(100.0);
        (overlap, shared)
    }

    pub fn score(&self, subject: &CompanyProfile, candidate: PeerCandidate, cache: &KeywordCache) -> ScoredPeer {
        let subject_keywords = cache.keywords(&subject.symbol);
        let candidate_keywords = cache.keywords(&candidate.ticker);

        let textual = self.is_reliable(subject.business_summary.as_deref())
            && self.is_reliable(candidate.business_summary.as_deref())
            && !subject_keywords.is_empty()
            && !candidate_keywords.is_empty();

        let (score, method, shared_keywords) = if textual {
            let (overlap, shared) = self.keyword_overlap(subject_keywords, candidate_keywords);
            let similarity = self.blend_embedding(
                overlap,
                cache.embedding(&subject.symbol),
                cache.embedding(&candidate.ticker),
            );
            let score = if similarity > 0.0 {
                TEXT_MATCH_BASE + TEXT_MATCH_WEIGHT * similarity
            } else {
                BASELINE_SCORE
            };
            (score, ScoreMethod::KeywordOverlap, shared)
        } else {
            (coarse_score(subject, &candidate), ScoreMethod::SectorRule, Vec::new())
        };

        let score = score.clamp(0.0, 100.0);
        ScoredPeer {
            candidate,
            similarity_score: score,
            confidence_tier: ConfidenceTier::from_score(score),
            method,
            shared_keywords,
        }
    }

    fn blend_embedding(&self, overlap: f64, subject: Option<&[f64]>, candidate: Option<&[f64]>) -> f64 {
        let weight = self.config.embedding_weight.clamp(0.0, 1.0);
        if weight == 0.0 {
            return overlap;
        }
        match subject.zip(candidate).and_then(|(s, c)| cosine_similarity(s, c)) {
            Some(cosine) => (1.0 - weight) * overlap + weight * cosine.max(0.0) * 100.0,
            None => overlap,
        }
    }

    /// Score every candidate, then stable-sort descending and keep the top `top_n`
    pub fn rank(&self, subject: &CompanyProfile, candidates: Vec<PeerCandidate>, cache: &KeywordCache) -> Vec<ScoredPeer> {
        let mut scored: Vec<ScoredPeer> = candidates
            .into_iter()
            .map(|c| self.score(subject, c, cache))
            .collect();

        // Vec::sort_by is stable, so ties keep discovery order
        scored.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.config.top_n);
        scored
    }
}

/// Industry match beats sector match beats nothing
fn coarse_score(subject: &CompanyProfile, candidate: &PeerCandidate) -> f64 {
    if same_label(&subject.industry, &candidate.industry) {
        INDUSTRY_MATCH_SCORE
    } else if same_label(&subject.sector, &candidate.sector) {
        SECTOR_MATCH_SCORE
    } else {
        BASELINE_SCORE
    }
}

/// Scores and ranks a batch of candidates, fetching text signals first
pub struct PeerRanker {
    extractor: Arc<dyn KeywordExtractor>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    scorer: SimilarityScorer,
}

impl PeerRanker {
    pub fn new(
        extractor: Arc<dyn KeywordExtractor>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            extractor,
            embedder,
            scorer: SimilarityScorer::new(config),
        }
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Rank `candidates` against `subject`, best first
    pub async fn rank_peers(&self, subject: &CompanyProfile, candidates: Vec<PeerCandidate>) -> Vec<ScoredPeer> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let cache = self.build_cache(subject, &candidates).await;
        let ranked = self.scorer.rank(subject, candidates, &cache);

        tracing::info!(
            "Ranked {} peers for {} (top score {:.1})",
            ranked.len(),
            subject.symbol,
            ranked.first().map(|p| p.similarity_score).unwrap_or(0.0)
        );
        ranked
    }

    /// Only descriptions long enough to be scored textually are sent out,
    /// and none at all when the subject's own description is too short.
    async fn build_cache(&self, subject: &CompanyProfile, candidates: &[PeerCandidate]) -> KeywordCache {
        let Some(subject_summary) = subject
            .business_summary
            .as_deref()
            .filter(|s| self.scorer.is_reliable(Some(*s)))
        else {
            return KeywordCache::default();
        };

        let mut texts: Vec<(String, String)> = vec![(subject.symbol.clone(), subject_summary.to_string())];
        texts.extend(candidates.iter().filter_map(|c| {
            c.business_summary
                .as_deref()
                .filter(|s| self.scorer.is_reliable(Some(*s)))
                .map(|s| (c.ticker.clone(), s.to_string()))
        }));
        if texts.len() == 1 {
            return KeywordCache::default();
        }

        let embedder = if self.scorer.config().embedding_weight > 0.0 {
            self.embedder.as_deref()
        } else {
            None
        };

        KeywordCache::build(
            self.extractor.as_ref(),
            embedder,
            &texts,
            self.scorer.config().keyword_count,
        )
        .await
    }
}
