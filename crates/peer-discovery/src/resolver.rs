//! Peer Candidate Resolver
//!
//! Finds comparable companies for a subject by walking an ordered list of
//! strategies, from the most specific (same industry) to the least specific
//! (whatever the recommendation graph returned), until enough candidates
//! have been collected.

use analysis_core::{
    base_symbol, normalize_symbol, CompanyProfile, CompanyProfileProvider, DiscoverySource, Exchange,
    PeerCandidate, PeerTableSource, RecommendationProvider,
};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;

use crate::same_label;

/// One tier of the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverStrategy {
    /// Recommended companies in the subject's industry
    IndustryMatch,
    /// Recommended companies in the subject's sector
    SectorMatch,
    /// Companies listed in the subject's peer-comparison table
    PeerTable,
    /// Remaining recommended companies, in recommendation order
    Unfiltered,
}

impl ResolverStrategy {
    /// Default tier order
    pub fn default_order() -> Vec<ResolverStrategy> {
        vec![
            ResolverStrategy::IndustryMatch,
            ResolverStrategy::SectorMatch,
            ResolverStrategy::PeerTable,
            ResolverStrategy::Unfiltered,
        ]
    }

    fn source(&self) -> DiscoverySource {
        match self {
            ResolverStrategy::IndustryMatch => DiscoverySource::IndustryMatch,
            ResolverStrategy::SectorMatch => DiscoverySource::SectorMatch,
            ResolverStrategy::PeerTable => DiscoverySource::PeerTable,
            ResolverStrategy::Unfiltered => DiscoverySource::Unfiltered,
        }
    }

    fn uses_recommendations(&self) -> bool {
        !matches!(self, ResolverStrategy::PeerTable)
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Stop walking tiers once this many candidates are collected
    pub min_candidates: usize,
    /// Cap on candidates taken from the unfiltered tier
    pub max_unfiltered: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_candidates: 3,
            max_unfiltered: 10,
        }
    }
}

/// Subject profile plus the candidates found for it
#[derive(Debug, Clone)]
pub struct PeerResolution {
    pub subject: CompanyProfile,
    pub candidates: Vec<PeerCandidate>,
}

/// Data fetched once per resolution and shared by every tier
struct DiscoveryContext {
    subject: CompanyProfile,
    recommended: Vec<CompanyProfile>,
}

pub struct PeerResolver {
    profiles: Arc<dyn CompanyProfileProvider>,
    recommendations: Arc<dyn RecommendationProvider>,
    peer_table: Option<Arc<dyn PeerTableSource>>,
    strategies: Vec<ResolverStrategy>,
    config: ResolverConfig,
}

impl PeerResolver {
    pub fn new(
        profiles: Arc<dyn CompanyProfileProvider>,
        recommendations: Arc<dyn RecommendationProvider>,
        peer_table: Option<Arc<dyn PeerTableSource>>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            profiles,
            recommendations,
            peer_table,
            strategies: ResolverStrategy::default_order(),
            config,
        }
    }

    /// Replace the tier order
    pub fn with_strategies(mut self, strategies: Vec<ResolverStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn strategies(&self) -> &[ResolverStrategy] {
        &self.strategies
    }

    /// Candidates for `subject_symbol`, which must already carry its exchange suffix
    pub async fn resolve_peers(&self, subject_symbol: &str, exchange: Exchange) -> Vec<PeerCandidate> {
        self.resolve(subject_symbol, exchange).await.candidates
    }

    /// Resolve candidates and return them together with the subject profile.
    ///
    /// Never fails: every provider error is logged and treated as "no data".
    pub async fn resolve(&self, subject_symbol: &str, exchange: Exchange) -> PeerResolution {
        let context = self.load_context(subject_symbol).await;

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(base_symbol(subject_symbol));
        let mut candidates: Vec<PeerCandidate> = Vec::new();

        for strategy in &self.strategies {
            if candidates.len() >= self.config.min_candidates {
                break;
            }

            let batch = match strategy {
                ResolverStrategy::IndustryMatch => {
                    Self::matching(&context, &seen, |c| same_label(&c.industry, &context.subject.industry))
                }
                ResolverStrategy::SectorMatch => {
                    Self::matching(&context, &seen, |c| same_label(&c.sector, &context.subject.sector))
                }
                ResolverStrategy::PeerTable => self.peer_table_candidates(subject_symbol, exchange, &seen).await,
                ResolverStrategy::Unfiltered => Self::matching(&context, &seen, |_| true)
                    .into_iter()
                    .take(self.config.max_unfiltered)
                    .collect(),
            };

            let before = candidates.len();
            for profile in batch {
                if seen.insert(base_symbol(&profile.symbol)) {
                    candidates.push(PeerCandidate::from_profile(profile, strategy.source()));
                }
            }
            tracing::debug!(
                "{:?} added {} candidates for {} ({} total)",
                strategy,
                candidates.len() - before,
                subject_symbol,
                candidates.len()
            );
        }

        tracing::info!("Resolved {} peer candidates for {}", candidates.len(), subject_symbol);

        PeerResolution {
            subject: context.subject,
            candidates,
        }
    }

    async fn load_context(&self, subject_symbol: &str) -> DiscoveryContext {
        let needs_recommendations = self.strategies.iter().any(|s| s.uses_recommendations());

        let (subject, recommended_symbols) = tokio::join!(
            self.profile_or_bare(subject_symbol),
            async {
                if !needs_recommendations {
                    return Vec::new();
                }
                match self.recommendations.recommended_symbols(subject_symbol).await {
                    Ok(symbols) => symbols,
                    Err(e) => {
                        tracing::warn!("Recommendation lookup failed for {}: {}", subject_symbol, e);
                        Vec::new()
                    }
                }
            }
        );

        // Keep recommendation order; drop self-matches and case/suffix duplicates
        let subject_base = base_symbol(subject_symbol);
        let mut unique: HashSet<String> = HashSet::new();
        let symbols: Vec<String> = recommended_symbols
            .into_iter()
            .map(|s| normalize_symbol(&s))
            .filter(|s| !s.is_empty())
            .filter(|s| {
                let base = base_symbol(s);
                base != subject_base && unique.insert(base)
            })
            .collect();

        let recommended = join_all(symbols.iter().map(|s| self.profile_or_bare(s))).await;

        DiscoveryContext { subject, recommended }
    }

    async fn profile_or_bare(&self, symbol: &str) -> CompanyProfile {
        match self.profiles.company_profile(symbol).await {
            Ok(mut profile) => {
                profile.symbol = normalize_symbol(symbol);
                profile
            }
            Err(e) => {
                tracing::warn!("Profile lookup failed for {}: {}", symbol, e);
                CompanyProfile::bare(normalize_symbol(symbol))
            }
        }
    }

    fn matching<F>(context: &DiscoveryContext, seen: &HashSet<String>, predicate: F) -> Vec<CompanyProfile>
    where
        F: Fn(&CompanyProfile) -> bool,
    {
        context
            .recommended
            .iter()
            .filter(|c| !seen.contains(&base_symbol(&c.symbol)))
            .filter(|c| predicate(c))
            .cloned()
            .collect()
    }

    async fn peer_table_candidates(
        &self,
        subject_symbol: &str,
        exchange: Exchange,
        seen: &HashSet<String>,
    ) -> Vec<CompanyProfile> {
        let Some(peer_table) = &self.peer_table else {
            return Vec::new();
        };

        let identifiers = match peer_table.peer_symbols(subject_symbol).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("Peer table lookup failed for {}: {}", subject_symbol, e);
                return Vec::new();
            }
        };

        let mut unique: HashSet<String> = HashSet::new();
        let symbols: Vec<String> = identifiers
            .iter()
            .filter(|id| !id.trim().is_empty())
            .filter(|id| {
                let base = base_symbol(id);
                !seen.contains(&base) && unique.insert(base)
            })
            .map(|id| exchange.qualify(id))
            .collect();

        join_all(symbols.iter().map(|s| self.profile_or_bare(s))).await
    }
}
