use analysis_core::{
    normalize_symbol, AnalysisError, AnalysisRequest, AnalysisResult, AnalysisStore, CompanyProfileProvider,
    EmbeddingProvider, Exchange, KeywordExtractor, PeerBeta, PeerTableSource, PriceHistoryProvider, PriceSeries,
    RecommendationProvider, ScoredPeer,
};
use chrono::{NaiveDate, Utc};
use futures_util::future::join_all;
use peer_discovery::{PeerRanker, PeerResolver, ResolverStrategy};
use quant_analysis::BetaCalculator;
use std::sync::Arc;

pub mod config;
pub mod history;
pub mod timeout;

pub use config::PipelineConfig;
pub use history::{InMemoryHistoryStore, SqliteHistoryStore};
pub use timeout::{with_timeout, Timed};

/// Where an analysis request currently is.
///
/// The last four variants are terminal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    FetchSubject,
    ComputeSubjectBeta,
    ResolvePeers,
    ScorePeers,
    ComputePeerBetas,
    Assemble,
    Done,
    SubjectDataMissing,
    InsufficientData,
    MarketDataMissing,
    DeadlineExceeded,
}

impl PipelineStage {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PipelineStage::SubjectDataMissing
                | PipelineStage::InsufficientData
                | PipelineStage::MarketDataMissing
                | PipelineStage::DeadlineExceeded
        )
    }

    pub fn is_terminal(&self) -> bool {
        *self == PipelineStage::Done || self.is_failure()
    }
}

/// External services the pipeline depends on
pub struct Collaborators {
    pub prices: Arc<dyn PriceHistoryProvider>,
    pub profiles: Arc<dyn CompanyProfileProvider>,
    pub recommendations: Arc<dyn RecommendationProvider>,
    /// Optional peer-comparison table; without it the resolver skips that tier
    pub peer_table: Option<Arc<dyn PeerTableSource>>,
    pub keywords: Arc<dyn KeywordExtractor>,
    pub embeddings: Option<Arc<dyn EmbeddingProvider>>,
}

/// Runs one beta analysis end to end: subject and benchmark prices, subject
/// beta, peer discovery, peer ranking and peer betas.
pub struct BetaOrchestrator {
    prices: Arc<dyn PriceHistoryProvider>,
    resolver: PeerResolver,
    ranker: PeerRanker,
    calculator: BetaCalculator,
    /// Optional store for completed analyses
    store: Option<Arc<dyn AnalysisStore>>,
    config: PipelineConfig,
}

impl BetaOrchestrator {
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        let limit = config.call_timeout;

        let prices: Arc<dyn PriceHistoryProvider> = Arc::new(Timed::new(collaborators.prices, limit));
        let profiles: Arc<dyn CompanyProfileProvider> = Arc::new(Timed::new(collaborators.profiles, limit));
        let recommendations: Arc<dyn RecommendationProvider> =
            Arc::new(Timed::new(collaborators.recommendations, limit));
        let peer_table = collaborators
            .peer_table
            .map(|p| Arc::new(Timed::new(p, limit)) as Arc<dyn PeerTableSource>);
        let keywords: Arc<dyn KeywordExtractor> = Arc::new(Timed::new(collaborators.keywords, limit));
        let embeddings = collaborators
            .embeddings
            .map(|e| Arc::new(Timed::new(e, limit)) as Arc<dyn EmbeddingProvider>);

        Self {
            prices,
            resolver: PeerResolver::new(profiles, recommendations, peer_table, config.resolver.clone()),
            ranker: PeerRanker::new(keywords, embeddings, config.scoring.clone()),
            calculator: BetaCalculator::new(),
            store: None,
            config,
        }
    }

    /// Save every completed analysis to `store`
    pub fn with_store(mut self, store: Arc<dyn AnalysisStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the resolver's tier order
    pub fn with_strategies(mut self, strategies: Vec<ResolverStrategy>) -> Self {
        self.resolver = self.resolver.with_strategies(strategies);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Most recent stored analyses; empty when no store is attached
    pub async fn recent_analyses(&self, limit: usize) -> Result<Vec<AnalysisResult>, AnalysisError> {
        match &self.store {
            Some(store) => store.recent(limit).await,
            None => Ok(Vec::new()),
        }
    }

    fn enter(&self, ticker: &str, stage: PipelineStage) {
        if stage.is_failure() {
            tracing::warn!("[{}] pipeline stopped at {:?}", ticker, stage);
        } else {
            tracing::info!("[{}] {:?}", ticker, stage);
        }
    }

    /// Run the full pipeline for `request` within the configured deadline
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let deadline = self.config.request_deadline;
        match tokio::time::timeout(deadline, self.run(request)).await {
            Ok(result) => result,
            Err(_) => {
                self.enter(&request.subject_ticker, PipelineStage::DeadlineExceeded);
                Err(AnalysisError::DeadlineExceeded(deadline.as_millis() as u64))
            }
        }
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let ticker = normalize_symbol(&request.subject_ticker);
        let (start, end) = (request.start_date, request.end_date);

        if start >= end {
            self.enter(&ticker, PipelineStage::InsufficientData);
            return Err(AnalysisError::InsufficientDataPoints {
                ticker,
                detail: format!("start date {} must be before end date {}", start, end),
            });
        }

        self.enter(&ticker, PipelineStage::FetchSubject);
        let benchmark_symbol = request.exchange.benchmark_symbol();
        let (subject, benchmark) = tokio::join!(
            self.fetch_with_fallback(&ticker, request.exchange, start, end),
            self.prices.price_history(benchmark_symbol, start, end),
        );

        let benchmark = match benchmark {
            Ok(series) if !series.is_empty() => series,
            other => {
                if let Err(e) = other {
                    tracing::warn!("Benchmark fetch failed for {}: {}", benchmark_symbol, e);
                }
                self.enter(&ticker, PipelineStage::MarketDataMissing);
                return Err(AnalysisError::NoMarketData {
                    symbol: benchmark_symbol.to_string(),
                    start,
                    end,
                });
            }
        };

        let (resolved_exchange, subject) = match subject {
            Ok(found) => found,
            Err(e) => {
                self.enter(&ticker, PipelineStage::SubjectDataMissing);
                return Err(e);
            }
        };

        self.enter(&ticker, PipelineStage::ComputeSubjectBeta);
        let subject_beta = match self.calculator.calculate(&subject, &benchmark) {
            Ok(beta) => beta,
            Err(e) => {
                self.enter(&ticker, PipelineStage::InsufficientData);
                return Err(AnalysisError::InsufficientDataPoints {
                    ticker,
                    detail: e.to_string(),
                });
            }
        };
        tracing::info!(
            "{} beta {:.3} against {} over {} observations",
            subject.symbol,
            subject_beta.beta,
            benchmark_symbol,
            subject_beta.observations
        );

        self.enter(&ticker, PipelineStage::ResolvePeers);
        let resolution = self.resolver.resolve(&subject.symbol, resolved_exchange).await;

        self.enter(&ticker, PipelineStage::ScorePeers);
        let ranked = self.ranker.rank_peers(&resolution.subject, resolution.candidates).await;

        self.enter(&ticker, PipelineStage::ComputePeerBetas);
        let peers: Vec<PeerBeta> = join_all(
            ranked
                .into_iter()
                .map(|peer| self.peer_beta(peer, &benchmark, start, end)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        self.enter(&ticker, PipelineStage::Assemble);
        let result = AnalysisResult {
            subject_ticker: ticker.clone(),
            resolved_symbol: subject.symbol.clone(),
            market_index_name: request.exchange.benchmark_name().to_string(),
            start_date: start,
            end_date: end,
            beta: subject_beta.beta,
            alpha: subject_beta.alpha,
            correlation: subject_beta.correlation,
            r_squared: subject_beta.r_squared,
            volatility: subject_beta.volatility,
            observations: subject_beta.observations,
            peers,
            generated_at: Utc::now(),
        };

        self.save_in_background(&result);

        self.enter(&ticker, PipelineStage::Done);
        Ok(result)
    }

    /// Fetch `ticker` on `exchange`, retrying once on the alternate exchange
    pub async fn fetch_with_fallback(
        &self,
        ticker: &str,
        exchange: Exchange,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Exchange, PriceSeries), AnalysisError> {
        let mut tried: Vec<String> = Vec::new();

        for listing in std::iter::once(exchange).chain(exchange.alternate()) {
            let symbol = listing.qualify(ticker);
            match self.prices.price_history(&symbol, start, end).await {
                Ok(series) if !series.is_empty() => {
                    if listing != exchange {
                        tracing::info!("{} has no data on {}, using {}", ticker, exchange, symbol);
                    }
                    return Ok((listing, series));
                }
                Ok(_) => tracing::warn!("No prices for {} between {} and {}", symbol, start, end),
                Err(e) => tracing::warn!("Price fetch failed for {}: {}", symbol, e),
            }
            tried.push(symbol);
        }

        Err(AnalysisError::NoSubjectData {
            ticker: normalize_symbol(ticker),
            tried,
            start,
            end,
        })
    }

    /// Beta for one ranked peer; `None` (logged) when its data is unusable
    async fn peer_beta(
        &self,
        peer: ScoredPeer,
        benchmark: &PriceSeries,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<PeerBeta> {
        let symbol = peer.candidate.ticker.clone();
        let series = match self.prices.price_history(&symbol, start, end).await {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!("Dropping peer {}: {}", symbol, e);
                return None;
            }
        };

        match self.calculator.calculate(&series, benchmark) {
            Ok(beta) => Some(PeerBeta { peer, beta }),
            Err(e) => {
                tracing::warn!("Dropping peer {}: {}", symbol, e);
                None
            }
        }
    }

    /// Fire-and-forget save; a storage failure never affects the returned result
    fn save_in_background(&self, result: &AnalysisResult) {
        let Some(store) = &self.store else {
            return;
        };
        let store = Arc::clone(store);
        let result = result.clone();

        tokio::spawn(async move {
            if let Err(e) = store.save(&result).await {
                tracing::warn!("Failed to store analysis for {}: {}", result.subject_ticker, e);
            }
        });
    }
}
