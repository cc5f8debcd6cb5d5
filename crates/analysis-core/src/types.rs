use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exchange suffixes recognised when comparing ticker identity
const KNOWN_SUFFIXES: &[&str] = &[".NS", ".BO"];

/// Trim and uppercase a ticker.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Normalized ticker with any known exchange suffix removed.
///
/// `tcs.ns`, `TCS.BO` and `TCS` all share the base symbol `TCS`.
pub fn base_symbol(symbol: &str) -> String {
    let normalized = normalize_symbol(symbol);
    for suffix in KNOWN_SUFFIXES {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    normalized
}

/// Daily close for one trading date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Close history for one ticker over one window. Dates need not be contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Prices present on both sides for the same dates, ascending, all closes > 0
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedPrices {
    pub dates: Vec<NaiveDate>,
    pub subject: Vec<f64>,
    pub benchmark: Vec<f64>,
}

impl AlignedPrices {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Equal-length daily returns for subject and benchmark
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedReturnPair {
    pub subject: Vec<f64>,
    pub benchmark: Vec<f64>,
}

impl AlignedReturnPair {
    pub fn len(&self) -> usize {
        self.subject.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subject.is_empty()
    }
}

/// Regression statistics of subject returns against benchmark returns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaResult {
    pub beta: f64,
    pub alpha: Option<f64>,
    pub correlation: Option<f64>,
    pub r_squared: Option<f64>,
    /// Annualized (x sqrt(252)) standard deviation of subject daily returns
    pub volatility: Option<f64>,
    /// Number of return observations the regression used
    pub observations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub business_summary: Option<String>,
}

impl CompanyProfile {
    /// Profile carrying only a symbol, used when metadata lookup failed
    pub fn bare(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }
}

/// Which resolver tier produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoverySource {
    IndustryMatch,
    SectorMatch,
    PeerTable,
    Unfiltered,
}

/// A possible peer before scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerCandidate {
    pub ticker: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub business_summary: Option<String>,
    pub source: DiscoverySource,
}

impl PeerCandidate {
    pub fn from_profile(profile: CompanyProfile, source: DiscoverySource) -> Self {
        Self {
            ticker: profile.symbol,
            name: profile.name,
            sector: profile.sector,
            industry: profile.industry,
            market_cap: profile.market_cap,
            business_summary: profile.business_summary,
            source,
        }
    }

    pub fn base_symbol(&self) -> String {
        base_symbol(&self.ticker)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 50.0 => ConfidenceTier::High,
            s if s >= 30.0 => ConfidenceTier::Medium,
            _ => ConfidenceTier::Low,
        }
    }
}

/// Which scoring branch produced a similarity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreMethod {
    /// Both descriptions were long enough for textual similarity
    KeywordOverlap,
    /// Coarse industry/sector rule
    SectorRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPeer {
    #[serde(flatten)]
    pub candidate: PeerCandidate,
    /// 0 to 100
    pub similarity_score: f64,
    pub confidence_tier: ConfidenceTier,
    pub method: ScoreMethod,
    #[serde(default)]
    pub shared_keywords: Vec<String>,
}

/// A peer at any point of its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PeerRecord {
    Candidate(PeerCandidate),
    Scored(ScoredPeer),
}

impl PeerRecord {
    pub fn ticker(&self) -> &str {
        match self {
            PeerRecord::Candidate(c) => &c.ticker,
            PeerRecord::Scored(s) => &s.candidate.ticker,
        }
    }

    /// `None` until the peer has been scored
    pub fn confidence_tier(&self) -> Option<ConfidenceTier> {
        match self {
            PeerRecord::Candidate(_) => None,
            PeerRecord::Scored(s) => Some(s.confidence_tier),
        }
    }

    pub fn similarity_score(&self) -> Option<f64> {
        match self {
            PeerRecord::Candidate(_) => None,
            PeerRecord::Scored(s) => Some(s.similarity_score),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerBeta {
    pub peer: ScoredPeer,
    pub beta: BetaResult,
}

/// Listing exchange of the subject ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exchange {
    /// National Stock Exchange of India
    Nse,
    /// Bombay Stock Exchange
    Bse,
    Us,
}

impl Exchange {
    pub fn suffix(&self) -> &'static str {
        match self {
            Exchange::Nse => ".NS",
            Exchange::Bse => ".BO",
            Exchange::Us => "",
        }
    }

    /// Exchange to retry on when the primary listing has no data
    pub fn alternate(&self) -> Option<Exchange> {
        match self {
            Exchange::Nse => Some(Exchange::Bse),
            Exchange::Bse => Some(Exchange::Nse),
            Exchange::Us => None,
        }
    }

    pub fn benchmark_symbol(&self) -> &'static str {
        match self {
            Exchange::Nse => "^NSEI",
            Exchange::Bse => "^BSESN",
            Exchange::Us => "^GSPC",
        }
    }

    pub fn benchmark_name(&self) -> &'static str {
        match self {
            Exchange::Nse => "NIFTY 50",
            Exchange::Bse => "S&P BSE SENSEX",
            Exchange::Us => "S&P 500",
        }
    }

    /// Provider symbol for a bare or already-suffixed ticker on this exchange
    pub fn qualify(&self, ticker: &str) -> String {
        format!("{}{}", base_symbol(ticker), self.suffix())
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Nse => write!(f, "NSE"),
            Exchange::Bse => write!(f, "BSE"),
            Exchange::Us => write!(f, "US"),
        }
    }
}

impl FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nse" | "ns" | ".ns" => Ok(Exchange::Nse),
            "bse" | "bo" | ".bo" => Ok(Exchange::Bse),
            "us" | "nyse" | "nasdaq" => Ok(Exchange::Us),
            other => Err(format!("Unknown exchange '{}'. Use: nse, bse, us", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub subject_ticker: String,
    pub exchange: Exchange,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Terminal output of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub subject_ticker: String,
    /// Provider symbol that actually returned data (may use the alternate suffix)
    pub resolved_symbol: String,
    pub market_index_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub beta: f64,
    pub alpha: Option<f64>,
    pub correlation: Option<f64>,
    pub r_squared: Option<f64>,
    pub volatility: Option<f64>,
    pub observations: usize,
    pub peers: Vec<PeerBeta>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(ticker: &str) -> PeerCandidate {
        PeerCandidate {
            ticker: ticker.to_string(),
            name: None,
            sector: Some("Technology".to_string()),
            industry: None,
            market_cap: None,
            business_summary: None,
            source: DiscoverySource::SectorMatch,
        }
    }

    #[test]
    fn test_base_symbol_strips_known_suffixes() {
        assert_eq!(base_symbol("tcs"), "TCS");
        assert_eq!(base_symbol(" TCS.NS "), "TCS");
        assert_eq!(base_symbol("tcs.bo"), "TCS");
        assert_eq!(base_symbol("BRK.B"), "BRK.B");
    }

    #[test]
    fn test_exchange_qualify_and_alternate() {
        assert_eq!(Exchange::Nse.qualify("infy"), "INFY.NS");
        assert_eq!(Exchange::Bse.qualify("INFY.NS"), "INFY.BO");
        assert_eq!(Exchange::Us.qualify("aapl"), "AAPL");
        assert_eq!(Exchange::Nse.alternate(), Some(Exchange::Bse));
        assert_eq!(Exchange::Us.alternate(), None);
    }

    #[test]
    fn test_exchange_from_str() {
        assert_eq!("NSE".parse::<Exchange>().unwrap(), Exchange::Nse);
        assert_eq!(".bo".parse::<Exchange>().unwrap(), Exchange::Bse);
        assert!("lse".parse::<Exchange>().is_err());
    }

    #[test]
    fn test_confidence_tier_thresholds() {
        assert_eq!(ConfidenceTier::from_score(86.0), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_score(50.0), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_score(45.0), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(30.0), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(10.0), ConfidenceTier::Low);
    }

    #[test]
    fn test_unscored_peer_has_no_tier() {
        let unscored = PeerRecord::Candidate(candidate("WIPRO.NS"));
        assert_eq!(unscored.confidence_tier(), None);
        assert_eq!(unscored.similarity_score(), None);

        let scored = PeerRecord::Scored(ScoredPeer {
            candidate: candidate("WIPRO.NS"),
            similarity_score: 10.0,
            confidence_tier: ConfidenceTier::Low,
            method: ScoreMethod::SectorRule,
            shared_keywords: vec![],
        });
        assert_eq!(scored.confidence_tier(), Some(ConfidenceTier::Low));
        assert_eq!(scored.ticker(), "WIPRO.NS");
    }

    #[test]
    fn test_scored_peer_serializes_flat() {
        let scored = ScoredPeer {
            candidate: candidate("HCLTECH.NS"),
            similarity_score: 44.0,
            confidence_tier: ConfidenceTier::Medium,
            method: ScoreMethod::KeywordOverlap,
            shared_keywords: vec!["software".to_string()],
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["ticker"], "HCLTECH.NS");
        assert_eq!(json["confidence_tier"], "Medium");
    }
}
