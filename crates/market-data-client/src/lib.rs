pub mod config;
pub mod peer_table;
pub mod rate_limiter;

pub use config::MarketDataConfig;
pub use peer_table::PeerTableScraper;
pub use rate_limiter::RateLimiter;

use analysis_core::{
    CompanyProfile, CompanyProfileProvider, FetchFailure, PriceHistoryProvider, PricePoint,
    PriceSeries, RecommendationProvider,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Rate-limited HTTP transport shared by the provider clients
#[derive(Clone)]
pub(crate) struct ProviderHttp {
    client: Client,
    rate_limiter: RateLimiter,
}

impl ProviderHttp {
    pub(crate) fn new(timeout: Duration, rate_limiter: RateLimiter) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, rate_limiter }
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Send with rate limiting and up to three 429 retries, returning the body
    pub(crate) async fn get_text(&self, symbol: &str, builder: reqwest::RequestBuilder) -> Result<String, FetchFailure> {
        let request = builder.build().map_err(|e| FetchFailure::Transport(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| FetchFailure::Transport("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| FetchFailure::Transport(e.to_string()))?;

            let status = response.status();
            if status.as_u16() == 429 {
                let wait_secs = 5u64 * (attempt as u64 + 1);
                tracing::warn!("429 from {} for {}, waiting {}s before retry {}/3", request.url().host_str().unwrap_or("provider"), symbol, wait_secs, attempt + 1);
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                continue;
            }
            if status.as_u16() == 404 {
                return Err(FetchFailure::NoData(symbol.to_string()));
            }

            let text = response
                .text()
                .await
                .map_err(|e| FetchFailure::Transport(e.to_string()))?;
            if !status.is_success() {
                return Err(FetchFailure::Http {
                    status: status.as_u16(),
                    message: text.chars().take(200).collect(),
                });
            }
            return Ok(text);
        }

        Err(FetchFailure::RateLimited(format!("{} after 3 retries", symbol)))
    }
}

/// Yahoo-style market data client: daily chart, company profile, recommendation graph
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    http: ProviderHttp,
}

impl YahooClient {
    pub fn new(config: &MarketDataConfig) -> Self {
        Self::with_rate_limiter(config, RateLimiter::per_minute(config.rate_limit_per_minute))
    }

    pub fn with_rate_limiter(config: &MarketDataConfig, rate_limiter: RateLimiter) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http: ProviderHttp::new(config.timeout, rate_limiter),
        }
    }

    /// Daily closes between `start` and `end`, both inclusive
    pub async fn get_chart(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries, FetchFailure> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = (end + ChronoDuration::days(1)).and_time(NaiveTime::MIN).and_utc().timestamp();

        let body = self
            .http
            .get_text(
                symbol,
                self.http.client().get(&url).query(&[
                    ("period1", period1.to_string()),
                    ("period2", period2.to_string()),
                    ("interval", "1d".to_string()),
                    ("events", "history".to_string()),
                ]),
            )
            .await?;

        let series = parse_chart(symbol, &body)?;
        let in_range: Vec<PricePoint> = series
            .points
            .into_iter()
            .filter(|p| p.date >= start && p.date <= end)
            .collect();

        if in_range.is_empty() {
            return Err(FetchFailure::NoData(symbol.to_string()));
        }
        tracing::debug!("Fetched {} closes for {} ({} to {})", in_range.len(), symbol, start, end);
        Ok(PriceSeries::new(series.symbol, in_range))
    }

    pub async fn get_profile(&self, symbol: &str) -> Result<CompanyProfile, FetchFailure> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);
        let body = self
            .http
            .get_text(symbol, self.http.client().get(&url).query(&[("modules", "assetProfile,price")]))
            .await?;

        parse_profile(symbol, &body)
    }

    pub async fn get_recommendations(&self, symbol: &str) -> Result<Vec<String>, FetchFailure> {
        let url = format!("{}/v6/finance/recommendationsbysymbol/{}", self.base_url, symbol);
        let body = self.http.get_text(symbol, self.http.client().get(&url)).await?;

        parse_recommendations(&body)
    }
}

#[async_trait]
impl PriceHistoryProvider for YahooClient {
    async fn price_history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries, FetchFailure> {
        self.get_chart(symbol, start, end).await
    }
}

#[async_trait]
impl CompanyProfileProvider for YahooClient {
    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, FetchFailure> {
        self.get_profile(symbol).await
    }
}

#[async_trait]
impl RecommendationProvider for YahooClient {
    async fn recommended_symbols(&self, symbol: &str) -> Result<Vec<String>, FetchFailure> {
        self.get_recommendations(symbol).await
    }
}

/// Parse a chart response into a series of non-null closes
pub fn parse_chart(symbol: &str, body: &str) -> Result<PriceSeries, FetchFailure> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| FetchFailure::Parse(format!("chart for {}: {}", symbol, e)))?;

    if let Some(error) = response.chart.error {
        tracing::debug!("Chart error for {}: {} {}", symbol, error.code, error.description.unwrap_or_default());
        return Err(FetchFailure::NoData(symbol.to_string()));
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FetchFailure::NoData(symbol.to_string()))?;

    let offset = result.meta.as_ref().and_then(|m| m.gmtoffset).unwrap_or(0);
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let points: Vec<PricePoint> = result
        .timestamp
        .unwrap_or_default()
        .into_iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let close = close?;
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            Some(PricePoint { date, close })
        })
        .collect();

    if points.is_empty() {
        return Err(FetchFailure::NoData(symbol.to_string()));
    }

    let resolved = result
        .meta
        .and_then(|m| m.symbol)
        .unwrap_or_else(|| symbol.to_string());
    Ok(PriceSeries::new(resolved, points))
}

/// Parse a quote summary (assetProfile + price modules) into a profile
pub fn parse_profile(symbol: &str, body: &str) -> Result<CompanyProfile, FetchFailure> {
    let response: QuoteSummaryResponse =
        serde_json::from_str(body).map_err(|e| FetchFailure::Parse(format!("profile for {}: {}", symbol, e)))?;

    let result = response
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FetchFailure::NoData(symbol.to_string()))?;

    let asset = result.asset_profile.unwrap_or_default();
    let price = result.price.unwrap_or_default();

    Ok(CompanyProfile {
        symbol: symbol.to_string(),
        name: price.long_name.or(price.short_name),
        sector: asset.sector.filter(|s| !s.trim().is_empty()),
        industry: asset.industry.filter(|s| !s.trim().is_empty()),
        market_cap: price.market_cap.and_then(|m| m.raw),
        business_summary: asset.long_business_summary.filter(|s| !s.trim().is_empty()),
    })
}

/// Parse recommended symbols, best score first
pub fn parse_recommendations(body: &str) -> Result<Vec<String>, FetchFailure> {
    let response: RecommendationResponse =
        serde_json::from_str(body).map_err(|e| FetchFailure::Parse(format!("recommendations: {}", e)))?;

    let mut recommended: Vec<RecommendedSymbol> = response
        .finance
        .result
        .unwrap_or_default()
        .into_iter()
        .flat_map(|r| r.recommended_symbols)
        .collect();

    // Stable: equal scores keep provider order
    recommended.sort_by(|a, b| {
        b.score
            .unwrap_or(0.0)
            .partial_cmp(&a.score.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(recommended.into_iter().map(|r| r.symbol).collect())
}

// Response structures
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    symbol: Option<String>,
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(rename = "assetProfile")]
    asset_profile: Option<AssetProfile>,
    price: Option<PriceModule>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
    #[serde(rename = "longBusinessSummary")]
    long_business_summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PriceModule {
    #[serde(rename = "longName")]
    long_name: Option<String>,
    #[serde(rename = "shortName")]
    short_name: Option<String>,
    #[serde(rename = "marketCap")]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RecommendationResponse {
    finance: RecommendationBody,
}

#[derive(Debug, Deserialize)]
struct RecommendationBody {
    result: Option<Vec<RecommendationResult>>,
}

#[derive(Debug, Deserialize)]
struct RecommendationResult {
    #[serde(rename = "recommendedSymbols", default)]
    recommended_symbols: Vec<RecommendedSymbol>,
}

#[derive(Debug, Deserialize)]
struct RecommendedSymbol {
    symbol: String,
    score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART_BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "TCS.NS", "gmtoffset": 19800},
                "timestamp": [1704167100, 1704253500, 1704339900, 1704426300],
                "indicators": {"quote": [{"close": [3793.5, null, 3750.25, 3711.0]}]}
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_skips_null_closes() {
        let series = parse_chart("TCS.NS", CHART_BODY).unwrap();

        assert_eq!(series.symbol, "TCS.NS");
        assert_eq!(series.len(), 3);
        assert_eq!(series.points[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series.points[1].close, 3750.25);
    }

    #[test]
    fn test_parse_chart_not_found_is_no_data() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        assert_eq!(parse_chart("XYZ.NS", body), Err(FetchFailure::NoData("XYZ.NS".to_string())));
    }

    #[test]
    fn test_parse_chart_without_timestamps_is_no_data() {
        let body = r#"{"chart": {"result": [{"meta": {"symbol": "XYZ.BO"}, "indicators": {"quote": [{}]}}], "error": null}}"#;
        assert!(parse_chart("XYZ.BO", body).unwrap_err().is_no_data());
    }

    #[test]
    fn test_parse_chart_garbage_is_parse_error() {
        assert!(matches!(parse_chart("TCS.NS", "<html>"), Err(FetchFailure::Parse(_))));
    }

    #[test]
    fn test_parse_profile() {
        let body = r#"{
            "quoteSummary": {
                "result": [{
                    "assetProfile": {
                        "sector": "Technology",
                        "industry": "Information Technology Services",
                        "longBusinessSummary": "Tata Consultancy Services Limited provides IT services."
                    },
                    "price": {"longName": "Tata Consultancy Services Limited", "marketCap": {"raw": 1.4e13, "fmt": "14T"}}
                }],
                "error": null
            }
        }"#;

        let profile = parse_profile("TCS.NS", body).unwrap();

        assert_eq!(profile.sector.as_deref(), Some("Technology"));
        assert_eq!(profile.industry.as_deref(), Some("Information Technology Services"));
        assert_eq!(profile.market_cap, Some(1.4e13));
        assert_eq!(profile.name.as_deref(), Some("Tata Consultancy Services Limited"));
    }

    #[test]
    fn test_parse_profile_missing_modules() {
        let body = r#"{"quoteSummary": {"result": [{"assetProfile": {"sector": ""}}], "error": null}}"#;

        let profile = parse_profile("ABC.NS", body).unwrap();

        assert_eq!(profile.sector, None);
        assert_eq!(profile.industry, None);
        assert_eq!(profile.market_cap, None);
    }

    #[test]
    fn test_parse_recommendations_orders_by_score() {
        let body = r#"{
            "finance": {
                "result": [{
                    "symbol": "TCS.NS",
                    "recommendedSymbols": [
                        {"symbol": "WIPRO.NS", "score": 0.12},
                        {"symbol": "INFY.NS", "score": 0.31},
                        {"symbol": "HCLTECH.NS", "score": 0.12}
                    ]
                }],
                "error": null
            }
        }"#;

        let symbols = parse_recommendations(body).unwrap();
        assert_eq!(symbols, vec!["INFY.NS", "WIPRO.NS", "HCLTECH.NS"]);
    }

    #[test]
    fn test_parse_recommendations_empty_result() {
        let body = r#"{"finance": {"result": [], "error": null}}"#;
        assert!(parse_recommendations(body).unwrap().is_empty());
    }
}
