//! Peer-comparison table scraped from a company profile page.
//!
//! The page lists comparable companies as links of the form
//! `/company/<IDENTIFIER>/...`; the identifiers are returned bare (no exchange
//! suffix) and it is up to the caller to qualify them.

use analysis_core::{base_symbol, FetchFailure, PeerTableSource};
use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::{MarketDataConfig, ProviderHttp, RateLimiter};

#[derive(Clone)]
pub struct PeerTableScraper {
    base_url: String,
    selector: String,
    http: ProviderHttp,
}

impl PeerTableScraper {
    pub fn new(config: &MarketDataConfig) -> Self {
        Self {
            base_url: config.peer_table_base_url.trim_end_matches('/').to_string(),
            selector: config.peer_table_selector.clone(),
            http: ProviderHttp::new(config.timeout, RateLimiter::per_minute(config.rate_limit_per_minute)),
        }
    }

    pub async fn fetch_peer_table(&self, symbol: &str) -> Result<Vec<String>, FetchFailure> {
        let identifier = base_symbol(symbol);
        let url = format!("{}/company/{}/", self.base_url, identifier);
        let html = self.http.get_text(symbol, self.http.client().get(&url)).await?;

        let peers = parse_peer_table(&html, &self.selector, &identifier)?;
        tracing::debug!("Peer table for {} listed {} companies", identifier, peers.len());
        Ok(peers)
    }
}

#[async_trait]
impl PeerTableSource for PeerTableScraper {
    async fn peer_symbols(&self, symbol: &str) -> Result<Vec<String>, FetchFailure> {
        self.fetch_peer_table(symbol).await
    }
}

/// Identifier following `/company/` in a link, e.g. `/company/INFY/consolidated/`
fn company_identifier(href: &str) -> Option<String> {
    let mut segments = href.split('/').filter(|s| !s.is_empty());
    segments.find(|s| *s == "company")?;
    segments
        .next()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
}

/// Unique linked company identifiers in document order, excluding `subject`
pub fn parse_peer_table(html: &str, selector: &str, subject: &str) -> Result<Vec<String>, FetchFailure> {
    let selector =
        Selector::parse(selector).map_err(|e| FetchFailure::Parse(format!("invalid peer table selector: {:?}", e)))?;
    let document = Html::parse_document(html);
    let subject = base_symbol(subject);

    let mut peers: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        let Some(identifier) = element.value().attr("href").and_then(company_identifier) else {
            continue;
        };
        if identifier != subject && !peers.contains(&identifier) {
            peers.push(identifier);
        }
    }

    Ok(peers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PEER_TABLE_SELECTOR;

    const PAGE: &str = r#"
        <html><body>
          <nav><a href="/company/NIFTY/">Index</a></nav>
          <section id="peers">
            <table>
              <tr><th>Name</th><th>CMP</th></tr>
              <tr><td><a href="/company/TCS/consolidated/">TCS</a></td><td>3900</td></tr>
              <tr><td><a href="/company/INFY/consolidated/">Infosys</a></td><td>1500</td></tr>
              <tr><td><a href="/company/HCLTECH/">HCL Technologies</a></td><td>1400</td></tr>
              <tr><td><a href="/company/infy/">Infosys duplicate</a></td><td>1500</td></tr>
              <tr><td><a href="/screens/123/">Screen</a></td><td></td></tr>
            </table>
          </section>
        </body></html>
    "#;

    #[test]
    fn test_parse_peer_table_extracts_identifiers() {
        let peers = parse_peer_table(PAGE, DEFAULT_PEER_TABLE_SELECTOR, "TCS.NS").unwrap();
        assert_eq!(peers, vec!["INFY", "HCLTECH"]);
    }

    #[test]
    fn test_parse_peer_table_without_table_is_empty() {
        let peers = parse_peer_table("<html><body><p>No peers</p></body></html>", DEFAULT_PEER_TABLE_SELECTOR, "TCS").unwrap();
        assert!(peers.is_empty());
    }

    #[test]
    fn test_invalid_selector_is_parse_error() {
        assert!(matches!(parse_peer_table(PAGE, "##", "TCS"), Err(FetchFailure::Parse(_))));
    }

    #[test]
    fn test_company_identifier() {
        assert_eq!(company_identifier("/company/INFY/consolidated/"), Some("INFY".to_string()));
        assert_eq!(company_identifier("https://example.com/company/wipro/"), Some("WIPRO".to_string()));
        assert_eq!(company_identifier("/screens/1/"), None);
        assert_eq!(company_identifier("/company/"), None);
    }
}
