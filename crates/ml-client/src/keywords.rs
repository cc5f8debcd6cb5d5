use analysis_core::{FetchFailure, KeywordExtractor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{MLError, MLResult};

#[derive(Debug, Clone, Serialize)]
struct KeywordRequest<'a> {
    text: &'a str,
    top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordResponse {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub processing_time_ms: f64,
}

/// Lowercase, trim and dedupe keywords, keeping at most `count` in order.
pub fn normalize_keywords<I, S>(keywords: I, count: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::with_capacity(count);
    for keyword in keywords {
        let keyword = keyword.as_ref().trim().to_lowercase();
        if keyword.is_empty() || normalized.contains(&keyword) {
            continue;
        }
        normalized.push(keyword);
        if normalized.len() == count {
            break;
        }
    }
    normalized
}

/// Client for the text-summarization service that condenses a business
/// description into a handful of keywords
#[derive(Clone)]
pub struct KeywordClient {
    client: reqwest::Client,
    base_url: String,
}

impl KeywordClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Extract up to `count` keywords from `text`
    pub async fn extract(&self, text: &str, count: usize) -> MLResult<Vec<String>> {
        let request = KeywordRequest { text, top_k: count };

        let response = self
            .client
            .post(format!("{}/keywords", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MLError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let result = response.json::<KeywordResponse>().await?;
        let keywords = normalize_keywords(result.keywords, count);
        if keywords.is_empty() {
            return Err(MLError::InvalidResponse("no keywords returned".to_string()));
        }
        tracing::debug!("Extracted {} keywords in {:.0}ms", keywords.len(), result.processing_time_ms);
        Ok(keywords)
    }
}

#[async_trait]
impl KeywordExtractor for KeywordClient {
    async fn extract_keywords(&self, text: &str, count: usize) -> Result<Vec<String>, FetchFailure> {
        self.extract(text, count).await.map_err(FetchFailure::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keywords_dedupes_and_caps() {
        let keywords = normalize_keywords(
            ["IT Services", " consulting ", "it services", "", "Cloud", "BPO", "Banking", "Retail"],
            5,
        );
        assert_eq!(keywords, vec!["it services", "consulting", "cloud", "bpo", "banking"]);
    }

    #[test]
    fn test_request_shape() {
        let request = KeywordRequest { text: "Tata Consultancy Services", top_k: 5 };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["top_k"], 5);
        assert_eq!(json["text"], "Tata Consultancy Services");
    }

    #[test]
    fn test_response_without_timing() {
        let response: KeywordResponse = serde_json::from_str(r#"{"keywords": ["software", "consulting"]}"#).unwrap();
        assert_eq!(response.keywords.len(), 2);
        assert_eq!(response.processing_time_ms, 0.0);
    }
}
