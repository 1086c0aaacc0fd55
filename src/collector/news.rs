//! Headline lookups for the advice prompt

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use zeroize::Zeroizing;

use crate::config::NewsConfig;
use crate::domain::{Asset, Headline};
use crate::error::{PrinterError, Result};

/// Source of recent headlines for one asset
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn headlines(&self, asset: Asset) -> Result<Vec<Headline>>;
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

/// NewsAPI `everything` search, one query per asset symbol
pub struct NewsApiClient {
    config: NewsConfig,
    api_key: Zeroizing<String>,
    http: Client,
}

impl NewsApiClient {
    pub fn new(config: NewsConfig, api_key: Zeroizing<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PrinterError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            http,
        })
    }

    /// News is optional; without a key every lookup is empty
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn decode(&self, body: &str) -> Result<Vec<Headline>> {
        let response: EverythingResponse = serde_json::from_str(body)
            .map_err(|e| PrinterError::News(format!("malformed response: {}", e)))?;

        if response.status != "ok" {
            return Err(PrinterError::News(
                response
                    .message
                    .unwrap_or_else(|| format!("status {}", response.status)),
            ));
        }

        Ok(response
            .articles
            .into_iter()
            .filter_map(|article| {
                Some(Headline {
                    title: article.title?,
                    source: article.source.and_then(|s| s.name).unwrap_or_default(),
                })
            })
            .take(self.config.max_headlines)
            .collect())
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn headlines(&self, asset: Asset) -> Result<Vec<Headline>> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }

        let url = format!("{}/everything", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .query(&[("q", asset.as_str()), ("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        // NewsAPI reports failures in the body with status "error"
        let body = response.text().await?;
        let headlines = self.decode(&body)?;
        debug!("{} headlines for {}", headlines.len(), asset);
        Ok(headlines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(key: &str) -> NewsApiClient {
        NewsApiClient::new(NewsConfig::default(), Zeroizing::new(key.to_string())).unwrap()
    }

    #[test]
    fn test_keeps_first_three_titled_articles() {
        let body = r#"{
            "status": "ok",
            "totalResults": 5,
            "articles": [
                {"source": {"id": null, "name": "CoinDesk"}, "title": "Bitcoin climbs"},
                {"source": {"id": null, "name": "Reuters"}, "title": null},
                {"source": {"name": "Decrypt"}, "title": "ETF flows"},
                {"title": "No source"},
                {"source": {"name": "Late"}, "title": "Dropped"}
            ]
        }"#;

        let headlines = client("k").decode(body).unwrap();
        assert_eq!(headlines.len(), 3);
        assert_eq!(headlines[0].source, "CoinDesk");
        assert_eq!(headlines[1].title, "ETF flows");
        assert_eq!(headlines[2].source, "");
    }

    #[test]
    fn test_error_status_is_reported() {
        let body = r#"{"status":"error","code":"rateLimited","message":"Too many requests"}"#;
        match client("k").decode(body) {
            Err(PrinterError::News(msg)) => assert_eq!(msg, "Too many requests"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_key_yields_no_headlines() {
        let news = client("");
        assert!(!news.is_enabled());
        assert!(news.headlines(Asset::Btc).await.unwrap().is_empty());
    }
}
