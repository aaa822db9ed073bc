//! Tavily 검색 API 클라이언트
//!
//! source: https://docs.tavily.com/docs/rest-api/api-reference

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::{SearchHit, WebSearchProvider};

/// Tavily API 기본 주소
pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Tavily 클라이언트
#[derive(Debug, Clone)]
pub struct TavilyClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    content: String,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Result<Self, ConfigError> {
        Self::with_base_url(api_key, TAVILY_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ConfigError> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("TAVILY_API_KEY"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConfigError::InvalidSetting {
                name: "http client",
                reason: e.to_string(),
            })?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl WebSearchProvider for TavilyClient {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        tracing::info!("Web search: {}", query);

        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: "basic",
            max_results: top_k,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&request)
            .send()
            .await
            .context("Failed to send Tavily search request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Tavily API error {}: {}", status, body);
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .context("Failed to parse Tavily response")?;

        Ok(parsed
            .results
            .into_iter()
            .take(top_k)
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                content: r.content,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
