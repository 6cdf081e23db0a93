use log::{debug, error, info};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::data::{Article, ArticlesResponse, RefreshCacheRequest};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server responded with {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeRequest {
    pub country_code: String,
    pub limit: u32,
}

/// Anything that can answer a narrative request.
pub trait ArticleSource {
    async fn fetch_articles(&self, request: &NarrativeRequest) -> Result<Vec<Article>, ApiError>;

    /// Rebuilds cached articles for `countries`. Sources without a cache
    /// have nothing to do.
    async fn refresh_countries(&self, _countries: &[String]) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Client for the article backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn articles_url(&self, request: &NarrativeRequest) -> String {
        format!(
            "{}/articles/{}?limit={}",
            self.base_url,
            urlencoding::encode(&request.country_code),
            request.limit
        )
    }

    /// Raw cache status blob from the backend.
    pub async fn cache_status(&self) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}/cache-status", self.base_url);
        let response = self.http.get(&url).send().await;
        decode(url, response).await
    }

    pub async fn refresh_cache(&self, countries: &[String]) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}/refresh-cache", self.base_url);
        info!("Requesting cache refresh for {:?}", countries);
        let response = self
            .http
            .post(&url)
            .json(&RefreshCacheRequest { countries })
            .send()
            .await;
        decode(url, response).await
    }
}

impl ArticleSource for ApiClient {
    async fn fetch_articles(&self, request: &NarrativeRequest) -> Result<Vec<Article>, ApiError> {
        let url = self.articles_url(request);
        info!("Fetching articles from {}", url);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await;
        let data: ArticlesResponse = decode(url, response).await?;

        info!(
            "Fetched {} of {} articles for {} (source: {})",
            data.articles.len(),
            data.count,
            if data.country.is_empty() { request.country_code.as_str() } else { data.country.as_str() },
            if data.source.is_empty() { "unknown" } else { data.source.as_str() }
        );
        Ok(data.articles)
    }

    async fn refresh_countries(&self, countries: &[String]) -> Result<(), ApiError> {
        let status = self.refresh_cache(countries).await?;
        debug!("Refresh response: {}", status);
        Ok(())
    }
}

/// One-line tooltip text for a `cache-status` blob.
pub fn cache_summary(status: &serde_json::Value) -> String {
    let coverage = status
        .get("cache_coverage")
        .and_then(|v| v.as_str())
        .unwrap_or("0/0");
    match status.get("total_articles").and_then(|v| v.as_u64()) {
        Some(total) => format!("Cache: {} countries, {} articles", coverage, total),
        None => format!("Cache: {} countries", coverage),
    }
}

async fn decode<T: DeserializeOwned>(
    url: String,
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, ApiError> {
    let response = match response {
        Ok(response) => response,
        Err(source) => return Err(ApiError::Transport { url, source }),
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(
            "Server responded with {} for {}: {}",
            status,
            url,
            body.chars().take(200).collect::<String>()
        );
        return Err(ApiError::Status { url, status });
    }

    let text = match response.text().await {
        Ok(text) => text,
        Err(source) => return Err(ApiError::Transport { url, source }),
    };
    parse_body(url, &text)
}

fn parse_body<T: DeserializeOwned>(url: String, text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|source| {
        error!(
            "Response preview: {}",
            text.chars().take(200).collect::<String>()
        );
        ApiError::Decode { url, source }
    })
}
