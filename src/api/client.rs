//! GitHub GraphQL search client
//!
//! This module handles all HTTP traffic for the crawler:
//! - Building the HTTP client with user agent and timeouts
//! - Charging the shared rate governor before and after each request
//! - Issuing the search and preflight GraphQL queries
//! - Classifying HTTP and GraphQL failures
//! - Retrying transient failures through [`RetryPolicy`]

use crate::api::error::{classify_status, ApiError};
use crate::api::governor::RateGovernor;
use crate::api::retry::RetryPolicy;
use crate::api::types::{
    GraphQlResponse, RateLimitStatus, SearchData, SearchPage, ViewerData,
};
use crate::config::Config;
use crate::GhStarsError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

const SEARCH_QUERY: &str = r#"
query($q: String!, $first: Int!, $after: String) {
  search(query: $q, type: REPOSITORY, first: $first, after: $after) {
    pageInfo { endCursor hasNextPage }
    nodes {
      ... on Repository {
        databaseId
        nameWithOwner
        stargazerCount
        primaryLanguage { name }
      }
    }
  }
  rateLimit { cost remaining }
}
"#;

const PREFLIGHT_QUERY: &str = r#"
query {
  viewer { login }
  rateLimit { limit cost remaining resetAt }
}
"#;

/// Search operations the crawler needs from the code-hosting platform
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Fetches one page of repositories matching `query`
    ///
    /// # Arguments
    ///
    /// * `query` - Search expression, e.g. `stars:100..199 created:2024-05-01..2024-05-31`
    /// * `after` - Cursor returned by the previous page, `None` for the first page
    /// * `batch_size` - Number of results requested
    async fn search(
        &self,
        query: &str,
        after: Option<&str>,
        batch_size: u32,
    ) -> Result<SearchPage, ApiError>;

    /// Verifies credentials and reports the token's budget before a crawl
    async fn preflight(&self) -> Result<RateLimitStatus, ApiError> {
        Ok(RateLimitStatus::default())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Value of the User-Agent header
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// GraphQL client for the GitHub search API
///
/// Every request is charged twice against the governor: a fixed estimate
/// before it is sent, and the cost GitHub reports once it returns. The
/// governor therefore runs ahead of GitHub's own accounting.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    endpoint: String,
    token: String,
    governor: RateGovernor,
    retry: RetryPolicy,
    estimated_cost: u32,
    inter_request_delay: Duration,
}

impl GitHubClient {
    /// Creates a client with the default retry policy and pacing
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        user_agent: &str,
        governor: RateGovernor,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_http_client(user_agent)?,
            endpoint: endpoint.into(),
            token: token.into(),
            governor,
            retry: RetryPolicy::default(),
            estimated_cost: 1,
            inter_request_delay: Duration::from_millis(150),
        })
    }

    /// Creates a client from the loaded configuration
    pub fn from_config(config: &Config, governor: RateGovernor) -> Result<Self, GhStarsError> {
        let token = config.require_token()?;
        let client = Self::new(
            config.github.endpoint.clone(),
            token,
            &config.github.user_agent,
            governor,
        )?
        .with_retry(RetryPolicy::from(&config.retry))
        .with_pacing(
            config.rate_limit.estimated_cost,
            config.rate_limit.inter_request_delay(),
        );
        Ok(client)
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the up-front cost estimate and the fixed pause before each request
    #[must_use]
    pub fn with_pacing(mut self, estimated_cost: u32, inter_request_delay: Duration) -> Self {
        self.estimated_cost = estimated_cost;
        self.inter_request_delay = inter_request_delay;
        self
    }

    /// One search attempt, without retries
    async fn search_once(
        &self,
        query: &str,
        after: Option<&str>,
        batch_size: u32,
    ) -> Result<SearchPage, ApiError> {
        self.governor.acquire(self.estimated_cost).await;
        if !self.inter_request_delay.is_zero() {
            tokio::time::sleep(self.inter_request_delay).await;
        }

        let body = json!({
            "query": SEARCH_QUERY,
            "variables": { "q": query, "first": batch_size, "after": after },
        });
        let data: SearchData = self.post(&body).await?;
        let page = SearchPage::try_from(data)?;

        self.governor.acquire(page.cost).await;

        tracing::trace!(
            "{} -> {} repos, cost={} remaining={}",
            query,
            page.repos.len(),
            page.cost,
            page.remaining
        );
        Ok(page)
    }

    /// POSTs a GraphQL body and decodes its `data` member
    async fn post<T: DeserializeOwned>(&self, body: &serde_json::Value) -> Result<T, ApiError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(
                status,
                &headers,
                &text,
                chrono::Utc::now().timestamp(),
            ));
        }

        let text = response.text().await?;
        let envelope: GraphQlResponse<T> =
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;
        envelope.into_data()
    }
}

#[async_trait]
impl SearchApi for GitHubClient {
    async fn search(
        &self,
        query: &str,
        after: Option<&str>,
        batch_size: u32,
    ) -> Result<SearchPage, ApiError> {
        self.retry
            .run(query, || self.search_once(query, after, batch_size))
            .await
    }

    async fn preflight(&self) -> Result<RateLimitStatus, ApiError> {
        self.retry
            .run("preflight", || async {
                self.governor.acquire(self.estimated_cost).await;
                let data: ViewerData = self.post(&json!({ "query": PREFLIGHT_QUERY })).await?;
                Ok(RateLimitStatus::from(data))
            })
            .await
    }
}
