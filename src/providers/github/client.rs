use indexmap::IndexMap;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use url::Url;

use crate::auth::Token;
use crate::config::ApiConfig;
use crate::error::{FetchError, Result, TrendLensError};

use super::types::{CommitResponse, ReadmeResponse, RepoResponse};

/// Repository metadata lookups used for enrichment.
///
/// Implemented over HTTP by [`GitHubClient`]; the enricher only depends on
/// this trait.
pub trait RepositoryApi {
    fn repository(
        &self,
        full_name: &str,
    ) -> impl Future<Output = std::result::Result<RepoResponse, FetchError>>;

    fn readme(
        &self,
        full_name: &str,
    ) -> impl Future<Output = std::result::Result<ReadmeResponse, FetchError>>;

    fn commits(
        &self,
        full_name: &str,
        count: usize,
    ) -> impl Future<Output = std::result::Result<Vec<CommitResponse>, FetchError>>;

    fn languages(
        &self,
        full_name: &str,
    ) -> impl Future<Output = std::result::Result<IndexMap<String, u64>, FetchError>>;
}

/// GitHub REST API client for repository metadata.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `config` - API base URL, timeout and user agent
    /// * `token` - Optional GitHub personal access token
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, token: Option<Token>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrendLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let api_url = Url::parse(&config.base_url)
            .map_err(|e| TrendLensError::Config(format!("Invalid API base URL: {e}")))?;

        if api_url.cannot_be_a_base() {
            return Err(TrendLensError::Config(format!(
                "API base URL cannot be joined with paths: {api_url}"
            )));
        }

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    /// Helper to build authenticated requests
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// `{api}/repos/{owner}/{name}[/{tail}...]`
    pub fn repo_url(&self, full_name: &str, tail: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("repos")
                .extend(full_name.split('/'))
                .extend(tail);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> std::result::Result<T, FetchError> {
        debug!("GET {url}");

        let response = self
            .auth_request(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::decode(url.as_str(), e))
    }
}

impl RepositoryApi for GitHubClient {
    async fn repository(&self, full_name: &str) -> std::result::Result<RepoResponse, FetchError> {
        self.get_json(self.repo_url(full_name, &[])).await
    }

    async fn readme(&self, full_name: &str) -> std::result::Result<ReadmeResponse, FetchError> {
        self.get_json(self.repo_url(full_name, &["readme"])).await
    }

    async fn commits(
        &self,
        full_name: &str,
        count: usize,
    ) -> std::result::Result<Vec<CommitResponse>, FetchError> {
        let mut url = self.repo_url(full_name, &["commits"]);
        url.query_pairs_mut()
            .append_pair("per_page", &count.to_string());
        self.get_json(url).await
    }

    async fn languages(
        &self,
        full_name: &str,
    ) -> std::result::Result<IndexMap<String, u64>, FetchError> {
        self.get_json(self.repo_url(full_name, &["languages"])).await
    }
}
