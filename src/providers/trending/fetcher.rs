use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::config::ListingConfig;
use crate::error::{FetchError, Result, TrendLensError};
use crate::retry::RetryPolicy;

use super::Window;

/// Downloads the raw trending listing page.
pub struct ListingFetcher {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl ListingFetcher {
    /// Creates a fetcher for the listing at `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ListingConfig, retry: RetryPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrendLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TrendLensError::Config(format!("Invalid listing URL: {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(TrendLensError::Config(format!(
                "Listing URL cannot take a language segment: {base_url}"
            )));
        }

        Ok(Self {
            client,
            base_url,
            retry,
        })
    }

    /// Builds `{base}[/{language}][?since=weekly|monthly]`.
    pub fn listing_url(&self, language: Option<&str>, window: Window) -> Url {
        let mut url = self.base_url.clone();

        if let Some(language) = language.map(str::trim).filter(|l| !l.is_empty()) {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().push(language);
            }
        }

        if let Some(since) = window.query_value() {
            url.query_pairs_mut().append_pair("since", since);
        }

        url
    }

    /// Fetches the listing document, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::RetriesExhausted`] once every attempt has failed
    /// transiently, or the original error for a non-retryable client error.
    pub async fn fetch(
        &self,
        language: Option<&str>,
        window: Window,
    ) -> std::result::Result<String, FetchError> {
        let url = self.listing_url(language, window);
        info!("Fetching trending listing: {url}");

        let document = self
            .retry
            .run("Trending listing", || self.fetch_once(&url))
            .await?;

        debug!("Received {} bytes of listing markup", document.len());
        Ok(document)
    }

    async fn fetch_once(&self, url: &Url) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher_for(base_url: &str) -> ListingFetcher {
        let config = ListingConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..ListingConfig::default()
        };
        ListingFetcher::new(&config, RetryPolicy::immediate(3)).unwrap()
    }

    #[test]
    fn test_listing_url_default_window_has_no_query() {
        let fetcher = fetcher_for("https://github.com/trending");
        let url = fetcher.listing_url(None, Window::Daily);
        assert_eq!(url.as_str(), "https://github.com/trending");
    }

    #[test]
    fn test_listing_url_with_language_and_window() {
        let fetcher = fetcher_for("https://github.com/trending");
        let url = fetcher.listing_url(Some("rust"), Window::Weekly);
        assert_eq!(url.as_str(), "https://github.com/trending/rust?since=weekly");

        let url = fetcher.listing_url(Some("python"), Window::Monthly);
        assert_eq!(url.as_str(), "https://github.com/trending/python?since=monthly");
    }

    #[test]
    fn test_listing_url_encodes_language_segment() {
        let fetcher = fetcher_for("https://github.com/trending/");
        let url = fetcher.listing_url(Some("c#"), Window::Daily);
        assert_eq!(url.as_str(), "https://github.com/trending/c%23");
    }

    #[test]
    fn test_blank_language_is_ignored() {
        let fetcher = fetcher_for("https://github.com/trending");
        let url = fetcher.listing_url(Some("  "), Window::Daily);
        assert_eq!(url.as_str(), "https://github.com/trending");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let config = ListingConfig {
            base_url: "not a url".to_string(),
            ..ListingConfig::default()
        };
        let result = ListingFetcher::new(&config, RetryPolicy::default());
        assert!(matches!(result, Err(TrendLensError::Config(_))));
    }

    #[tokio::test]
    async fn test_fetch_returns_document() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/trending/rust")
            .match_query(mockito::Matcher::UrlEncoded(
                "since".into(),
                "weekly".into(),
            ))
            .with_status(200)
            .with_body("<html>listing</html>")
            .create_async()
            .await;

        let fetcher = fetcher_for(&format!("{}/trending", server.url()));
        let document = fetcher.fetch(Some("rust"), Window::Weekly).await.unwrap();

        assert_eq!(document, "<html>listing</html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors_then_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/trending")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;

        let fetcher = fetcher_for(&format!("{}/trending", server.url()));

        // mockito prefers matching mocks that still have expected hits left
        let ok = server
            .mock("GET", "/trending")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let document = fetcher.fetch(None, Window::Daily).await.unwrap();
        assert_eq!(document, "ok");
        failing.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_exhausts_retries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/trending")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let fetcher = fetcher_for(&format!("{}/trending", server.url()));
        let err = fetcher.fetch(None, Window::Daily).await.unwrap_err();

        assert!(matches!(
            err,
            FetchError::RetriesExhausted { attempts: 3, .. }
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_retries_timeouts_then_gives_up() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        // Accepts connections and never answers, so every attempt times out.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                open.push(socket);
            }
        });

        let config = ListingConfig {
            base_url: format!("http://{addr}/trending"),
            timeout_secs: 1,
            ..ListingConfig::default()
        };
        let fetcher = ListingFetcher::new(&config, RetryPolicy::immediate(3)).unwrap();

        let err = fetcher.fetch(None, Window::Daily).await.unwrap_err();

        match err {
            FetchError::RetriesExhausted { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                let timed_out = matches!(
                    *last,
                    FetchError::Network { ref source, .. } if source.is_timeout()
                );
                assert!(timed_out);
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/trending/klingon")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let fetcher = fetcher_for(&format!("{}/trending", server.url()));
        let err = fetcher
            .fetch(Some("klingon"), Window::Daily)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        mock.assert_async().await;
    }
}
