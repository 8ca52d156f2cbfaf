use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::auth::Token;
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::providers::github::{Enricher, GitHubClient};
use crate::providers::trending::{parse_listing, ListingFetcher, Window};
use crate::record::RepositoryRecord;
use crate::retry::RetryPolicy;

/// Fetch → parse → enrich, strictly in that order.
///
/// Holds only the components built from its [`Config`]; a run either yields
/// a (possibly empty, possibly partly enriched) ordered list or a single
/// [`FetchError`].
pub struct Pipeline {
    fetcher: ListingFetcher,
    enricher: Option<Enricher<GitHubClient>>,
}

/// Stage hooks for progress display; the default does nothing.
pub trait StageObserver {
    fn listing_fetched(&self, _bytes: usize) {}
    fn listing_parsed(&self, _records: usize, _skipped: usize) {}
    fn enrichment_finished(&self, _enriched: usize) {}
}

impl StageObserver for () {}

impl Pipeline {
    /// Builds the pipeline from configuration.
    ///
    /// Enrichment is only set up when it is enabled and a token is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if a base URL is invalid or an HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let retry = RetryPolicy::from(&config.retry);
        let fetcher = ListingFetcher::new(&config.listing, retry)?;

        let token = config
            .api
            .token
            .as_deref()
            .map(Token::from)
            .filter(|t| !t.as_str().is_empty());

        let enricher = match token {
            Some(token) if config.enrichment.enabled => {
                let client = GitHubClient::new(&config.api, Some(token))?;
                Some(Enricher::new(client, config.enrichment.clone(), retry))
            }
            Some(_) => {
                info!("Enrichment disabled by configuration");
                None
            }
            None => {
                info!("No API token configured, skipping enrichment");
                None
            }
        };

        Ok(Self { fetcher, enricher })
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.enricher.is_some()
    }

    #[cfg(test)]
    pub async fn run(
        &self,
        language: Option<&str>,
        window: Window,
    ) -> std::result::Result<Vec<RepositoryRecord>, FetchError> {
        self.run_until_cancelled(language, window, &CancellationToken::new(), &())
            .await
    }

    /// Runs the pipeline, giving up early when `cancel` fires.
    ///
    /// Cancellation during the listing fetch yields [`FetchError::Cancelled`];
    /// during enrichment, records keep the overlay data completed so far.
    pub async fn run_until_cancelled(
        &self,
        language: Option<&str>,
        window: Window,
        cancel: &CancellationToken,
        observer: &impl StageObserver,
    ) -> std::result::Result<Vec<RepositoryRecord>, FetchError> {
        info!(
            "Collecting {window} trending repositories for language: {}",
            language.unwrap_or("all")
        );

        let document = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(FetchError::Cancelled),
            document = self.fetcher.fetch(language, window) => document?,
        };
        observer.listing_fetched(document.len());

        let listing = parse_listing(&document);
        observer.listing_parsed(listing.records.len(), listing.skipped.len());
        info!(
            "Parsed {} repositories ({} entries skipped)",
            listing.records.len(),
            listing.skipped.len()
        );

        if listing.records.is_empty() {
            warn!("Listing contained no repositories");
            return Ok(Vec::new());
        }

        let records = match &self.enricher {
            Some(enricher) => enricher.enrich_all_until(listing.records, cancel).await,
            None => listing.records,
        };

        observer.enrichment_finished(records.iter().filter(|r| r.is_enriched()).count());

        Ok(records)
    }
}
