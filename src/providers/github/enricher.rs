use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::EnrichmentConfig;
use crate::record::{RepositoryRecord, UNKNOWN_LANGUAGE};
use crate::retry::RetryPolicy;

use super::client::RepositoryApi;
use super::types::RepoResponse;

/// Upper bound on commits kept per repository, whatever the configuration says.
pub const MAX_RECENT_COMMITS: usize = 5;

/// Layers repository metadata from the API on top of listing records.
///
/// Failures never escape: a record whose lookups fail keeps its listing data.
pub struct Enricher<A> {
    pub(super) api: A,
    config: EnrichmentConfig,
    retry: RetryPolicy,
}

impl<A: RepositoryApi> Enricher<A> {
    pub fn new(api: A, config: EnrichmentConfig, retry: RetryPolicy) -> Self {
        Self { api, config, retry }
    }

    /// Enriches every record and returns them in their original order.
    #[cfg(test)]
    pub async fn enrich_all(&self, records: Vec<RepositoryRecord>) -> Vec<RepositoryRecord> {
        self.enrich_all_until(records, &CancellationToken::new()).await
    }

    /// Like [`Enricher::enrich_all`], but stops issuing requests once `cancel`
    /// fires. Records keep whatever enrichment they had completed by then.
    pub async fn enrich_all_until(
        &self,
        records: Vec<RepositoryRecord>,
        cancel: &CancellationToken,
    ) -> Vec<RepositoryRecord> {
        let total = records.len();
        let workers = self.config.workers.max(1);
        info!("Enriching {total} repositories with {workers} workers...");

        let mut enriched: Vec<(usize, RepositoryRecord)> =
            stream::iter(records.into_iter().enumerate())
                .map(|(rank, record)| self.enrich_record(rank, total, record, cancel))
                .buffer_unordered(workers)
                .collect()
                .await;

        // Workers finish in any order; callers always see rank order.
        enriched.sort_by_key(|(rank, _)| *rank);

        let count = enriched.iter().filter(|(_, r)| r.is_enriched()).count();
        info!("Enriched {count}/{total} repositories");

        enriched.into_iter().map(|(_, record)| record).collect()
    }

    async fn enrich_record(
        &self,
        rank: usize,
        total: usize,
        mut record: RepositoryRecord,
        cancel: &CancellationToken,
    ) -> (usize, RepositoryRecord) {
        if cancel.is_cancelled() {
            return (rank, record);
        }

        debug!("[{}/{}] Enriching {}", rank + 1, total, record.full_name);

        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Enrichment of #{} cancelled", rank + 1);
            }
            () = self.apply_enrichment(rank, &mut record) => {}
        }

        (rank, record)
    }

    /// Each lookup writes its own fields as soon as it succeeds, so an
    /// interrupted record is never left half-written within a group.
    async fn apply_enrichment(&self, rank: usize, record: &mut RepositoryRecord) {
        let full_name = record.full_name.clone();

        let label = format!("Metadata for {full_name}");
        let response = match self
            .retry
            .run(&label, || self.api.repository(&full_name))
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_rate_limited() => {
                warn!("Rate limited while enriching {full_name}, keeping listing data");
                return;
            }
            Err(e) => {
                warn!("Failed to fetch metadata for {full_name}: {e}");
                return;
            }
        };

        self.apply_metadata(record, response);

        if rank >= self.config.detail_limit {
            return;
        }

        if let Some(excerpt) = self.fetch_readme(&full_name).await {
            record.readme_excerpt = Some(excerpt);
        }

        let commit_count = self.config.commit_count.min(MAX_RECENT_COMMITS);
        match self.api.commits(&full_name, commit_count).await {
            Ok(commits) if !commits.is_empty() => {
                record.recent_commits = Some(
                    commits
                        .iter()
                        .take(commit_count)
                        .map(|c| c.summary())
                        .collect(),
                );
            }
            Ok(_) => debug!("No commits returned for {full_name}"),
            Err(e) => warn!("Failed to fetch commits for {full_name}: {e}"),
        }

        match self.api.languages(&full_name).await {
            Ok(languages) if !languages.is_empty() => record.languages = Some(languages),
            Ok(_) => debug!("No language breakdown for {full_name}"),
            Err(e) => warn!("Failed to fetch languages for {full_name}: {e}"),
        }
    }

    /// The API is authoritative for counts; text fields only fill gaps.
    fn apply_metadata(&self, record: &mut RepositoryRecord, response: RepoResponse) {
        if let Some(stars) = response.stargazers_count {
            record.stars = stars;
        }
        if let Some(forks) = response.forks_count {
            record.forks = forks;
        }
        if record.description.is_empty() {
            if let Some(description) = response.description.as_deref().filter(|d| !d.is_empty()) {
                record.description = description.to_string();
            }
        }
        if record.language == UNKNOWN_LANGUAGE {
            if let Some(language) = response.language.as_deref().filter(|l| !l.is_empty()) {
                record.language = language.to_string();
            }
        }

        record.metadata = Some(response.to_metadata(self.config.max_topics));
    }

    async fn fetch_readme(&self, full_name: &str) -> Option<String> {
        let readme = match self.api.readme(full_name).await {
            Ok(readme) => readme,
            Err(e) => {
                warn!("Failed to fetch README for {full_name}: {e}");
                return None;
            }
        };

        match readme.excerpt(self.config.readme_chars) {
            Ok(excerpt) if !excerpt.trim().is_empty() => Some(excerpt),
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to decode README for {full_name}: {e:#}");
                None
            }
        }
    }
}
