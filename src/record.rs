use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::providers::trending::Window;

/// One trending repository, as listed and (optionally) enriched.
///
/// Baseline fields come from the listing page and are always present.
/// Each enrichment group is filled independently by its own API call, so a
/// failed README lookup never hides commits or languages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub description: String,
    pub language: String,
    pub stars: u64,
    pub forks: u64,
    pub stars_today: u64,
    pub built_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RepoMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme_excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_commits: Option<Vec<CommitSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<IndexMap<String, u64>>,
}

/// Fields supplied by the core repository metadata call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub watchers: u64,
    pub open_issues: u64,
    pub license: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub topics: Vec<String>,
    pub homepage: Option<String>,
    pub default_branch: Option<String>,
    pub archived: bool,
    /// Repository size in kilobytes
    pub size: u64,
    pub has_wiki: bool,
    pub has_pages: bool,
    pub has_discussions: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub date: Option<DateTime<Utc>>,
    pub author: Option<String>,
}

impl RepositoryRecord {
    /// A listing-only record with every count at zero and no enrichment.
    pub fn new(owner: &str, name: &str) -> Self {
        let full_name = format!("{owner}/{name}");
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            url: format!("https://github.com/{full_name}"),
            full_name,
            description: String::new(),
            language: UNKNOWN_LANGUAGE.to_string(),
            stars: 0,
            forks: 0,
            stars_today: 0,
            built_by: Vec::new(),
            metadata: None,
            readme_excerpt: None,
            recent_commits: None,
            languages: None,
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.metadata.is_some()
            || self.readme_excerpt.is_some()
            || self.recent_commits.is_some()
            || self.languages.is_some()
    }
}

pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// A day's worth of records, ready to be handed to a persistence layer.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrendingBatch {
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub language: Option<String>,
    pub since: Window,
    pub total_repos: usize,
    pub repositories: Vec<RepositoryRecord>,
}

impl TrendingBatch {
    pub fn new(
        date: NaiveDate,
        language: Option<String>,
        since: Window,
        repositories: Vec<RepositoryRecord>,
    ) -> Self {
        Self {
            date,
            generated_at: Utc::now(),
            language,
            since,
            total_repos: repositories.len(),
            repositories,
        }
    }
}
