use anyhow::{bail, Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{CommitSummary, RepoMetadata};

const SHORT_SHA_LEN: usize = 7;
const COMMIT_MESSAGE_CHARS: usize = 100;
/// Upper bound on topics kept per repository, whatever the configuration says.
pub const MAX_TOPICS: usize = 10;

/// Repository resource from `GET /repos/{owner}/{name}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoResponse {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: Option<u64>,
    #[serde(default)]
    pub forks_count: Option<u64>,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub license: Option<LicenseResponse>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub archived: bool,
    /// Size in kilobytes
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub has_wiki: bool,
    #[serde(default)]
    pub has_pages: bool,
    #[serde(default)]
    pub has_discussions: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LicenseResponse {
    #[serde(default)]
    pub spdx_id: Option<String>,
}

/// README resource from `GET /repos/{owner}/{name}/readme`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadmeResponse {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Entry of `GET /repos/{owner}/{name}/commits`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitResponse {
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<GitActor>,
    #[serde(default)]
    pub committer: Option<GitActor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitActor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl RepoResponse {
    /// Overlay fields of this response, keeping the first `max_topics` topics
    /// (never more than [`MAX_TOPICS`]).
    pub fn to_metadata(&self, max_topics: usize) -> RepoMetadata {
        RepoMetadata {
            watchers: self.watchers_count,
            open_issues: self.open_issues_count,
            license: self
                .license
                .as_ref()
                .and_then(|license| license.spdx_id.clone()),
            created_at: self.created_at,
            updated_at: self.updated_at,
            pushed_at: self.pushed_at,
            topics: self
                .topics
                .iter()
                .take(max_topics.min(MAX_TOPICS))
                .cloned()
                .collect(),
            homepage: self.homepage.clone().filter(|h| !h.trim().is_empty()),
            default_branch: self.default_branch.clone(),
            archived: self.archived,
            size: self.size,
            has_wiki: self.has_wiki,
            has_pages: self.has_pages,
            has_discussions: self.has_discussions,
        }
    }
}

impl ReadmeResponse {
    /// Decoded README text, cut to at most `max_chars` characters.
    pub fn excerpt(&self, max_chars: usize) -> Result<String> {
        let text = match self.encoding.as_deref() {
            None | Some("base64") => {
                let compact: String = self
                    .content
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .context("README content is not valid base64")?;
                String::from_utf8(bytes).context("README content is not UTF-8")?
            }
            Some(other) => bail!("Unsupported README encoding: {other}"),
        };

        Ok(text.chars().take(max_chars).collect())
    }
}

impl CommitResponse {
    pub fn summary(&self) -> CommitSummary {
        let first_line = self.commit.message.lines().next().unwrap_or_default();
        CommitSummary {
            sha: self.sha.chars().take(SHORT_SHA_LEN).collect(),
            message: first_line.chars().take(COMMIT_MESSAGE_CHARS).collect(),
            date: self.commit.committer.as_ref().and_then(|c| c.date),
            author: self.commit.author.as_ref().and_then(|a| a.name.clone()),
        }
    }
}
