//! Extraction of repository records from trending listing markup.
//!
//! The markup is not a stable contract, so every field has a fallback and a
//! block that cannot be identified is skipped rather than failing the page.

use std::collections::HashSet;
use std::sync::LazyLock;

use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::number::parse_count;
use crate::record::RepositoryRecord;

const MAX_BUILT_BY: usize = 5;

struct Selectors {
    entry: Selector,
    title_link: Selector,
    description: Selector,
    language: Selector,
    stargazers: Selector,
    forks: Selector,
    stars_in_window: Selector,
    profile_link: Selector,
    avatar: Selector,
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    entry: selector("article.Box-row"),
    title_link: selector("h2 a[href]"),
    description: selector("p.col-9"),
    language: selector(r#"span[itemprop="programmingLanguage"]"#),
    stargazers: selector(r#"a[href*="/stargazers"]"#),
    forks: selector(r#"a[href*="/forks"]"#),
    stars_in_window: selector("span.d-inline-block.float-sm-right"),
    profile_link: selector(r#"a[href^="/"]"#),
    avatar: selector("img[alt]"),
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("listing selectors are valid CSS")
}

/// Records in rank order plus the entries that had to be dropped.
#[derive(Debug, Default)]
pub struct ParsedListing {
    pub records: Vec<RepositoryRecord>,
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// 1-based position of the entry on the page
    pub position: usize,
    pub reason: SkipReason,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("entry has no repository link")]
    MissingLink,

    #[error("link '{0}' does not name an owner and repository")]
    MalformedLink(String),

    #[error("repository {0} already listed")]
    Duplicate(String),
}

/// Parses every entry block of a listing document, keeping page order.
///
/// A document without any recognizable entries produces an empty listing.
pub fn parse_listing(document: &str) -> ParsedListing {
    let html = Html::parse_document(document);
    let mut listing = ParsedListing::default();
    let mut seen = HashSet::new();

    for (index, entry) in html.select(&SELECTORS.entry).enumerate() {
        let position = index + 1;

        match parse_entry(entry) {
            Ok(record) if !seen.insert(record.full_name.clone()) => {
                listing.skipped.push(SkippedEntry {
                    position,
                    reason: SkipReason::Duplicate(record.full_name),
                });
            }
            Ok(record) => {
                debug!("Parsed #{position}: {}", record.full_name);
                listing.records.push(record);
            }
            Err(reason) => listing.skipped.push(SkippedEntry { position, reason }),
        }
    }

    for skipped in &listing.skipped {
        warn!("Skipping listing entry #{}: {}", skipped.position, skipped.reason);
    }

    listing
}

fn parse_entry(entry: ElementRef<'_>) -> Result<RepositoryRecord, SkipReason> {
    let href = entry
        .select(&SELECTORS.title_link)
        .next()
        .and_then(|link| link.value().attr("href"))
        .ok_or(SkipReason::MissingLink)?;

    let (owner, name) =
        split_identity(href).ok_or_else(|| SkipReason::MalformedLink(href.to_string()))?;

    let mut record = RepositoryRecord::new(owner, name);

    if let Some(description) = first_text(entry, &SELECTORS.description) {
        record.description = description;
    }
    if let Some(language) = first_text(entry, &SELECTORS.language).filter(|l| !l.is_empty()) {
        record.language = language;
    }

    record.stars = first_text(entry, &SELECTORS.stargazers)
        .map(|text| parse_count(&text))
        .unwrap_or(0);
    record.forks = first_text(entry, &SELECTORS.forks)
        .map(|text| parse_count(&text))
        .unwrap_or(0);
    // "1,234 stars today" / "5,678 stars this week"
    record.stars_today = first_text(entry, &SELECTORS.stars_in_window)
        .and_then(|text| text.split_whitespace().next().map(parse_count))
        .unwrap_or(0);

    record.built_by = built_by(entry, owner);

    Ok(record)
}

/// Splits `/owner/name` (with optional surrounding slashes) into its parts.
fn split_identity(href: &str) -> Option<(&str, &str)> {
    let mut parts = href.trim().trim_matches('/').split('/');
    let owner = parts.next().filter(|p| !p.is_empty())?;
    let name = parts.next().filter(|p| !p.is_empty())?;
    Some((owner, name))
}

fn built_by(entry: ElementRef<'_>, owner: &str) -> Vec<String> {
    let mut contributors: Vec<String> = Vec::new();

    let avatars = entry
        .select(&SELECTORS.profile_link)
        .filter(|link| {
            link.value()
                .attr("href")
                .is_some_and(|href| !href.contains("/commits"))
        })
        .filter_map(|link| link.select(&SELECTORS.avatar).next())
        .filter_map(|img| img.value().attr("alt"));

    for alt in avatars {
        let username = alt.trim().trim_start_matches('@');
        if username.is_empty() || username == owner {
            continue;
        }
        if !contributors.iter().any(|c| c == username) {
            contributors.push(username.to_string());
        }
        if contributors.len() == MAX_BUILT_BY {
            break;
        }
    }

    contributors
}

/// Whitespace-normalized text of the first element matching `selector`.
fn first_text(entry: ElementRef<'_>, selector: &Selector) -> Option<String> {
    entry
        .select(selector)
        .next()
        .map(|element| element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
}
