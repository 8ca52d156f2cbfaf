use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::record::{RepositoryRecord, TrendingBatch};

use super::styling::{bright, bright_yellow, cyan, dim, enrichment_ratio};
use super::tables::{color_coded_stars_today_cell, create_table, cyan_header, format_count};

const MAX_ROWS: usize = 25;

/// Prints the ranked trending table to stderr.
///
/// stdout is reserved for the JSON batch so the two can be piped apart.
pub fn print_summary(batch: &TrendingBatch) {
    eprintln!("{}", render_summary(batch));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn enrichment_cell(record: &RepositoryRecord) -> Cell {
    if !record.is_enriched() {
        return Cell::new("-").fg(TableColor::DarkGrey);
    }

    let mut parts = vec!["meta"];
    if record.readme_excerpt.is_some() {
        parts.push("readme");
    }
    if record.recent_commits.is_some() {
        parts.push("commits");
    }
    if record.languages.is_some() {
        parts.push("langs");
    }
    Cell::new(parts.join(", ")).fg(TableColor::Green)
}

fn render_summary(batch: &TrendingBatch) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");

    let enriched = batch
        .repositories
        .iter()
        .filter(|r| r.is_enriched())
        .count();

    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        dim("Language:"),
        cyan(batch.language.as_deref().unwrap_or("all")),
        dim("Window:"),
        cyan(batch.since),
        dim("Repositories:"),
        bright_yellow(batch.total_repos),
        dim("Enriched:"),
        enrichment_ratio(enriched, batch.total_repos),
        dim("Date:"),
        dim(batch.date),
    );

    if batch.repositories.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No trending repositories found."));
        return output;
    }

    add_section_header(&mut output, "🔥", "Trending Repositories");

    let mut table = create_table();
    table.set_header(cyan_header(&[
        "#",
        "Repository",
        "Language",
        "Stars",
        "Today",
        "Forks",
        "Enriched",
    ]));

    for (rank, record) in batch.repositories.iter().take(MAX_ROWS).enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&record.full_name),
            Cell::new(&record.language),
            Cell::new(format_count(record.stars)),
            color_coded_stars_today_cell(record.stars_today),
            Cell::new(format_count(record.forks)),
            enrichment_cell(record),
        ]);
    }

    if batch.repositories.len() > MAX_ROWS {
        let mut row = vec![Cell::new(format!(
            "... and {} more",
            batch.repositories.len() - MAX_ROWS
        ))
        .fg(TableColor::DarkGrey)];
        row.extend(vec![Cell::new(""); 6]);
        table.add_row(row);
    }

    let _ = writeln!(output, "{table}");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::trending::Window;
    use crate::record::RepoMetadata;
    use chrono::NaiveDate;

    fn record(owner: &str, stars: u64, stars_today: u64) -> RepositoryRecord {
        let mut record = RepositoryRecord::new(owner, "repo");
        record.stars = stars;
        record.stars_today = stars_today;
        record
    }

    fn batch(repositories: Vec<RepositoryRecord>) -> TrendingBatch {
        TrendingBatch::new(
            NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            Some("rust".to_string()),
            Window::Weekly,
            repositories,
        )
    }

    #[test]
    fn test_render_summary_lists_repositories_in_rank_order() {
        let output = render_summary(&batch(vec![
            record("first", 45_600, 812),
            record("second", 950, 12),
        ]));

        assert!(output.contains("Overview"));
        assert!(output.contains("weekly"));
        assert!(output.contains("2026-01-12"));
        assert!(output.contains("45.6k"));
        assert!(output.contains("+812"));

        let first = output.find("first/repo").unwrap();
        let second = output.find("second/repo").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_render_summary_marks_enriched_groups() {
        let mut enriched = record("rich", 10, 1);
        enriched.metadata = Some(RepoMetadata {
            watchers: 0,
            open_issues: 0,
            license: None,
            created_at: None,
            updated_at: None,
            pushed_at: None,
            topics: vec![],
            homepage: None,
            default_branch: None,
            archived: false,
            size: 0,
            has_wiki: false,
            has_pages: false,
            has_discussions: false,
        });
        enriched.languages = Some(Default::default());

        let output = render_summary(&batch(vec![enriched, record("plain", 5, 0)]));

        assert!(output.contains("meta, langs"));
        assert!(output.contains("1/2"));
    }

    #[test]
    fn test_render_summary_empty_batch() {
        let output = render_summary(&batch(vec![]));
        assert!(output.contains("No trending repositories found."));
        assert!(!output.contains("Trending Repositories"));
    }

    #[test]
    fn test_render_summary_truncates_long_listings() {
        let records = (0..30).map(|i| record(&format!("o{i}"), i, 0)).collect();
        let output = render_summary(&batch(records));
        assert!(output.contains("... and 5 more"));
        assert!(!output.contains("o29/repo"));
    }
}
