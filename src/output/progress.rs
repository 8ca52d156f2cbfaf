use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::pipeline::StageObserver;

use super::styling::{bright, bright_green, bright_yellow, dim};

/// Three-phase spinner driven by pipeline stage callbacks.
pub struct PhaseProgress {
    pb: Mutex<ProgressBar>,
    enrich: bool,
    parsed: Mutex<usize>,
}

impl PhaseProgress {
    pub fn start(enrich: bool) -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow("Phase 1/3: Fetching trending listing").to_string());
        Self {
            pb: Mutex::new(pb),
            enrich,
            parsed: Mutex::new(0),
        }
    }

    /// Marks the current phase done and starts the next one.
    fn advance(&self, done: String, next: Option<String>) {
        if let Ok(mut pb) = self.pb.lock() {
            pb.finish_with_message(bright_green(done).to_string());
            if let Some(next) = next {
                *pb = create_spinner(bright_yellow(next).to_string());
            }
        }
    }

    /// Clears a spinner left running by an early return or an error.
    pub fn finish(&self) {
        if let Ok(pb) = self.pb.lock() {
            if !pb.is_finished() {
                pb.abandon_with_message(dim("stopped").to_string());
            }
        }
        eprintln!();
    }
}

impl StageObserver for PhaseProgress {
    fn listing_fetched(&self, bytes: usize) {
        self.advance(
            format!("Phase 1/3: Fetched listing ({} KB) ✓", bytes.div_ceil(1024)),
            Some("Phase 2/3: Parsing repositories".to_string()),
        );
    }

    fn listing_parsed(&self, records: usize, skipped: usize) {
        if let Ok(mut parsed) = self.parsed.lock() {
            *parsed = records;
        }

        let done = if skipped > 0 {
            format!("Phase 2/3: Parsed {records} repositories ({skipped} skipped) ✓")
        } else {
            format!("Phase 2/3: Parsed {records} repositories ✓")
        };
        let next = if records == 0 {
            None
        } else if self.enrich {
            Some("Phase 3/3: Enriching repositories".to_string())
        } else {
            Some("Phase 3/3: Skipping enrichment".to_string())
        };
        self.advance(done, next);
    }

    fn enrichment_finished(&self, enriched: usize) {
        let total = self.parsed.lock().map(|p| *p).unwrap_or_default();
        self.advance(enrichment_done_message(self.enrich, enriched, total), None);
    }
}

fn enrichment_done_message(enrich: bool, enriched: usize, total: usize) -> String {
    if enrich {
        format!("Phase 3/3: Enriched {enriched}/{total} repositories ✓")
    } else {
        "Phase 3/3: Enrichment skipped ✓".to_string()
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrichment_done_message() {
        assert_eq!(
            enrichment_done_message(true, 7, 25),
            "Phase 3/3: Enriched 7/25 repositories ✓"
        );
        assert_eq!(
            enrichment_done_message(false, 0, 25),
            "Phase 3/3: Enrichment skipped ✓"
        );
    }
}
