use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::output::{print_summary, PhaseProgress};
use crate::pipeline::Pipeline;
use crate::providers::trending::Window;
use crate::record::TrendingBatch;

#[derive(Parser)]
#[command(name = "trendlens")]
#[command(author, version, about = "Trending repository collector", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./trendlens.toml or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect today's trending repositories
    Trending {
        /// Language filter, e.g. `rust` or `c++`
        #[arg(short, long)]
        language: Option<String>,

        #[arg(short, long, value_enum, default_value_t = Window::Daily)]
        since: Window,

        #[arg(short, long, env = "GITHUB_API_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Skip API enrichment even when a token is available
        #[arg(long, default_value_t = false)]
        no_enrich: bool,

        /// Date stamped on the batch (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Write a default configuration file
    Init {
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
}

impl Cli {
    async fn execute_trending(
        &self,
        language: Option<&str>,
        since: Window,
        token: Option<&str>,
        no_enrich: bool,
        date: Option<NaiveDate>,
    ) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(token) = token {
            config.api.token = Some(token.to_owned());
        }
        if no_enrich {
            config.enrichment.enabled = false;
        }

        let pipeline = Pipeline::new(&config)?;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, keeping the data collected so far");
                trigger.cancel();
            }
        });

        let progress = PhaseProgress::start(pipeline.enrichment_enabled());
        let result = pipeline
            .run_until_cancelled(language, since, &cancel, &progress)
            .await;
        progress.finish();

        let records = result.context("Failed to collect trending repositories")?;
        if records.is_empty() {
            info!("No trending repositories, nothing to report");
        }

        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let batch = TrendingBatch::new(date, language.map(str::to_owned), since, records);

        print_summary(&batch);

        let json_output = if self.pretty {
            serde_json::to_string_pretty(&batch)?
        } else {
            serde_json::to_string(&batch)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            info!("Batch written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }

    fn execute_init(path: Option<&Path>, force: bool) -> Result<()> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from("trendlens.toml"),
        };

        if path.exists() && !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }

        Config::default().save(&path)?;
        info!("Default configuration written to: {}", path.display());
        eprintln!("Wrote {}", path.display());

        if let Some(user_path) = Config::user_config_path() {
            eprintln!("Per-user configuration is read from {}", user_path.display());
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Trending {
                language,
                since,
                token,
                no_enrich,
                date,
            } => {
                self.execute_trending(
                    language.as_deref(),
                    *since,
                    token.as_deref(),
                    *no_enrich,
                    *date,
                )
                .await
            }
            Commands::Init { path, force } => Self::execute_init(path.as_deref(), *force),
        }
    }
}
