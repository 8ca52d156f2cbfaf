mod auth;
mod cli;
mod config;
mod error;
mod number;
mod output;
mod pipeline;
mod providers;
mod record;
mod retry;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting TrendLens");
    cli.execute().await?;

    Ok(())
}
