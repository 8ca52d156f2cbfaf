mod client;
mod enricher;
mod types;


pub use client::GitHubClient;
pub use enricher::Enricher;
