mod fetcher;
mod parser;

pub use fetcher::ListingFetcher;
pub use parser::parse_listing;

use serde::{Deserialize, Serialize};

/// Time range the listing ranks repositories over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Window {
    /// Value of the `since` query parameter; daily is the listing's default
    /// and is never sent explicitly.
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            Self::Daily => None,
            Self::Weekly => Some("weekly"),
            Self::Monthly => Some("monthly"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
