#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

pub mod error;
pub mod github;
pub mod http;
pub mod huggingface;
pub mod kaggle;
pub mod paper;
pub mod scholar;
pub mod throttle;
pub mod web_fetch;

pub use error::SourceError;
pub use github::{GithubRepo, GithubSource};
pub use http::{Auth, Backoff, HttpClient};
pub use huggingface::{HuggingfaceDataset, HuggingfaceSource};
pub use kaggle::{KaggleDataset, KaggleSource};
pub use paper::{OpenSourceRow, PaperScanner};
pub use scholar::{CitationRow, ScholarClient, ScholarMatch};
pub use throttle::Throttle;
pub use web_fetch::{WebFetcher, html_to_text};

use async_trait::async_trait;
use lncd_core::SourceKind;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A platform crawled for candidate downstream uses of a dataset.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// The enriched form of one candidate, as persisted and judged.
    type Item: Serialize + DeserializeOwned + Send + Sync;

    fn kind(&self) -> SourceKind;

    /// Raw search hits for `term`, in the platform's own JSON shape.
    async fn search(&self, term: &str) -> Result<Vec<Value>, SourceError>;

    /// Reduce raw hits to the fields the judges read, fetching cards,
    /// readmes and file listings on the way.
    async fn enrich(&self, hits: &[Value]) -> Result<Vec<Self::Item>, SourceError>;
}
