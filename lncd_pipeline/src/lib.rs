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

pub mod artifacts;
pub mod compliance;
pub mod filter;
pub mod license;
pub mod open_source;
pub mod pipeline;
pub mod stats;

pub use artifacts::{ArtifactError, ArtifactKind, ArtifactStore};
pub use compliance::{Audited, ComplianceChecker};
pub use filter::{Candidate, DownstreamFilter, Judged};
pub use license::{LicenseFormalizer, PageFetcher};
pub use open_source::{OpenSourceCheck, OpenSourceReport};
pub use pipeline::{DetectionPipeline, DetectionReport, SourceReport};
pub use stats::{FilterStats, ViolationStats};
