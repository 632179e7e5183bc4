//! Open-source obligation: do the papers citing the dataset publish their
//! work on an open platform?

use anyhow::Context;
use lncd_config::Config;
use lncd_core::LicenseProfile;
use lncd_sources::{CitationRow, HttpClient, OpenSourceRow, PaperScanner, ScholarClient, WebFetcher};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifacts::{ArtifactKind, ArtifactStore};

/// Counts over the citation and scan tables of one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSourceReport {
    pub cited_papers: usize,
    pub pdf_papers: usize,
    pub scanned: usize,
    pub platform_hits: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OpenSourceReport {
    #[must_use]
    pub fn from_rows(cited: &[CitationRow], scanned: &[OpenSourceRow]) -> Self {
        Self {
            cited_papers: cited.len(),
            pdf_papers: cited.iter().filter(|row| row.is_pdf()).count(),
            scanned: scanned.len(),
            platform_hits: scanned.iter().filter(|row| row.has_platform()).count(),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: &anyhow::Error) -> Self {
        Self {
            error: Some(format!("{error:#}")),
            ..Self::default()
        }
    }
}

pub struct OpenSourceCheck {
    scholar: ScholarClient,
    scanner: PaperScanner,
}

impl OpenSourceCheck {
    #[must_use]
    pub const fn new(scholar: ScholarClient, scanner: PaperScanner) -> Self {
        Self { scholar, scanner }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = HttpClient::new(&config.http).context("failed to build HTTP client")?;
        let fetcher = WebFetcher::new(&config.http).context("failed to build paper fetcher")?;
        Ok(Self::new(
            ScholarClient::new(http, &config.sources.scholar),
            PaperScanner::new(fetcher),
        ))
    }

    /// Collect the papers citing the dataset and save the citation table.
    /// A title Scholar does not know yields an empty table.
    pub async fn collect_citations(
        &self,
        profile: &LicenseProfile,
        store: &ArtifactStore,
        keyword: &str,
    ) -> anyhow::Result<Vec<CitationRow>> {
        let rows = match self.scholar.find_paper(&profile.title).await? {
            Some(paper) => {
                info!(
                    "Found \"{}\" cited by {} papers",
                    paper.title, paper.cited_count
                );
                self.scholar.cited_by(&paper, &profile.title).await?
            }
            None => Vec::new(),
        };
        store.save_csv(ArtifactKind::CitedPapers, keyword, &CitationRow::HEADERS, &rows)?;
        Ok(rows)
    }

    /// Scan the PDFs of a saved citation table and save the scan table.
    pub async fn scan_citations(&self, store: &ArtifactStore, keyword: &str) -> anyhow::Result<OpenSourceReport> {
        let cited: Vec<CitationRow> = store.load_csv(ArtifactKind::CitedPapers, keyword)?;
        let scanned = self.scanner.scan_all(&cited).await;
        store.save_csv(ArtifactKind::OpenSourceCheck, keyword, &OpenSourceRow::HEADERS, &scanned)?;

        let report = OpenSourceReport::from_rows(&cited, &scanned);
        if report.platform_hits < report.scanned {
            warn!(
                "{} of {} scanned papers mention no open platform",
                report.scanned - report.platform_hits,
                report.scanned
            );
        }
        Ok(report)
    }

    pub async fn run(
        &self,
        profile: &LicenseProfile,
        store: &ArtifactStore,
        keyword: &str,
    ) -> anyhow::Result<OpenSourceReport> {
        self.collect_citations(profile, store, keyword).await?;
        self.scan_citations(store, keyword).await
    }
}
