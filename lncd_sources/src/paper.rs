//! Scan citing papers for the open platforms they mention.

use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{error, info};

use crate::error::SourceError;
use crate::scholar::CitationRow;
use crate::web_fetch::WebFetcher;

pub const OPEN_PLATFORMS: [&str; 7] = [
    "physionet",
    "github",
    "huggingface",
    "kaggle",
    "zenodo",
    "tfhub",
    "monai",
];

const REFERENCES_MARKER: &str = "references\n";

/// The paper body up to its first `References` heading line, trimmed.
#[must_use]
pub fn body_before_references(text: &str) -> Option<&str> {
    // ASCII lowering keeps byte offsets aligned with `text`.
    let end = text.to_ascii_lowercase().find(REFERENCES_MARKER)?;
    Some(text[..end].trim())
}

/// Platforms from [`OPEN_PLATFORMS`] mentioned anywhere in `body`.
#[must_use]
pub fn detect_platforms(body: &str) -> Vec<&'static str> {
    let lowered = body.to_lowercase();
    OPEN_PLATFORMS
        .into_iter()
        .filter(|platform| lowered.contains(platform))
        .collect()
}

#[must_use]
pub fn platform_summary(platforms: &[&str]) -> String {
    if platforms.is_empty() {
        "N/A".to_string()
    } else {
        platforms.join(", ")
    }
}

pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, SourceError> {
    task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| SourceError::Pdf(e.to_string()))?
        .map_err(|e| SourceError::Pdf(e.to_string()))
}

/// A citing paper whose PDF was read, with the platforms its body names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSourceRow {
    #[serde(rename = "Original")]
    pub original: String,
    #[serde(rename = "Cited By")]
    pub cited_by: String,
    #[serde(rename = "Source Existed")]
    pub source_existed: String,
    #[serde(rename = "Source Type")]
    pub source_type: String,
    #[serde(rename = "Source Link")]
    pub source_link: String,
    #[serde(rename = "Open Source Platform")]
    pub open_source_platform: String,
}

impl OpenSourceRow {
    pub const HEADERS: [&'static str; 6] = [
        "Original",
        "Cited By",
        "Source Existed",
        "Source Type",
        "Source Link",
        "Open Source Platform",
    ];

    #[must_use]
    pub fn new(row: &CitationRow, platforms: &[&str]) -> Self {
        Self {
            original: row.original.clone(),
            cited_by: row.cited_by.clone(),
            source_existed: row.source_existed.clone(),
            source_type: row.source_type.clone(),
            source_link: row.source_link.clone(),
            open_source_platform: platform_summary(platforms),
        }
    }

    /// At least one open platform was mentioned.
    #[must_use]
    pub fn has_platform(&self) -> bool {
        self.open_source_platform != "N/A"
    }
}

/// Downloads citing-paper PDFs and scans their bodies.
pub struct PaperScanner {
    fetcher: WebFetcher,
}

impl PaperScanner {
    #[must_use]
    pub const fn new(fetcher: WebFetcher) -> Self {
        Self { fetcher }
    }

    pub async fn scan(&self, row: &CitationRow) -> Result<OpenSourceRow, SourceError> {
        let bytes = self.fetcher.fetch_bytes(&row.source_link).await?;
        let text = extract_pdf_text(bytes).await?;
        let body = body_before_references(&text).ok_or(SourceError::NoReferences)?;
        Ok(OpenSourceRow::new(row, &detect_platforms(body)))
    }

    /// Scan every PDF row; papers that fail are logged and left out.
    pub async fn scan_all(&self, rows: &[CitationRow]) -> Vec<OpenSourceRow> {
        let mut scanned = Vec::new();
        for row in rows.iter().filter(|row| row.is_pdf()) {
            info!("Scanning {}", row.source_link);
            match self.scan(row).await {
                Ok(result) => scanned.push(result),
                Err(e) => error!("Error processing {}: {e}", row.source_link),
            }
        }
        scanned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_cut_at_references() {
        let text = "Intro\nWe release code on GitHub.\nREFERENCES\n[1] Kaggle paper\n";
        assert_eq!(
            body_before_references(text),
            Some("Intro\nWe release code on GitHub.")
        );
        assert_eq!(body_before_references("no heading here\nreferences: inline"), None);
    }

    #[test]
    fn cut_keeps_offsets_with_non_ascii() {
        let text = "Ünïcödé body · physionet\nReferences\nzenodo";
        assert_eq!(body_before_references(text), Some("Ünïcödé body · physionet"));
    }

    #[test]
    fn platforms_are_detected_case_insensitively() {
        let body = "Data from PhysioNet; code at https://github.com/x; weights on HuggingFace.";
        assert_eq!(detect_platforms(body), vec!["physionet", "github", "huggingface"]);
        assert!(detect_platforms("nothing relevant").is_empty());
    }

    #[test]
    fn summary_joins_or_marks_missing() {
        assert_eq!(platform_summary(&["github", "zenodo"]), "github, zenodo");
        assert_eq!(platform_summary(&[]), "N/A");
    }

    #[test]
    fn open_source_row_copies_citation() {
        let citation = CitationRow {
            original: "O".to_string(),
            cited_by: "C".to_string(),
            source_existed: "Yes".to_string(),
            source_type: "PDF".to_string(),
            source_link: "https://x/p.pdf".to_string(),
        };
        let row = OpenSourceRow::new(&citation, &["monai"]);
        assert_eq!(row.open_source_platform, "monai");
        assert!(row.has_platform());
        assert!(!OpenSourceRow::new(&citation, &[]).has_platform());
    }
}
