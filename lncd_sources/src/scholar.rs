//! Google Scholar lookups through `SerpAPI`.

use lncd_config::ScholarConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use url::Url;

use crate::error::SourceError;
use crate::http::{Auth, Backoff, HttpClient};

pub const SERPAPI_URL: &str = "https://serpapi.com/search.json";
const NOT_AVAILABLE: &str = "N/A";

/// Normalized indel similarity in `[0, 100]`; 100 only for equal strings.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }

    // Longest common subsequence, one row at a time.
    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut diagonal = 0;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    let lcs = row[b.len()];

    (2 * lcs) as f64 / total as f64 * 100.0
}

/// The dataset paper as found on Scholar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScholarMatch {
    pub title: String,
    pub result_id: String,
    pub cited_count: u64,
}

/// Pick the result whose title equals `title` ignoring case.
#[must_use]
pub fn best_match(results: &[Value], title: &str) -> Option<ScholarMatch> {
    let wanted = title.to_lowercase();
    let mut best: Option<(&Value, f64)> = None;

    for result in results {
        let candidate = result.get("title").and_then(Value::as_str).unwrap_or_default();
        let score = similarity_ratio(&wanted, &candidate.to_lowercase());
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((result, score));
            if candidate.to_lowercase() == wanted {
                break;
            }
        }
    }

    let (result, score) = best?;
    let found = result.get("title").and_then(Value::as_str).unwrap_or_default();
    info!("Best match: {found} with score: {score:.1}");
    if found.to_lowercase() != wanted {
        return None;
    }

    Some(ScholarMatch {
        title: found.to_string(),
        result_id: result.get("result_id").and_then(Value::as_str)?.to_string(),
        cited_count: result
            .pointer("/inline_links/cited_by/total")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    })
}

/// One citing paper, with the first downloadable resource if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRow {
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
}

impl CitationRow {
    /// CSV column names, in field order.
    pub const HEADERS: [&'static str; 5] = [
        "Original",
        "Cited By",
        "Source Existed",
        "Source Type",
        "Source Link",
    ];

    #[must_use]
    pub fn from_result(original: &str, paper: &Value) -> Self {
        let resources = paper.get("resources");
        let first = resources.and_then(|r| r.get(0));
        let field = |key: &str| {
            first
                .and_then(|r| r.get(key))
                .and_then(Value::as_str)
                .unwrap_or(NOT_AVAILABLE)
                .to_string()
        };
        Self {
            original: original.to_string(),
            cited_by: paper
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            source_existed: if resources.is_some() { "Yes" } else { "No" }.to_string(),
            source_type: field("file_format"),
            source_link: field("link"),
        }
    }

    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.source_type == "PDF"
    }
}

pub struct ScholarClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
    page_size: u32,
}

impl ScholarClient {
    #[must_use]
    pub fn new(http: HttpClient, config: &ScholarConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: SERPAPI_URL.to_string(),
            page_size: config.page_size.max(1),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn query(&self, params: &[(&str, String)]) -> Result<Value, SourceError> {
        let mut all = vec![
            ("engine", "google_scholar".to_string()),
            ("api_key", self.api_key.clone()),
        ];
        all.extend(params.iter().cloned());
        let url = Url::parse_with_params(&self.base_url, &all)?;
        Ok(self
            .http
            .get_json(&url, &Auth::None, Backoff::CappedRetryAfter)
            .await?
            .unwrap_or(Value::Null))
    }

    /// Look the dataset paper up by its exact title.
    pub async fn find_paper(&self, title: &str) -> Result<Option<ScholarMatch>, SourceError> {
        let results = self.query(&[("q", title.to_string())]).await?;
        let found = results
            .get("organic_results")
            .and_then(Value::as_array)
            .and_then(|organic| best_match(organic, title));
        if found.is_none() {
            error!("No results found for: {title}");
        }
        Ok(found)
    }

    /// Every paper citing `paper`, paged by `page_size`.
    pub async fn cited_by(&self, paper: &ScholarMatch, original: &str) -> Result<Vec<CitationRow>, SourceError> {
        let mut rows = Vec::new();
        let mut start = 0u64;

        while start < paper.cited_count {
            let page = self
                .query(&[
                    ("hl", "en".to_string()),
                    ("cites", paper.result_id.clone()),
                    ("start", start.to_string()),
                    ("num", self.page_size.to_string()),
                ])
                .await?;
            let citing = page
                .get("organic_results")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            info!("Found {} citing papers for: {}", citing.len(), paper.title);
            if citing.is_empty() {
                break;
            }
            rows.extend(citing.iter().map(|p| CitationRow::from_result(original, p)));
            start += u64::from(self.page_size);
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ratio_matches_indel_definition() {
        assert!((similarity_ratio("abc", "abc") - 100.0).abs() < f64::EPSILON);
        assert!(similarity_ratio("abc", "xyz").abs() < f64::EPSILON);
        // lcs("kitten", "sitting") = 4 -> 2 * 4 / 13
        let expected = 8.0 / 13.0 * 100.0;
        assert!((similarity_ratio("kitten", "sitting") - expected).abs() < 1e-9);
        assert!((similarity_ratio("", "") - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn only_exact_title_is_accepted() {
        let title = "A Brazilian multilabel ophthalmological dataset (BRSET)";
        let results = vec![
            json!({"title": "A Brazilian multilabel ophthalmological dataset", "result_id": "near"}),
            json!({
                "title": "A Brazilian Multilabel Ophthalmological Dataset (BRSET)",
                "result_id": "exact",
                "inline_links": {"cited_by": {"total": 41}}
            }),
        ];
        let Some(found) = best_match(&results, title) else {
            panic!("expected an exact match");
        };
        assert_eq!(found.result_id, "exact");
        assert_eq!(found.cited_count, 41);

        assert_eq!(best_match(&results[..1], title), None);
        assert_eq!(best_match(&[], title), None);
    }

    #[test]
    fn citation_row_reads_first_resource() {
        let paper = json!({
            "title": "Deep learning for diabetic retinopathy on BRSET",
            "resources": [
                {"title": "arxiv.org", "file_format": "PDF", "link": "https://arxiv.org/pdf/1.pdf"},
                {"file_format": "HTML", "link": "https://example.org"}
            ]
        });
        let row = CitationRow::from_result("BRSET paper", &paper);
        assert_eq!(row.source_existed, "Yes");
        assert_eq!(row.source_type, "PDF");
        assert_eq!(row.source_link, "https://arxiv.org/pdf/1.pdf");
        assert!(row.is_pdf());

        let bare = CitationRow::from_result("BRSET paper", &json!({"title": "No files"}));
        assert_eq!(bare.source_existed, "No");
        assert_eq!(bare.source_type, "N/A");
        assert_eq!(bare.source_link, "N/A");
        assert!(!bare.is_pdf());
    }

    #[test]
    fn csv_headers_use_column_names() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let row = CitationRow::from_result("T", &json!({"title": "C"}));
        assert!(writer.serialize(&row).is_ok());
        let Ok(bytes) = writer.into_inner() else {
            panic!("writer should flush");
        };
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("Original,Cited By,Source Existed,Source Type,Source Link\n"));
        assert!(text.contains("T,C,No,N/A,N/A"));
    }
}
