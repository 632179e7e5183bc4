use async_trait::async_trait;
use lncd_config::HuggingfaceConfig;
use lncd_core::SourceKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::DatasetSource;
use crate::error::SourceError;
use crate::http::{Auth, Backoff, HttpClient};

pub const HUGGINGFACE_BASE: &str = "https://huggingface.co";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HuggingfaceDataset {
    pub id: String,
    pub license: Option<String>,
    pub dataset_card: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
}

/// The value of the first `license:<id>` tag.
#[must_use]
pub fn license_from_tags(tags: &[Value]) -> Option<String> {
    tags.iter()
        .filter_map(Value::as_str)
        .find_map(|tag| tag.strip_prefix("license:"))
        .map(String::from)
}

pub struct HuggingfaceSource {
    http: HttpClient,
    auth: Auth,
    base_url: String,
}

impl HuggingfaceSource {
    #[must_use]
    pub fn new(http: HttpClient, config: &HuggingfaceConfig) -> Self {
        let auth = config
            .token
            .as_ref()
            .filter(|token| !token.is_empty())
            .map_or(Auth::None, |token| Auth::Bearer(token.clone()));
        Self {
            http,
            auth,
            base_url: HUGGINGFACE_BASE.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn fetch_card(&self, dataset_id: &str) -> Result<Option<String>, SourceError> {
        let url = Url::parse(&format!(
            "{}/datasets/{dataset_id}/raw/main/README.md",
            self.base_url
        ))?;
        let card = self
            .http
            .get_text(&url, &self.auth, Backoff::CappedRetryAfter, None)
            .await?;
        if card.is_none() {
            info!("No README found for {dataset_id}");
        }
        Ok(card)
    }

    /// Every file path in the dataset repository, walking subdirectories.
    pub async fn fetch_files(&self, dataset_id: &str) -> Result<Vec<String>, SourceError> {
        let mut files = Vec::new();
        let mut pending = vec![String::new()];

        while let Some(dir) = pending.pop() {
            let mut endpoint = format!("{}/api/datasets/{dataset_id}/tree/main", self.base_url);
            if !dir.is_empty() {
                endpoint.push('/');
                endpoint.push_str(&dir);
            }
            let url = Url::parse(&endpoint)?;

            let Some(entries) = self
                .http
                .get_json::<Vec<TreeEntry>>(&url, &self.auth, Backoff::CappedRetryAfter)
                .await?
            else {
                warn!("Failed to fetch files for {dataset_id} at path '{dir}'");
                continue;
            };

            for entry in entries {
                match entry.kind.as_str() {
                    "file" => files.push(entry.path),
                    "directory" => pending.push(entry.path),
                    _ => {}
                }
            }
        }

        Ok(files)
    }
}

#[async_trait]
impl DatasetSource for HuggingfaceSource {
    type Item = HuggingfaceDataset;

    fn kind(&self) -> SourceKind {
        SourceKind::Huggingface
    }

    async fn search(&self, term: &str) -> Result<Vec<Value>, SourceError> {
        let url = Url::parse_with_params(&format!("{}/api/datasets", self.base_url), &[("search", term)])?;
        let items: Vec<Value> = self
            .http
            .get_json(&url, &self.auth, Backoff::CappedRetryAfter)
            .await?
            .unwrap_or_default();
        info!("Fetched {} datasets for keyword: '{term}'", items.len());
        Ok(items)
    }

    async fn enrich(&self, hits: &[Value]) -> Result<Vec<HuggingfaceDataset>, SourceError> {
        let total = hits.len();
        let mut datasets = Vec::with_capacity(total);

        for (i, hit) in hits.iter().enumerate() {
            let Some(id) = hit.get("id").and_then(Value::as_str) else {
                warn!("Skipping Hugging Face hit without id");
                continue;
            };
            let license = hit
                .get("tags")
                .and_then(Value::as_array)
                .and_then(|tags| license_from_tags(tags));

            let dataset_card = self.fetch_card(id).await.unwrap_or_else(|e| {
                warn!("Failed to fetch card for {id}: {e}");
                None
            });
            let files = self.fetch_files(id).await.unwrap_or_else(|e| {
                warn!("Failed to list files for {id}: {e}");
                Vec::new()
            });

            datasets.push(HuggingfaceDataset {
                id: id.to_string(),
                license,
                dataset_card,
                files,
            });
            info!("Processed {}/{total}: {id}", i + 1);
        }

        Ok(datasets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn license_tag_is_extracted() {
        let tags = vec![
            json!("task_categories:image-classification"),
            json!("license:cc-by-nc-4.0"),
            json!("license:mit"),
            json!(42),
        ];
        assert_eq!(license_from_tags(&tags).as_deref(), Some("cc-by-nc-4.0"));
        assert_eq!(license_from_tags(&[json!("size_categories:1K<n<10K")]), None);
    }

    #[test]
    fn tree_entries_deserialize() {
        let entries: Vec<TreeEntry> = serde_json::from_value(json!([
            {"type": "file", "oid": "abc", "size": 10, "path": "README.md"},
            {"type": "directory", "oid": "def", "size": 0, "path": "data"}
        ]))
        .unwrap_or_default();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].kind, "directory");
        assert_eq!(entries[1].path, "data");
    }

    #[test]
    fn empty_token_means_anonymous() {
        let Ok(http) = HttpClient::new(&lncd_config::HttpConfig::default()) else {
            panic!("client should build");
        };
        let config = HuggingfaceConfig {
            token: Some(String::new()),
        };
        let source = HuggingfaceSource::new(http, &config);
        assert!(matches!(source.auth, Auth::None));
    }
}
