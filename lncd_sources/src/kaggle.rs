use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lncd_config::KaggleConfig;
use lncd_core::SourceKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use url::Url;

use crate::DatasetSource;
use crate::error::SourceError;
use crate::http::{Auth, Backoff, HttpClient};
use crate::throttle::Throttle;

pub const KAGGLE_API_BASE: &str = "https://www.kaggle.com/api/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KaggleDataset {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(rename = "licenseName", default)]
    pub license_name: String,
    #[serde(default)]
    pub dataset_card: String,
    #[serde(default)]
    pub files: Vec<String>,
}

impl KaggleDataset {
    /// Listing fields, preferring the `*Nullable` variants when set.
    #[must_use]
    pub fn from_hit(hit: &Value) -> Self {
        let pick = |key: &str| {
            let nullable = format!("{key}Nullable");
            hit.get(&nullable)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .or_else(|| hit.get(key).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string()
        };
        Self {
            reference: hit
                .get("ref")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            title: pick("title"),
            subtitle: pick("subtitle"),
            license_name: pick("licenseName"),
            dataset_card: String::new(),
            files: Vec::new(),
        }
    }

    /// Fill in the description and file names from a `datasets/view` body.
    pub fn apply_view(&mut self, view: &Value) {
        self.dataset_card = view
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.files = view
            .get("datasetFiles")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(|f| f.get("name").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
    }
}

/// Every Kaggle request passes through the shared throttle.
#[derive(Debug, Clone)]
struct KaggleApi {
    http: HttpClient,
    auth: Auth,
    base_url: String,
    throttle: Arc<Throttle>,
}

impl KaggleApi {
    async fn get_json(&self, url: &Url) -> Result<Option<Value>, SourceError> {
        self.throttle.wait().await;
        self.http
            .get_json(url, &self.auth, Backoff::FlooredRetryAfter)
            .await
    }

    async fn view(&self, reference: &str) -> Result<Option<Value>, SourceError> {
        let url = Url::parse(&format!("{}/datasets/view/{reference}", self.base_url))?;
        self.get_json(&url).await
    }
}

pub struct KaggleSource {
    api: KaggleApi,
    page_size: u32,
    workers: usize,
}

impl KaggleSource {
    #[must_use]
    pub fn new(http: HttpClient, config: &KaggleConfig) -> Self {
        Self {
            api: KaggleApi {
                http,
                auth: Auth::Basic {
                    username: config.username.clone(),
                    password: config.key.clone(),
                },
                base_url: KAGGLE_API_BASE.to_string(),
                throttle: Arc::new(Throttle::new(Duration::from_millis(config.min_interval_ms))),
            },
            page_size: config.page_size,
            workers: config.workers.max(1),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn list_url(&self, term: &str, page: u32) -> Result<Url, SourceError> {
        Ok(Url::parse_with_params(
            &format!("{}/datasets/list", self.api.base_url),
            &[
                ("search", term.to_string()),
                ("page", page.to_string()),
                ("pageSize", self.page_size.to_string()),
            ],
        )?)
    }
}

#[async_trait]
impl DatasetSource for KaggleSource {
    type Item = KaggleDataset;

    fn kind(&self) -> SourceKind {
        SourceKind::Kaggle
    }

    async fn search(&self, term: &str) -> Result<Vec<Value>, SourceError> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let url = self.list_url(term, page)?;
            let items = match self.api.get_json(&url).await {
                Ok(Some(Value::Array(items))) => items,
                Ok(_) => Vec::new(),
                Err(e) if e.is_status() => {
                    error!("Kaggle listing stopped at page {page}: {e}");
                    break;
                }
                Err(e) => return Err(e),
            };
            if items.is_empty() {
                info!("No more datasets at page {page}");
                break;
            }
            info!(
                "Fetched {} datasets from page {page}. Total: {}",
                items.len(),
                all.len() + items.len()
            );
            all.extend(items);
            page += 1;
        }

        Ok(all)
    }

    async fn enrich(&self, hits: &[Value]) -> Result<Vec<KaggleDataset>, SourceError> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (index, hit) in hits.iter().enumerate() {
            let mut dataset = KaggleDataset::from_hit(hit);
            let api = self.api.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                info!("Fetching dataset: {}", dataset.reference);
                match api.view(&dataset.reference).await {
                    Ok(Some(view)) => dataset.apply_view(&view),
                    Ok(None) => {}
                    Err(e) => warn!("No details for {}, keeping listing fields: {e}", dataset.reference),
                }
                (index, dataset)
            });
        }

        let mut done = Vec::with_capacity(hits.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => done.push(entry),
                Err(e) => error!("Dataset task panicked: {e}"),
            }
        }
        done.sort_by_key(|(index, _)| *index);

        info!("Processed {} of {} Kaggle datasets", done.len(), hits.len());
        Ok(done.into_iter().map(|(_, dataset)| dataset).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lncd_config::HttpConfig;
    use serde_json::json;

    #[test]
    fn hit_prefers_nullable_fields() {
        let hit = json!({
            "ref": "someone/brset-resized",
            "title": "old title",
            "titleNullable": "BRSET resized 512",
            "subtitleNullable": "",
            "subtitle": "fundus images",
            "licenseName": "Unknown",
            "licenseNameNullable": null
        });
        let dataset = KaggleDataset::from_hit(&hit);
        assert_eq!(dataset.reference, "someone/brset-resized");
        assert_eq!(dataset.title, "BRSET resized 512");
        assert_eq!(dataset.subtitle, "fundus images");
        assert_eq!(dataset.license_name, "Unknown");
    }

    #[test]
    fn view_fills_card_and_files() {
        let mut dataset = KaggleDataset::from_hit(&json!({"ref": "a/b"}));
        dataset.apply_view(&json!({
            "description": "Derived from BRSET.",
            "datasetFiles": [{"name": "labels.csv"}, {"name": "images.zip"}, {"size": 3}]
        }));
        assert_eq!(dataset.dataset_card, "Derived from BRSET.");
        assert_eq!(dataset.files, vec!["labels.csv", "images.zip"]);
    }

    #[test]
    fn serialized_keys_match_api_names() {
        let dataset = KaggleDataset::from_hit(&json!({"ref": "a/b", "licenseName": "CC0-1.0"}));
        let value = serde_json::to_value(&dataset).unwrap_or_default();
        assert_eq!(value["ref"], "a/b");
        assert_eq!(value["licenseName"], "CC0-1.0");
    }

    /// Answers every request with 403.
    async fn forbidding_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("listener should bind");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("listener has an address");
        };
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 403 Forbidden\r\nContent-Length: 9\r\nConnection: close\r\n\r\nForbidden",
                    )
                    .await;
            }
        });
        format!("http://{addr}/api/v1")
    }

    #[tokio::test]
    async fn failed_view_keeps_listing_fields() {
        let base = forbidding_server().await;
        let Ok(http) = HttpClient::new(&HttpConfig::default()) else {
            panic!("client should build");
        };
        let config = KaggleConfig {
            min_interval_ms: 0,
            ..KaggleConfig::default()
        };
        let source = KaggleSource::new(http, &config).with_base_url(base);

        let hits = [
            json!({"ref": "a/brset-small", "title": "BRSET small", "licenseName": "CC0-1.0"}),
            json!({"ref": "b/brset-labels", "title": "BRSET labels"}),
        ];
        let Ok(datasets) = source.enrich(&hits).await else {
            panic!("enrich should not fail");
        };
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].reference, "a/brset-small");
        assert_eq!(datasets[0].license_name, "CC0-1.0");
        assert!(datasets[0].dataset_card.is_empty());
        assert_eq!(datasets[1].title, "BRSET labels");
        assert!(datasets[1].files.is_empty());
    }

    #[test]
    fn list_url_pages() {
        let Ok(http) = HttpClient::new(&HttpConfig::default()) else {
            panic!("client should build");
        };
        let source = KaggleSource::new(http, &KaggleConfig::default());
        let Ok(url) = source.list_url("BRSET", 3) else {
            panic!("url should build");
        };
        assert_eq!(url.path(), "/api/v1/datasets/list");
        assert_eq!(url.query(), Some("search=BRSET&page=3&pageSize=100"));
    }
}
