use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use lncd_config::GithubConfig;
use lncd_core::SourceKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use url::Url;

use crate::DatasetSource;
use crate::error::SourceError;
use crate::http::{Auth, Backoff, HttpClient};

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";

/// A repository reduced to what the downstream judge reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubRepo {
    pub name: String,
    pub full_name: String,
    pub license: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub readme: Option<String>,
}

impl GithubRepo {
    /// Keep the fields of one search hit; the readme is fetched separately.
    #[must_use]
    pub fn from_hit(hit: &Value) -> Self {
        let text = |key: &str| hit.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        Self {
            name: text("name"),
            full_name: text("full_name"),
            license: hit
                .pointer("/license/name")
                .and_then(Value::as_str)
                .map(String::from),
            topics: hit
                .get("topics")
                .and_then(Value::as_array)
                .map(|topics| {
                    topics
                        .iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            readme: None,
        }
    }
}

/// Partition `[start, end]` into inclusive windows of `interval_days` days.
/// `created:a..b` includes both ends, so no day belongs to two windows.
#[must_use]
pub fn date_windows(start: NaiveDate, end: NaiveDate, interval_days: u32) -> Vec<(NaiveDate, NaiveDate)> {
    let span = Days::new(u64::from(interval_days.max(1)) - 1);
    let mut windows = Vec::new();
    let mut current = start;
    while current <= end {
        let last = current.checked_add_days(span).map_or(end, |d| d.min(end));
        windows.push((current, last));
        match last.checked_add_days(Days::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }
    windows
}

/// Drop repeated `full_name`s, keeping the first hit.
fn dedup_hits(hits: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| match hit.get("full_name").and_then(Value::as_str) {
            Some(name) => seen.insert(name.to_string()),
            None => true,
        })
        .collect()
}

pub struct GithubSource {
    http: HttpClient,
    auth: Auth,
    base_url: String,
    config: GithubConfig,
}

impl GithubSource {
    #[must_use]
    pub fn new(http: HttpClient, config: GithubConfig) -> Self {
        let auth = if config.token.is_empty() {
            Auth::None
        } else {
            Auth::Token(config.token.clone())
        };
        Self {
            http,
            auth,
            base_url: GITHUB_API_BASE.to_string(),
            config,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn search_url(&self, term: &str, from: NaiveDate, to: NaiveDate, page: u32) -> Result<Url, SourceError> {
        let query = format!("{term} created:{}..{}", from.format("%Y-%m-%d"), to.format("%Y-%m-%d"));
        Ok(Url::parse_with_params(
            &format!("{}/search/repositories", self.base_url),
            &[
                ("q", query),
                ("sort", "stars".to_string()),
                ("order", "desc".to_string()),
                ("per_page", self.config.per_page.to_string()),
                ("page", page.to_string()),
            ],
        )?)
    }

    async fn search_window(&self, term: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Value>, SourceError> {
        let mut repos = Vec::new();

        for page in 1..=self.config.max_pages {
            let url = self.search_url(term, from, to, page)?;
            let body: Option<Value> = match self.http.get_json(&url, &self.auth, Backoff::RateLimitReset).await {
                Ok(body) => body,
                Err(e) if e.is_status() => {
                    error!("GitHub search stopped at page {page}: {e}");
                    break;
                }
                Err(e) => return Err(e),
            };

            let items = match body {
                Some(Value::Object(mut map)) => match map.remove("items") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            };
            if items.is_empty() {
                break;
            }
            info!("Fetched {} repos on page {page} ({from} to {to})", items.len());
            repos.extend(items);
        }

        Ok(repos)
    }

    /// Raw README text, `None` when the repository has none.
    pub async fn fetch_readme(&self, full_name: &str) -> Result<Option<String>, SourceError> {
        let url = Url::parse(&format!("{}/repos/{full_name}/readme", self.base_url))?;
        self.http
            .get_text(&url, &self.auth, Backoff::RateLimitReset, Some(RAW_MEDIA_TYPE))
            .await
    }
}

#[async_trait]
impl DatasetSource for GithubSource {
    type Item = GithubRepo;

    fn kind(&self) -> SourceKind {
        SourceKind::Github
    }

    async fn search(&self, term: &str) -> Result<Vec<Value>, SourceError> {
        let mut all = Vec::new();
        for (from, to) in date_windows(
            self.config.start_date,
            self.config.end_date,
            self.config.interval_days,
        ) {
            info!("Searching GitHub from {from} to {to}");
            all.extend(self.search_window(term, from, to).await?);
        }
        let all = dedup_hits(all);
        info!("Total repositories fetched: {}", all.len());
        Ok(all)
    }

    async fn enrich(&self, hits: &[Value]) -> Result<Vec<GithubRepo>, SourceError> {
        let total = hits.len();
        let mut repos = Vec::with_capacity(total);

        for (i, hit) in hits.iter().enumerate() {
            let mut repo = GithubRepo::from_hit(hit);
            if !repo.full_name.is_empty() {
                repo.readme = match self.fetch_readme(&repo.full_name).await {
                    Ok(readme) => readme,
                    Err(e) => {
                        warn!("Failed to fetch README for {}: {e}", repo.full_name);
                        None
                    }
                };
            }
            repos.push(repo);

            let done = i + 1;
            if done % 10 == 0 || done == total {
                info!("Processed {done}/{total} repositories");
            }
        }

        Ok(repos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lncd_config::HttpConfig;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    #[test]
    fn windows_cover_range() {
        let windows = date_windows(date(2025, 1, 1), date(2025, 4, 15), 30);
        assert_eq!(
            windows,
            vec![
                (date(2025, 1, 1), date(2025, 1, 30)),
                (date(2025, 1, 31), date(2025, 3, 1)),
                (date(2025, 3, 2), date(2025, 3, 31)),
                (date(2025, 4, 1), date(2025, 4, 15)),
            ]
        );
    }

    #[test]
    fn windows_never_share_a_day() {
        let (start, end) = (date(2024, 1, 1), date(2024, 3, 1));
        let windows = date_windows(start, end, 30);
        assert_eq!(windows.first().map(|w| w.0), Some(start));
        assert_eq!(windows.last().map(|w| w.1), Some(end));
        for pair in windows.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            assert!(prev.0 <= prev.1);
            assert_eq!(prev.1.succ_opt(), Some(next.0), "{prev:?} and {next:?} overlap or leave a gap");
        }
    }

    #[test]
    fn windows_empty_or_degenerate() {
        assert!(date_windows(date(2025, 1, 2), date(2025, 1, 1), 30).is_empty());
        assert_eq!(
            date_windows(date(2025, 1, 1), date(2025, 1, 1), 30),
            vec![(date(2025, 1, 1), date(2025, 1, 1))]
        );
        assert_eq!(date_windows(date(2025, 1, 1), date(2025, 1, 3), 0).len(), 3);
    }

    #[test]
    fn repeated_hits_are_dropped() {
        let hits = vec![
            json!({"full_name": "lab/brset-cnn", "stargazers_count": 3}),
            json!({"full_name": "lab/brset-vit"}),
            json!({"full_name": "lab/brset-cnn", "stargazers_count": 4}),
        ];
        let kept = dedup_hits(hits);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0]["stargazers_count"], 3);
        assert_eq!(kept[1]["full_name"], "lab/brset-vit");
    }

    #[test]
    fn hit_keeps_license_name_and_topics() {
        let hit = json!({
            "name": "brset-baseline",
            "full_name": "lab/brset-baseline",
            "license": {"key": "mit", "name": "MIT License"},
            "topics": ["ophthalmology", "fundus"],
            "stargazers_count": 12
        });
        let repo = GithubRepo::from_hit(&hit);
        assert_eq!(repo.full_name, "lab/brset-baseline");
        assert_eq!(repo.license.as_deref(), Some("MIT License"));
        assert_eq!(repo.topics, vec!["ophthalmology", "fundus"]);
        assert!(repo.readme.is_none());

        let bare = GithubRepo::from_hit(&json!({"name": "x", "full_name": "a/x", "license": null}));
        assert!(bare.license.is_none());
        assert!(bare.topics.is_empty());
    }

    #[test]
    fn search_url_carries_window_query() {
        let Ok(http) = HttpClient::new(&HttpConfig::default()) else {
            panic!("client should build");
        };
        let source = GithubSource::new(http, GithubConfig::default());
        let Ok(url) = source.search_url("BRSET", date(2025, 1, 1), date(2025, 1, 31), 2) else {
            panic!("url should build");
        };
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("q".to_string(), "BRSET created:2025-01-01..2025-01-31".to_string())));
        assert!(pairs.contains(&("sort".to_string(), "stars".to_string())));
        assert!(pairs.contains(&("per_page".to_string(), "100".to_string())));
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
        assert_eq!(url.path(), "/search/repositories");
    }
}
