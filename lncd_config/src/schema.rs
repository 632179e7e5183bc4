use chrono::NaiveDate;
use lncd_core::SourceKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Models used by each LLM-backed stage.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentsConfig {
    #[serde(default = "AgentsConfig::default_license_model")]
    pub license_model: String,
    #[serde(default = "AgentsConfig::default_filter_model")]
    pub filter_model: String,
    #[serde(default = "AgentsConfig::default_compliance_model")]
    pub compliance_model: String,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            license_model: Self::default_license_model(),
            filter_model: Self::default_filter_model(),
            compliance_model: Self::default_compliance_model(),
        }
    }
}

impl AgentsConfig {
    fn default_license_model() -> String {
        "gpt-4o".to_string()
    }

    fn default_filter_model() -> String {
        "gpt-4o-mini".to_string()
    }

    fn default_compliance_model() -> String {
        "gpt-4o".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub huggingface: HuggingfaceConfig,
    #[serde(default)]
    pub kaggle: KaggleConfig,
    #[serde(default)]
    pub scholar: ScholarConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GithubConfig {
    #[serde(default)]
    pub token: String,
    /// First day of the repository creation window searched.
    #[serde(default = "GithubConfig::default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "GithubConfig::default_end_date")]
    pub end_date: NaiveDate,
    /// Width of each search window; the search API caps results per query.
    #[serde(default = "GithubConfig::default_interval_days")]
    pub interval_days: u32,
    #[serde(default = "GithubConfig::default_per_page")]
    pub per_page: u32,
    #[serde(default = "GithubConfig::default_max_pages")]
    pub max_pages: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            start_date: Self::default_start_date(),
            end_date: Self::default_end_date(),
            interval_days: Self::default_interval_days(),
            per_page: Self::default_per_page(),
            max_pages: Self::default_max_pages(),
        }
    }
}

impl GithubConfig {
    fn default_start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
    }

    fn default_end_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 15).unwrap_or_default()
    }

    const fn default_interval_days() -> u32 {
        30
    }

    const fn default_per_page() -> u32 {
        100
    }

    const fn default_max_pages() -> u32 {
        10
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HuggingfaceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KaggleConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub key: String,
    #[serde(default = "KaggleConfig::default_page_size")]
    pub page_size: u32,
    /// Concurrent dataset enrichments.
    #[serde(default = "KaggleConfig::default_workers")]
    pub workers: usize,
    /// Minimum spacing between any two Kaggle API requests.
    #[serde(default = "KaggleConfig::default_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl Default for KaggleConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            key: String::new(),
            page_size: Self::default_page_size(),
            workers: Self::default_workers(),
            min_interval_ms: Self::default_min_interval_ms(),
        }
    }
}

impl KaggleConfig {
    const fn default_page_size() -> u32 {
        100
    }

    const fn default_workers() -> usize {
        2
    }

    const fn default_min_interval_ms() -> u64 {
        3000
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScholarConfig {
    /// `SerpAPI` key for the `google_scholar` engine.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "ScholarConfig::default_page_size")]
    pub page_size: u32,
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            page_size: Self::default_page_size(),
        }
    }
}

impl ScholarConfig {
    const fn default_page_size() -> u32 {
        20
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Request timeout (seconds)
    #[serde(default = "HttpConfig::default_timeout")]
    pub timeout: u64,
    #[serde(default = "HttpConfig::default_user_agent")]
    pub user_agent: String,
    /// Upper bound on attempts for rate-limited or failing requests.
    #[serde(default = "HttpConfig::default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Self::default_timeout(),
            user_agent: Self::default_user_agent(),
            max_attempts: Self::default_max_attempts(),
        }
    }
}

impl HttpConfig {
    const fn default_timeout() -> u64 {
        20
    }

    fn default_user_agent() -> String {
        "Mozilla/5.0 (compatible; lncd/0.1)".to_string()
    }

    const fn default_max_attempts() -> u32 {
        5
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "PipelineConfig::default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "PipelineConfig::default_sources")]
    pub sources: Vec<SourceKind>,
    #[serde(default = "PipelineConfig::default_open_source_check")]
    pub open_source_check: bool,
    /// Extra `{ "<license id>": { <terms> } }` entries for the license catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_table: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: Self::default_output_dir(),
            sources: Self::default_sources(),
            open_source_check: Self::default_open_source_check(),
            license_table: None,
        }
    }
}

impl PipelineConfig {
    fn default_output_dir() -> PathBuf {
        PathBuf::from("lncd-output")
    }

    fn default_sources() -> Vec<SourceKind> {
        SourceKind::ALL.to_vec()
    }

    const fn default_open_source_check() -> bool {
        true
    }
}

const CONFIG_TEMPLATE: &str = r#"{
  "providers": {
    "openai": {
      "api_key": "your-openai-api-key-here"
    }
  },
  "agents": {
    "license_model": "gpt-4o",
    "filter_model": "gpt-4o-mini",
    "compliance_model": "gpt-4o"
  },
  "sources": {
    "github": {
      "token": "your-github-token-here",
      "start_date": "2025-01-01",
      "end_date": "2025-04-15",
      "interval_days": 30,
      "per_page": 100,
      "max_pages": 10
    },
    "huggingface": {
      "token": "your-huggingface-token-here"
    },
    "kaggle": {
      "username": "your-kaggle-username",
      "key": "your-kaggle-key-here",
      "page_size": 100,
      "workers": 2,
      "min_interval_ms": 3000
    },
    "scholar": {
      "api_key": "your-serpapi-key-here",
      "page_size": 20
    }
  },
  "http": {
    "timeout": 20,
    "user_agent": "Mozilla/5.0 (compatible; lncd/0.1)",
    "max_attempts": 5
  },
  "pipeline": {
    "output_dir": "lncd-output",
    "sources": ["github", "huggingface", "kaggle"],
    "open_source_check": true
  }
}"#;

impl Config {
    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("lncd")
            .join("config.json"))
    }

    /// Load from `path`, or from `~/lncd/config.json` when none is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'lncd init' to create config.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config = Self::from_json(&content)?;
        info!("Loaded config from {}", config_path.display());

        Ok(config)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        if config.sources.github.start_date > config.sources.github.end_date {
            anyhow::bail!("sources.github.start_date must not be after end_date");
        }
        Ok(config)
    }

    pub fn create_config(path: Option<&Path>) -> anyhow::Result<PathBuf> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses() {
        let config = Config::from_json(CONFIG_TEMPLATE);
        let Ok(config) = config else {
            panic!("template should parse: {config:?}");
        };
        assert_eq!(config.agents.filter_model, "gpt-4o-mini");
        assert_eq!(config.sources.kaggle.workers, 2);
        assert_eq!(config.pipeline.sources.len(), 3);
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let Ok(config) = Config::from_json(r#"{"providers": {"openai": {"api_key": "k"}}}"#)
        else {
            panic!("minimal config should parse");
        };
        assert_eq!(config.providers.openai.base_url, None);
        assert_eq!(config.agents.license_model, "gpt-4o");
        assert_eq!(config.sources.github.interval_days, 30);
        assert_eq!(
            config.sources.github.start_date,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
        );
        assert_eq!(config.sources.scholar.page_size, 20);
        assert_eq!(config.http.max_attempts, 5);
        assert_eq!(config.pipeline.output_dir, PathBuf::from("lncd-output"));
        assert!(config.pipeline.open_source_check);
        assert_eq!(config.pipeline.sources, SourceKind::ALL.to_vec());
    }

    #[test]
    fn inverted_github_window_is_rejected() {
        let json = r#"{"providers": {"openai": {"api_key": "k"}},
            "sources": {"github": {"start_date": "2025-05-01", "end_date": "2025-04-01"}}}"#;
        assert!(Config::from_json(json).is_err());
    }

    #[test]
    fn create_then_load_round_trip() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let path = dir.path().join("nested").join("config.json");
        assert!(Config::create_config(Some(&path)).is_ok());
        assert!(Config::create_config(Some(&path)).is_err());
        let loaded = Config::load(Some(&path));
        assert!(loaded.is_ok());
        assert!(Config::load(Some(&dir.path().join("absent.json"))).is_err());
    }
}
