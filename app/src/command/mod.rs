//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use lncd_config::Config;
use lncd_core::{DatasetRecord, LLMProvider};
use lncd_providers::OpenAIProvider;
use tracing::info;

mod info;
mod init;
mod license;
mod parse;
mod run;
mod stats;
mod version;

pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use license::LicenseStrategy;
pub use parse::{ParseInput, ParseStrategy};
pub use run::{RunInput, RunStrategy};
pub use stats::{StatsInput, StatsStrategy};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
///
/// # Example
/// ```rust,ignore
/// struct MyStrategy;
///
/// impl CommandStrategy for MyStrategy {
///     type Input = MyInput;
///
///     async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Settings {
    /// Load the config file and apply command-line overrides.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(output) = &self.output {
            config.pipeline.output_dir.clone_from(output);
        }
        Ok(config)
    }
}

fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn LLMProvider>> {
    let openai = &config.providers.openai;
    if openai.api_key.is_empty() {
        anyhow::bail!("providers.openai.api_key is empty; edit the config file first");
    }

    let mut provider = OpenAIProvider::new(openai.api_key.clone());
    if let Some(base_url) = &openai.base_url {
        info!("Using chat endpoint {base_url}");
        provider = provider.with_base_url(base_url.clone());
    }
    Ok(Arc::new(provider))
}

fn read_record(path: &Path) -> anyhow::Result<DatasetRecord> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read record file {}", path.display()))?;
    DatasetRecord::parse(&text).with_context(|| format!("invalid record in {}", path.display()))
}
