use lncd_config::Config;
use lncd_core::SourceKind;
use lncd_pipeline::{ArtifactStore, FilterStats, ViolationStats};

use super::Settings;

/// Input parameters for the Stats command strategy.
#[derive(Debug, Clone)]
pub struct StatsInput {
    pub settings: Settings,
    pub source: Option<SourceKind>,
    pub keyword: Option<String>,
}

/// Strategy for summarizing saved artifacts.
///
/// Needs no API key: with `--output` the config file is not read at all.
#[derive(Debug, Clone, Copy)]
pub struct StatsStrategy;

impl super::CommandStrategy for StatsStrategy {
    type Input = StatsInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let root = match &input.settings.output {
            Some(output) => output.clone(),
            None => Config::load(input.settings.config.as_deref())?.pipeline.output_dir,
        };
        let store = ArtifactStore::new(root);

        let sources = input
            .source
            .map_or_else(|| SourceKind::ALL.to_vec(), |source| vec![source]);
        let keyword = input.keyword.as_deref();

        for source in sources {
            print!("{}", ViolationStats::collect(&store, source, keyword)?);
            print!("{}", FilterStats::collect(&store, source, keyword)?);
            println!();
        }
        Ok(())
    }
}
