use std::path::PathBuf;

use lncd_core::SourceKind;
use lncd_pipeline::DetectionPipeline;
use tracing::info;

use super::Settings;

/// Input parameters for the Run command strategy.
#[derive(Debug, Clone)]
pub struct RunInput {
    pub settings: Settings,
    pub file: PathBuf,
    /// Overrides the configured sources when non-empty.
    pub sources: Vec<SourceKind>,
    pub skip_open_source: bool,
}

/// Strategy for the full detection workflow.
///
/// Formalizes the license, searches, filters and audits every selected
/// source concurrently, runs the citing-paper check when the license
/// requires open-sourcing, then prints the saved report.
#[derive(Debug, Clone, Copy)]
pub struct RunStrategy;

impl super::CommandStrategy for RunStrategy {
    type Input = RunInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let record = super::read_record(&input.file)?;

        let mut config = input.settings.load_config()?;
        if !input.sources.is_empty() {
            let mut sources = input.sources;
            sources.sort();
            sources.dedup();
            config.pipeline.sources = sources;
        }
        if input.skip_open_source {
            config.pipeline.open_source_check = false;
        }

        info!(
            "Detecting license violations for {} on {:?}",
            record.representative_term, config.pipeline.sources
        );

        let provider = super::build_provider(&config)?;
        let pipeline = DetectionPipeline::from_config(provider, &config)?;
        let report = pipeline.run(&record).await?;

        print!("{report}");
        println!("Artifacts in {}", pipeline.store().root().display());
        Ok(())
    }
}
