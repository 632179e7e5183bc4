use std::path::PathBuf;

use lncd_pipeline::DetectionPipeline;

use super::Settings;

/// Strategy for formalizing the license of one record.
///
/// Saves the license profile artifact and prints it.
#[derive(Debug, Clone, Copy)]
pub struct LicenseStrategy;

impl super::CommandStrategy for LicenseStrategy {
    type Input = (Settings, PathBuf);

    async fn execute(&self, (settings, file): Self::Input) -> anyhow::Result<()> {
        let record = super::read_record(&file)?;

        let mut config = settings.load_config()?;
        config.pipeline.sources.clear();
        config.pipeline.open_source_check = false;

        let provider = super::build_provider(&config)?;
        let pipeline = DetectionPipeline::from_config(provider, &config)?;
        let profile = pipeline.formalize_license(&record).await?;

        println!("{}", serde_json::to_string_pretty(&profile)?);
        Ok(())
    }
}
