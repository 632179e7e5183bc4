use lncd_config::Config;

use super::Settings;

/// Strategy for initializing the configuration.
///
/// Writes the config template to `--config` or `~/lncd/config.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = Settings;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let path = Config::create_config(input.config.as_deref())?;
        println!("Created config at {}", path.display());
        println!("Fill in providers.openai.api_key and the source credentials before running.");
        Ok(())
    }
}
