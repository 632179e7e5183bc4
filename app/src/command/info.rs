use lncd_config::Config;
use lncd_core::LicenseCatalog;

use super::Settings;

/// Strategy for displaying configuration information.
///
/// Credentials are masked; everything else is printed as loaded, after the
/// command-line overrides.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = Settings;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = input.load_config()?;
        let path = match &input.config {
            Some(path) => path.clone(),
            None => Config::default_path()?,
        };

        println!("=== lncd Configuration ===\n");
        println!("File: {}\n", path.display());

        println!("Provider:");
        println!("  OpenAI Key: {}", mask(&config.providers.openai.api_key));
        println!(
            "  Base URL: {}",
            config
                .providers
                .openai
                .base_url
                .as_deref()
                .unwrap_or("(default)")
        );
        println!();

        println!("Models:");
        println!("  License: {}", config.agents.license_model);
        println!("  Filter: {}", config.agents.filter_model);
        println!("  Compliance: {}", config.agents.compliance_model);
        println!();

        let github = &config.sources.github;
        let kaggle = &config.sources.kaggle;
        println!("Sources:");
        println!("  GitHub Token: {}", mask(&github.token));
        println!(
            "  GitHub Window: {} .. {} every {} days, {} per page, {} pages max",
            github.start_date, github.end_date, github.interval_days, github.per_page, github.max_pages
        );
        println!(
            "  Hugging Face Token: {}",
            mask(config.sources.huggingface.token.as_deref().unwrap_or_default())
        );
        println!("  Kaggle User: {}", or_unset(&kaggle.username));
        println!("  Kaggle Key: {}", mask(&kaggle.key));
        println!(
            "  Kaggle Paging: {} per page, {} workers, {} ms between requests",
            kaggle.page_size, kaggle.workers, kaggle.min_interval_ms
        );
        println!("  SerpAPI Key: {}", mask(&config.sources.scholar.api_key));
        println!();

        println!("HTTP:");
        println!("  Timeout: {}s", config.http.timeout);
        println!("  User Agent: {}", config.http.user_agent);
        println!("  Max Attempts: {}", config.http.max_attempts);
        println!();

        let pipeline = &config.pipeline;
        let sources: Vec<&str> = pipeline.sources.iter().map(|s| s.as_str()).collect();
        println!("Pipeline:");
        println!("  Output: {}", pipeline.output_dir.display());
        println!("  Sources: {}", sources.join(", "));
        println!("  Open-source Check: {}", pipeline.open_source_check);
        match &pipeline.license_table {
            Some(table) => println!("  License Table: {}", table.display()),
            None => println!(
                "  License Table: (built-in, {} licenses)",
                LicenseCatalog::builtin().len()
            ),
        }

        Ok(())
    }
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "(not set)" } else { value }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        1..=8 => "***".to_string(),
        n => format!(
            "{}...{}",
            chars[..4].iter().collect::<String>(),
            chars[n - 4..].iter().collect::<String>()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask(""), "(not set)");
        assert_eq!(mask("short"), "***");
        assert_eq!(mask("sk-abcdefghijkl"), "sk-a...ijkl");
    }
}
