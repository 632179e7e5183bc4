//! Turn a record's `License` field into structured obligations.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lncd_core::{
    CUSTOM_LICENSE, ChatMessage, ChatOptions, DatasetRecord, LLMProvider, LicenseCatalog,
    LicenseProfile, LicenseSource, LicenseTerms, extract_json,
};
use lncd_sources::WebFetcher;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "You are an assistant that analyzes license texts.";

/// Source of license page text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> anyhow::Result<String>;
}

#[async_trait]
impl PageFetcher for WebFetcher {
    async fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
        Ok(Self::fetch_text(self, url).await?)
    }
}

fn analysis_prompt(license_text: &str) -> String {
    format!(
        "You are an assistant specialized in analyzing dataset licenses. \
Analyze the license text below and return ONLY valid JSON with these keys: \
non_commercial, sharealike, no_derivatives, attribution, open_source, distribution_platform, naming. \
Each value must be true or false. If a rule is not mentioned, return false.

Interpretation rules:
- Non-commercial (NC): true if the license prohibits commercial use OR restricts use to \
non-commercial contexts such as 'research-only', 'educational use only', 'academic use only', \
'scientific research and no other', or 'non-profit use only'. These phrases count as NC even if \
the word 'commercial' is not used.
- Share-Alike (SA): true if derivatives must use the same license terms.
- No Derivatives (ND): true if modifications/derivatives are not allowed.
- Attribution (BY): true if credit/citation is required.
- Open Source (OS): true if the license requires downstream users to release code or derivatives openly.
- Distribution Platform (DP): true if redistribution must occur on specified platforms or channels only.
- Naming: true if the license requires specific naming for derivative datasets.

Return JSON exactly like:
{{
  \"non_commercial\": true/false,
  \"sharealike\": true/false,
  \"no_derivatives\": true/false,
  \"attribution\": true/false,
  \"open_source\": true/false,
  \"distribution_platform\": true/false,
  \"naming\": true/false
}}

License text:
{license_text}

JSON:"
    )
}

/// Resolves license terms from the catalog, or by asking the model.
pub struct LicenseFormalizer<P = Arc<dyn LLMProvider>> {
    provider: P,
    model: String,
    catalog: LicenseCatalog,
    fetcher: Option<Arc<dyn PageFetcher>>,
}

impl<P: LLMProvider> LicenseFormalizer<P> {
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            catalog: LicenseCatalog::builtin(),
            fetcher: None,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: LicenseCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Required for records whose `License` is a link.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    #[must_use]
    pub const fn catalog(&self) -> &LicenseCatalog {
        &self.catalog
    }

    /// Ask the model which obligations `license_text` imposes.
    pub async fn analyze(&self, license_text: &str) -> anyhow::Result<LicenseTerms> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(analysis_prompt(license_text)),
        ];
        let options = ChatOptions::new(&self.model)
            .with_temperature(0.0)
            .with_max_tokens(150);

        let response = self.provider.chat(&messages, &options).await?;
        debug!("License analysis response: {}", response.content);
        extract_json(&response.content).context("license analysis returned no usable JSON")
    }

    pub async fn formalize(&self, record: &DatasetRecord) -> anyhow::Result<LicenseProfile> {
        let (license, terms) = match record.license_source(&self.catalog) {
            LicenseSource::Known { id, terms } => {
                info!("License {id} found in catalog");
                (id.to_string(), terms)
            }
            LicenseSource::Url(url) => {
                let fetcher = self
                    .fetcher
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("no page fetcher configured for {url}"))?;
                let text = fetcher
                    .fetch_text(url)
                    .await
                    .with_context(|| format!("failed to fetch license page {url}"))?;
                info!("Analyzing license page {url}");
                (CUSTOM_LICENSE.to_string(), self.analyze(&text).await?)
            }
            LicenseSource::Text(text) => {
                info!("Analyzing verbatim license text");
                (CUSTOM_LICENSE.to_string(), self.analyze(text).await?)
            }
        };

        Ok(LicenseProfile {
            title: record.title.clone(),
            license,
            representative_term: record.representative_term.clone(),
            website: record.website.clone(),
            citation: record.citation.clone(),
            license_analysis: terms,
        })
    }
}
