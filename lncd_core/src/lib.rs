#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod json;
pub mod license;
pub mod record;
pub mod source;
pub mod stats;
pub mod util;
pub mod verdict;

pub use json::{JsonExtractError, extract_json, extract_json_value};
pub use license::{
    CUSTOM_LICENSE, LicenseCatalog, LicenseProfile, LicenseRule, LicenseSource, LicenseTerms,
};
pub use record::{DatasetRecord, ParseError, RecordField, UnknownFieldError, parse};
pub use source::SourceKind;
pub use stats::{FilterTally, RuleTally, normalize_items};
pub use util::{safe_name, truncate_chars};
pub use verdict::{ComplianceVerdict, DownstreamVerdict, Violation};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-call sampling settings for a chat completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> anyhow::Result<LLMResponse>;
    fn get_default_model(&self) -> &str;
}

#[async_trait]
impl<T: LLMProvider + ?Sized> LLMProvider for std::sync::Arc<T> {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> anyhow::Result<LLMResponse> {
        (**self).chat(messages, options).await
    }

    fn get_default_model(&self) -> &str {
        (**self).get_default_model()
    }
}
