//! Fine filter: ask the model whether each candidate is a downstream use.

use std::sync::Arc;

use lncd_core::{
    ChatMessage, ChatOptions, DatasetRecord, DownstreamVerdict, LLMProvider, extract_json,
    truncate_chars,
};
use lncd_sources::{GithubRepo, HuggingfaceDataset, KaggleDataset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are an expert on dataset usage analysis.";
const KAGGLE_CARD_LIMIT: usize = 8000;
const HUGGINGFACE_CARD_LIMIT: usize = 5000;
const HUGGINGFACE_FILES_LIMIT: usize = 2000;

/// A crawled item the downstream judge can reason about.
pub trait Candidate: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// How the item is named in prompts, e.g. "Kaggle dataset".
    const NOUN: &'static str;

    /// Identifier used in logs.
    fn label(&self) -> &str;

    /// The candidate's section of the judging prompt.
    fn describe(&self) -> String;
}

impl Candidate for GithubRepo {
    const NOUN: &'static str = "repository";

    fn label(&self) -> &str {
        &self.full_name
    }

    fn describe(&self) -> String {
        format!(
            "Repository Name: {}\nRepository Topics: {}\nRepository License: {}\nRepository README:\n{}",
            self.name,
            self.topics.join(", "),
            self.license.as_deref().unwrap_or("None"),
            self.readme.as_deref().unwrap_or_default(),
        )
    }
}

impl Candidate for HuggingfaceDataset {
    const NOUN: &'static str = "Hugging Face dataset";

    fn label(&self) -> &str {
        &self.id
    }

    fn describe(&self) -> String {
        let card = truncate_chars(self.dataset_card.as_deref().unwrap_or_default(), HUGGINGFACE_CARD_LIMIT);
        let files = truncate_chars(&self.files.join(", "), HUGGINGFACE_FILES_LIMIT);
        format!(
            "Dataset ID: {}\nLicense: {}\nDataset Card:\n{card}\nFile List: {files}",
            self.id,
            self.license.as_deref().unwrap_or("None"),
        )
    }
}

impl Candidate for KaggleDataset {
    const NOUN: &'static str = "Kaggle dataset";

    fn label(&self) -> &str {
        &self.reference
    }

    fn describe(&self) -> String {
        format!(
            "Dataset Ref: {}\nTitle: {}\nSubtitle: {}\nLicense: {}\nDataset Card:\n{}",
            self.reference,
            self.title,
            self.subtitle,
            self.license_name,
            truncate_chars(&self.dataset_card, KAGGLE_CARD_LIMIT),
        )
    }
}

/// A candidate together with the judge's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judged<T> {
    #[serde(flatten)]
    pub item: T,
    pub downstream_usage: DownstreamVerdict,
}

impl<T> Judged<T> {
    #[must_use]
    pub const fn is_downstream(&self) -> bool {
        self.downstream_usage.is_downstream
    }
}

fn original_section(record: &DatasetRecord) -> String {
    format!(
        "Dataset Title: {}\nDataset Topics: {}\nDataset Name: {}\nRepresentative Words: {}\nKeywords: {}\nWebsite: {}",
        record.title,
        record.description,
        record.representative_term,
        record.representative_term,
        record.keyword_list().join(", "),
        record.website,
    )
}

fn judge_prompt<T: Candidate>(item: &T, record: &DatasetRecord) -> String {
    format!(
        "You are an expert in analyzing dataset usage.
Given the following {noun} information:
-------------------------------------------
{candidate}

And the original dataset information:
-------------------------------------------
{original}

Determine whether this {noun} is a true downstream usage of the original dataset.
Downstream usage means that it uses, evaluates, or extends the original dataset (or its methods/code).
Return your answer in valid JSON format with the following keys:
- \"is_downstream\": a boolean value (true or false)
- \"reason\": a brief explanation of your decision.
",
        noun = T::NOUN,
        candidate = item.describe(),
        original = original_section(record),
    )
}

pub struct DownstreamFilter<P = Arc<dyn LLMProvider>> {
    provider: P,
    model: String,
}

impl<P: LLMProvider> DownstreamFilter<P> {
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Never fails: provider errors and unusable answers reject the candidate.
    pub async fn judge<T: Candidate>(&self, item: &T, record: &DatasetRecord) -> DownstreamVerdict {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(judge_prompt(item, record)),
        ];
        let options = ChatOptions::new(&self.model);

        match self.provider.chat(&messages, &options).await {
            Ok(response) => extract_json(&response.content).unwrap_or_else(|e| {
                warn!("Unusable verdict for {}: {e}", item.label());
                DownstreamVerdict::rejected(format!("Unparseable verdict: {e}"))
            }),
            Err(e) => DownstreamVerdict::rejected(format!("Error calling LLM API: {e}")),
        }
    }

    pub async fn filter<T: Candidate>(&self, items: Vec<T>, record: &DatasetRecord) -> Vec<Judged<T>> {
        let total = items.len();
        let mut judged = Vec::with_capacity(total);
        for (i, item) in items.into_iter().enumerate() {
            info!("Judging {} {}/{total}: {}", T::NOUN, i + 1, item.label());
            let downstream_usage = self.judge(&item, record).await;
            judged.push(Judged {
                item,
                downstream_usage,
            });
        }
        info!(
            "{} of {total} candidates judged downstream",
            judged.iter().filter(|j| j.is_downstream()).count()
        );
        judged
    }
}
