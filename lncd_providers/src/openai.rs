use async_trait::async_trait;
use lncd_core::{ChatMessage, ChatOptions, LLMProvider, LLMResponse};
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::retry::{RetryPolicy, retry_with_backoff};

/// Chat completions against any OpenAI-compatible endpoint.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenAIProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn new(api_key: String) -> Self {
        info!("Creating OpenAIProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(messages: &[ChatMessage], options: &ChatOptions) -> serde_json::Value {
        let mut request = json!({
            "model": options.model,
            "messages": messages,
        });
        if let Some(temperature) = options.temperature {
            request["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            request["max_tokens"] = json!(max_tokens);
        }
        request
    }

    /// Helper method to send a single request
    async fn try_send(&self, request: &serde_json::Value) -> anyhow::Result<LLMResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        parse_completion(&response)
    }
}

fn parse_completion(response: &serde_json::Value) -> anyhow::Result<LLMResponse> {
    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing content"))?
        .trim()
        .to_string();

    let usage = response["usage"].as_object().map(|u| lncd_core::Usage {
        prompt_tokens: u32::try_from(u["prompt_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
        completion_tokens: u32::try_from(u["completion_tokens"].as_u64().unwrap_or(0))
            .unwrap_or(0),
        total_tokens: u32::try_from(u["total_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
    });

    Ok(LLMResponse { content, usage })
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> anyhow::Result<LLMResponse> {
        let request = Self::build_request(messages, options);

        info!("Sending request to chat completions API: model={}", options.model);

        let response = retry_with_backoff(|| self.try_send(&request), &self.retry).await?;

        if let Some(usage) = &response.usage {
            info!(
                "Received response: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }
        Ok(response)
    }

    fn get_default_model(&self) -> &str {
        "gpt-4o"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_includes_optional_sampling() {
        let messages = [ChatMessage::system("sys"), ChatMessage::user("hi")];
        let options = ChatOptions::new("gpt-4o").with_temperature(0.0).with_max_tokens(150);
        let request = OpenAIProvider::build_request(&messages, &options);
        assert_eq!(request["model"], "gpt-4o");
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["content"], "hi");
        assert_eq!(request["max_tokens"], 150);
        assert!(request.get("temperature").is_some());

        let bare = OpenAIProvider::build_request(&messages, &ChatOptions::new("m"));
        assert!(bare.get("temperature").is_none());
        assert!(bare.get("max_tokens").is_none());
    }

    #[test]
    fn completion_content_and_usage() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "  {\"a\": 1}\n"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        });
        let Ok(response) = parse_completion(&body) else {
            panic!("expected completion");
        };
        assert_eq!(response.content, "{\"a\": 1}");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(13));
    }

    #[test]
    fn completion_without_content_is_an_error() {
        assert!(parse_completion(&json!({"choices": []})).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let provider = OpenAIProvider::new("k".to_string())
            .with_base_url("http://localhost:8080/v1/".to_string());
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }
}
