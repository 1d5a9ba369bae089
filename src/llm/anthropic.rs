use crate::error::{CategorizerError, Result};
use crate::llm::provider::{
    request_with_policy, CategorizationProvider, CategorizeOutcome, RetryPolicy,
};
use crate::schema::TransactionDescriptor;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Upper bound on response length. Large enough for a full batch of
/// categorized records, small enough to cap cost on runaway output.
const MAX_RESPONSE_TOKENS: u32 = 4000;

/// Messages-style backend: the categorization prompt goes in as the
/// top-level `system` field and the JSON-encoded descriptor batch as the
/// user message content.
#[derive(Debug, Clone)]
pub struct AnthropicMessagesClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl AnthropicMessagesClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request_payload(&self, system_prompt: &str, user_content: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_RESPONSE_TOKENS,
            "temperature": 0,
            "system": system_prompt,
            "messages": [
                { "role": "user", "content": user_content }
            ]
        })
    }

    async fn send(&self, system_prompt: &str, user_content: &str) -> Result<String> {
        let url = format!("{}/messages", self.base_url);
        let payload = self.request_payload(system_prompt, user_content);

        let res = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await?;
            return Err(CategorizerError::ProviderApi {
                status: status.as_u16(),
                body,
            });
        }

        let body: MessagesResponse = res.json().await?;
        let block = body
            .content
            .into_iter()
            .next()
            .ok_or_else(|| CategorizerError::ProviderPayload("empty content list".to_string()))?;

        block
            .text
            .ok_or_else(|| CategorizerError::ProviderPayload("first content block has no text".to_string()))
    }
}

impl CategorizationProvider for AnthropicMessagesClient {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn categorize(
        &self,
        prompt: &str,
        batch: &[TransactionDescriptor],
    ) -> CategorizeOutcome {
        if batch.is_empty() {
            debug!("Anthropic batch is empty; skipping request");
            return CategorizeOutcome::NoWork;
        }

        let user_content = match serde_json::to_string(batch) {
            Ok(json) => json,
            Err(e) => {
                return CategorizeOutcome::Failed {
                    reason: format!("batch serialization failed: {e}"),
                }
            }
        };

        debug!(
            "Sending {} transaction descriptors to Anthropic model {}",
            batch.len(),
            self.model
        );
        request_with_policy(self.name(), &self.retry, || {
            self.send(prompt, &user_content)
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}
