use crate::error::{CategorizerError, Result};
use crate::llm::provider::{
    request_with_policy, CategorizationProvider, CategorizeOutcome, RetryPolicy,
};
use crate::schema::TransactionDescriptor;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions backend: the categorization prompt goes in as the system
/// message and the JSON-encoded descriptor batch as a single user message.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenAiChatClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
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

    async fn send(&self, system_prompt: &str, user_content: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_content }
            ]
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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

        let body: ChatCompletionResponse = res.json().await?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CategorizerError::ProviderPayload("empty choices list".to_string()))?;

        Ok(choice.message.content)
    }
}

impl CategorizationProvider for OpenAiChatClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn categorize(
        &self,
        prompt: &str,
        batch: &[TransactionDescriptor],
    ) -> CategorizeOutcome {
        if batch.is_empty() {
            debug!("OpenAI batch is empty; skipping request");
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
            "Sending {} transaction descriptors to OpenAI model {}",
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
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}
