use crate::error::Result;
use crate::llm::anthropic::AnthropicMessagesClient;
use crate::llm::openai::OpenAiChatClient;
use crate::schema::{CategorizationResult, TransactionDescriptor};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Outcome of one provider invocation. Splits "nothing to do" from
/// "something broke" so callers never have to infer which one an empty
/// result meant.
#[derive(Debug, Clone, PartialEq)]
pub enum CategorizeOutcome {
    /// The batch was empty; no request was made.
    NoWork,
    /// The provider returned a parseable result array.
    Success(Vec<CategorizationResult>),
    /// Transport fault or malformed response. Recoverable by the caller;
    /// equivalent to zero results for this batch.
    Failed { reason: String },
}

impl CategorizeOutcome {
    /// Results for reconciliation: both `NoWork` and `Failed` contribute none.
    pub fn into_results(self) -> Vec<CategorizationResult> {
        match self {
            CategorizeOutcome::Success(results) => results,
            CategorizeOutcome::NoWork | CategorizeOutcome::Failed { .. } => Vec::new(),
        }
    }
}

/// The categorize contract every LLM backend implements. Adding a third
/// backend means one new implementation; the engine never changes.
#[allow(async_fn_in_trait)]
pub trait CategorizationProvider {
    /// Stable backend name, used in logs and batch reports.
    fn name(&self) -> &'static str;

    /// Submit one deduplicated batch under the given system prompt.
    /// Must return [`CategorizeOutcome::NoWork`] without a network call when
    /// the batch is empty, and must never raise for provider-side faults.
    async fn categorize(
        &self,
        prompt: &str,
        batch: &[TransactionDescriptor],
    ) -> CategorizeOutcome;
}

/// Bounded retry for transient transport faults. Defaults to a single
/// attempt (no retry) to match the at-most-one-attempt contract; parse
/// failures are never retried.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "backoff_secs")]
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_secs(2),
        }
    }
}

mod backoff_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Shared response-handling policy, identical across backends: trim, then a
/// strict JSON-array parse. Malformed output is logged (raw text at debug
/// level only, it can contain financial descriptions) and reported as a
/// failure rather than raised.
pub(crate) fn parse_response(provider: &str, raw: &str) -> CategorizeOutcome {
    let trimmed = raw.trim();
    match serde_json::from_str::<Vec<CategorizationResult>>(trimmed) {
        Ok(results) => {
            info!("{} returned {} categorized transactions", provider, results.len());
            for result in &results {
                if !result.confidence.in_scale() {
                    warn!(
                        "{} reported out-of-scale confidence {} for '{}'",
                        provider, result.confidence, result.description
                    );
                }
            }
            CategorizeOutcome::Success(results)
        }
        Err(e) => {
            error!("Failed to parse {} response as a JSON array: {}", provider, e);
            debug!("Raw {} output: {}", provider, trimmed);
            CategorizeOutcome::Failed {
                reason: format!("malformed response: {e}"),
            }
        }
    }
}

/// Drives one backend request under the retry policy and hands the raw text
/// to the shared parser. Only transport faults consume retry attempts.
pub(crate) async fn request_with_policy<F, Fut>(
    provider: &str,
    retry: &RetryPolicy,
    send: F,
) -> CategorizeOutcome
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match send().await {
            Ok(raw) => return parse_response(provider, &raw),
            Err(e) => {
                error!(
                    "{} request failed (attempt {}/{}): {}",
                    provider, attempt, max_attempts, e
                );
                if attempt >= max_attempts {
                    return CategorizeOutcome::Failed {
                        reason: e.to_string(),
                    };
                }
                attempt += 1;
                sleep(retry.backoff).await;
            }
        }
    }
}

/// Config-time choice between the two backends. A tagged union rather than
/// trait objects keeps dispatch explicit and the set of backends closed.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAi(OpenAiChatClient),
    Anthropic(AnthropicMessagesClient),
}

impl CategorizationProvider for Provider {
    fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi(client) => client.name(),
            Provider::Anthropic(client) => client.name(),
        }
    }

    async fn categorize(
        &self,
        prompt: &str,
        batch: &[TransactionDescriptor],
    ) -> CategorizeOutcome {
        match self {
            Provider::OpenAi(client) => client.categorize(prompt, batch).await,
            Provider::Anthropic(client) => client.categorize(prompt, batch).await,
        }
    }
}
