use crate::error::{CategorizerError, Result};
use crate::llm::{AnthropicMessagesClient, OpenAiChatClient, Provider, RetryPolicy};
use crate::schema::ConfidenceScale;
use serde::Deserialize;

fn default_taxonomy_range() -> String {
    "Categories!A:B".to_string()
}

/// Which LLM backend a deployment talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Openai,
    Anthropic,
}

/// One configured transaction range: where to read it, which column holds
/// the description join key, and where the annotated rows go (the same
/// range, unless overridden).
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSource {
    pub range: String,
    pub description_column: String,
    #[serde(default)]
    pub write_range: Option<String>,
}

impl BatchSource {
    pub fn write_range(&self) -> &str {
        self.write_range.as_deref().unwrap_or(&self.range)
    }
}

/// Run configuration, deserialized from JSON. API credentials are supplied
/// separately at provider construction; they never live in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct CategorizerConfig {
    pub spreadsheet_id: String,
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default)]
    pub confidence_scale: ConfidenceScale,
    #[serde(default = "default_taxonomy_range")]
    pub taxonomy_range: String,
    pub sources: Vec<BatchSource>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl CategorizerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CategorizerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(CategorizerError::InvalidConfig(
                "model must not be empty".to_string(),
            ));
        }
        if self.sources.is_empty() {
            return Err(CategorizerError::InvalidConfig(
                "at least one batch source must be configured".to_string(),
            ));
        }
        for source in &self.sources {
            if source.description_column.trim().is_empty() {
                return Err(CategorizerError::InvalidConfig(format!(
                    "source '{}' has an empty description_column",
                    source.range
                )));
            }
        }
        Ok(())
    }

    /// Constructs the configured backend with the given API credential.
    pub fn build_provider(&self, api_key: &str) -> Provider {
        match self.provider {
            ProviderKind::Openai => Provider::OpenAi(
                OpenAiChatClient::new(api_key, &self.model).with_retry(self.retry.clone()),
            ),
            ProviderKind::Anthropic => Provider::Anthropic(
                AnthropicMessagesClient::new(api_key, &self.model).with_retry(self.retry.clone()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "spreadsheet_id": "sheet-123",
        "provider": "anthropic",
        "model": "claude-3-haiku-20240307",
        "confidence_scale": "categorical",
        "sources": [
            { "range": "Transactions!A:E", "description_column": "Description" },
            { "range": "Cards!A:C", "description_column": "Memo", "write_range": "Cards!A:F" }
        ]
    }"#;

    #[test]
    fn test_parses_full_config() {
        let config = CategorizerConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.provider, ProviderKind::Anthropic);
        assert_eq!(config.confidence_scale, ConfidenceScale::Categorical);
        assert_eq!(config.taxonomy_range, "Categories!A:B");
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    fn test_write_range_defaults_to_read_range() {
        let config = CategorizerConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.sources[0].write_range(), "Transactions!A:E");
        assert_eq!(config.sources[1].write_range(), "Cards!A:F");
    }

    #[test]
    fn test_scale_and_retry_defaults() {
        let json = r#"{
            "spreadsheet_id": "sheet-123",
            "provider": "openai",
            "model": "gpt-4o",
            "sources": [ { "range": "Tx!A:B", "description_column": "Description" } ]
        }"#;
        let config = CategorizerConfig::from_json(json).unwrap();
        assert_eq!(config.confidence_scale, ConfidenceScale::Numeric);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn test_rejects_empty_sources() {
        let json = r#"{
            "spreadsheet_id": "sheet-123",
            "provider": "openai",
            "model": "gpt-4o",
            "sources": []
        }"#;
        let err = CategorizerConfig::from_json(json).unwrap_err();
        assert!(matches!(err, CategorizerError::InvalidConfig(_)));
    }

    #[test]
    fn test_build_provider_matches_kind() {
        let config = CategorizerConfig::from_json(SAMPLE).unwrap();
        assert!(matches!(
            config.build_provider("key"),
            Provider::Anthropic(_)
        ));
    }
}
