//! # Transaction Categorizer
//!
//! Categorizes financial transaction descriptions into a user-defined
//! category/subcategory taxonomy by delegating the classification decision
//! to an LLM backend, then reconciling the results back onto the original
//! spreadsheet rows.
//!
//! ## Core Concepts
//!
//! - **Taxonomy**: the closed set of allowed category/subcategory label pairs
//! - **Batch**: one deduplicated set of transaction descriptions submitted to
//!   a provider in a single request
//! - **Provider**: an interchangeable LLM backend (OpenAI chat-completions or
//!   Anthropic messages) implementing the categorize contract
//! - **Reconciliation**: the strict 1:1 left join that re-attaches results to
//!   every original row, preserving row count
//!
//! Provider faults and malformed responses are recoverable: the batch gets
//! zero predicted labels and the run continues. Store faults abort the run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use transaction_categorizer::*;
//!
//! let config = CategorizerConfig::from_json(r#"{
//!     "spreadsheet_id": "1a2b3c",
//!     "provider": "anthropic",
//!     "model": "claude-3-haiku-20240307",
//!     "sources": [
//!         { "range": "Transactions!A:E", "description_column": "Description" }
//!     ]
//! }"#)?;
//!
//! let provider = config.build_provider(&api_key);
//! let store = GoogleSheetsClient::new(access_token, &config.spreadsheet_id);
//! let summary = run_pipeline(&config, provider, &store).await?;
//! println!("{} batches completed", summary.completed());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod reconcile;
pub mod schema;
pub mod sheets;
pub mod table;

pub use config::{BatchSource, CategorizerConfig, ProviderKind};
pub use engine::{
    parse_taxonomy, run_pipeline, BatchReport, BatchStatus, CategorizationEngine, RunSummary,
};
pub use error::{CategorizerError, Result};
pub use llm::{
    build_categorization_prompt, AnthropicMessagesClient, CategorizationProvider,
    CategorizeOutcome, OpenAiChatClient, Provider, RetryPolicy,
};
pub use reconcile::{
    reconcile, ReconciledTable, CONFIDENCE_COLUMN, PREDICTED_CATEGORY_COLUMN, REASONING_COLUMN,
};
pub use schema::{
    CategorizationResult, Confidence, ConfidenceLevel, ConfidenceScale, TaxonomyEntry,
    TransactionDescriptor,
};
pub use sheets::{GoogleSheetsClient, SheetStore};
pub use table::Table;
