use thiserror::Error;

#[derive(Error, Debug)]
pub enum CategorizerError {
    #[error("Failed to build categorization prompt: {0}")]
    PromptBuild(String),

    #[error("Column '{column}' not found in range '{range}'")]
    MissingColumn { column: String, range: String },

    #[error("Reconciliation would duplicate rows; results contain repeated descriptions: {}", descriptions.join(", "))]
    DuplicateResultKeys { descriptions: Vec<String> },

    #[error("Reconciliation produced {actual} rows for {expected} input rows")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("Sheet API error (status {status}): {body}")]
    SheetApi { status: u16, body: String },

    #[error("Provider API error (status {status}): {body}")]
    ProviderApi { status: u16, body: String },

    #[error("Provider response envelope missing expected content: {0}")]
    ProviderPayload(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CategorizerError>;
