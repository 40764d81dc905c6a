use thiserror::Error;

/// Errors surfaced to callers of the flattening API
#[derive(Debug, Error)]
pub enum FlattenError {
    /// The requested path list cannot be used as a selection
    #[error("invalid selection: {reason}")]
    InvalidSelection { reason: String },

    /// Input text is not valid JSON
    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Input bytes rejected by the SIMD parser
    #[error("failed to parse JSON: {0}")]
    SimdParse(#[from] simd_json::Error),

    /// A named schema was requested but the schema file does not define it
    #[error("schema not found: {name}")]
    SchemaNotFound { name: String },

    /// The schema file could not be read
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    /// The schema file is not a valid schema document
    #[error("malformed schema file: {0}")]
    SchemaFile(#[source] serde_json::Error),
}

impl FlattenError {
    pub fn invalid_selection(reason: impl Into<String>) -> Self {
        FlattenError::InvalidSelection {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlattenError>;
