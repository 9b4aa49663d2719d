use thiserror::Error;

/// Errors that can arise while constructing or manipulating core pipeline types.
#[derive(Debug, Error)]
pub enum IcesError {
    #[error("malformed event payload: {0}")]
    MalformedEvent(String),

    #[error("observation {key} has no numeric value")]
    NotNumeric { key: String },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IcesError>;
