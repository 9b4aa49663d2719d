use thiserror::Error;

#[derive(Debug, Error)]
pub enum BecError {
    #[error("store error: {0}")]
    Store(#[from] ices_store::StoreError),

    #[error("content extraction failed: {0}")]
    ContentExtraction(String),
}

pub type Result<T> = std::result::Result<T, BecError>;
