use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] ices_store::StoreError),

    #[error(transparent)]
    Cache(#[from] ices_cache::CacheError),

    #[error(transparent)]
    Dispatch(#[from] ices_dispatch::DispatchError),

    #[error("malformed queue payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
