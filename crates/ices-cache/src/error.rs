use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis connection error: {0}")]
    Connection(String),

    #[error("redis command failed: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
