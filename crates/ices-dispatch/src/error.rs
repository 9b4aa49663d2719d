use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no OAuth credentials configured for tenant {0}")]
    UnknownTenant(String),

    #[error("no default tenant configured and none was specified")]
    NoDefaultTenant,

    #[error("token request failed: {0}")]
    TokenRequest(#[source] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    TokenResponse { status: u16, body: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Cache(#[from] ices_cache::CacheError),

    #[error("batch buffer entry was not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("remediation API returned {status}: {body}")]
    RemediationFailed { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, DispatchError>;
