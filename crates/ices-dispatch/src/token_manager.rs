use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{DispatchError, Result};

const TOKEN_ENDPOINT_FMT: &str = "https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Proactive refresh buffer: a token is considered stale 5 minutes before
/// its actual expiry, so a request never races the token dying mid-flight.
const REFRESH_BUFFER: Duration = Duration::seconds(300);

/// OAuth2 client-credentials registration for one tenant.
#[derive(Debug, Clone)]
pub struct TenantCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - REFRESH_BUFFER
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Per-tenant OAuth2 client-credentials token cache for the Graph API.
///
/// Each tenant gets its own cache slot and its own lock, so a refresh for
/// one tenant never blocks lookups for another. Within a tenant, a cheap
/// read-lock fast path serves the common case (token already fresh); the
/// write lock is only taken — and only one refresh performed — when the
/// cached token is missing or stale.
pub struct TokenManager {
    client: Client,
    credentials: HashMap<String, TenantCredentials>,
    default_tenant: Option<String>,
    cache: DashMap<String, Arc<RwLock<Option<CachedToken>>>>,
}

impl TokenManager {
    #[must_use]
    pub fn new(credentials: HashMap<String, TenantCredentials>, default_tenant: Option<String>) -> Self {
        Self {
            client: Client::new(),
            credentials,
            default_tenant,
            cache: DashMap::new(),
        }
    }

    /// Returns a valid bearer token for `tenant_id` (or the configured
    /// default tenant when `None`), fetching or refreshing it as needed.
    ///
    /// # Errors
    /// Returns an error if the tenant has no registered credentials, or if
    /// the token endpoint fails and no still-valid cached token exists to
    /// fall back on.
    pub async fn get_token(&self, tenant_id: Option<&str>) -> Result<String> {
        let tenant_id = self.resolve_tenant(tenant_id)?;
        let slot = self
            .cache
            .entry(tenant_id.clone())
            .or_insert_with(|| Arc::new(RwLock::new(None)))
            .clone();

        let now = Utc::now();

        {
            let guard = slot.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.is_fresh(now) {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let mut guard = slot.write().await;
        if let Some(cached) = guard.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.access_token.clone());
            }
        }

        let creds = self
            .credentials
            .get(&tenant_id)
            .ok_or_else(|| DispatchError::UnknownTenant(tenant_id.clone()))?;

        match self.fetch_token(&tenant_id, creds).await {
            Ok(fresh) => {
                let token = fresh.access_token.clone();
                *guard = Some(fresh);
                Ok(token)
            }
            Err(err) => {
                if let Some(stale) = guard.as_ref() {
                    if !stale.is_expired(now) {
                        warn!(tenant_id, error = %err, "token refresh failed, serving stale-but-unexpired token");
                        return Ok(stale.access_token.clone());
                    }
                }
                Err(err)
            }
        }
    }

    fn resolve_tenant(&self, tenant_id: Option<&str>) -> Result<String> {
        match tenant_id.map(str::to_string).or_else(|| self.default_tenant.clone()) {
            Some(tenant) => Ok(tenant),
            None => Err(DispatchError::NoDefaultTenant),
        }
    }

    async fn fetch_token(&self, tenant_id: &str, creds: &TenantCredentials) -> Result<CachedToken> {
        let url = TOKEN_ENDPOINT_FMT.replace("{tenant_id}", tenant_id);
        let params = [
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(DispatchError::TokenRequest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::TokenResponse { status: status.as_u16(), body });
        }

        let parsed: TokenResponse = response.json().await.map_err(DispatchError::TokenRequest)?;
        Ok(CachedToken {
            access_token: parsed.access_token,
            expires_at: Utc::now() + Duration::seconds(parsed.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_token_is_fresh_outside_the_refresh_buffer() {
        let now = Utc::now();
        let token = CachedToken {
            access_token: "t".into(),
            expires_at: now + Duration::seconds(600),
        };
        assert!(token.is_fresh(now));
    }

    #[test]
    fn cached_token_is_stale_inside_the_refresh_buffer() {
        let now = Utc::now();
        let token = CachedToken {
            access_token: "t".into(),
            expires_at: now + Duration::seconds(100),
        };
        assert!(!token.is_fresh(now));
        assert!(!token.is_expired(now));
    }

    #[test]
    fn cached_token_past_expiry_is_expired() {
        let now = Utc::now();
        let token = CachedToken {
            access_token: "t".into(),
            expires_at: now - Duration::seconds(1),
        };
        assert!(token.is_expired(now));
    }

    #[tokio::test]
    async fn unknown_tenant_without_default_errors() {
        let manager = TokenManager::new(HashMap::new(), None);
        let err = manager.get_token(Some("tenant-a")).await.unwrap_err();
        assert!(matches!(err, DispatchError::UnknownTenant(t) if t == "tenant-a"));
    }

    #[tokio::test]
    async fn missing_tenant_id_without_default_errors() {
        let manager = TokenManager::new(HashMap::new(), None);
        let err = manager.get_token(None).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoDefaultTenant));
    }
}
