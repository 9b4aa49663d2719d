use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ices_cache::EphemeralCache;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::actions::BatchSubRequest;
use crate::error::{DispatchError, Result};
use crate::token_manager::TokenManager;

/// Graph API's hard limit on `/$batch` sub-request count. `BatchClientConfig`
/// may configure a smaller effective threshold but never a larger one.
const MAX_BATCH_SIZE: i64 = 20;

#[derive(Debug, Clone)]
pub struct BatchClientConfig {
    pub buffer_key: String,
    pub flush_interval: Duration,
    pub graph_api_base: String,
    batch_size: i64,
}

impl BatchClientConfig {
    /// Clamps `batch_size` to the Graph API's hard ceiling of 20.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = (batch_size as i64).clamp(1, MAX_BATCH_SIZE);
        self
    }
}

impl Default for BatchClientConfig {
    fn default() -> Self {
        Self {
            buffer_key: "ices:batch:requests".to_string(),
            flush_interval: Duration::from_secs(2),
            graph_api_base: "https://graph.microsoft.com/v1.0".to_string(),
            batch_size: MAX_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchSubResponse {
    id: String,
    status: u16,
    #[serde(default)]
    body: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct BatchResponseEnvelope {
    responses: Vec<BatchSubResponse>,
}

/// Buffers `tag`/`delete` sub-requests in a shared Redis list and flushes
/// them as Graph `/$batch` calls, either once the buffer reaches
/// the configured batch size or on the periodic timer started by
/// [`BatchClient::spawn_periodic_flush`].
pub struct BatchClient {
    cache: Arc<dyn EphemeralCache>,
    token_manager: Arc<TokenManager>,
    http: Client,
    config: BatchClientConfig,
}

impl BatchClient {
    #[must_use]
    pub fn new(cache: Arc<dyn EphemeralCache>, token_manager: Arc<TokenManager>, config: BatchClientConfig) -> Self {
        Self { cache, token_manager, http: Client::new(), config }
    }

    /// Queues a sub-request for the next batch, flushing immediately once
    /// the buffer reaches the Graph API's batch-size limit.
    ///
    /// # Errors
    /// Returns an error if the cache push fails or an immediate flush
    /// fails.
    pub async fn add(&self, tenant_id: Option<&str>, request: BatchSubRequest) -> Result<()> {
        let payload = serde_json::to_string(&request)?;
        let len = self.cache.push(&self.config.buffer_key, &payload).await?;
        if len >= self.config.batch_size {
            self.flush(tenant_id).await?;
        }
        Ok(())
    }

    /// Spawns a background task that calls [`Self::flush`] on
    /// `config.flush_interval`, draining whatever partial batch has
    /// accumulated since the last flush. Errors are logged, not
    /// propagated — a single failed flush shouldn't kill the timer.
    pub fn spawn_periodic_flush(self: Arc<Self>, tenant_id: Option<String>) -> tokio::task::JoinHandle<()> {
        let interval = self.config.flush_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = self.flush(tenant_id.as_deref()).await {
                    warn!(error = %err, "periodic batch flush failed");
                }
            }
        })
    }

    /// Drains up to the configured batch size of queued requests and POSTs them as one
    /// `/$batch` call. A `429` sub-response pushes that one request back
    /// onto the buffer for the next flush; any other `>=400` is logged and
    /// dropped. A failure of the batch POST itself (transport error or a
    /// non-2xx envelope) pushes every drained request back so nothing is
    /// silently lost.
    ///
    /// # Errors
    /// Returns an error if the cache pop fails, the token fetch fails, or
    /// the batch POST itself fails.
    pub async fn flush(&self, tenant_id: Option<&str>) -> Result<()> {
        let raw = self.cache.pop_batch(&self.config.buffer_key, self.config.batch_size).await?;
        if raw.is_empty() {
            return Ok(());
        }

        let requests: Vec<BatchSubRequest> = raw
            .iter()
            .filter_map(|entry| match serde_json::from_str::<BatchSubRequest>(entry) {
                Ok(req) => Some(req),
                Err(err) => {
                    warn!(error = %err, "dropping unparseable batch buffer entry");
                    None
                }
            })
            .collect();

        if requests.is_empty() {
            return Ok(());
        }

        let token = self.token_manager.get_token(tenant_id).await?;
        let url = format!("{}/$batch", self.config.graph_api_base);
        let body = json!({ "requests": requests });

        let response = match self.http.post(&url).bearer_auth(&token).json(&body).send().await {
            Ok(resp) => resp,
            Err(err) => {
                warn!(error = %err, "batch POST transport failure, requeuing all requests");
                self.requeue(&requests).await?;
                return Err(DispatchError::Http(err));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "batch POST envelope failed, requeuing all requests");
            self.requeue(&requests).await?;
            return Err(DispatchError::RemediationFailed { status: status.as_u16(), body: text });
        }

        let envelope: BatchResponseEnvelope = response.json().await?;
        self.handle_responses(&requests, envelope).await
    }

    async fn handle_responses(&self, requests: &[BatchSubRequest], envelope: BatchResponseEnvelope) -> Result<()> {
        let by_id: HashMap<&str, &BatchSubRequest> = requests.iter().map(|r| (r.id.as_str(), r)).collect();

        for sub in &envelope.responses {
            let Some(request) = by_id.get(sub.id.as_str()) else { continue };
            match sub.status {
                429 => {
                    warn!(id = sub.id, "sub-request rate limited, requeuing");
                    self.requeue(std::slice::from_ref(*request)).await?;
                }
                status if status >= 400 => {
                    warn!(id = sub.id, status, body = ?sub.body, "sub-request failed, dropping");
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn requeue(&self, requests: &[BatchSubRequest]) -> Result<()> {
        for request in requests {
            let payload = serde_json::to_string(request)?;
            self.cache.push(&self.config.buffer_key, &payload).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use ices_cache::Result as CacheResult;

    use super::*;

    /// In-memory stand-in for the Redis-backed cache, enough to exercise
    /// `add`/`flush`'s push/pop_batch contract without a live Redis.
    struct FakeCache {
        list: Mutex<Vec<String>>,
    }

    impl FakeCache {
        fn new() -> Self {
            Self { list: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl EphemeralCache for FakeCache {
        async fn push(&self, _key: &str, value: &str) -> CacheResult<i64> {
            let mut list = self.list.lock().unwrap();
            list.push(value.to_string());
            Ok(list.len() as i64)
        }

        async fn len(&self, _key: &str) -> CacheResult<i64> {
            Ok(self.list.lock().unwrap().len() as i64)
        }

        async fn pop_batch(&self, _key: &str, max: i64) -> CacheResult<Vec<String>> {
            let mut list = self.list.lock().unwrap();
            let take = (max as usize).min(list.len());
            Ok(list.drain(..take).collect())
        }

        async fn blocking_pop(&self, _key: &str, _timeout: Duration) -> CacheResult<Option<String>> {
            Ok(self.list.lock().unwrap().pop())
        }

        async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
            Ok(())
        }

        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Ok(None)
        }
    }

    fn sub_request(id: &str) -> BatchSubRequest {
        BatchSubRequest {
            id: id.to_string(),
            method: "PATCH",
            url: "/users/u1/messages/m1".to_string(),
            headers: None,
            body: json!({}),
        }
    }

    #[tokio::test]
    async fn add_does_not_flush_below_batch_size() {
        let cache: Arc<dyn EphemeralCache> = Arc::new(FakeCache::new());
        let manager = Arc::new(TokenManager::new(HashMap::new(), None));
        let client = BatchClient::new(cache.clone(), manager, BatchClientConfig::default());

        client.add(Some("tenant-a"), sub_request("1")).await.unwrap();
        assert_eq!(cache.len("ices:batch:requests").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn flush_on_empty_buffer_is_a_no_op() {
        let cache: Arc<dyn EphemeralCache> = Arc::new(FakeCache::new());
        let manager = Arc::new(TokenManager::new(HashMap::new(), None));
        let client = BatchClient::new(cache, manager, BatchClientConfig::default());
        client.flush(Some("tenant-a")).await.unwrap();
    }
}
