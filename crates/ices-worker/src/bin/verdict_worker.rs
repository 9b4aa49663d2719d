use std::sync::Arc;
use std::time::Duration;

use ices_cache::{EphemeralCache, RedisCache, RedisCacheConfig};
use ices_core::Verdict;
use ices_dispatch::{BatchClient, BatchClientConfig, Dispatcher, DispatcherConfig, TokenManager};
use ices_policy::PolicyEngine;
use ices_store::Store;
use ices_worker::{Result, WorkerConfig};
use tracing::{debug, error, info, warn};

const VERDICTS_QUEUE: &str = "verdicts";
const POP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let config = WorkerConfig::load()?;
    let store = Store::connect(&config.database_url).await?;
    store.init_schema().await;

    let cache: Arc<dyn EphemeralCache> = Arc::new(RedisCache::new(&RedisCacheConfig { url: config.redis_url.clone(), ..RedisCacheConfig::default() })?);

    let token_manager = Arc::new(TokenManager::new(config.tenant_credentials.clone(), config.default_tenant.clone()));
    let batch_config = BatchClientConfig {
        flush_interval: config.batch_flush_interval,
        graph_api_base: config.graph_api_base.clone(),
        ..BatchClientConfig::default()
    }
    .with_batch_size(config.verdict_batch_size);
    let batch_client = Arc::new(BatchClient::new(Arc::clone(&cache), Arc::clone(&token_manager), batch_config));
    let _flush_timer = Arc::clone(&batch_client).spawn_periodic_flush(config.default_tenant.clone());

    let policy_engine = PolicyEngine::new(config.policy_rules.clone());
    let dispatcher_config = DispatcherConfig { graph_api_beta_base: config.graph_api_beta_base.clone(), defender_severity: config.defender_remediate_severity.clone() };
    let dispatcher = Dispatcher::new(policy_engine, batch_client, token_manager, dispatcher_config);

    info!(rules = config.policy_rules.len(), "verdict worker starting");

    loop {
        match cache.blocking_pop(VERDICTS_QUEUE, POP_TIMEOUT).await {
            Ok(Some(payload)) => {
                if let Err(err) = process_one(&payload, &store, &dispatcher).await {
                    error!(error = %err, "failed to dispatch verdict");
                }
            }
            Ok(None) => debug!("no verdict available, polling again"),
            Err(err) => {
                warn!(error = %err, "queue poll failed, retrying after delay");
                tokio::time::sleep(config.queue_retry_delay).await;
            }
        }
    }
}

async fn process_one(payload: &str, store: &Store, dispatcher: &ices_dispatch::Dispatcher) -> Result<()> {
    let verdict: Verdict = match serde_json::from_str(payload) {
        Ok(verdict) => verdict,
        Err(err) => {
            warn!(error = %err, "malformed verdict payload, dropping (no retry)");
            return Ok(());
        }
    };

    if store.is_message_processed(&verdict.message_id).await? {
        debug!(message_id = verdict.message_id, "message already dispatched, skipping");
        return Ok(());
    }

    let outcome = dispatcher.dispatch(&verdict).await?;
    store.store_policy_outcome(&outcome).await?;

    info!(message_id = verdict.message_id, action = outcome.action_taken.as_str(), policy = outcome.policy_name, "verdict dispatched");
    Ok(())
}
