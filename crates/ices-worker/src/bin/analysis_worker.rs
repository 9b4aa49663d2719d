use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ices_bec::post_analyze_update;
use ices_cache::{EphemeralCache, RedisCache, RedisCacheConfig};
use ices_core::{EmailEvent, Verdict};
use ices_store::{BecStore, Store};
use ices_worker::pipeline::build_registry;
use ices_worker::retry::with_retry;
use ices_worker::{Result, WorkerConfig};
use tracing::{debug, error, info, warn};

const EMAILS_QUEUE: &str = "emails";
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
    let bec_store = Arc::new(BecStore::new(store.pool().clone()));
    bec_store.init_schema().await;

    let cache: Arc<dyn EphemeralCache> = Arc::new(RedisCache::new(&RedisCacheConfig { url: config.redis_url.clone(), ..RedisCacheConfig::default() })?);
    let registry = build_registry(Arc::clone(&cache), Arc::clone(&bec_store));

    info!(analyzers = ?registry.list(), "analysis worker starting");

    loop {
        match cache.blocking_pop(EMAILS_QUEUE, POP_TIMEOUT).await {
            Ok(Some(payload)) => {
                if let Err(err) = process_one(&payload, &store, &bec_store, &cache, &registry, config).await {
                    error!(error = %err, "failed to process email event");
                }
            }
            Ok(None) => debug!("no email event available, polling again"),
            Err(err) => {
                warn!(error = %err, "queue poll failed, retrying after delay");
                tokio::time::sleep(config.queue_retry_delay).await;
            }
        }
    }
}

async fn process_one(
    payload: &str,
    store: &Store,
    bec_store: &Arc<BecStore>,
    cache: &Arc<dyn EphemeralCache>,
    registry: &ices_analyzers::AnalyzerRegistry,
    config: &WorkerConfig,
) -> Result<()> {
    let event: EmailEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "malformed email event payload, dropping (no retry)");
            return Ok(());
        }
    };

    if store.is_message_processed(&event.message_id).await? {
        debug!(message_id = event.message_id, "message already processed, skipping");
        return Ok(());
    }

    let results = registry.run_all(&event).await;
    let verdict = Verdict::from_event(&event, results);

    match store.store_email_event(&verdict, &event.subject, event.received_at).await {
        Ok(email_event_id) => {
            if let Err(err) = store.store_analysis_results(email_event_id, &verdict).await {
                warn!(error = %err, message_id = verdict.message_id, "failed to persist analysis results, proceeding anyway");
            }
        }
        Err(err) => {
            warn!(error = %err, message_id = verdict.message_id, "failed to persist email event, proceeding anyway");
        }
    }

    let payload = serde_json::to_string(&verdict)?;
    with_retry(config.queue_retry_max, config.queue_retry_delay, || async {
        cache.push(VERDICTS_QUEUE, &payload).await?;
        Ok::<(), ices_worker::WorkerError>(())
    })
    .await?;

    info!(message_id = verdict.message_id, "verdict enqueued");

    let intent_category = verdict
        .result_for("bec_detector")
        .and_then(|result| result.find("intent_category"))
        .map(|obs| obs.value.display_string())
        .unwrap_or_else(|| "informational".to_string());
    post_analyze_update(bec_store, &event, &intent_category, Utc::now()).await;

    Ok(())
}
