use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use ices_dispatch::TenantCredentials;
use ices_policy::PolicyRule;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Result, WorkerError};

/// Raw on-disk shape, deserialized from YAML. Every field is optional so a
/// near-empty config file (or none at all, in single-tenant/dev
/// deployments relying on environment variables) still parses.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    database_url: Option<String>,
    redis_url: Option<String>,
    default_tenant: Option<String>,
    #[serde(default)]
    tenants: Vec<RawTenant>,
    graph_api_base: Option<String>,
    graph_api_beta_base: Option<String>,
    defender_remediate_severity: Option<String>,
    verdict_batch_size: Option<usize>,
    batch_flush_interval_secs: Option<u64>,
    queue_retry_max: Option<u32>,
    queue_retry_delay_secs: Option<u64>,
    #[serde(default)]
    policy_rules: Vec<PolicyRule>,
}

#[derive(Debug, Deserialize)]
struct RawTenant {
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

/// Fully-resolved worker configuration: file contents overlaid with
/// environment-variable fallbacks, used for single-tenant/dev deployments
/// where shipping a config file is unnecessary ceremony.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: String,
    pub default_tenant: Option<String>,
    pub tenant_credentials: HashMap<String, TenantCredentials>,
    pub graph_api_base: String,
    pub graph_api_beta_base: String,
    pub defender_remediate_severity: String,
    pub verdict_batch_size: usize,
    pub batch_flush_interval: Duration,
    pub queue_retry_max: u32,
    pub queue_retry_delay: Duration,
    pub policy_rules: Vec<PolicyRule>,
}

static CONFIG: OnceLock<WorkerConfig> = OnceLock::new();

impl WorkerConfig {
    /// Loads (and caches for the process lifetime) the worker
    /// configuration, searching `$ICES_CONFIG_PATH`, then
    /// `/app/config/config.yaml`, then `config.yaml` next to the running
    /// binary, falling back to an empty config (entirely environment-driven)
    /// if none of those exist.
    ///
    /// # Errors
    /// Returns an error if a config file exists but fails to parse, or if
    /// neither the file nor the environment supplies a required value
    /// (`database_url`, `redis_url`).
    pub fn load() -> Result<&'static WorkerConfig> {
        if let Some(cfg) = CONFIG.get() {
            return Ok(cfg);
        }
        let cfg = Self::load_uncached()?;
        Ok(CONFIG.get_or_init(|| cfg))
    }

    fn load_uncached() -> Result<WorkerConfig> {
        let raw = match Self::config_path() {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| WorkerError::Config(format!("reading {}: {e}", path.display())))?;
                serde_yaml_ng::from_str(&contents).map_err(|e| WorkerError::Config(format!("parsing {}: {e}", path.display())))?
            }
            None => {
                info!("no config file found on the search path, relying entirely on environment variables");
                RawConfig::default()
            }
        };
        Self::resolve(raw)
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = env::var("ICES_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            warn!(path = %path.display(), "ICES_CONFIG_PATH set but file does not exist");
        }

        let fallback = PathBuf::from("/app/config/config.yaml");
        if fallback.exists() {
            return Some(fallback);
        }

        let beside_binary = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .map(|dir| dir.join("config.yaml"));
        beside_binary.filter(|p| p.exists())
    }

    fn resolve(raw: RawConfig) -> Result<WorkerConfig> {
        let database_url = raw
            .database_url
            .or_else(|| env::var("DATABASE_URL").ok())
            .ok_or_else(|| WorkerError::Config("no database_url in config and DATABASE_URL not set".into()))?;

        let redis_url = raw
            .redis_url
            .or_else(|| env::var("REDIS_URL").ok())
            .ok_or_else(|| WorkerError::Config("no redis_url in config and REDIS_URL not set".into()))?;

        let mut tenant_credentials: HashMap<String, TenantCredentials> = raw
            .tenants
            .into_iter()
            .map(|t| (t.tenant_id, TenantCredentials { client_id: t.client_id, client_secret: t.client_secret }))
            .collect();

        let default_tenant = raw.default_tenant.or_else(|| env::var("M365_TENANT_ID").ok());

        if let (Ok(tenant_id), Ok(client_id), Ok(client_secret)) =
            (env::var("M365_TENANT_ID"), env::var("M365_CLIENT_ID"), env::var("M365_CLIENT_SECRET"))
        {
            tenant_credentials.entry(tenant_id).or_insert(TenantCredentials { client_id, client_secret });
        }

        Ok(WorkerConfig {
            database_url,
            redis_url,
            default_tenant,
            tenant_credentials,
            graph_api_base: raw
                .graph_api_base
                .or_else(|| env::var("GRAPH_API_BASE").ok())
                .unwrap_or_else(|| "https://graph.microsoft.com/v1.0".to_string()),
            graph_api_beta_base: raw
                .graph_api_beta_base
                .or_else(|| env::var("GRAPH_API_BETA_BASE").ok())
                .unwrap_or_else(|| "https://graph.microsoft.com/beta".to_string()),
            defender_remediate_severity: raw
                .defender_remediate_severity
                .or_else(|| env::var("DEFENDER_REMEDIATE_SEVERITY").ok())
                .unwrap_or_else(|| "high".to_string()),
            verdict_batch_size: raw
                .verdict_batch_size
                .or_else(|| env::var("VERDICT_BATCH_SIZE").ok().and_then(|v| v.parse().ok()))
                .unwrap_or(20),
            batch_flush_interval: Duration::from_secs(raw.batch_flush_interval_secs.unwrap_or(2)),
            queue_retry_max: raw.queue_retry_max.unwrap_or(3),
            queue_retry_delay: Duration::from_secs(raw.queue_retry_delay_secs.unwrap_or(10)),
            policy_rules: raw.policy_rules,
        })
    }
}
