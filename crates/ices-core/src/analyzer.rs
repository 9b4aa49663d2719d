use async_trait::async_trait;

use crate::error::Result;
use crate::event::EmailEvent;
use crate::observation::Observation;

/// A single analysis stage in the pipeline. Implementations must not panic —
/// any internal failure should surface as `Err` so a registry can isolate it
/// into a single `error` observation rather than aborting the whole run.
/// Defined here rather than alongside the pipeline's registry so that both
/// the stateless analyzers and the store-backed BEC analyzer can implement
/// it without crate dependency cycles.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stable identifier stored in `analysis_results.analyzer` and used for
    /// `(order, name)` tie-breaking.
    fn name(&self) -> &str;

    /// Lower runs first. Ties broken by `name` for a total, deterministic order.
    fn order(&self) -> i32;

    async fn observe(&self, event: &EmailEvent) -> Result<Vec<Observation>>;
}
