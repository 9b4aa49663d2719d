use std::sync::Arc;

use ices_analyzers::{AnalyzerRegistry, AttachmentCheckAnalyzer, HeaderAuthAnalyzer, ReputationAnalyzer, SaasUsageAnalyzer, UrlCheckAnalyzer};
use ices_bec::BecAnalyzer;
use ices_cache::EphemeralCache;
use ices_store::BecStore;

/// Builds the full analyzer pipeline in the fixed `(order, name)` shape the
/// registry itself will also enforce: `header_auth` (10), `reputation`
/// (15), `url_check` (20), `attachment_check` (30), `bec_detector` (45),
/// `saas_usage` (50).
#[must_use]
pub fn build_registry(cache: Arc<dyn EphemeralCache>, bec_store: Arc<BecStore>) -> AnalyzerRegistry {
    let mut registry = AnalyzerRegistry::new();
    registry.register(Arc::new(HeaderAuthAnalyzer));
    registry.register(Arc::new(ReputationAnalyzer::new(cache)));
    registry.register(Arc::new(UrlCheckAnalyzer));
    registry.register(Arc::new(AttachmentCheckAnalyzer));
    registry.register(Arc::new(BecAnalyzer::new(bec_store)));
    registry.register(Arc::new(SaasUsageAnalyzer));
    registry
}
