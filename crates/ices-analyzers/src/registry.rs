use std::sync::Arc;
use std::time::Instant;

use ices_core::{AnalysisResult, Analyzer, EmailEvent};

/// Holds the analyzers that make up a tenant's pipeline, always kept sorted
/// by `(order, name)` so [`run_all`](Self::run_all) is deterministic
/// regardless of registration order.
pub struct AnalyzerRegistry {
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { analyzers: Vec::new() }
    }

    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        self.analyzers.push(analyzer);
        self.analyzers
            .sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.name().cmp(b.name())));
    }

    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Run every registered analyzer against `event` concurrently, returning
    /// one [`AnalysisResult`] per analyzer in `(order, name)` order. An
    /// analyzer that errors contributes a single `error` observation instead
    /// of aborting the batch.
    pub async fn run_all(&self, event: &EmailEvent) -> Vec<AnalysisResult> {
        let futures = self.analyzers.iter().map(|analyzer| {
            let analyzer = Arc::clone(analyzer);
            async move {
                let start = Instant::now();
                let outcome = analyzer.observe(event).await;
                let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
                match outcome {
                    Ok(observations) => AnalysisResult {
                        analyzer: analyzer.name().to_string(),
                        observations,
                        processing_time_ms,
                    },
                    Err(err) => {
                        tracing::warn!(analyzer = analyzer.name(), error = %err, "analyzer failed");
                        let mut result = AnalysisResult::error(analyzer.name(), &err.to_string());
                        result.processing_time_ms = processing_time_ms;
                        result
                    }
                }
            }
        });
        futures::future::join_all(futures).await
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use ices_core::Observation;

    use super::*;
    use crate::test_support::sample_event;

    struct StubAnalyzer {
        stub_name: &'static str,
        stub_order: i32,
        fail: bool,
    }

    #[async_trait]
    impl Analyzer for StubAnalyzer {
        fn name(&self) -> &str {
            self.stub_name
        }

        fn order(&self) -> i32 {
            self.stub_order
        }

        async fn observe(&self, _event: &EmailEvent) -> ices_core::Result<Vec<Observation>> {
            if self.fail {
                return Err(ices_core::IcesError::MalformedEvent("boom".into()));
            }
            Ok(vec![Observation::boolean("ok", true)])
        }
    }

    #[tokio::test]
    async fn runs_in_order_then_name() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Arc::new(StubAnalyzer { stub_name: "z", stub_order: 10, fail: false }));
        registry.register(Arc::new(StubAnalyzer { stub_name: "a", stub_order: 10, fail: false }));
        registry.register(Arc::new(StubAnalyzer { stub_name: "m", stub_order: 5, fail: false }));

        assert_eq!(registry.list(), vec!["m", "a", "z"]);

        let results = registry.run_all(&sample_event()).await;
        let names: Vec<&str> = results.iter().map(|r| r.analyzer.as_str()).collect();
        assert_eq!(names, vec!["m", "a", "z"]);
    }

    #[tokio::test]
    async fn failing_analyzer_yields_error_observation_not_panic() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Arc::new(StubAnalyzer { stub_name: "bad", stub_order: 1, fail: true }));

        let results = registry.run_all(&sample_event()).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].find("error").is_some());
    }
}
