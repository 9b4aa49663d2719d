use serde::{Deserialize, Serialize};

use crate::observation::Observation;

/// One analyzer's complete output for one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analyzer: String,
    pub observations: Vec<Observation>,
    pub processing_time_ms: f64,
}

impl AnalysisResult {
    pub fn find(&self, key: &str) -> Option<&Observation> {
        self.observations.iter().find(|o| o.key == key)
    }

    /// The result an analyzer yields when it fails; carries exactly one
    /// `error` observation. Pipeline failure isolation relies on this shape.
    pub fn error(analyzer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            analyzer: analyzer.into(),
            observations: vec![Observation::error(message)],
            processing_time_ms: 0.0,
        }
    }
}
