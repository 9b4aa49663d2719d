//! Shared zero-shot classification used by both the SaaS-usage analyzer
//! (`{usage, marketing}`) and the BEC intent step (seven intent labels).
//! `classifier()` returns `None` whenever no model is configured — every
//! caller treats that as "unavailable" and falls back to its own documented
//! default rather than failing.

use std::sync::OnceLock;

/// Scores an arbitrary set of candidate labels against a piece of text.
/// Implementations are multi-label: every label gets an independent score
/// in `[0, 1]`, not a softmax over mutually exclusive classes.
pub trait ZeroShotClassifier: Send + Sync {
    fn classify(&self, text: &str, labels: &[&str]) -> Vec<(String, f64)>;
}

#[cfg(feature = "onnx-classifier")]
#[path = "onnx.rs"]
mod onnx;

static CLASSIFIER: OnceLock<Option<Box<dyn ZeroShotClassifier>>> = OnceLock::new();

#[must_use]
pub fn classifier() -> Option<&'static dyn ZeroShotClassifier> {
    CLASSIFIER
        .get_or_init(|| {
            #[cfg(feature = "onnx-classifier")]
            {
                match onnx::OnnxClassifier::load_from_env() {
                    Ok(model) => Some(Box::new(model) as Box<dyn ZeroShotClassifier>),
                    Err(err) => {
                        tracing::warn!(error = %err, "ONNX classifier unavailable, falling back to defaults");
                        None
                    }
                }
            }
            #[cfg(not(feature = "onnx-classifier"))]
            {
                None
            }
        })
        .as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_is_unavailable_without_the_onnx_feature() {
        assert!(classifier().is_none());
    }
}
