//! Behavioural business-email-compromise detection, shared between the
//! `bec_detector` analyzer and the `saas_usage` analyzer (which borrows the
//! same zero-shot classifier and SaaS vendor catalog).

mod bec_analyzer;
mod behavior;
mod error;
mod intent;
mod scoring;
mod signals;

pub mod catalog;
pub mod classifier;
pub mod html;

pub use bec_analyzer::{post_analyze_update, BecAnalyzer};
pub use behavior::{evaluate_pair, evaluate_profile, PairFlags, ProfileFlags};
pub use classifier::classifier;
pub use error::{BecError, Result};
pub use intent::{classify_intent, IntentResult, HIGH_RISK_CATEGORIES, INTENT_LABELS};
pub use scoring::{compute as compute_risk_score, RiskScore};
pub use signals::{scan as scan_content_signals, ContentSignals};
