//! Tenant/sender/recipient scoped rule matching against analyzer
//! observations, producing the [`ices_core::PolicyDecision`] the dispatcher
//! acts on.

mod engine;
mod matcher;
mod rule;

pub use engine::PolicyEngine;
pub use rule::{AnalyzerScope, Operator, PolicyRule, ScopePattern, WhenClause};
