use serde::{Deserialize, Serialize};

use ices_core::Action;

/// A sender/recipient/tenant scope pattern: either the literal wildcard
/// `"*"`, a single glob (or plain exact-match string), or a list of globs
/// any one of which may match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopePattern {
    List(Vec<String>),
    One(String),
}

impl ScopePattern {
    pub fn patterns(&self) -> &[String] {
        match self {
            ScopePattern::List(items) => items,
            ScopePattern::One(item) => std::slice::from_ref(item),
        }
    }
}

/// Restricts which analyzers' observations a `when` clause considers.
/// Empty/absent means every analyzer is in scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalyzerScope {
    #[default]
    All,
    One(String),
    Some(Vec<String>),
}

impl AnalyzerScope {
    pub fn includes(&self, analyzer: &str) -> bool {
        match self {
            AnalyzerScope::All => true,
            AnalyzerScope::One(name) => name == analyzer,
            AnalyzerScope::Some(names) => names.iter().any(|n| n == analyzer),
        }
    }
}

/// Exactly one of `equals`/`gte`/`lte`/`contains`/`exists`, matched by trying
/// each struct-shaped variant in turn against the clause's remaining keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operator {
    Equals { equals: String },
    Gte { gte: f64 },
    Lte { lte: f64 },
    Contains { contains: String },
    Exists { exists: bool },
}

/// A single condition: `observation` names the key to look up (within
/// `analyzer`'s scope, searching matching results in their pipeline order),
/// `operator` decides whether the found value (if any) matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhenClause {
    #[serde(default)]
    pub analyzer: AnalyzerScope,
    pub observation: String,
    #[serde(flatten)]
    pub operator: Operator,
}

/// One rule record as loaded from configuration. Rules are evaluated in the
/// order they're listed; that order is the tiebreaker when two rules both
/// match at the same action priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,
    /// `*`, a tenant id, or a tenant alias.
    pub tenant: String,
    /// A glob pattern, or `*`. A pattern with no glob metacharacter is
    /// matched as an exact case-insensitive string.
    pub sender: String,
    pub recipients: ScopePattern,
    pub when: WhenClause,
    pub action: Action,
}
