use serde::{Deserialize, Serialize};

use crate::error::{IcesError, Result};

/// Semantic hint the policy engine uses to coerce operator arguments.
///
/// Values are stored as-is regardless of `type`; `type` only narrows which
/// operators make sense against a given observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    Text,
    Numeric,
    PassFail,
    Boolean,
}

/// A typed observation value. Serializes as a bare JSON scalar (no variant
/// tag) so the wire shape of `Observation` stays `{key, value, type}` rather
/// than nesting `value` under a discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationValue {
    Boolean(bool),
    Numeric(f64),
    Text(String),
}

impl ObservationValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ObservationValue::Boolean(b) => Some(*b),
            ObservationValue::Text(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            ObservationValue::Numeric(n) => Some(*n != 0.0),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ObservationValue::Numeric(n) => Some(*n),
            ObservationValue::Text(s) => s.parse::<f64>().ok(),
            ObservationValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }

    pub fn display_string(&self) -> String {
        match self {
            ObservationValue::Boolean(b) => b.to_string(),
            ObservationValue::Numeric(n) => {
                if n.fract() == 0.0 {
                    format!("{n:.0}")
                } else {
                    n.to_string()
                }
            }
            ObservationValue::Text(s) => s.clone(),
        }
    }
}

/// One typed key-value fact produced by an analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub key: String,
    pub value: ObservationValue,
    #[serde(rename = "type")]
    pub obs_type: ObservationType,
}

impl Observation {
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: ObservationValue::Text(value.into()),
            obs_type: ObservationType::Text,
        }
    }

    pub fn numeric(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value: ObservationValue::Numeric(value),
            obs_type: ObservationType::Numeric,
        }
    }

    pub fn boolean(key: impl Into<String>, value: bool) -> Self {
        Self {
            key: key.into(),
            value: ObservationValue::Boolean(value),
            obs_type: ObservationType::Boolean,
        }
    }

    pub fn pass_fail(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: ObservationValue::Text(label.into()),
            obs_type: ObservationType::PassFail,
        }
    }

    /// The single observation an analyzer emits when it panics or returns
    /// an error; the pipeline never lets this abort the run.
    pub fn error(message: impl Into<String>) -> Self {
        Self::text("error", message)
    }

    pub fn as_f64(&self) -> Result<f64> {
        self.value.as_f64().ok_or_else(|| IcesError::NotNumeric {
            key: self.key.clone(),
        })
    }
}
