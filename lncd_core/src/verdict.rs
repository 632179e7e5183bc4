//! Verdicts returned by the LLM judges.

use serde::{Deserialize, Serialize};

use crate::license::LicenseRule;

/// Whether a candidate uses, evaluates or extends the original dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownstreamVerdict {
    #[serde(default)]
    pub is_downstream: bool,
    #[serde(default)]
    pub reason: String,
}

impl DownstreamVerdict {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_downstream: false,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    #[serde(default)]
    pub detail: String,
}

impl Violation {
    /// The rule as a known obligation, if the judge used one of the names.
    #[must_use]
    pub fn license_rule(&self) -> Option<LicenseRule> {
        self.rule.parse().ok()
    }
}

/// Both keys are required; an answer lacking either does not deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub has_violation: bool,
    pub violations: Vec<Violation>,
}

impl ComplianceVerdict {
    #[must_use]
    pub const fn clean() -> Self {
        Self {
            has_violation: false,
            violations: Vec::new(),
        }
    }
}
