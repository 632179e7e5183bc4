//! Audit downstream candidates against the formalized license.

use std::sync::Arc;

use lncd_core::{
    ChatMessage, ChatOptions, ComplianceVerdict, LLMProvider, LicenseProfile, RuleTally,
    Violation, extract_json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::filter::{Candidate, Judged};

const SYSTEM_PROMPT: &str = "You are a licensing compliance expert.";

const RULES: &str = "Check compliance against the following rules:
a. non_commercial: If true, the downstream license must explicitly prohibit commercial use. \
If the downstream dataset license allows commercial use, is missing, or is unclear, this is a violation.
b. sharealike: If true, the downstream license must be identical to the original license. \
Any deviation (even more permissive) is a violation.
c. no_derivatives: If true, the downstream dataset must not create or distribute derivative works. \
If modifications, extensions, or derivatives are indicated, this is a violation.
d. attribution: If true, the downstream dataset must provide attribution, including: \
the creator's name, attribution parties, a copyright notice, a license notice, a disclaimer notice, \
and a link to the original material. Missing any of these is a violation.
e. open_source: If true, the downstream dataset or related code/derivatives must be released under an \
open-source license. If it is closed-source, missing, or unclear, this is a violation.
f. distribution_platform: If true, redistribution must occur on the specified platforms (e.g. Physionet). \
If it is distributed elsewhere, this is a violation.
g. naming: If true, derivative datasets must be named as the original license prescribes. \
Any other naming is a violation.";

/// A downstream candidate with its audit outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audited<T> {
    #[serde(flatten)]
    pub judged: Judged<T>,
    pub has_violation: bool,
    pub violations: Vec<Violation>,
    pub citation: String,
}

/// Per-rule counts over a set of audit results.
#[must_use]
pub fn tally<T>(audited: &[Audited<T>]) -> RuleTally {
    let mut tally = RuleTally::default();
    for violation in audited.iter().flat_map(|a| &a.violations) {
        if let Some(rule) = violation.license_rule() {
            tally.add(rule, 1);
        }
    }
    tally
}

fn audit_prompt(profile_json: &str, record_json: &str) -> String {
    format!(
        "You are a dataset licensing compliance auditor. Your task is to determine whether a downstream \
dataset record violates the original dataset's licensing requirements. Follow these rules carefully:

1. Your output must be a single valid JSON object with exactly two keys: 'has_violation' and 'violations'.
2. 'has_violation' must be a boolean. It is true if at least one violation exists, false otherwise.
3. 'violations' must be an array. Each element is an object with exactly two keys: 'rule' and 'detail'.
   - 'rule' must be one of: 'non_commercial', 'sharealike', 'no_derivatives', 'attribution', \
'open_source', 'distribution_platform', 'naming'.
   - 'detail' must be a clear natural-language explanation explicitly referencing the original \
dataset's requirements.
4. If no violations are found, return: {{\"has_violation\": false, \"violations\": []}}.

Original dataset licensing requirements:
{profile_json}

Downstream dataset record:
{record_json}

{RULES}

Return only the JSON object. Do not include explanations or text outside of the JSON."
    )
}

pub struct ComplianceChecker<P = Arc<dyn LLMProvider>> {
    provider: P,
    model: String,
}

impl<P: LLMProvider> ComplianceChecker<P> {
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Anything short of a well-formed verdict counts as no violation.
    pub async fn check<T: Candidate>(&self, judged: &Judged<T>, profile: &LicenseProfile) -> ComplianceVerdict {
        let (Ok(profile_json), Ok(record_json)) = (
            serde_json::to_string_pretty(profile),
            serde_json::to_string_pretty(judged),
        ) else {
            warn!("Could not serialize {} for audit", judged.item.label());
            return ComplianceVerdict::clean();
        };

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(audit_prompt(&profile_json, &record_json)),
        ];
        let options = ChatOptions::new(&self.model).with_temperature(0.0);

        let response = match self.provider.chat(&messages, &options).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Error calling LLM API for {}: {e}", judged.item.label());
                return ComplianceVerdict::clean();
            }
        };

        match extract_json::<ComplianceVerdict>(&response.content) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Unexpected audit answer for {}: {e}", judged.item.label());
                ComplianceVerdict::clean()
            }
        }
    }

    /// Audit the downstream candidates of `judged`; the rest are dropped.
    pub async fn audit<T: Candidate>(&self, judged: Vec<Judged<T>>, profile: &LicenseProfile) -> Vec<Audited<T>> {
        let total = judged.len();
        let mut audited = Vec::new();

        for (i, candidate) in judged.into_iter().enumerate() {
            if !candidate.is_downstream() {
                continue;
            }
            info!("Auditing record {}/{total}: {}", i + 1, candidate.item.label());
            let verdict = self.check(&candidate, profile).await;
            audited.push(Audited {
                judged: candidate,
                has_violation: verdict.has_violation,
                violations: verdict.violations,
                citation: profile.citation.clone(),
            });
        }

        info!(
            "{} of {} downstream records violate the license",
            audited.iter().filter(|a| a.has_violation).count(),
            audited.len()
        );
        audited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lncd_core::{DownstreamVerdict, LicenseRule};

    #[test]
    fn prompt_lists_every_rule() {
        let prompt = audit_prompt("{\"license\": \"CC-BY-NC-4.0\"}", "{\"id\": \"x\"}");
        for rule in LicenseRule::ALL {
            assert!(prompt.contains(&format!("{rule}:")), "rule {rule} missing");
        }
        assert!(prompt.contains("{\"has_violation\": false, \"violations\": []}"));
        assert!(prompt.contains("Downstream dataset record:\n{\"id\": \"x\"}"));
    }

    #[test]
    fn tally_counts_known_rules() {
        let audited = vec![Audited {
            judged: Judged {
                item: "x".to_string(),
                downstream_usage: DownstreamVerdict::default(),
            },
            has_violation: true,
            violations: vec![
                Violation {
                    rule: "non_commercial".to_string(),
                    detail: String::new(),
                },
                Violation {
                    rule: "give_credit".to_string(),
                    detail: String::new(),
                },
                Violation {
                    rule: "special_requirement".to_string(),
                    detail: String::new(),
                },
            ],
            citation: String::new(),
        }];
        let tally = tally(&audited);
        assert_eq!(tally.get(LicenseRule::NonCommercial), 1);
        assert_eq!(tally.get(LicenseRule::Attribution), 1);
        assert_eq!(tally.total(), 2);
    }
}
