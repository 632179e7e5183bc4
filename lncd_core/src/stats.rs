//! Tallies over filtered and violation artifacts.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use serde::Serialize;
use serde_json::Value;

use crate::license::LicenseRule;

/// Coerce an artifact payload into a list of items.
///
/// A list is used as-is; an object carrying a list under `list_key`,
/// `items` or `data` yields that list; any other object is one item.
#[must_use]
pub fn normalize_items(data: Value, list_key: &str) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            for key in [list_key, "items", "data"] {
                if matches!(map.get(key), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove(key) {
                        return items;
                    }
                }
            }
            vec![Value::Object(map)]
        }
        _ => Vec::new(),
    }
}

/// Violation entries counted per rule. Every listed entry counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleTally {
    counts: BTreeMap<LicenseRule, usize>,
}

impl RuleTally {
    #[must_use]
    pub fn from_items(items: &[Value]) -> Self {
        let mut tally = Self::default();
        for item in items {
            let Some(violations) = item.get("violations").and_then(Value::as_array) else {
                continue;
            };
            for violation in violations {
                if let Some(rule) = violation
                    .get("rule")
                    .and_then(Value::as_str)
                    .and_then(|r| r.parse::<LicenseRule>().ok())
                {
                    tally.add(rule, 1);
                }
            }
        }
        tally
    }

    pub fn add(&mut self, rule: LicenseRule, count: usize) {
        *self.counts.entry(rule).or_default() += count;
    }

    #[must_use]
    pub fn get(&self, rule: LicenseRule) -> usize {
        self.counts.get(&rule).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LicenseRule, usize)> + '_ {
        LicenseRule::ALL.into_iter().map(|rule| (rule, self.get(rule)))
    }
}

impl AddAssign<&Self> for RuleTally {
    fn add_assign(&mut self, other: &Self) {
        for (rule, count) in &other.counts {
            self.add(*rule, *count);
        }
    }
}

/// Coarse (all candidates) against fine (judged downstream) counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterTally {
    pub coarse: usize,
    pub fine: usize,
}

impl FilterTally {
    #[must_use]
    pub fn from_items(items: &[Value]) -> Self {
        let fine = items
            .iter()
            .filter(|item| {
                item.pointer("/downstream_usage/is_downstream")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            })
            .count();
        Self {
            coarse: items.len(),
            fine,
        }
    }

    /// Share of fine over coarse, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fine_percent(&self) -> f64 {
        if self.coarse == 0 {
            0.0
        } else {
            self.fine as f64 / self.coarse as f64 * 100.0
        }
    }
}

impl AddAssign for FilterTally {
    fn add_assign(&mut self, other: Self) {
        self.coarse += other.coarse;
        self.fine += other.fine;
    }
}
