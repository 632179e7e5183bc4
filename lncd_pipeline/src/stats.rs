//! Statistics over saved `violations` and `filtered` artifacts.

use std::collections::BTreeMap;
use std::fmt;

use lncd_core::{FilterTally, RuleTally, SourceKind, normalize_items};
use serde::Serialize;
use serde_json::Value;

use crate::artifacts::{ArtifactError, ArtifactKind, ArtifactStore};

fn load_items(
    store: &ArtifactStore,
    kind: ArtifactKind,
    source: SourceKind,
    keyword: &str,
) -> Result<Vec<Value>, ArtifactError> {
    let data: Value = store.load_json(kind, keyword)?;
    Ok(normalize_items(data, source.as_str()))
}

/// `keyword` alone when given and saved, otherwise every keyword with an
/// artifact.
fn keywords_for(
    store: &ArtifactStore,
    kind: ArtifactKind,
    keyword: Option<&str>,
) -> Result<Vec<String>, ArtifactError> {
    match keyword {
        Some(keyword) if store.exists(kind, keyword) => Ok(vec![keyword.to_string()]),
        Some(_) => Ok(Vec::new()),
        None => store.keywords(kind),
    }
}

/// Per-rule violation counts per dataset for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViolationStats {
    pub source: Option<SourceKind>,
    pub datasets: BTreeMap<String, RuleTally>,
    pub total: RuleTally,
}

impl ViolationStats {
    pub fn collect(
        store: &ArtifactStore,
        source: SourceKind,
        keyword: Option<&str>,
    ) -> Result<Self, ArtifactError> {
        let kind = ArtifactKind::Violations(source);
        let mut stats = Self {
            source: Some(source),
            ..Self::default()
        };
        for keyword in keywords_for(store, kind, keyword)? {
            let tally = RuleTally::from_items(&load_items(store, kind, source, &keyword)?);
            stats.total += &tally;
            stats.datasets.insert(keyword, tally);
        }
        Ok(stats)
    }
}

impl fmt::Display for ViolationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = self.source {
            writeln!(f, "Violations ({source})")?;
        }
        if self.datasets.is_empty() {
            return writeln!(f, "  no violation artifacts");
        }
        for (keyword, tally) in &self.datasets {
            writeln!(f, "  {keyword}: {} violations", tally.total())?;
            for (rule, count) in tally.iter().filter(|(_, count)| *count > 0) {
                writeln!(f, "    {rule}: {count}")?;
            }
        }
        writeln!(f, "  Total: {} violations", self.total.total())?;
        for (rule, count) in self.total.iter() {
            writeln!(f, "    {rule}: {count}")?;
        }
        Ok(())
    }
}

/// Coarse against fine counts per dataset for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub source: Option<SourceKind>,
    pub datasets: BTreeMap<String, FilterTally>,
    pub total: FilterTally,
}

impl FilterStats {
    pub fn collect(
        store: &ArtifactStore,
        source: SourceKind,
        keyword: Option<&str>,
    ) -> Result<Self, ArtifactError> {
        let kind = ArtifactKind::Filtered(source);
        let mut stats = Self {
            source: Some(source),
            ..Self::default()
        };
        for keyword in keywords_for(store, kind, keyword)? {
            let tally = FilterTally::from_items(&load_items(store, kind, source, &keyword)?);
            stats.total += tally;
            stats.datasets.insert(keyword, tally);
        }
        Ok(stats)
    }
}

impl fmt::Display for FilterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = self.source {
            writeln!(f, "Filtering ({source})")?;
        }
        if self.datasets.is_empty() {
            return writeln!(f, "  no filtered artifacts");
        }
        for (keyword, tally) in &self.datasets {
            writeln!(
                f,
                "  {keyword}: coarse {}, fine {} ({:.2}%)",
                tally.coarse,
                tally.fine,
                tally.fine_percent()
            )?;
        }
        writeln!(
            f,
            "  Total: coarse {}, fine {} ({:.2}%)",
            self.total.coarse,
            self.total.fine,
            self.total.fine_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lncd_core::LicenseRule;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, ArtifactStore) {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let store = ArtifactStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn violations_are_summed_across_datasets() {
        let (_dir, store) = temp_store();
        let kind = ArtifactKind::Violations(SourceKind::Kaggle);
        let saved = [
            store.save_json(
                kind,
                "BRSET",
                &json!([
                    {"ref": "a/b", "violations": [{"rule": "non_commercial"}, {"rule": "attribution"}]},
                    {"ref": "c/d", "violations": []}
                ]),
            ),
            store.save_json(
                kind,
                "CelebA",
                &json!({"kaggle": [{"ref": "e/f", "violations": [{"rule": "non_commercial"}]}]}),
            ),
        ];
        assert!(saved.iter().all(Result::is_ok));

        let Ok(stats) = ViolationStats::collect(&store, SourceKind::Kaggle, None) else {
            panic!("stats should load");
        };
        assert_eq!(stats.datasets.len(), 2);
        assert_eq!(stats.datasets["BRSET"].total(), 2);
        assert_eq!(stats.total.get(LicenseRule::NonCommercial), 2);
        assert_eq!(stats.total.get(LicenseRule::Attribution), 1);

        let text = stats.to_string();
        assert!(text.starts_with("Violations (kaggle)\n"));
        assert!(text.contains("  Total: 3 violations\n"));
        assert!(text.contains("    sharealike: 0\n"));
    }

    #[test]
    fn one_keyword_can_be_selected() {
        let (_dir, store) = temp_store();
        let kind = ArtifactKind::Filtered(SourceKind::Github);
        assert!(store
            .save_json(
                kind,
                "BRSET",
                &json!([
                    {"full_name": "a/b", "downstream_usage": {"is_downstream": true}},
                    {"full_name": "c/d", "downstream_usage": {"is_downstream": false}}
                ]),
            )
            .is_ok());
        assert!(store.save_json(kind, "Other", &json!([{}])).is_ok());

        let Ok(stats) = FilterStats::collect(&store, SourceKind::Github, Some("BRSET")) else {
            panic!("stats should load");
        };
        assert_eq!(stats.datasets.len(), 1);
        assert_eq!(stats.total, FilterTally { coarse: 2, fine: 1 });
        assert!(stats.to_string().contains("  BRSET: coarse 2, fine 1 (50.00%)\n"));
    }

    #[test]
    fn missing_keyword_is_skipped() {
        let (_dir, store) = temp_store();
        let Ok(stats) = FilterStats::collect(&store, SourceKind::Github, Some("absent")) else {
            panic!("missing keyword should not fail");
        };
        assert!(stats.datasets.is_empty());
    }

    #[test]
    fn corrupt_artifact_is_an_error() {
        let (_dir, store) = temp_store();
        let path = store.path(ArtifactKind::Filtered(SourceKind::Github), "BRSET");
        assert!(std::fs::write(path, "not json").is_ok());
        let result = FilterStats::collect(&store, SourceKind::Github, None);
        assert!(matches!(result, Err(ArtifactError::Json { .. })));
    }

    #[test]
    fn empty_store_reports_nothing() {
        let (_dir, store) = temp_store();
        let Ok(stats) = ViolationStats::collect(&store, SourceKind::Huggingface, None) else {
            panic!("empty store should load");
        };
        assert_eq!(stats.total.total(), 0);
        assert!(stats.to_string().contains("no violation artifacts"));
    }
}
