//! License obligations and the catalog of well-known licenses.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// License name recorded when the terms came from LLM analysis instead of
/// the catalog.
pub const CUSTOM_LICENSE: &str = "Custom License";

/// An obligation a license can impose on downstream users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseRule {
    NonCommercial,
    #[serde(rename = "sharealike")]
    ShareAlike,
    NoDerivatives,
    #[serde(alias = "give_credit")]
    Attribution,
    OpenSource,
    DistributionPlatform,
    Naming,
}

impl LicenseRule {
    pub const ALL: [Self; 7] = [
        Self::NonCommercial,
        Self::ShareAlike,
        Self::NoDerivatives,
        Self::Attribution,
        Self::OpenSource,
        Self::DistributionPlatform,
        Self::Naming,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonCommercial => "non_commercial",
            Self::ShareAlike => "sharealike",
            Self::NoDerivatives => "no_derivatives",
            Self::Attribution => "attribution",
            Self::OpenSource => "open_source",
            Self::DistributionPlatform => "distribution_platform",
            Self::Naming => "naming",
        }
    }
}

impl fmt::Display for LicenseRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "give_credit" {
            return Ok(Self::Attribution);
        }
        Self::ALL
            .into_iter()
            .find(|rule| rule.as_str() == normalized)
            .ok_or_else(|| format!("unknown license rule: {s}"))
    }
}

/// The obligations of one license. Keys missing from JSON read as `false`.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseTerms {
    pub non_commercial: bool,
    pub sharealike: bool,
    pub no_derivatives: bool,
    #[serde(alias = "give_credit")]
    pub attribution: bool,
    pub open_source: bool,
    pub distribution_platform: bool,
    pub naming: bool,
}

const NC: u8 = 1;
const SA: u8 = 1 << 1;
const ND: u8 = 1 << 2;
const BY: u8 = 1 << 3;
const OS: u8 = 1 << 4;

impl LicenseTerms {
    const fn from_mask(mask: u8) -> Self {
        Self {
            non_commercial: mask & NC != 0,
            sharealike: mask & SA != 0,
            no_derivatives: mask & ND != 0,
            attribution: mask & BY != 0,
            open_source: mask & OS != 0,
            distribution_platform: false,
            naming: false,
        }
    }

    #[must_use]
    pub const fn requires(&self, rule: LicenseRule) -> bool {
        match rule {
            LicenseRule::NonCommercial => self.non_commercial,
            LicenseRule::ShareAlike => self.sharealike,
            LicenseRule::NoDerivatives => self.no_derivatives,
            LicenseRule::Attribution => self.attribution,
            LicenseRule::OpenSource => self.open_source,
            LicenseRule::DistributionPlatform => self.distribution_platform,
            LicenseRule::Naming => self.naming,
        }
    }

    #[must_use]
    pub fn required_rules(&self) -> Vec<LicenseRule> {
        LicenseRule::ALL
            .into_iter()
            .filter(|rule| self.requires(*rule))
            .collect()
    }
}

const BUILTIN: &[(&str, u8)] = &[
    ("CC0-1.0", 0),
    ("PDDL-1.0", 0),
    ("Unlicense", 0),
    ("CC-BY-3.0", BY),
    ("CC-BY-4.0", BY),
    ("CC-BY-SA-3.0", BY | SA),
    ("CC-BY-SA-4.0", BY | SA),
    ("CC-BY-NC-3.0", BY | NC),
    ("CC-BY-NC-4.0", BY | NC),
    ("CC-BY-NC-SA-3.0", BY | NC | SA),
    ("CC-BY-NC-SA-4.0", BY | NC | SA),
    ("CC-BY-ND-3.0", BY | ND),
    ("CC-BY-ND-4.0", BY | ND),
    ("CC-BY-NC-ND-3.0", BY | NC | ND),
    ("CC-BY-NC-ND-4.0", BY | NC | ND),
    ("ODC-By-1.0", BY),
    ("ODbL-1.0", BY | SA),
    ("CDLA-Permissive-2.0", BY),
    ("CDLA-Sharing-1.0", BY | SA),
    ("MIT", BY),
    ("BSD-2-Clause", BY),
    ("BSD-3-Clause", BY),
    ("Apache-2.0", BY),
    ("GPL-2.0", BY | SA | OS),
    ("GPL-3.0", BY | SA | OS),
    ("LGPL-3.0", BY | SA | OS),
    ("AGPL-3.0", BY | SA | OS),
];

/// How the `License` field of a record is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseSource<'a> {
    /// A catalog identifier with known terms.
    Known { id: &'a str, terms: LicenseTerms },
    /// A link to the license page.
    Url(&'a str),
    /// Verbatim license text.
    Text(&'a str),
}

/// Known license identifiers mapped to their terms. Lookup ignores case.
#[derive(Debug, Clone)]
pub struct LicenseCatalog {
    entries: BTreeMap<String, (String, LicenseTerms)>,
}

impl LicenseCatalog {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Creative Commons, open data and common software licenses.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for (id, mask) in BUILTIN {
            catalog.insert(*id, LicenseTerms::from_mask(*mask));
        }
        catalog
    }

    pub fn insert(&mut self, id: impl Into<String>, terms: LicenseTerms) {
        let id = id.into();
        self.entries
            .insert(id.trim().to_ascii_lowercase(), (id, terms));
    }

    /// Merge a `{ "<id>": { <terms> } }` table, overriding existing ids.
    /// Returns the number of entries read.
    pub fn extend_from_json(&mut self, json: &str) -> serde_json::Result<usize> {
        let table: BTreeMap<String, LicenseTerms> = serde_json::from_str(json)?;
        let count = table.len();
        for (id, terms) in table {
            self.insert(id, terms);
        }
        Ok(count)
    }

    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<(&str, LicenseTerms)> {
        self.entries
            .get(&id.trim().to_ascii_lowercase())
            .map(|(id, terms)| (id.as_str(), *terms))
    }

    #[must_use]
    pub fn classify<'a>(&'a self, license: &'a str) -> LicenseSource<'a> {
        let license = license.trim();
        if let Some((id, terms)) = self.lookup(license) {
            LicenseSource::Known { id, terms }
        } else if license.starts_with("http") {
            LicenseSource::Url(license)
        } else {
            LicenseSource::Text(license)
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LicenseCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The original dataset together with its formalized license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseProfile {
    pub title: String,
    pub license: String,
    pub representative_term: String,
    pub website: String,
    pub citation: String,
    pub license_analysis: LicenseTerms,
}
