//! Dataset record text format.
//!
//! A record is a block of `Label: value` lines describing one dataset:
//!
//! ```text
//! # comment lines start with '#'
//! RepresentativeTerm: BRSET
//! Title: A Brazilian Multilabel Ophthalmological Dataset (BRSET)
//! Website: https://physionet.org/content/brazilian-ophthalmological/1.0.1/
//! Keywords: fundus, ophthalmology
//! Description: The dataset contains ...
//!   ... more prose until the next label
//! Citation: Nakayama et al. ...
//! License: CC-BY-NC-4.0
//! ```
//!
//! `Description` and `License` may continue over several lines; every other
//! label holds a single line.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::license::{LicenseCatalog, LicenseSource};

/// One of the seven labels of a dataset record, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordField {
    RepresentativeTerm,
    Title,
    Website,
    Keywords,
    Description,
    Citation,
    License,
}

impl RecordField {
    pub const ALL: [Self; 7] = [
        Self::RepresentativeTerm,
        Self::Title,
        Self::Website,
        Self::Keywords,
        Self::Description,
        Self::Citation,
        Self::License,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RepresentativeTerm => "RepresentativeTerm",
            Self::Title => "Title",
            Self::Website => "Website",
            Self::Keywords => "Keywords",
            Self::Description => "Description",
            Self::Citation => "Citation",
            Self::License => "License",
        }
    }

    /// Whether the value may continue on the following lines.
    #[must_use]
    pub const fn is_multiline(self) -> bool {
        matches!(self, Self::Description | Self::License)
    }

    /// Case-sensitive label lookup.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.label() == label)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown record field `{0}`")]
pub struct UnknownFieldError(pub String);

impl FromStr for RecordField {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| UnknownFieldError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A required label never appeared, or its value was empty.
    #[error("missing required field `{0}`")]
    MissingField(RecordField),

    /// A line that is neither a comment, a blank line, a `Label: value`
    /// line nor part of an open multi-line value.
    #[error("unrecognized line {line_number}: `{line}`")]
    UnrecognizedLabel { line_number: usize, line: String },
}

/// Provenance and licensing metadata of one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetRecord {
    pub representative_term: String,
    pub title: String,
    pub website: String,
    pub keywords: String,
    pub description: String,
    pub citation: String,
    pub license: String,
}

impl DatasetRecord {
    /// Parse a record from its labeled text form.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse(text)
    }

    #[must_use]
    pub fn get(&self, field: RecordField) -> &str {
        match field {
            RecordField::RepresentativeTerm => &self.representative_term,
            RecordField::Title => &self.title,
            RecordField::Website => &self.website,
            RecordField::Keywords => &self.keywords,
            RecordField::Description => &self.description,
            RecordField::Citation => &self.citation,
            RecordField::License => &self.license,
        }
    }

    /// Serialize back to `Label: value` lines in canonical order.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// `Keywords` split on commas, each trimmed.
    #[must_use]
    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }

    #[must_use]
    pub fn license_source<'a>(&'a self, catalog: &'a LicenseCatalog) -> LicenseSource<'a> {
        catalog.classify(&self.license)
    }

    fn from_values(values: [Option<String>; 7]) -> Result<Self, ParseError> {
        let mut values = values.map(|v| v.filter(|s| !s.is_empty()));
        let mut take = |field: RecordField| {
            values[field.index()]
                .take()
                .ok_or(ParseError::MissingField(field))
        };

        Ok(Self {
            representative_term: take(RecordField::RepresentativeTerm)?,
            title: take(RecordField::Title)?,
            website: take(RecordField::Website)?,
            keywords: take(RecordField::Keywords)?,
            description: take(RecordField::Description)?,
            citation: take(RecordField::Citation)?,
            license: take(RecordField::License)?,
        })
    }
}

impl fmt::Display for DatasetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in RecordField::ALL {
            writeln!(f, "{field}: {}", self.get(field))?;
        }
        Ok(())
    }
}

impl FromStr for DatasetRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse a dataset record. Pure; all-or-nothing.
///
/// A label whose value is empty after trimming counts as missing. A leading
/// byte order mark is ignored.
pub fn parse(text: &str) -> Result<DatasetRecord, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut values: [Option<String>; 7] = Default::default();
    let mut open: Option<(RecordField, Vec<&str>)> = None;

    for (index, line) in text.lines().enumerate() {
        if line.trim_start().starts_with('#') {
            continue;
        }

        if let Some((field, value)) = split_field_line(line) {
            if let Some((previous, lines)) = open.take() {
                store(&mut values, previous, join_value(&lines));
            }
            if field.is_multiline() {
                open = Some((field, vec![value]));
            } else {
                store(&mut values, field, value.trim().to_string());
            }
            continue;
        }

        if let Some((_, lines)) = open.as_mut() {
            lines.push(line);
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        return Err(ParseError::UnrecognizedLabel {
            line_number: index + 1,
            line: line.to_string(),
        });
    }

    if let Some((field, lines)) = open {
        store(&mut values, field, join_value(&lines));
    }

    DatasetRecord::from_values(values)
}

/// Split `Label: value` when `Label` is one of the recognized labels.
fn split_field_line(line: &str) -> Option<(RecordField, &str)> {
    let (label, value) = line.split_once(':')?;
    RecordField::from_label(label).map(|field| (field, value))
}

fn join_value(lines: &[&str]) -> String {
    lines.join("\n").trim().to_string()
}

fn store(values: &mut [Option<String>; 7], field: RecordField, value: String) {
    if values[field.index()].replace(value).is_some() {
        debug!("Field {field} given more than once, keeping the last value");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "RepresentativeTerm: X\nTitle: T\nWebsite: W\nKeywords: K\nDescription: D\nCitation: C\nLicense: MIT\n";

    #[test]
    fn labels_round_trip_through_from_str() {
        for field in RecordField::ALL {
            assert_eq!(field.label().parse::<RecordField>(), Ok(field));
        }
        assert!("title".parse::<RecordField>().is_err());
    }

    #[test]
    fn only_description_and_license_are_multiline() {
        let multi: Vec<_> = RecordField::ALL
            .into_iter()
            .filter(|f| f.is_multiline())
            .collect();
        assert_eq!(multi, vec![RecordField::Description, RecordField::License]);
    }

    #[test]
    fn split_requires_exact_label() {
        assert!(split_field_line("Title: x").is_some());
        assert!(split_field_line("title: x").is_none());
        assert!(split_field_line(" Title: x").is_none());
        assert!(split_field_line("Title x").is_none());
    }

    #[test]
    fn minimal_record_parses() {
        let record = parse(MINIMAL);
        assert!(record.is_ok());
        let Ok(record) = record else { return };
        assert_eq!(record.representative_term, "X");
        assert_eq!(record.license, "MIT");
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let text = MINIMAL.replace("Title: T", "Title:   ");
        assert_eq!(parse(&text), Err(ParseError::MissingField(RecordField::Title)));
    }

    #[test]
    fn empty_multiline_value_counts_as_missing() {
        let text = MINIMAL.replace("License: MIT", "License:\n\n");
        assert_eq!(parse(&text), Err(ParseError::MissingField(RecordField::License)));
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let text = format!("\u{feff}{MINIMAL}");
        let Ok(record) = parse(&text) else {
            panic!("expected record");
        };
        assert_eq!(record.representative_term, "X");
    }

    #[test]
    fn duplicate_label_keeps_last_value() {
        let text = format!("{MINIMAL}Title: Second\n");
        let Ok(record) = parse(&text) else {
            panic!("expected record");
        };
        assert_eq!(record.title, "Second");
    }

    #[test]
    fn keyword_list_splits_on_commas() {
        let Ok(mut record) = parse(MINIMAL) else {
            panic!("expected record");
        };
        record.keywords = "fundus,  diabetic retinopathy ,,ophthalmology,".to_string();
        assert_eq!(
            record.keyword_list(),
            vec!["fundus", "diabetic retinopathy", "ophthalmology"]
        );
    }

    #[test]
    fn serde_uses_label_names() {
        let Ok(record) = parse(MINIMAL) else {
            panic!("expected record");
        };
        let value = serde_json::to_value(&record).unwrap_or_default();
        assert_eq!(value["RepresentativeTerm"], "X");
        assert_eq!(value["License"], "MIT");
    }
}
