//! Integration tests for the dataset record format.
//!
//! These tests verify that:
//! - well-formed records parse into trimmed field values
//! - missing labels and stray lines are reported precisely
//! - multi-line `Description`/`License` values stop at the next label
//! - serialization round-trips and label order does not matter

use lncd_core::license::{LicenseCatalog, LicenseSource};
use lncd_core::{DatasetRecord, ParseError, RecordField, parse};

const BRSET: &str = include_str!("fixtures/brset.txt");

fn sample_values() -> Vec<(RecordField, &'static str)> {
    vec![
        (RecordField::RepresentativeTerm, "CelebA"),
        (RecordField::Title, "Large-scale CelebFaces Attributes (CelebA) Dataset"),
        (RecordField::Website, "https://mmlab.ie.cuhk.edu.hk/projects/CelebA.html"),
        (RecordField::Keywords, "faces, attributes, landmarks"),
        (RecordField::Description, "Over 200K celebrity images with 40 attribute annotations."),
        (RecordField::Citation, "Liu et al. Deep Learning Face Attributes in the Wild. ICCV 2015."),
        (RecordField::License, "Non-commercial research purposes only."),
    ]
}

fn render(values: &[(RecordField, &str)]) -> String {
    values
        .iter()
        .map(|(field, value)| format!("{}: {value}\n", field.label()))
        .collect()
}

#[test]
fn test_brset_example() {
    let record = parse(BRSET);
    let Ok(record) = record else {
        panic!("BRSET fixture should parse: {record:?}");
    };

    assert_eq!(record.representative_term, "BRSET");
    assert_eq!(
        record.license,
        "https://physionet.org/content/brazilian-ophthalmological/view-license/1.0.1/"
    );
    assert!(record.description.starts_with("The Brazilian Multilabel Ophthalmological Dataset (BRSET) is"));
    assert!(record.description.contains("It contains 16,266 retinal fundus photographs"));
    assert!(record.description.ends_with("multi-label ophthalmological diagnoses."));
    assert!(!record.description.contains('\n'));
    assert_eq!(
        record.website,
        "https://physionet.org/content/brazilian-ophthalmological/1.0.1/"
    );
}

#[test]
fn test_brset_license_is_a_url() {
    let Ok(record) = parse(BRSET) else {
        panic!("BRSET fixture should parse");
    };
    let catalog = LicenseCatalog::builtin();
    assert!(matches!(record.license_source(&catalog), LicenseSource::Url(_)));
}

#[test]
fn test_values_are_trimmed() {
    let text = "RepresentativeTerm:    CelebA   \n\
                Title:\tLarge-scale CelebFaces Attributes (CelebA) Dataset \n\
                Website: https://mmlab.ie.cuhk.edu.hk/projects/CelebA.html\n\
                Keywords: faces, attributes, landmarks\n\
                Description:   Over 200K celebrity images with 40 attribute annotations.   \n\
                Citation: Liu et al. Deep Learning Face Attributes in the Wild. ICCV 2015.\n\
                License:  Non-commercial research purposes only.\n";
    let Ok(record) = parse(text) else {
        panic!("record should parse");
    };
    for (field, value) in sample_values() {
        assert_eq!(record.get(field), value, "field {field}");
    }
}

#[test]
fn test_each_missing_label_is_named() {
    let values = sample_values();
    for skip in RecordField::ALL {
        let kept: Vec<_> = values.iter().copied().filter(|(f, _)| *f != skip).collect();
        assert_eq!(parse(&render(&kept)), Err(ParseError::MissingField(skip)));
    }
}

#[test]
fn test_first_missing_label_in_canonical_order() {
    let text = "Title: T\nDescription: D\nLicense: MIT\n";
    assert_eq!(
        parse(text),
        Err(ParseError::MissingField(RecordField::RepresentativeTerm))
    );
}

#[test]
fn test_stray_line_after_single_line_field() {
    let text = "RepresentativeTerm: X\nthis line has no label\nTitle: T\n";
    assert_eq!(
        parse(text),
        Err(ParseError::UnrecognizedLabel {
            line_number: 2,
            line: "this line has no label".to_string(),
        })
    );
}

#[test]
fn test_unknown_label_outside_multiline_value() {
    let text = "RepresentativeTerm: X\nAuthor: Someone\n";
    let Err(ParseError::UnrecognizedLabel { line_number, line }) = parse(text) else {
        panic!("expected unrecognized label");
    };
    assert_eq!(line_number, 2);
    assert_eq!(line, "Author: Someone");
}

#[test]
fn test_lowercase_label_is_not_recognized() {
    let text = format!("RepresentativeTerm: X\ntitle: lowercase\n{}", render(&sample_values()));
    assert!(matches!(
        parse(&text),
        Err(ParseError::UnrecognizedLabel { line_number: 2, .. })
    ));
}

#[test]
fn test_multiline_description_and_license() {
    let text = "\
RepresentativeTerm: X
Title: T
Website: W
Keywords: K
Description:

  First paragraph line one.
Note: still part of the description.

Second paragraph.

Citation: C
License: Permission is granted for research use.
# comments are skipped even here

Redistribution requires prior written consent.
";
    let Ok(record) = parse(text) else {
        panic!("record should parse");
    };
    assert_eq!(
        record.description,
        "First paragraph line one.\nNote: still part of the description.\n\nSecond paragraph."
    );
    assert_eq!(record.citation, "C");
    assert_eq!(
        record.license,
        "Permission is granted for research use.\n\nRedistribution requires prior written consent."
    );
}

#[test]
fn test_crlf_line_endings() {
    let text = render(&sample_values()).replace('\n', "\r\n");
    let Ok(record) = parse(&text) else {
        panic!("record should parse");
    };
    assert_eq!(record.representative_term, "CelebA");
    assert_eq!(record.license, "Non-commercial research purposes only.");
}

#[test]
fn test_round_trip() {
    for text in [BRSET.to_string(), render(&sample_values())] {
        let Ok(record) = parse(&text) else {
            panic!("record should parse");
        };
        let reparsed = DatasetRecord::parse(&record.to_text());
        assert_eq!(reparsed, Ok(record));
    }
}

#[test]
fn test_round_trip_multiline() {
    let mut values = sample_values();
    values[4].1 = "Line one.\n\nLine two.";
    values[6].1 = "Clause 1.\nClause 2.";
    let Ok(record) = parse(&render(&values)) else {
        panic!("record should parse");
    };
    assert_eq!(record.description, "Line one.\n\nLine two.");
    assert_eq!(record.to_text().parse::<DatasetRecord>(), Ok(record));
}

#[test]
fn test_order_independence() {
    let canonical = render(&sample_values());
    let mut reversed = sample_values();
    reversed.reverse();
    let reversed = render(&reversed);

    let (Ok(a), Ok(b)) = (parse(&canonical), parse(&reversed)) else {
        panic!("both orders should parse");
    };
    assert_eq!(a, b);
}

#[test]
fn test_error_messages_name_the_problem() {
    let err = ParseError::MissingField(RecordField::Citation);
    assert_eq!(err.to_string(), "missing required field `Citation`");

    let err = ParseError::UnrecognizedLabel {
        line_number: 3,
        line: "oops".to_string(),
    };
    assert_eq!(err.to_string(), "unrecognized line 3: `oops`");
}
