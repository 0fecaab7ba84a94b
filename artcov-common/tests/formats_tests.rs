//! File-level import/export tests

use artcov_common::formats::{exporter_for, CsvFormat, DataImporter, JsonFormat};
use artcov_common::{ArticleId, ComputedModel, Error, SubjectId};
use std::fs;
use tempfile::TempDir;

const DOCUMENT: &str = r#"{
  "subjects": [
    {"id": 1, "name": "Numbers"},
    {"id": 2, "name": "Fractions"},
    {"id": 3, "name": "Ratios"}
  ],
  "articles": [
    {"id": 10, "name": "Counting"},
    {"id": 11, "name": "Halves"}
  ],
  "appearance": {"10": [1], "11": [1, 3]},
  "firstAppearance": {"10": 1, "11": 1}
}"#;

#[test]
fn test_file_round_trip_preserves_edits() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("course.json");
    fs::write(&path, DOCUMENT).unwrap();

    let verified = JsonFormat.import_data(&fs::read(&path).unwrap()).unwrap();
    let mut model = ComputedModel::compute(verified);
    model
        .set_appearance(SubjectId::new(2), ArticleId::new(10), true)
        .unwrap();
    let added = model.add_article("Thirds");

    let bytes = exporter_for("json").unwrap().export_data(&model).unwrap();
    fs::write(&path, &bytes).unwrap();

    let reloaded = ComputedModel::compute(JsonFormat::import(&fs::read(&path).unwrap()).unwrap());
    assert_eq!(reloaded.data(), model.data());
    assert_eq!(reloaded.article_at(2).unwrap().id, added);
    assert_eq!(
        reloaded.computed_data_for_article(ArticleId::new(10)),
        model.computed_data_for_article(ArticleId::new(10))
    );
    assert_eq!(reloaded.c_nu(), model.c_nu());
}

#[test]
fn test_csv_report_for_document() {
    let model = ComputedModel::compute(JsonFormat::import(DOCUMENT.as_bytes()).unwrap());
    let csv = CsvFormat::export(&model).unwrap();
    let rows: Vec<&str> = csv.lines().collect();

    assert_eq!(rows[0], "Article Names,Numbers,Fractions,Ratios,L,C,h");
    assert_eq!(rows.len(), 3);
    assert!(rows[2].starts_with("Halves,🔴✅,,🔴,1,"));
}

#[test]
fn test_unknown_reference_is_rejected() {
    let doc = DOCUMENT.replace(r#""11": [1, 3]"#, r#""11": [1, 9]"#);
    let err = JsonFormat::import(doc.as_bytes()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid data: reference to unknown subject id 9"
    );
}

#[test]
fn test_appearance_for_unknown_article_is_rejected() {
    let doc = DOCUMENT.replace(r#""10": [1], "11""#, r#""10": [1], "12": [1], "11""#);
    assert!(matches!(
        JsonFormat::import(doc.as_bytes()),
        Err(Error::Validation(_))
    ));
}
