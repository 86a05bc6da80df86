use anise_catalog::{NameNormalizer, normalize_query};
use std::collections::HashMap;
use tempfile::TempDir;

// ── Name normalization ───────────────────────────────────────────

#[test]
fn folds_full_width_and_case() {
    let n = NameNormalizer::new();
    assert_eq!(n.normalize("Ｆｌａｍｅ Knight"), "flame knight");
}

#[test]
fn trims_surrounding_whitespace() {
    let n = NameNormalizer::new();
    assert_eq!(n.normalize("  炎骑士 \t"), "炎骑士");
}

#[test]
fn applies_script_fold_table() {
    let n = NameNormalizer::with_fold_table(HashMap::from([('騎', '骑')]));
    assert_eq!(n.normalize("炎騎士"), "炎骑士");
    assert_eq!(n.fold_len(), 1);
}

#[test]
fn fold_table_loads_from_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("script_fold.json");
    std::fs::write(&path, r#"{"騎": "骑", "bad": "x", "書": "书"}"#).unwrap();

    let n = NameNormalizer::load_fold_table(&path).unwrap();
    assert_eq!(n.fold_len(), 2);
    assert_eq!(n.normalize("騎書"), "骑书");
}

#[test]
fn missing_fold_table_is_empty() {
    let dir = TempDir::new().unwrap();
    let n = NameNormalizer::load_fold_table(&dir.path().join("nope.json")).unwrap();
    assert_eq!(n.fold_len(), 0);
}

#[test]
fn malformed_fold_table_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("script_fold.json");
    std::fs::write(&path, "[1, 2").unwrap();
    assert!(NameNormalizer::load_fold_table(&path).is_err());
}

// ── Query normalization ──────────────────────────────────────────

#[test]
fn query_collapses_whitespace_and_keeps_case() {
    assert_eq!(normalize_query("  AbC12x   立绘 "), "AbC12x 立绘");
}

#[test]
fn query_applies_nfkc() {
    assert_eq!(normalize_query("ｕｉｄ１０１"), "uid101");
}
