use std::fs;
use std::path::Path;

use umls_install::constants::install::{LOWERCASE_FLAG, NORMALIZE_UNICODE_FLAG};
use umls_install::{
    ConceptMatch, CuiSemTypesReader, InstallConfig, InstallError, Measure, RrfSchema,
    SimstringReader, install,
};

fn compact_config(source: &Path, destination: &Path) -> InstallConfig {
    InstallConfig::new(source, destination)
        .with_mrconso_schema(RrfSchema::new(["cui", "lat", "str"]).unwrap())
        .with_mrsty_schema(RrfSchema::new(["cui", "sty"]).unwrap())
}

fn write_tables(root: &Path, mrconso: &str, mrsty: &str) {
    fs::create_dir_all(root).unwrap();
    fs::write(root.join("MRCONSO.RRF"), mrconso).unwrap();
    fs::write(root.join("MRSTY.RRF"), mrsty).unwrap();
}

#[test]
fn case_variants_produce_one_term_in_each_store() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("umls");
    let destination = temp.path().join("out");
    write_tables(
        &source,
        "C0001|ENG|Heart Attack\nC0001|ENG|heart attack\nC0002|SPA|Infarto\n",
        "C0001|T001\n",
    );

    let summary = install(&compact_config(&source, &destination).with_lowercase(true)).unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.extraction.records, 2);
    assert_eq!(summary.extraction.duplicates, 1);
    assert_eq!(summary.concepts, 1);

    let similarity = SimstringReader::open(&destination.join("umls-simstring.db")).unwrap();
    assert_eq!(similarity.len(), 1);
    assert_eq!(
        similarity
            .retrieve("heart attack", Measure::Cosine, 0.9)
            .unwrap(),
        vec!["heart attack"]
    );

    let concepts = CuiSemTypesReader::open(&destination.join("cui-semtypes.db")).unwrap();
    assert_eq!(
        concepts.get("heart attack").unwrap(),
        vec![ConceptMatch {
            cui: "C0001".into(),
            semantic_types: vec!["T001".into()],
        }]
    );
    assert!(concepts.get("Heart Attack").unwrap().is_empty());
    assert!(concepts.get("infarto").unwrap().is_empty());
}

#[test]
fn full_rrf_rows_under_meta_directory() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("2024AA");
    let meta = source.join("META");
    write_tables(
        &meta,
        concat!(
            "C0027051|ENG|P|L0027051|PF|S0064037|Y|A0088702||M0014340|D009203|MSH|MH|D009203|Myocardial Infarction|0|N|256|\n",
            "C0027051|FRE|P|L0162004|PF|S0226714|Y|A0271079||M0014340|D009203|MSHFRE|MH|D009203|Infarctus du myocarde|3|N||\n",
            "C0027051|ENG|S|L0018822|PF|S0047022|Y|A0066363||M0014340|D009203|MSH|EN|D009203|Heart Attack|0|N|256|\n",
        ),
        "C0027051|T047|B2.2.1.2.1|Disease or Syndrome|AT32683796|3840|\n",
    );
    let destination = temp.path().join("out");

    let summary = install(&InstallConfig::new(&source, &destination)).unwrap();
    assert_eq!(summary.inserted, 2);

    let concepts = CuiSemTypesReader::open(&destination.join("cui-semtypes.db")).unwrap();
    let hits = concepts.get("Myocardial Infarction").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].semantic_types, vec!["T047"]);
    assert!(concepts.get("Infarctus du myocarde").unwrap().is_empty());
}

#[test]
fn missing_semantic_types_abort_the_run() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("umls");
    let destination = temp.path().join("out");
    write_tables(
        &source,
        "C0001|ENG|Angina\nC9999|ENG|Orphan\nC0001|ENG|Angina pectoris\n",
        "C0001|T047\n",
    );

    let err = install(&compact_config(&source, &destination)).unwrap_err();
    match err {
        InstallError::MissingSemanticTypes { cui, line } => {
            assert_eq!(cui, "C9999");
            assert_eq!(line, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    // the unfinished similarity index has no metadata record
    assert!(SimstringReader::open(&destination.join("umls-simstring.db")).is_err());
    let concepts = CuiSemTypesReader::open(&destination.join("cui-semtypes.db")).unwrap();
    assert_eq!(concepts.get("Angina").unwrap().len(), 1);
    assert!(concepts.get("Angina pectoris").unwrap().is_empty());
}

#[test]
fn malformed_semantic_type_row_aborts_before_stores_fill() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("umls");
    let destination = temp.path().join("out");
    write_tables(&source, "C0001|ENG|Angina\n", "C0001|T047\nC0002\n");

    let err = install(&compact_config(&source, &destination)).unwrap_err();
    assert!(matches!(err, InstallError::SchemaViolation { line: 2, .. }));
    let concepts = CuiSemTypesReader::open(&destination.join("cui-semtypes.db")).unwrap();
    assert!(concepts.get("Angina").unwrap().is_empty());
}

#[test]
fn flag_files_track_normalization_policy() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("umls");
    let destination = temp.path().join("out");
    write_tables(&source, "C0001|ENG|Angina\n", "C0001|T047\n");

    install(&compact_config(&source, &destination).with_lowercase(true)).unwrap();
    assert!(destination.join(LOWERCASE_FLAG).is_file());
    assert_eq!(fs::metadata(destination.join(LOWERCASE_FLAG)).unwrap().len(), 0);
    assert!(!destination.join(NORMALIZE_UNICODE_FLAG).exists());

    install(&compact_config(&source, &destination)).unwrap();
    assert!(!destination.join(LOWERCASE_FLAG).exists());
    assert!(!destination.join(NORMALIZE_UNICODE_FLAG).exists());
}

#[cfg(feature = "unicode")]
#[test]
fn normalize_unicode_writes_flag_and_folds_terms() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("umls");
    let destination = temp.path().join("out");
    write_tables(
        &source,
        "C0001|ENG|Ménière’s disease\nC0001|ENG|Meniere's disease\n",
        "C0001|T047\n",
    );

    let config = compact_config(&source, &destination).with_normalize_unicode(true);
    let summary = install(&config).unwrap();
    assert_eq!(summary.inserted, 1);
    assert!(destination.join(NORMALIZE_UNICODE_FLAG).is_file());
    assert!(!destination.join(LOWERCASE_FLAG).exists());

    let concepts = CuiSemTypesReader::open(&destination.join("cui-semtypes.db")).unwrap();
    assert_eq!(concepts.get("Meniere's disease").unwrap().len(), 1);
}

#[cfg(not(feature = "unicode"))]
#[test]
fn normalize_unicode_without_support_fails_before_io() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("umls");
    let destination = temp.path().join("out");
    write_tables(&source, "C0001|ENG|Angina\n", "C0001|T047\n");

    let config = compact_config(&source, &destination).with_normalize_unicode(true);
    let err = install(&config).unwrap_err();
    assert!(matches!(err, InstallError::UnicodeNormalizationUnavailable));
    assert!(!destination.exists());
}

#[test]
fn rerun_replaces_previous_stores() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("umls");
    let destination = temp.path().join("out");
    write_tables(&source, "C0001|ENG|Angina\nC0002|ENG|Fever\n", "C0001|T047\nC0002|T184\n");
    install(&compact_config(&source, &destination)).unwrap();

    write_tables(&source, "C0002|ENG|Fever\n", "C0002|T184\n");
    install(&compact_config(&source, &destination)).unwrap();

    let similarity = SimstringReader::open(&destination.join("umls-simstring.db")).unwrap();
    assert_eq!(similarity.len(), 1);
    let concepts = CuiSemTypesReader::open(&destination.join("cui-semtypes.db")).unwrap();
    assert!(concepts.get("Angina").unwrap().is_empty());
    assert_eq!(concepts.get("Fever").unwrap().len(), 1);
}
