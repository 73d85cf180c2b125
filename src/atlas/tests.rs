#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

#[test]
fn every_listed_atlas_has_an_embedded_table() {
    assert!(!list().is_empty());
    for atlas in list() {
        let content = table(atlas).unwrap_or_else(|| panic!("missing table {}", atlas.file));
        // Header plus at least one data row.
        assert!(content.lines().count() > 1, "{} too short", atlas.id);
        assert!(content.lines().next().unwrap().contains("label"));
    }
}

#[test]
fn info_is_case_insensitive() {
    assert_eq!(info("AAL3").unwrap().id, "aal3");
    assert!(info("nonexistent").is_none());
}

#[test]
fn copy_writes_the_table_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let dest = copy("schaefer2018_100", dir.path()).unwrap();

    assert_eq!(dest.file_name().unwrap(), "schaefer2018_100.csv");
    let written = std::fs::read_to_string(&dest).unwrap();
    let embedded = table(info("schaefer2018_100").unwrap()).unwrap();
    assert_eq!(written, embedded);
}

#[test]
fn copy_unknown_atlas_errors() {
    let dir = tempfile::tempdir().unwrap();
    let err = copy("no-such-atlas", dir.path()).unwrap_err();
    assert!(err.to_string().contains("unknown atlas"));
}

#[test]
fn copy_all_writes_one_file_per_atlas() {
    let dir = tempfile::tempdir().unwrap();
    let written = copy_all(dir.path()).unwrap();
    assert_eq!(written.len(), list().len());
    for path in &written {
        assert!(path.exists());
    }
}

#[test]
fn attribution_covers_all_atlases() {
    let refs = attribution();
    assert!(!refs.is_empty());
    for atlas in list() {
        assert!(
            refs.iter().any(|r| r.starts_with(&atlas.name)),
            "no citation for {}",
            atlas.id
        );
    }
}
