//! Embedded dataset catalog.
//!
//! The catalog ships inside the binary so discovery works offline. A
//! malformed embedded file degrades to an empty catalog with a warning
//! rather than a panic.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use include_dir::{Dir, include_dir};
use serde::{Deserialize, Serialize};

use crate::logging;

static CATALOG_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/data/catalog");

/// External tool used to fetch a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMethod {
    AwsS3,
    Aria2c,
    Datalad,
}

impl fmt::Display for DownloadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwsS3 => "aws s3",
            Self::Aria2c => "aria2c",
            Self::Datalad => "datalad",
        };
        f.write_str(name)
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub auth_required: bool,
    pub download_method: DownloadMethod,
    pub source: String,
    pub size: String,
}

static DATASETS: LazyLock<Vec<Dataset>> = LazyLock::new(|| {
    let Some(content) = CATALOG_DIR
        .get_file("datasets.json")
        .and_then(|f| f.contents_utf8())
    else {
        logging::warn("embedded dataset catalog missing");
        return Vec::new();
    };
    match serde_json::from_str(content) {
        Ok(datasets) => datasets,
        Err(e) => {
            logging::warn(&format!("embedded dataset catalog unreadable: {e}"));
            Vec::new()
        }
    }
});

/// All datasets, in catalog order.
pub fn all() -> &'static [Dataset] {
    &DATASETS
}

/// Look up a dataset by id, case-insensitively.
pub fn get(id: &str) -> Option<&'static Dataset> {
    DATASETS.iter().find(|d| d.id.eq_ignore_ascii_case(id))
}

/// Case-insensitive substring search over id, name, description and
/// category.
pub fn search(query: &str) -> Vec<&'static Dataset> {
    let needle = query.to_lowercase();
    DATASETS
        .iter()
        .filter(|d| {
            d.id.to_lowercase().contains(&needle)
                || d.name.to_lowercase().contains(&needle)
                || d.description.to_lowercase().contains(&needle)
                || d.category.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Dataset count per category, sorted by category name.
pub fn categories() -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for dataset in DATASETS.iter() {
        *counts.entry(dataset.category.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Aggregate catalog numbers for `neurohub stats`.
#[derive(Debug, Serialize)]
pub struct CatalogStats {
    pub total: usize,
    pub auth_required: usize,
    pub open_access: usize,
    pub by_method: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
}

pub fn stats() -> CatalogStats {
    let mut by_method = BTreeMap::new();
    let mut by_category = BTreeMap::new();
    let mut auth_required = 0;
    for dataset in DATASETS.iter() {
        *by_method
            .entry(dataset.download_method.to_string())
            .or_insert(0) += 1;
        *by_category.entry(dataset.category.clone()).or_insert(0) += 1;
        if dataset.auth_required {
            auth_required += 1;
        }
    }
    CatalogStats {
        total: DATASETS.len(),
        auth_required,
        open_access: DATASETS.len() - auth_required,
        by_method,
        by_category,
    }
}
