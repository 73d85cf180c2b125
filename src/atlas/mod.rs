//! Embedded brain-atlas lookup tables.
//!
//! Ships a small set of region-label tables (CSV) plus their metadata so
//! `neurohub atlas` works without network access. Copy operations write
//! the embedded bytes out verbatim.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context as _, bail};
use include_dir::{Dir, include_dir};
use serde::{Deserialize, Serialize};

use crate::logging;

static ATLAS_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/data/atlases");

/// Metadata for one embedded atlas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub regions: u32,
    pub space: String,
    pub file: String,
    pub reference: String,
}

static ATLASES: LazyLock<Vec<AtlasInfo>> = LazyLock::new(|| {
    let Some(content) = ATLAS_DIR
        .get_file("metadata.json")
        .and_then(|f| f.contents_utf8())
    else {
        logging::warn("embedded atlas metadata missing");
        return Vec::new();
    };
    match serde_json::from_str(content) {
        Ok(atlases) => atlases,
        Err(e) => {
            logging::warn(&format!("embedded atlas metadata unreadable: {e}"));
            Vec::new()
        }
    }
});

/// All embedded atlases, in metadata order.
pub fn list() -> &'static [AtlasInfo] {
    &ATLASES
}

/// Look up an atlas by id, case-insensitively.
pub fn info(id: &str) -> Option<&'static AtlasInfo> {
    ATLASES.iter().find(|a| a.id.eq_ignore_ascii_case(id))
}

/// Raw CSV content of an atlas lookup table.
pub fn table(atlas: &AtlasInfo) -> Option<&'static str> {
    ATLAS_DIR.get_file(&atlas.file)?.contents_utf8()
}

/// Copy one atlas table into `dest_dir`, returning the written path.
///
/// # Errors
///
/// Returns an error for an unknown atlas id, a missing embedded table,
/// or a filesystem failure.
pub fn copy(id: &str, dest_dir: &Path) -> anyhow::Result<PathBuf> {
    let Some(atlas) = info(id) else {
        bail!("unknown atlas '{id}' (see `neurohub atlas list`)");
    };
    let Some(content) = table(atlas) else {
        bail!("embedded table for atlas '{id}' is missing");
    };
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("create directory {}", dest_dir.display()))?;
    let dest = dest_dir.join(&atlas.file);
    std::fs::write(&dest, content).with_context(|| format!("write {}", dest.display()))?;
    Ok(dest)
}

/// Copy every embedded atlas table into `dest_dir`.
///
/// # Errors
///
/// Fails on the first atlas that cannot be written.
pub fn copy_all(dest_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(ATLASES.len());
    for atlas in ATLASES.iter() {
        written.push(copy(&atlas.id, dest_dir)?);
    }
    Ok(written)
}

/// Citation lines for every embedded atlas, deduplicated.
pub fn attribution() -> Vec<String> {
    let mut refs: Vec<String> = ATLASES
        .iter()
        .map(|a| format!("{}: {}", a.name, a.reference))
        .collect();
    refs.sort();
    refs.dedup();
    refs
}

#[cfg(test)]
mod tests;
