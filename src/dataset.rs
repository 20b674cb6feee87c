//! Plain JSON files exchanged by the batch commands: repository lists,
//! feature and label caches, and column-oriented metric samples.

use crate::error::Result;
use crate::types::report::{FeatureRecord, LabelRecord};
use crate::types::series::Metric;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Like [`read_json`] but a missing file yields `T::default()`.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    read_json(path)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}

/// `["owner/name", ...]`
pub fn read_repo_list(path: &Path) -> Result<Vec<String>> {
    read_json(path)
}

/// `[{"repo": ..., "features": {...}}, ...]`
pub fn read_features(path: &Path) -> Result<Vec<FeatureRecord>> {
    read_json(path)
}

/// `[{"repo": ..., "t": "YYYY-MM", "openrank_t": ..., ...}, ...]`; an absent
/// cache is empty.
pub fn read_labels(path: &Path) -> Result<Vec<LabelRecord>> {
    read_json_or_default(path)
}

/// `{"activity": [6.01, 0.72, ...], "openrank": [...]}`, one value per sample.
pub fn read_samples(path: &Path) -> Result<BTreeMap<Metric, Vec<f64>>> {
    read_json(path)
}
