//! Compiled cache snapshots.
//!
//! A compiled cache is the whole in-memory package cache written to a single
//! JSON file so a later process can warm its repository without locating and
//! decoding every package file again. Writes go through a temporary file in
//! the destination directory and are persisted atomically.

use crate::repository::{IconEntry, PackageMetadata};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// File name used when the configured compiled location is a directory.
pub const COMPILED_FILE_NAME: &str = "iconify.json";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledCache {
    #[serde(default)]
    pub packages: BTreeMap<String, CompiledPackage>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompiledPackage {
    pub meta: PackageMetadata,
    #[serde(default)]
    pub icons: BTreeMap<String, IconEntry>,
}

impl CompiledCache {
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            fs::read(path).with_context(|| format!("reading compiled cache {}", path.display()))?;
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing compiled cache {}", path.display()))
    }

    /// Load the snapshot when the file exists; `Ok(None)` otherwise.
    pub fn load_if_present(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        let temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("allocating temp file in {}", dir.display()))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, self)
                .with_context(|| format!("serializing compiled cache {}", path.display()))?;
            writer
                .flush()
                .with_context(|| format!("flushing compiled cache {}", path.display()))?;
        }
        temp.persist(path)
            .with_context(|| format!("persisting compiled cache {}", path.display()))?;
        Ok(())
    }

    /// Delete the compiled file. Returns whether anything was removed.
    pub fn clear(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn icon_count(&self) -> usize {
        self.packages.values().map(|pkg| pkg.icons.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> CompiledCache {
        let mut icons = BTreeMap::new();
        icons.insert(
            "home".to_string(),
            IconEntry {
                body: "<path/>".to_string(),
                ..IconEntry::default()
            },
        );
        let mut cache = CompiledCache::default();
        cache.packages.insert(
            "si".to_string(),
            CompiledPackage {
                meta: PackageMetadata {
                    package: "si".to_string(),
                    prefix: "si".to_string(),
                    info: Default::default(),
                    width: Some(24),
                    height: Some(24),
                    last_modified: None,
                    suffixes: Vec::new(),
                },
                icons,
            },
        );
        cache
    }

    #[test]
    fn write_then_load_preserves_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(COMPILED_FILE_NAME);
        let cache = sample();
        cache.write(&path).unwrap();

        let loaded = CompiledCache::load(&path).unwrap();
        assert_eq!(loaded, cache);
        assert_eq!(loaded.icon_count(), 1);
    }

    #[test]
    fn clear_reports_whether_file_existed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(COMPILED_FILE_NAME);
        assert!(!CompiledCache::clear(&path).unwrap());
        sample().write(&path).unwrap();
        assert!(CompiledCache::clear(&path).unwrap());
        assert!(CompiledCache::load_if_present(&path).unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_reported_with_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(COMPILED_FILE_NAME);
        fs::write(&path, "{").unwrap();
        let err = CompiledCache::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing compiled cache"));
    }
}
