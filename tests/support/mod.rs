#![allow(dead_code)]

use anyhow::{Context, Result};
use iconsprite::{IconFinder, PackageLocator};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

// Scratch directory holding icon-set files, removed when dropped.
pub struct IconSets {
    dir: TempDir,
}

impl IconSets {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().context("failed to create icon-set dir")?,
        })
    }

    // Directory with the usual fixture packages `si` and `a`.
    pub fn standard() -> Result<Self> {
        let sets = Self::new()?;
        sets.write("si", si_package())?;
        sets.write("a", a_package())?;
        Ok(sets)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    // Final component of the fixture directory, for building relative paths
    // between sibling fixtures.
    pub fn dir_name(&self) -> String {
        self.dir
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn write(&self, name: &str, value: Value) -> Result<PathBuf> {
        self.write_raw(&format!("{name}.json"), &serde_json::to_vec_pretty(&value)?)
    }

    pub fn write_raw(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(file_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)
            .with_context(|| format!("failed to write fixture {}", path.display()))?;
        Ok(path)
    }

    pub fn finder(&self) -> IconFinder {
        IconFinder::new([self.path()])
    }
}

pub fn si_package() -> Value {
    json!({
        "prefix": "si",
        "width": 24,
        "height": 24,
        "icons": {
            "home": {"body": "<path/>"},
            "github": {"body": "<path d=\"M0 0h24v24H0z\"/>"},
            "wide": {"body": "<rect/>", "width": 48}
        }
    })
}

pub fn a_package() -> Value {
    json!({
        "prefix": "a",
        "width": 16,
        "height": 16,
        "icons": {
            "heart": {"body": "<circle r=\"4\"/>"},
            "star": {"body": "<polygon/>"}
        }
    })
}

// Package with `count` generated icons named icon0..icon{count-1}.
pub fn numbered_package(prefix: &str, count: usize) -> Value {
    let icons: serde_json::Map<String, Value> = (0..count)
        .map(|i| (format!("icon{i}"), json!({"body": format!("<path id=\"{prefix}{i}\"/>")})))
        .collect();
    json!({"prefix": prefix, "width": 24, "height": 24, "icons": icons})
}

// Locator that counts how often the repository asks for a path.
pub struct CountingLocator {
    inner: IconFinder,
    finds: AtomicUsize,
}

impl CountingLocator {
    pub fn new(inner: IconFinder) -> Self {
        Self {
            inner,
            finds: AtomicUsize::new(0),
        }
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
}

impl PackageLocator for CountingLocator {
    fn find(&self, name: &str) -> iconsprite::Result<PathBuf> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find(name)
    }

    fn flush(&self) {
        self.inner.flush();
    }
}
