//! Package and icon caches.
//!
//! [`IconRepository`] loads a package file through a [`PackageLocator`],
//! derives its [`PackageMetadata`] and lazy [`IconSet`], and keeps both until
//! they are flushed. Metadata and icons live in one [`LoadedPackage`], so they
//! are always cached and evicted together.
//!
//! First-time population is single-flight per package: concurrent callers for
//! the same package wait on that package's slot while the first one reads the
//! file, and callers for other packages are not blocked.

pub mod icons;
pub mod model;

pub use icons::{IconSet, Icons};
pub use model::{IconEntry, IconRecord, PackageMetadata};

use crate::compiled::{CompiledCache, CompiledPackage};
use crate::error::{IconifyError, Result};
use crate::finder::{IconFinder, PackageLocator};
use model::RawPackage;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::sync::Arc;
use tracing::{debug, trace};

/// Metadata and icons of one package, loaded together.
#[derive(Debug)]
pub struct LoadedPackage {
    meta: Arc<PackageMetadata>,
    icons: IconSet,
}

impl LoadedPackage {
    fn from_raw(package: &str, raw: RawPackage) -> Self {
        let meta = Arc::new(raw.metadata(package));
        let icons = IconSet::new(meta.clone(), raw.icons);
        Self { meta, icons }
    }

    fn from_compiled(package: &str, compiled: CompiledPackage) -> Self {
        let mut meta = compiled.meta;
        meta.package = package.to_string();
        let meta = Arc::new(meta);
        let icons = IconSet::new(meta.clone(), compiled.icons);
        Self { meta, icons }
    }

    pub fn metadata(&self) -> &Arc<PackageMetadata> {
        &self.meta
    }

    pub fn icons(&self) -> &IconSet {
        &self.icons
    }
}

type PackageSlot = Mutex<Option<Arc<LoadedPackage>>>;

pub struct IconRepository<L = IconFinder> {
    locator: L,
    packages: Mutex<HashMap<String, Arc<PackageSlot>>>,
}

impl<L: PackageLocator> IconRepository<L> {
    pub fn new(locator: L) -> Self {
        Self {
            locator,
            packages: Mutex::new(HashMap::new()),
        }
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    /// Make sure `package` is cached. No-op when it already is.
    pub fn load(&self, package: &str) -> Result<()> {
        self.ensure_loaded(package).map(|_| ())
    }

    pub fn load_meta(&self, package: &str) -> Result<Arc<PackageMetadata>> {
        Ok(self.ensure_loaded(package)?.meta.clone())
    }

    /// Look up one icon. An unknown icon name is `Ok(None)`; only
    /// package-level failures are errors.
    pub fn load_icon(&self, package: &str, icon: &str) -> Result<Option<Arc<IconRecord>>> {
        Ok(self.ensure_loaded(package)?.icons.get(icon))
    }

    pub fn load_package(&self, package: &str) -> Result<IconSet> {
        Ok(self.ensure_loaded(package)?.icons.clone())
    }

    /// Evict one package, or everything when `package` is `None`.
    pub fn flush(&self, package: Option<&str>) {
        let mut packages = self.packages.lock();
        match package {
            Some(package) => {
                debug!(package, "flushing package cache");
                packages.remove(package);
            }
            None => {
                debug!("flushing all package caches");
                packages.clear();
            }
        }
    }

    pub fn is_loaded(&self, package: &str) -> bool {
        let Some(slot) = self.packages.lock().get(package).cloned() else {
            return false;
        };
        let loaded = slot.lock().is_some();
        loaded
    }

    pub fn loaded_packages(&self) -> BTreeSet<String> {
        let slots: Vec<(String, Arc<PackageSlot>)> = self
            .packages
            .lock()
            .iter()
            .map(|(name, slot)| (name.clone(), slot.clone()))
            .collect();
        slots
            .into_iter()
            .filter(|(_, slot)| slot.lock().is_some())
            .map(|(name, _)| name)
            .collect()
    }

    /// Seed the cache from a compiled snapshot. Packages already loaded are
    /// replaced.
    pub fn warm(&self, compiled: CompiledCache) {
        let mut packages = self.packages.lock();
        for (name, package) in compiled.packages {
            let loaded = LoadedPackage::from_compiled(&name, package);
            packages.insert(name, Arc::new(Mutex::new(Some(Arc::new(loaded)))));
        }
        debug!(packages = packages.len(), "warmed package cache from compiled snapshot");
    }

    /// Snapshot every loaded package for persisting.
    pub fn snapshot(&self) -> CompiledCache {
        let slots: Vec<(String, Arc<PackageSlot>)> = self
            .packages
            .lock()
            .iter()
            .map(|(name, slot)| (name.clone(), slot.clone()))
            .collect();
        let mut compiled = CompiledCache::default();
        for (name, slot) in slots {
            let Some(loaded) = slot.lock().clone() else {
                continue;
            };
            compiled.packages.insert(
                name,
                CompiledPackage {
                    meta: (*loaded.meta).clone(),
                    icons: loaded
                        .icons
                        .entries()
                        .map(|(icon, entry)| (icon.to_string(), entry.clone()))
                        .collect(),
                },
            );
        }
        compiled
    }

    fn slot(&self, package: &str) -> Arc<PackageSlot> {
        self.packages
            .lock()
            .entry(package.to_string())
            .or_default()
            .clone()
    }

    fn ensure_loaded(&self, package: &str) -> Result<Arc<LoadedPackage>> {
        let slot = self.slot(package);
        let mut guard = slot.lock();
        if let Some(loaded) = guard.as_ref() {
            trace!(package, "package cache hit");
            return Ok(loaded.clone());
        }

        match self.read_package(package) {
            Ok(loaded) => {
                let loaded = Arc::new(loaded);
                *guard = Some(loaded.clone());
                Ok(loaded)
            }
            Err(err) => {
                drop(guard);
                self.discard_empty_slot(package, &slot);
                Err(err)
            }
        }
    }

    fn read_package(&self, package: &str) -> Result<LoadedPackage> {
        let path = self.locator.find(package)?;
        let bytes = fs::read(&path).map_err(|source| IconifyError::Io {
            path: path.clone(),
            source,
        })?;
        let raw = RawPackage::decode(package, &path, &bytes)?;
        let loaded = LoadedPackage::from_raw(package, raw);
        debug!(
            package,
            path = %path.display(),
            icons = loaded.icons.len(),
            "loaded icon package"
        );
        Ok(loaded)
    }

    // Failed loads must not leave placeholder slots behind for every bogus name.
    // The slot is checked before the map is locked, and a slot another caller
    // is already filling is left alone.
    fn discard_empty_slot(&self, package: &str, slot: &Arc<PackageSlot>) {
        let Some(state) = slot.try_lock() else {
            return;
        };
        if state.is_some() {
            return;
        }
        let mut packages = self.packages.lock();
        if packages
            .get(package)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            packages.remove(package);
        }
    }
}

impl<L: PackageLocator + Default> Default for IconRepository<L> {
    fn default() -> Self {
        Self::new(L::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_package(dir: &TempDir, name: &str, value: serde_json::Value) {
        fs::write(
            dir.path().join(format!("{name}.json")),
            serde_json::to_vec(&value).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn failed_load_leaves_no_slot() {
        let dir = TempDir::new().unwrap();
        let repo = IconRepository::new(IconFinder::new([dir.path()]));
        assert!(repo.load("missing").unwrap_err().is_not_found());
        assert!(repo.packages.lock().is_empty());
    }

    #[test]
    fn discarding_a_busy_slot_does_not_block_other_packages() {
        let dir = TempDir::new().unwrap();
        write_package(&dir, "si", json!({"icons": {"home": {"body": "<path/>"}}}));
        let repo = IconRepository::new(IconFinder::new([dir.path()]));

        let busy = repo.slot("pending");
        let guard = busy.lock();
        repo.discard_empty_slot("pending", &busy);
        assert!(repo.load_icon("si", "home").unwrap().is_some());
        drop(guard);
        assert!(repo.packages.lock().contains_key("pending"));

        repo.discard_empty_slot("pending", &busy);
        assert!(!repo.packages.lock().contains_key("pending"));
    }

    #[test]
    fn snapshot_round_trips_through_warm() {
        let dir = TempDir::new().unwrap();
        write_package(
            &dir,
            "si",
            json!({"width": 24, "height": 24, "icons": {"home": {"body": "<path/>"}, "wide": {"body": "<rect/>", "width": 48}}}),
        );
        let repo = IconRepository::new(IconFinder::new([dir.path()]));
        repo.load("si").unwrap();
        let snapshot = repo.snapshot();
        assert_eq!(snapshot.packages.len(), 1);

        let cold = IconRepository::new(IconFinder::default());
        cold.warm(snapshot);
        assert!(cold.is_loaded("si"));
        let wide = cold.load_icon("si", "wide").unwrap().unwrap();
        assert_eq!((wide.width, wide.height), (Some(48), Some(24)));
        assert_eq!(cold.load_meta("si").unwrap().width, Some(24));
    }
}
