//! Lazily materialized icon sequence for one package.
//!
//! The package file is decoded once into sorted slots; each slot turns into an
//! [`IconRecord`] the first time something reads it and keeps that record for
//! every later reader. Iterators are independent cursors over the slots, so a
//! traversal can be restarted without touching the source file.

use super::model::{IconEntry, IconRecord, PackageMetadata};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

struct IconSlot {
    name: String,
    entry: IconEntry,
    record: OnceLock<Arc<IconRecord>>,
}

#[derive(Clone)]
pub struct IconSet {
    meta: Arc<PackageMetadata>,
    slots: Arc<[IconSlot]>,
}

impl IconSet {
    pub(crate) fn new(meta: Arc<PackageMetadata>, icons: BTreeMap<String, IconEntry>) -> Self {
        let slots: Vec<IconSlot> = icons
            .into_iter()
            .map(|(name, entry)| IconSlot {
                name,
                entry,
                record: OnceLock::new(),
            })
            .collect();
        Self {
            meta,
            slots: slots.into(),
        }
    }

    pub fn package(&self) -> &str {
        &self.meta.package
    }

    pub fn metadata(&self) -> &Arc<PackageMetadata> {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, icon: &str) -> bool {
        self.position(icon).is_some()
    }

    /// Icon names in sorted order, without materializing records.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.iter().map(|slot| slot.name.as_str())
    }

    pub fn get(&self, icon: &str) -> Option<Arc<IconRecord>> {
        self.position(icon).map(|idx| self.record_at(idx))
    }

    /// Records for the requested names, in request order. Unknown names are
    /// skipped; a name requested twice yields its record twice.
    pub fn only<'a, I>(&self, icons: I) -> Vec<Arc<IconRecord>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        icons.into_iter().filter_map(|icon| self.get(icon)).collect()
    }

    pub fn iter(&self) -> Icons<'_> {
        Icons { set: self, next: 0 }
    }

    /// Number of slots already turned into records.
    pub fn materialized(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.record.get().is_some())
            .count()
    }

    /// Raw entries, for persisting into a compiled cache.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (&str, &IconEntry)> + '_ {
        self.slots
            .iter()
            .map(|slot| (slot.name.as_str(), &slot.entry))
    }

    fn position(&self, icon: &str) -> Option<usize> {
        self.slots
            .binary_search_by(|slot| slot.name.as_str().cmp(icon))
            .ok()
    }

    fn record_at(&self, idx: usize) -> Arc<IconRecord> {
        let slot = &self.slots[idx];
        slot.record
            .get_or_init(|| Arc::new(slot.entry.to_record(&slot.name, &self.meta)))
            .clone()
    }
}

impl fmt::Debug for IconSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconSet")
            .field("package", &self.meta.package)
            .field("len", &self.slots.len())
            .field("materialized", &self.materialized())
            .finish()
    }
}

impl<'a> IntoIterator for &'a IconSet {
    type Item = (&'a str, Arc<IconRecord>);
    type IntoIter = Icons<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Cursor over an [`IconSet`], yielding `(name, record)` pairs.
pub struct Icons<'a> {
    set: &'a IconSet,
    next: usize,
}

impl<'a> Iterator for Icons<'a> {
    type Item = (&'a str, Arc<IconRecord>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next;
        let slot = self.set.slots.get(idx)?;
        self.next += 1;
        Some((slot.name.as_str(), self.set.record_at(idx)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.set.slots.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Icons<'_> {}
