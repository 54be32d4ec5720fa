//! Batch resolution and strategy selection.
//!
//! Small batches look every icon up on its own; large batches, or batches that
//! fan out over many packages, load each package once and pick the requested
//! icons out of it. Both strategies yield the same records, so the choice is
//! purely about cost.
//!
//! Identifier-level problems never fail a batch: invalid identifiers are
//! dropped at parse time and unknown icon names yield nothing. A package that
//! cannot be loaded is skipped (with a warning) and the remaining packages are
//! still resolved.

use crate::config::StrategyConfig;
use crate::finder::PackageLocator;
use crate::identifier::IconIdentifier;
use crate::repository::{IconRecord, IconRepository};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// One `load_icon` per identifier.
    Single,
    /// One `load_package` per package, filtered to the requested names.
    Bulk,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Single => "single",
            Strategy::Bulk => "bulk",
        }
    }
}

/// Shape of a parsed batch and the strategy it calls for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchAnalysis {
    pub strategy: Strategy,
    pub icon_count: usize,
    pub package_count: usize,
    /// Valid identifiers in request order.
    pub identifiers: Vec<IconIdentifier>,
    /// Requested icon names grouped by package, request order within a group.
    pub groups: BTreeMap<String, Vec<String>>,
    /// Inputs dropped at parse time.
    pub rejected: usize,
}

impl StrategyConfig {
    /// Single lookups only while both counts stay within their thresholds.
    pub fn select(&self, icon_count: usize, package_count: usize) -> Strategy {
        if icon_count <= self.icon_threshold && package_count <= self.package_threshold {
            Strategy::Single
        } else {
            Strategy::Bulk
        }
    }
}

pub fn inspect<I, S>(names: I, thresholds: &StrategyConfig) -> BatchAnalysis
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut identifiers = Vec::new();
    let mut rejected = 0;
    for name in names {
        match IconIdentifier::parse(name.as_ref()) {
            Some(id) => identifiers.push(id),
            None => rejected += 1,
        }
    }

    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in &identifiers {
        groups
            .entry(id.package().to_string())
            .or_default()
            .push(id.icon().to_string());
    }

    let icon_count = identifiers.len();
    let package_count = groups.len();
    BatchAnalysis {
        strategy: thresholds.select(icon_count, package_count),
        icon_count,
        package_count,
        identifiers,
        groups,
        rejected,
    }
}

pub struct Resolver<'a, L> {
    repository: &'a IconRepository<L>,
    thresholds: StrategyConfig,
}

impl<'a, L: PackageLocator> Resolver<'a, L> {
    pub fn new(repository: &'a IconRepository<L>, thresholds: StrategyConfig) -> Self {
        Self {
            repository,
            thresholds,
        }
    }

    pub fn inspect<I, S>(&self, names: I) -> BatchAnalysis
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        inspect(names, &self.thresholds)
    }

    /// Resolve a batch with the strategy its shape calls for.
    pub fn resolve_many<I, S>(&self, names: I) -> Vec<Arc<IconRecord>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let analysis = self.inspect(names);
        self.resolve_analysis(&analysis, analysis.strategy)
    }

    /// Resolve a batch with a caller-chosen strategy.
    pub fn resolve_many_with<I, S>(&self, names: I, strategy: Strategy) -> Vec<Arc<IconRecord>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let analysis = self.inspect(names);
        self.resolve_analysis(&analysis, strategy)
    }

    pub fn resolve_analysis(
        &self,
        analysis: &BatchAnalysis,
        strategy: Strategy,
    ) -> Vec<Arc<IconRecord>> {
        debug!(
            strategy = strategy.as_str(),
            icons = analysis.icon_count,
            packages = analysis.package_count,
            rejected = analysis.rejected,
            "resolving icon batch"
        );
        match strategy {
            Strategy::Single => self.resolve_single(&analysis.identifiers),
            Strategy::Bulk => self.resolve_bulk(&analysis.groups),
        }
    }

    fn resolve_single(&self, identifiers: &[IconIdentifier]) -> Vec<Arc<IconRecord>> {
        identifiers
            .iter()
            .filter_map(|id| match self.repository.load_icon(id.package(), id.icon()) {
                Ok(record) => record,
                Err(err) => {
                    warn!(identifier = %id, error = %err, "skipping unresolvable icon");
                    None
                }
            })
            .collect()
    }

    fn resolve_bulk(&self, groups: &BTreeMap<String, Vec<String>>) -> Vec<Arc<IconRecord>> {
        let mut records = Vec::new();
        for (package, icons) in groups {
            match self.repository.load_package(package) {
                Ok(set) => records.extend(set.only(icons.iter().map(String::as_str))),
                Err(err) => {
                    warn!(package = %package, error = %err, "skipping unresolvable package");
                }
            }
        }
        records
    }
}

/// Partition records by package, keyed by icon name within each package.
pub fn group_by_package(
    records: impl IntoIterator<Item = Arc<IconRecord>>,
) -> BTreeMap<String, BTreeMap<String, Arc<IconRecord>>> {
    let mut grouped: BTreeMap<String, BTreeMap<String, Arc<IconRecord>>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.package.clone())
            .or_default()
            .insert(record.icon.clone(), record);
    }
    grouped
}
