//! Package file discovery.
//!
//! Maps a package name to the icon-set file on disk. Global search
//! directories are tried in declaration order; a name of the form
//! `namespace::package` is searched only in that namespace's hint
//! directories. Within one directory list each directory is tried with every
//! recognized extension in preference order and the first existing file wins.
//! Resolved paths are memoized until [`PackageLocator::flush`].

use crate::error::{IconifyError, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// Separates a hint namespace from the package name.
pub const HINT_DELIMITER: &str = "::";

/// Extension tried when none are configured.
pub const DEFAULT_EXTENSION: &str = "json";

/// Resolves package names to source files.
///
/// The repository only depends on this seam, so alternative discovery
/// schemes (or instrumented ones in tests) can stand in for [`IconFinder`].
pub trait PackageLocator: Send + Sync {
    fn find(&self, name: &str) -> Result<PathBuf>;

    /// Forget every memoized path.
    fn flush(&self);
}

#[derive(Debug)]
pub struct IconFinder {
    paths: Vec<PathBuf>,
    hints: BTreeMap<String, Vec<PathBuf>>,
    extensions: Vec<String>,
    resolved: RwLock<HashMap<String, PathBuf>>,
}

impl Default for IconFinder {
    fn default() -> Self {
        Self::new(Vec::<PathBuf>::new())
    }
}

impl IconFinder {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            paths: paths.into_iter().map(|p| resolve_dir(p.as_ref())).collect(),
            hints: BTreeMap::new(),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the recognized extensions, first entry preferred.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(Into::into)
            .map(|ext| ext.trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        if !extensions.is_empty() {
            self.extensions = extensions;
        }
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn hints(&self) -> &BTreeMap<String, Vec<PathBuf>> {
        &self.hints
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Append a global search directory.
    pub fn add_location(&mut self, location: impl AsRef<Path>) {
        self.paths.push(resolve_dir(location.as_ref()));
    }

    /// Insert a global search directory ahead of the existing ones.
    pub fn prepend_location(&mut self, location: impl AsRef<Path>) {
        self.paths.insert(0, resolve_dir(location.as_ref()));
    }

    /// Append hint directories to a namespace, creating it if needed.
    pub fn add_namespace<I, P>(&mut self, namespace: &str, hints: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let entry = self.hints.entry(namespace.to_string()).or_default();
        entry.extend(hints.into_iter().map(|p| resolve_dir(p.as_ref())));
    }

    /// Insert hint directories ahead of a namespace's existing ones.
    pub fn prepend_namespace<I, P>(&mut self, namespace: &str, hints: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let entry = self.hints.entry(namespace.to_string()).or_default();
        let mut merged: Vec<PathBuf> = hints.into_iter().map(|p| resolve_dir(p.as_ref())).collect();
        merged.append(entry);
        *entry = merged;
    }

    pub fn replace_namespace<I, P>(&mut self, namespace: &str, hints: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.hints.insert(
            namespace.to_string(),
            hints.into_iter().map(|p| resolve_dir(p.as_ref())).collect(),
        );
    }

    /// Register an extension; it takes precedence over the existing ones.
    pub fn add_extension(&mut self, extension: &str) {
        let extension = extension.trim_start_matches('.').to_string();
        if extension.is_empty() {
            return;
        }
        self.extensions.retain(|existing| *existing != extension);
        self.extensions.insert(0, extension);
    }

    pub fn has_hint_information(name: &str) -> bool {
        name.contains(HINT_DELIMITER)
    }

    /// Names of every package file reachable from the global paths.
    ///
    /// A name shadowed by an earlier directory or a preferred extension is
    /// listed once.
    pub fn packages(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for dir in &self.paths {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(IconifyError::Io {
                        path: dir.clone(),
                        source,
                    });
                }
            };
            for entry in entries {
                let entry = entry.map_err(|source| IconifyError::Io {
                    path: dir.clone(),
                    source,
                })?;
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let Some(stem) = package_name_for(&path, &self.extensions) else {
                    continue;
                };
                names.insert(stem);
            }
        }
        Ok(names)
    }

    fn find_in_namespace(&self, name: &str) -> Result<PathBuf> {
        let Some((namespace, package)) = name.split_once(HINT_DELIMITER) else {
            return Err(IconifyError::invalid_identifier(
                name,
                format!("expected namespace{HINT_DELIMITER}package"),
            ));
        };
        if namespace.is_empty() || package.is_empty() {
            return Err(IconifyError::invalid_identifier(
                name,
                format!("expected namespace{HINT_DELIMITER}package"),
            ));
        }
        let Some(dirs) = self.hints.get(namespace) else {
            return Err(IconifyError::NoHintPaths {
                namespace: namespace.to_string(),
            });
        };
        self.find_in_paths(package, dirs)
    }

    fn find_in_paths(&self, name: &str, dirs: &[PathBuf]) -> Result<PathBuf> {
        if !is_relative_name(name) {
            debug!(package = name, "rejecting package name outside the search directories");
            return Err(IconifyError::not_found(name));
        }
        for dir in dirs {
            for ext in &self.extensions {
                let candidate = dir.join(format!("{name}.{ext}"));
                if exceeds_path_max(&candidate) {
                    trace!(path = %candidate.display(), "skipping over-long candidate");
                    continue;
                }
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
        Err(IconifyError::not_found(name))
    }
}

impl PackageLocator for IconFinder {
    fn find(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        if let Some(path) = self.resolved.read().get(name) {
            trace!(package = name, "package path cache hit");
            return Ok(path.clone());
        }

        let path = if Self::has_hint_information(name) {
            self.find_in_namespace(name)?
        } else {
            self.find_in_paths(name, &self.paths)?
        };
        debug!(package = name, path = %path.display(), "resolved package file");
        self.resolved.write().insert(name.to_string(), path.clone());
        Ok(path)
    }

    fn flush(&self) {
        self.resolved.write().clear();
    }
}

fn resolve_dir(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// Package names must stay below the directory they are joined onto.
fn is_relative_name(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && !path.is_absolute()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

fn package_name_for(path: &Path, extensions: &[String]) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if !extensions.iter().any(|known| known == ext) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}

#[cfg(unix)]
fn max_path_len() -> usize {
    libc::PATH_MAX as usize
}

#[cfg(not(unix))]
fn max_path_len() -> usize {
    260
}

fn exceeds_path_max(path: &Path) -> bool {
    path.as_os_str().len() >= max_path_len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, file: &str) -> PathBuf {
        let path = dir.join(file);
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn first_directory_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        touch(second.path(), "mdi.json");
        let expected = touch(first.path(), "mdi.json");

        let finder = IconFinder::new([first.path(), second.path()]);
        let found = finder.find("mdi").unwrap();
        assert_eq!(found, fs::canonicalize(&expected).unwrap());
    }

    #[test]
    fn extension_order_breaks_ties_within_a_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "mdi.json");
        touch(dir.path(), "mdi.icons");

        let finder = IconFinder::new([dir.path()]).with_extensions(["icons", "json"]);
        let found = finder.find("mdi").unwrap();
        assert_eq!(found.extension().and_then(|e| e.to_str()), Some("icons"));
    }

    #[test]
    fn add_extension_takes_precedence() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "mdi.json");
        touch(dir.path(), "mdi.svgset");

        let mut finder = IconFinder::new([dir.path()]);
        finder.add_extension(".svgset");
        assert_eq!(finder.extensions(), ["svgset", "json"]);
        let found = finder.find("mdi").unwrap();
        assert_eq!(found.extension().and_then(|e| e.to_str()), Some("svgset"));
    }

    #[test]
    fn missing_package_is_not_found() {
        let dir = TempDir::new().unwrap();
        let finder = IconFinder::new([dir.path()]);
        let err = finder.find("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn memoizes_until_flush() {
        let dir = TempDir::new().unwrap();
        let path = touch(dir.path(), "mdi.json");
        let finder = IconFinder::new([dir.path()]);
        finder.find("mdi").unwrap();

        fs::remove_file(&path).unwrap();
        assert!(finder.find("mdi").is_ok(), "memoized path should be served");

        finder.flush();
        assert!(finder.find("mdi").unwrap_err().is_not_found());
    }

    #[test]
    fn namespaced_lookup_uses_hint_paths_only() {
        let global = TempDir::new().unwrap();
        let hinted = TempDir::new().unwrap();
        touch(global.path(), "si.json");
        let expected = touch(hinted.path(), "si.json");

        let mut finder = IconFinder::new([global.path()]);
        finder.add_namespace("brand", [hinted.path()]);
        let found = finder.find("brand::si").unwrap();
        assert_eq!(found, fs::canonicalize(&expected).unwrap());
    }

    #[test]
    fn namespaced_lookup_errors() {
        let finder = IconFinder::default();
        assert!(matches!(
            finder.find("brand::si").unwrap_err(),
            IconifyError::NoHintPaths { namespace } if namespace == "brand"
        ));
        assert!(matches!(
            finder.find("::si").unwrap_err(),
            IconifyError::InvalidIdentifier { .. }
        ));
        assert!(matches!(
            finder.find("brand::").unwrap_err(),
            IconifyError::InvalidIdentifier { .. }
        ));
    }

    #[test]
    fn over_long_candidates_are_never_matched() {
        let dir = TempDir::new().unwrap();
        let finder = IconFinder::new([dir.path()]);
        let name = "x".repeat(max_path_len() + 16);
        assert!(finder.find(&name).unwrap_err().is_not_found());
    }

    #[test]
    fn prepend_namespace_orders_new_hints_first() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        touch(a.path(), "si.json");
        let expected = touch(b.path(), "si.json");

        let mut finder = IconFinder::default();
        finder.add_namespace("brand", [a.path()]);
        finder.prepend_namespace("brand", [b.path()]);
        assert_eq!(
            finder.find("brand::si").unwrap(),
            fs::canonicalize(&expected).unwrap()
        );

        finder.flush();
        finder.replace_namespace("brand", [a.path()]);
        assert_eq!(finder.hints()["brand"].len(), 1);
    }

    #[test]
    fn names_cannot_escape_search_directories() {
        let outside = TempDir::new().unwrap();
        let sets = TempDir::new().unwrap();
        fs::create_dir(sets.path().join("inner")).unwrap();
        let evil = touch(outside.path(), "evil.json");
        touch(sets.path(), "sibling.json");

        let mut finder = IconFinder::new([sets.path().join("inner")]);
        finder.add_namespace("brand", [sets.path().join("inner")]);
        let absolute = evil.with_extension("");
        for name in [
            absolute.to_string_lossy().into_owned(),
            "../sibling".to_string(),
            "./../sibling".to_string(),
            "brand::../sibling".to_string(),
        ] {
            let err = finder.find(&name).unwrap_err();
            assert!(err.is_not_found(), "{name} resolved: {err:?}");
        }
    }

    #[test]
    fn packages_lists_each_name_once() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        touch(first.path(), "mdi.json");
        touch(second.path(), "mdi.json");
        touch(second.path(), "si.json");
        touch(second.path(), "notes.txt");

        let finder = IconFinder::new([first.path(), second.path()]);
        let names: Vec<_> = finder.packages().unwrap().into_iter().collect();
        assert_eq!(names, vec!["mdi".to_string(), "si".to_string()]);
    }
}
