//! Runtime configuration.
//!
//! Values come from [`IconifyConfig::default`], optionally a JSON file
//! ([`IconifyConfig::load`]), then `ICONIFY_*` environment overrides
//! ([`IconifyConfig::apply_env`]). Every field has a default so partial files
//! are fine.

use crate::compiled::COMPILED_FILE_NAME;
use crate::finder::{DEFAULT_EXTENSION, IconFinder};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_ICON_THRESHOLD: usize = 10;
pub const DEFAULT_PACKAGE_THRESHOLD: usize = 3;

const ENV_PATHS: &str = "ICONIFY_PATHS";
const ENV_ICON_THRESHOLD: &str = "ICONIFY_ICON_THRESHOLD";
const ENV_PACKAGE_THRESHOLD: &str = "ICONIFY_PACKAGE_THRESHOLD";
const ENV_THROW: &str = "ICONIFY_THROW";
const ENV_FALLBACK_STATUS: &str = "ICONIFY_FALLBACK_STATUS";
const ENV_FALLBACK_PACKAGE: &str = "ICONIFY_FALLBACK_PACKAGE";
const ENV_FALLBACK_ICON: &str = "ICONIFY_FALLBACK_ICON";
const ENV_COMPILED: &str = "ICONIFY_COMPILED";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct IconifyConfig {
    pub paths: Vec<PathBuf>,
    pub hints: BTreeMap<String, Vec<PathBuf>>,
    pub extensions: Vec<String>,
    #[serde(flatten)]
    pub strategy: StrategyConfig,
    /// Whether single-icon renders propagate package-level errors.
    pub throw: bool,
    pub fallback: FallbackConfig,
    /// Compiled cache file, or a directory to hold `iconify.json`.
    pub compiled: Option<PathBuf>,
}

/// Thresholds above which batch resolution switches to whole-package loads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub icon_threshold: usize,
    pub package_threshold: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub status: bool,
    pub package: String,
    pub icon: String,
}

impl Default for IconifyConfig {
    fn default() -> Self {
        Self {
            paths: default_paths(),
            hints: BTreeMap::new(),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            strategy: StrategyConfig::default(),
            throw: true,
            fallback: FallbackConfig::default(),
            compiled: None,
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            icon_threshold: DEFAULT_ICON_THRESHOLD,
            package_threshold: DEFAULT_PACKAGE_THRESHOLD,
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            status: false,
            package: "iconify".to_string(),
            icon: "iconify".to_string(),
        }
    }
}

impl FallbackConfig {
    /// The fallback as an identifier string, when enabled.
    pub fn identifier(&self) -> Option<String> {
        if !self.status || self.package.is_empty() || self.icon.is_empty() {
            return None;
        }
        Some(format!("{}:{}", self.package, self.icon))
    }
}

impl IconifyConfig {
    /// Parse a JSON config file. Relative paths resolve against the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let mut config: IconifyConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        if let Some(raw) = env::var_os(ENV_PATHS).filter(|raw| !raw.is_empty()) {
            self.paths = env::split_paths(&raw).collect();
        }
        if let Some(value) = env_parse::<usize>(ENV_ICON_THRESHOLD) {
            self.strategy.icon_threshold = value;
        }
        if let Some(value) = env_parse::<usize>(ENV_PACKAGE_THRESHOLD) {
            self.strategy.package_threshold = value;
        }
        if let Some(value) = env_flag(ENV_THROW) {
            self.throw = value;
        }
        if let Some(value) = env_flag(ENV_FALLBACK_STATUS) {
            self.fallback.status = value;
        }
        if let Some(value) = env_non_empty(ENV_FALLBACK_PACKAGE) {
            self.fallback.package = value;
        }
        if let Some(value) = env_non_empty(ENV_FALLBACK_ICON) {
            self.fallback.icon = value;
        }
        if let Some(value) = env_non_empty(ENV_COMPILED) {
            self.compiled = Some(PathBuf::from(value));
        }
    }

    /// Build a finder over the configured paths, hints, and extensions.
    pub fn finder(&self) -> IconFinder {
        let mut finder =
            IconFinder::new(&self.paths).with_extensions(self.extensions.iter().cloned());
        for (namespace, dirs) in &self.hints {
            finder.add_namespace(namespace, dirs);
        }
        finder
    }

    /// Location of the compiled cache file, if one is configured.
    pub fn compiled_path(&self) -> Option<PathBuf> {
        let compiled = self.compiled.as_ref()?;
        if compiled.is_dir() {
            Some(compiled.join(COMPILED_FILE_NAME))
        } else {
            Some(compiled.clone())
        }
    }

    fn rebase(&mut self, base: &Path) {
        for path in &mut self.paths {
            *path = rebase_path(base, path);
        }
        for dirs in self.hints.values_mut() {
            for dir in dirs.iter_mut() {
                *dir = rebase_path(base, dir);
            }
        }
        if let Some(compiled) = self.compiled.as_mut() {
            *compiled = rebase_path(base, compiled);
        }
    }
}

fn default_paths() -> Vec<PathBuf> {
    option_env!("ICONIFY_DEFAULT_PATH")
        .filter(|hint| !hint.is_empty())
        .map(|hint| vec![PathBuf::from(hint)])
        .unwrap_or_default()
}

fn rebase_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env_non_empty(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = env_non_empty(name)?;
    match parse_flag(&raw) {
        Some(value) => Some(value),
        None => {
            warn!(variable = name, value = %raw, "ignoring unparseable environment flag");
            None
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
