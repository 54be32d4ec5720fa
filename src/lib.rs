//! Resolve `package:icon` identifiers to SVG sprite markup.
//!
//! Icon sets live on disk as one JSON file per package
//! (`{prefix, width, height, icons: {name: {body}}}`). The pieces, leaf first:
//!
//! - [`IconFinder`] maps a package name to its file, searching configured
//!   directories (or a namespace's hint directories) and memoizing results.
//! - [`IconRepository`] decodes a package once and caches its metadata and
//!   lazily materialized [`IconSet`] together.
//! - [`Resolver`] picks single lookups or whole-package loads for a batch
//!   based on its size and package fan-out.
//! - [`Spriter`] compiles a record into `<svg><use href="#id"/></svg>` and
//!   registers the body once per [`RenderPass`].
//!
//! [`Iconify`] wires them together from an [`IconifyConfig`].

pub mod compiled;
pub mod config;
pub mod error;
pub mod finder;
pub mod iconify;
pub mod identifier;
pub mod repository;
pub mod resolver;
pub mod spriter;

pub use compiled::{COMPILED_FILE_NAME, CompiledCache, CompiledPackage};
pub use config::{FallbackConfig, IconifyConfig, StrategyConfig};
pub use error::{IconifyError, Result};
pub use finder::{HINT_DELIMITER, IconFinder, PackageLocator};
pub use iconify::{Grouped, Iconify, RenderedIcon};
pub use identifier::{ICON_SEPARATOR, IconIdentifier};
pub use repository::{
    IconEntry, IconRecord, IconRepository, IconSet, Icons, LoadedPackage, PackageMetadata,
};
pub use resolver::{BatchAnalysis, Resolver, Strategy, group_by_package, inspect};
pub use spriter::{DEFAULT_STACK, RenderOptions, RenderPass, Spriter, generate_id};

/// Split a comma- or whitespace-separated list, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
