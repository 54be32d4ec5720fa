//! Entry point that ties lookup, batch resolution, and compilation together.

use crate::compiled::CompiledCache;
use crate::config::IconifyConfig;
use crate::error::Result;
use crate::finder::{IconFinder, PackageLocator};
use crate::identifier::IconIdentifier;
use crate::repository::{IconRecord, IconRepository, IconSet};
use crate::resolver::{Resolver, group_by_package};
use crate::spriter::{DEFAULT_DIMENSION, RenderOptions, RenderPass, Spriter};
use html_escape::encode_double_quoted_attribute;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Entry of the grouped JSON rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderedIcon {
    pub svg: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

pub type Grouped<T> = BTreeMap<String, BTreeMap<String, T>>;

pub struct Iconify<L = IconFinder> {
    repository: IconRepository<L>,
    config: IconifyConfig,
}

impl Iconify<IconFinder> {
    /// Build from configuration, warming the cache from the compiled snapshot
    /// when one is configured and present.
    pub fn from_config(config: IconifyConfig) -> anyhow::Result<Self> {
        let repository = IconRepository::new(config.finder());
        if let Some(path) = config.compiled_path() {
            if let Some(compiled) = CompiledCache::load_if_present(&path)? {
                debug!(path = %path.display(), packages = compiled.len(), "using compiled icon cache");
                repository.warm(compiled);
            }
        }
        Ok(Self::new(repository, config))
    }

    /// Names of every package discoverable on the global search paths.
    pub fn package_names(&self) -> Result<Vec<String>> {
        Ok(self.repository.locator().packages()?.into_iter().collect())
    }

    /// Load every discoverable package. Packages that fail to load are
    /// returned alongside their error instead of aborting the sweep.
    pub fn all(&self) -> Result<Vec<(String, Result<IconSet>)>> {
        Ok(self
            .package_names()?
            .into_iter()
            .map(|name| {
                let loaded = self.repository.load_package(&name);
                (name, loaded)
            })
            .collect())
    }
}

impl<L: PackageLocator> Iconify<L> {
    pub fn new(repository: IconRepository<L>, config: IconifyConfig) -> Self {
        Self { repository, config }
    }

    pub fn repository(&self) -> &IconRepository<L> {
        &self.repository
    }

    pub fn config(&self) -> &IconifyConfig {
        &self.config
    }

    pub fn resolver(&self) -> Resolver<'_, L> {
        Resolver::new(&self.repository, self.config.strategy)
    }

    /// Point lookup. Package-level failures and malformed identifiers are
    /// errors; an unknown icon is `Ok(None)`.
    pub fn resolve(&self, identifier: &str) -> Result<Option<Arc<IconRecord>>> {
        let id = IconIdentifier::try_parse(identifier)?;
        self.repository.load_icon(id.package(), id.icon())
    }

    /// Batch lookup with automatic strategy selection.
    pub fn resolve_many<I, S>(&self, names: I) -> Vec<Arc<IconRecord>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.resolver().resolve_many(names)
    }

    pub fn compile(&self, icon: &IconRecord, options: &RenderOptions, pass: &RenderPass) -> String {
        let spriter = Spriter::new(pass)
            .size(
                icon.width.unwrap_or(DEFAULT_DIMENSION),
                icon.height.unwrap_or(DEFAULT_DIMENSION),
            )
            .body(icon.body.as_str());
        options.apply(spriter).render()
    }

    /// Render one identifier.
    ///
    /// An unknown icon renders the configured fallback, or nothing. Errors
    /// propagate when `throw` is set; otherwise they are logged and treated
    /// like an unknown icon.
    pub fn render(
        &self,
        identifier: &str,
        options: &RenderOptions,
        pass: &RenderPass,
    ) -> Result<String> {
        match self.resolve(identifier) {
            Ok(Some(record)) => return Ok(self.compile(&record, options, pass)),
            Ok(None) => {}
            Err(err) if self.config.throw => return Err(err),
            Err(err) => warn!(identifier, error = %err, "icon render failed"),
        }
        Ok(self.render_fallback(identifier, options, pass))
    }

    pub fn render_many<I, S>(&self, names: I, options: &RenderOptions, pass: &RenderPass) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.resolve_many(names)
            .iter()
            .map(|record| self.compile(record, options, pass))
            .collect()
    }

    /// Render a batch as `package -> icon -> svg`.
    pub fn render_many_grouped<I, S>(
        &self,
        names: I,
        options: &RenderOptions,
        pass: &RenderPass,
    ) -> Grouped<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.grouped(names, |record| self.compile(record, options, pass))
    }

    /// Render a batch as `package -> icon -> {svg, width, height}`.
    pub fn render_many_grouped_json<I, S>(
        &self,
        names: I,
        options: &RenderOptions,
        pass: &RenderPass,
    ) -> Grouped<RenderedIcon>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.grouped(names, |record| RenderedIcon {
            svg: self.compile(record, options, pass),
            width: record.width,
            height: record.height,
        })
    }

    /// Render a batch as nested `data-package` / `data-icon` preview blocks.
    pub fn render_many_grouped_preview<I, S>(
        &self,
        names: I,
        options: &RenderOptions,
        pass: &RenderPass,
    ) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.render_many_grouped_json(names, options, pass)
            .iter()
            .map(|(package, icons)| {
                let body: String = icons
                    .iter()
                    .map(|(icon, rendered)| {
                        let icon = encode_double_quoted_attribute(icon);
                        format!("<div data-icon=\"{icon}\">{}</div>", rendered.svg)
                    })
                    .collect();
                let package = encode_double_quoted_attribute(package);
                format!("<div data-package=\"{package}\">{body}</div>")
            })
            .collect()
    }

    pub fn icons(&self, package: &str) -> Result<IconSet> {
        self.repository.load_package(package)
    }

    /// Evict one package, or every cached package and resolved path.
    pub fn flush(&self, package: Option<&str>) {
        self.repository.flush(package);
        if package.is_none() {
            self.repository.locator().flush();
        }
    }

    fn grouped<I, S, T, F>(&self, names: I, mut render: F) -> Grouped<T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&IconRecord) -> T,
    {
        group_by_package(self.resolve_many(names))
            .into_iter()
            .map(|(package, icons)| {
                let rendered = icons
                    .into_iter()
                    .map(|(icon, record)| (icon, render(record.as_ref())))
                    .collect();
                (package, rendered)
            })
            .collect()
    }

    fn render_fallback(&self, identifier: &str, options: &RenderOptions, pass: &RenderPass) -> String {
        let Some(fallback) = self.config.fallback.identifier() else {
            return String::new();
        };
        if fallback == identifier.trim() {
            return String::new();
        }
        match self.resolve(&fallback) {
            Ok(Some(record)) => self.compile(&record, options, pass),
            Ok(None) => String::new(),
            Err(err) => {
                warn!(fallback = %fallback, error = %err, "fallback icon unavailable");
                String::new()
            }
        }
    }
}
