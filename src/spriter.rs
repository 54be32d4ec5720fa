//! SVG sprite compilation.
//!
//! [`Spriter`] turns one icon body plus presentation options into an `<svg>`
//! that references the body through `<use href="#id">`. The body itself is
//! registered once per id as a `<g id=...>` definition on a [`RenderPass`]
//! stack; the host emits each stack once (for example at the end of a page)
//! with [`RenderPass::render_stack`]. Ids are content addressed, so the same
//! body rendered many times contributes a single definition per pass.

use html_escape::{encode_double_quoted_attribute, encode_text};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const DEFAULT_STACK: &str = "iconify";
pub const ID_PREFIX: &str = "iconify";
/// Dimension used for the view box when an icon declares none.
pub const DEFAULT_DIMENSION: u32 = 256;

/// Definitions collected during one top-level render.
///
/// Each id is registered at most once per pass no matter how many stacks or
/// renders reference it. Call [`RenderPass::flush`] (or start a new pass)
/// before the next independent output so shared definitions are emitted again.
#[derive(Debug, Default)]
pub struct RenderPass {
    state: Mutex<PassState>,
}

#[derive(Debug, Default)]
struct PassState {
    emitted: HashSet<String>,
    stacks: BTreeMap<String, Vec<String>>,
}

impl RenderPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition` under `id` on `stack` unless `id` was already
    /// registered in this pass. Returns whether it was added.
    pub fn push_once(&self, stack: &str, id: &str, definition: String) -> bool {
        let mut state = self.state.lock();
        if !state.emitted.insert(id.to_string()) {
            return false;
        }
        state
            .stacks
            .entry(stack.to_string())
            .or_default()
            .push(definition);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().emitted.contains(id)
    }

    pub fn definitions(&self, stack: &str) -> Vec<String> {
        self.state
            .lock()
            .stacks
            .get(stack)
            .cloned()
            .unwrap_or_default()
    }

    pub fn stacks(&self) -> Vec<String> {
        self.state.lock().stacks.keys().cloned().collect()
    }

    /// Hidden `<svg>` holding every definition on `stack`; empty when the
    /// stack has none.
    pub fn render_stack(&self, stack: &str) -> String {
        let definitions = self.definitions(stack);
        if definitions.is_empty() {
            return String::new();
        }
        format!(
            "<svg xmlns=\"{SVG_NAMESPACE}\" style=\"display: none\">{}</svg>",
            definitions.concat()
        )
    }

    pub fn flush(&self) {
        let mut state = self.state.lock();
        state.emitted.clear();
        state.stacks.clear();
    }
}

/// Caller-supplied presentation overrides for one render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub class: String,
    pub attributes: BTreeMap<String, String>,
    pub id: Option<String>,
    pub title: Option<String>,
    pub style: Option<String>,
    /// Rendered `width` attribute; the view box still uses the icon's size.
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub stack: Option<String>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Apply these options on top of a spriter already holding the icon.
    pub fn apply<'p>(&self, spriter: Spriter<'p>) -> Spriter<'p> {
        let mut spriter = spriter
            .class(&self.class)
            .attributes(self.attributes.clone());
        if let Some(width) = self.width {
            spriter = spriter.attribute("width", width.to_string());
        }
        if let Some(height) = self.height {
            spriter = spriter.attribute("height", height.to_string());
        }
        if let Some(style) = &self.style {
            spriter = spriter.style(style);
        }
        if let Some(title) = &self.title {
            spriter = spriter.title(title);
        }
        if let Some(id) = &self.id {
            spriter = spriter.id(id);
        }
        if let Some(stack) = &self.stack {
            spriter = spriter.stack(stack);
        }
        spriter
    }
}

/// Builder for a single `<svg>` sprite reference.
#[derive(Debug)]
pub struct Spriter<'p> {
    pass: &'p RenderPass,
    attributes: BTreeMap<String, String>,
    body: Option<String>,
    width: u32,
    height: u32,
    id: Option<String>,
    title: Option<String>,
    stack: String,
}

impl<'p> Spriter<'p> {
    pub fn new(pass: &'p RenderPass) -> Self {
        Self {
            pass,
            attributes: BTreeMap::new(),
            body: None,
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            id: None,
            title: None,
            stack: DEFAULT_STACK.to_string(),
        }
    }

    /// Intrinsic icon size, used for the default view box.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.attributes
            .insert("class".to_string(), class.trim().to_string());
        self
    }

    /// Merge attributes over the current ones (and over the `xmlns` and
    /// `viewBox` defaults).
    pub fn attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes.extend(
            attributes
                .into_iter()
                .map(|(name, value)| (name.into(), value.into())),
        );
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Append to the inline style, semicolon separated.
    pub fn style(mut self, style: &str) -> Self {
        let addition = style.trim().trim_end_matches(';').trim();
        if addition.is_empty() {
            return self;
        }
        let merged = match self.attributes.get("style").map(|s| s.trim().trim_end_matches(';')) {
            Some(existing) if !existing.is_empty() => format!("{existing};{addition}"),
            _ => addition.to_string(),
        };
        self.attributes.insert("style".to_string(), merged);
        self
    }

    /// Accessible title; also marks the svg with `role="img"`.
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self.attributes.insert("role".to_string(), "img".to_string());
        self
    }

    /// Override the content-derived definition id.
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Stack that receives the `<g>` definition.
    pub fn stack(mut self, stack: &str) -> Self {
        self.stack = stack.to_string();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.body.as_deref().is_none_or(str::is_empty)
    }

    /// Id the `<use>` element will reference.
    pub fn definition_id(&self) -> Option<String> {
        let body = self.body.as_deref().filter(|body| !body.is_empty())?;
        Some(self.id.clone().unwrap_or_else(|| generate_id(body)))
    }

    /// Emit the `<svg>` and register its definition on the pass. An empty
    /// spriter renders nothing.
    pub fn render(&self) -> String {
        let Some(id) = self.definition_id() else {
            return String::new();
        };
        let body = self.body.as_deref().unwrap_or_default();
        let definition = format!("<g id=\"{}\">{body}</g>", encode_double_quoted_attribute(&id));
        self.pass.push_once(&self.stack, &id, definition);
        self.build_svg(&id)
    }

    fn build_svg(&self, id: &str) -> String {
        let mut attributes = self.attributes.clone();
        attributes
            .entry("xmlns".to_string())
            .or_insert_with(|| SVG_NAMESPACE.to_string());
        attributes
            .entry("viewBox".to_string())
            .or_insert_with(|| format!("0 0 {} {}", self.width, self.height));

        let rendered: String = attributes
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| {
                format!(" {name}=\"{}\"", encode_double_quoted_attribute(value))
            })
            .collect();
        let title = self
            .title
            .as_deref()
            .filter(|title| !title.is_empty())
            .map(|title| format!("<title>{}</title>", encode_text(title)))
            .unwrap_or_default();
        format!(
            "<svg{rendered}>{title}<use href=\"#{}\"></use></svg>",
            encode_double_quoted_attribute(id)
        )
    }
}

/// Content-addressed definition id: line endings are normalized before
/// hashing so the same body always maps to the same id.
pub fn generate_id(body: &str) -> String {
    let normalized = body.trim().replace("\r\n", "\n").replace('\r', "\n");
    format!("{ID_PREFIX}-{:x}", md5::compute(normalized.as_bytes()))
}
