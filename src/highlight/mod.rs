//! Marks the chunk being read inside the rendered page.
//!
//! The page itself is reached through [`ContentHost`], a narrow seam the
//! embedding UI implements. Highlighting is advisory: every failure is logged
//! here and never reaches the playback loop.

pub mod document;

use serde::{Deserialize, Serialize};

use crate::error::HostError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub use document::{DocumentHandle, TextDocument};

/// Generic content containers tried when the configured ones are absent.
pub const FALLBACK_CONTAINERS: &[&str] = &[
    ".prose",
    "article .prose",
    "article .mdx",
    ".mdx-content",
    "article",
    "main",
    ".blog-content",
    "#blog-content",
    "[data-mdx-content]",
    ".markdown-body",
    "[data-blog-content]",
];

/// A marked span of the host's rendered text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    pub container: String,
    pub node: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// The rendered page as seen by the highlighter.
pub trait ContentHost: Send {
    fn contains(&self, selector: &str) -> bool;

    fn inner_html(&self, selector: &str) -> Option<String>;

    /// Mark the best occurrence of `text` in the container; `None` if absent.
    fn mark(&mut self, selector: &str, text: &str) -> Result<Option<Mark>, HostError>;

    fn unmark(&mut self, mark: &Mark) -> Result<(), HostError>;

    fn clear_marks(&mut self);
}

/// Which container a session reads from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerTarget {
    pub slug: Option<String>,
    pub selector: Option<String>,
}

impl ContainerTarget {
    pub fn selector(selector: impl Into<String>) -> Self {
        Self {
            slug: None,
            selector: Some(selector.into()),
        }
    }

    pub fn slug(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            selector: None,
        }
    }

    /// Selectors in resolution order: slug, configured selector, fallbacks.
    pub fn candidates(&self) -> Vec<String> {
        let mut candidates = Vec::with_capacity(FALLBACK_CONTAINERS.len() + 2);
        if let Some(slug) = &self.slug {
            candidates.push(format!("[data-blog-slug=\"{}\"]", slug));
        }
        if let Some(selector) = &self.selector {
            candidates.push(selector.clone());
        }
        candidates.extend(FALLBACK_CONTAINERS.iter().map(|s| s.to_string()));
        candidates
    }
}

pub struct Highlighter {
    host: Box<dyn ContentHost>,
    target: ContainerTarget,
    last: Option<Mark>,
}

impl Highlighter {
    pub fn new(host: Box<dyn ContentHost>, target: ContainerTarget) -> Self {
        Self {
            host,
            target,
            last: None,
        }
    }

    pub fn target(&self) -> &ContainerTarget {
        &self.target
    }

    pub fn set_target(&mut self, target: ContainerTarget) {
        self.clear();
        self.target = target;
    }

    pub fn host(&self) -> &dyn ContentHost {
        self.host.as_ref()
    }

    pub fn current(&self) -> Option<&Mark> {
        self.last.as_ref()
    }

    /// First candidate container present on the host right now.
    pub fn resolve_container(&self) -> Option<String> {
        self.target
            .candidates()
            .into_iter()
            .find(|selector| self.host.contains(selector))
    }

    /// Move the mark to `text`, clearing the previous one first.
    pub fn highlight(&mut self, text: &str) -> Option<&Mark> {
        self.clear();

        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let Some(container) = self.resolve_container() else {
            log::debug!("No content container found for highlighting");
            return None;
        };

        match self.host.mark(&container, text) {
            Ok(Some(mark)) => {
                self.last = Some(mark);
                self.last.as_ref()
            }
            Ok(None) => {
                log::debug!("'{}' not found in {}", text, container);
                None
            }
            Err(err) => {
                log_warn!("Failed to highlight '{}' in {}: {}", text, container, err);
                None
            }
        }
    }

    /// Remove the mark this highlighter placed, if any.
    pub fn clear(&mut self) {
        if let Some(mark) = self.last.take() {
            if let Err(err) = self.host.unmark(&mark) {
                log::debug!("Failed to clear highlight in {}: {}", mark.container, err);
            }
        }
    }

    /// Remove every mark on the host.
    pub fn clear_all(&mut self) {
        self.last = None;
        self.host.clear_marks();
    }
}
