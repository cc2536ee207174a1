pub mod chunk;
mod entities;
pub mod parser;
pub mod text;

pub use chunk::{ChunkKind, ContentChunk};
pub use parser::{parse_blocks, parse_content, parse_content_with, TextBlock};
pub use text::{
    estimate_reading_minutes, format_reading_time, orp_index, reading_time_minutes, split_at_orp,
};

/// Where a session's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Element id, resolved as `#id` on the host.
    Element(String),
    /// Selector resolved on the host.
    Selector(String),
    /// Pre-extracted HTML or plain text.
    Html(String),
}

impl ContentSource {
    /// Host selector for sources that live in the rendered page.
    pub fn selector(&self) -> Option<String> {
        match self {
            ContentSource::Element(id) => Some(format!("#{}", id.trim_start_matches('#'))),
            ContentSource::Selector(selector) => Some(selector.clone()),
            ContentSource::Html(_) => None,
        }
    }
}
