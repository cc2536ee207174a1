use serde::{Deserialize, Serialize};

/// Structural role of the block a chunk was taken from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ChunkKind {
    Paragraph,
    Heading,
    List,
    Code,
    Quote,
    Image,
    Table,
}

impl Default for ChunkKind {
    fn default() -> Self {
        ChunkKind::Paragraph
    }
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Paragraph => "paragraph",
            ChunkKind::Heading => "heading",
            ChunkKind::List => "list",
            ChunkKind::Code => "code",
            ChunkKind::Quote => "quote",
            ChunkKind::Image => "image",
            ChunkKind::Table => "table",
        }
    }

    /// Markers stand in for non-text content and are never split into words.
    pub fn is_marker(&self) -> bool {
        matches!(self, ChunkKind::Image | ChunkKind::Table)
    }
}

/// One unit of playback text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentChunk {
    pub content: String,
    #[serde(default)]
    pub kind: ChunkKind,
    /// Heading level (1-6) for heading chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
}

impl ContentChunk {
    pub fn new(content: impl Into<String>, kind: ChunkKind) -> Self {
        Self {
            content: content.into(),
            kind,
            level: None,
        }
    }

    pub fn paragraph(content: impl Into<String>) -> Self {
        Self::new(content, ChunkKind::Paragraph)
    }

    pub fn heading(content: impl Into<String>, level: u8) -> Self {
        Self {
            content: content.into(),
            kind: ChunkKind::Heading,
            level: Some(level),
        }
    }

    pub fn code(content: impl Into<String>) -> Self {
        Self::new(content, ChunkKind::Code)
    }

    pub fn is_code(&self) -> bool {
        self.kind == ChunkKind::Code
    }
}
