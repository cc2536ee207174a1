//! HTML/plain text to chunk conversion.
//!
//! Input is treated as a loose HTML fragment rather than XML: void elements,
//! unclosed `<p>`/`<li>`, stray `&` and `<`, and named HTML entities are all
//! accepted. If the tokenizer still gives up, the text is recovered by
//! stripping tags so a malformed page never reads as empty.

use anyhow::{anyhow, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::chunk::{ChunkKind, ContentChunk};
use super::entities::decode_html_entity;
use super::text::group_words;

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "div", "dl", "dt",
    "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "html",
    "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody", "td", "tfoot",
    "th", "thead", "tr", "ul",
];

/// A run of text that shares one structural role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub kind: ChunkKind,
    pub level: Option<u8>,
    pub text: String,
}

impl TextBlock {
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }
}

/// Parse content into word-granularity chunks.
pub fn parse_content(input: &str) -> Vec<ContentChunk> {
    parse_content_with(input, 1)
}

/// Parse content, grouping `chunk_size` consecutive words of a block per chunk.
pub fn parse_content_with(input: &str, chunk_size: usize) -> Vec<ContentChunk> {
    let mut chunks = Vec::new();

    for block in parse_blocks(input) {
        if block.kind.is_marker() {
            chunks.push(ContentChunk {
                content: block.text,
                kind: block.kind,
                level: None,
            });
            continue;
        }

        for content in group_words(block.words(), chunk_size) {
            chunks.push(ContentChunk {
                content,
                kind: block.kind,
                level: block.level,
            });
        }
    }

    chunks
}

/// Extract the visible text of a fragment as role-tagged blocks.
pub fn parse_blocks(input: &str) -> Vec<TextBlock> {
    if input.trim().is_empty() {
        return Vec::new();
    }

    match tokenize(input) {
        Ok(blocks) => blocks,
        Err(err) => {
            log::warn!("Falling back to tag stripping for malformed content: {}", err);
            strip_tags(input)
        }
    }
}

#[derive(Debug)]
struct Frame {
    tag: String,
    role: Option<(ChunkKind, Option<u8>)>,
    hidden: bool,
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<TextBlock>,
    text: String,
    kind: ChunkKind,
    level: Option<u8>,
}

impl BlockBuilder {
    fn push_text(&mut self, role: (ChunkKind, Option<u8>), text: &str) {
        if (self.kind, self.level) != role {
            self.flush();
            self.kind = role.0;
            self.level = role.1;
        }
        self.text.push_str(text);
    }

    fn push_marker(&mut self, kind: ChunkKind, text: String) {
        self.flush();
        self.blocks.push(TextBlock {
            kind,
            level: None,
            text,
        });
    }

    fn flush(&mut self) {
        let text = std::mem::take(&mut self.text);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        self.blocks.push(TextBlock {
            kind: self.kind,
            level: self.level,
            text: trimmed.to_string(),
        });
    }

    fn finish(mut self) -> Vec<TextBlock> {
        self.flush();
        self.blocks
    }
}

fn tokenize(input: &str) -> Result<Vec<TextBlock>> {
    let prepared = escape_stray_markup(input);
    let mut reader = Reader::from_str(&prepared);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut stack: Vec<Frame> = Vec::with_capacity(16);
    let mut builder = BlockBuilder::default();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| anyhow!("tokenize error at {}: {:?}", reader.buffer_position(), err))?;

        match event {
            Event::Start(e) => {
                let tag = tag_name(&e);
                if VOID_TAGS.contains(&tag.as_str()) {
                    handle_void(&tag, &e, &stack, &mut builder);
                    continue;
                }

                // `<p>` and `<li>` close an open sibling of the same kind.
                if (tag == "p" || tag == "li") && stack.last().is_some_and(|top| top.tag == tag) {
                    stack.pop();
                    builder.flush();
                }

                if is_block(&tag) {
                    builder.flush();
                }
                if tag == "table" && !is_hidden(&stack) && current_role(&stack).is_none() {
                    builder.push_marker(ChunkKind::Table, "[Table]".to_string());
                }

                let hidden = HIDDEN_TAGS.contains(&tag.as_str()) || hides_element(&e);
                stack.push(Frame {
                    role: role_for(&tag),
                    tag,
                    hidden,
                });
            }
            Event::Empty(e) => {
                let tag = tag_name(&e);
                handle_void(&tag, &e, &stack, &mut builder);
            }
            Event::End(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                if let Some(pos) = stack.iter().rposition(|frame| frame.tag == tag) {
                    stack.truncate(pos);
                    if is_block(&tag) {
                        builder.flush();
                    }
                }
            }
            Event::Text(e) => {
                if is_hidden(&stack) {
                    continue;
                }
                let text = e
                    .decode()
                    .map_err(|err| anyhow!("text decode error: {:?}", err))?;
                builder.push_text(effective_role(&stack), &text);
            }
            Event::CData(e) => {
                if is_hidden(&stack) {
                    continue;
                }
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| anyhow!("cdata decode error: {:?}", err))?;
                builder.push_text(effective_role(&stack), &text);
            }
            Event::GeneralRef(e) => {
                if is_hidden(&stack) {
                    continue;
                }
                let name = e
                    .decode()
                    .map_err(|err| anyhow!("entity decode error: {:?}", err))?;
                let role = effective_role(&stack);
                match decode_html_entity(&name) {
                    Some(ch) => builder.push_text(role, ch.encode_utf8(&mut [0u8; 4])),
                    None => builder.push_text(role, &format!("&{};", name)),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(builder.finish())
}

fn handle_void(tag: &str, e: &BytesStart<'_>, stack: &[Frame], builder: &mut BlockBuilder) {
    if is_hidden(stack) || hides_element(e) {
        return;
    }

    match tag {
        "br" => builder.push_text(effective_role(stack), "\n"),
        "img" if current_role(stack).is_none() => {
            let alt = attribute(e, b"alt")
                .map(|alt| alt.trim().to_string())
                .filter(|alt| !alt.is_empty())
                .unwrap_or_else(|| "Image".to_string());
            builder.push_marker(ChunkKind::Image, format!("[{}]", alt));
        }
        tag if is_block(tag) => builder.flush(),
        _ => {}
    }
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

fn is_block(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

fn role_for(tag: &str) -> Option<(ChunkKind, Option<u8>)> {
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag.as_bytes()[1] - b'0';
            Some((ChunkKind::Heading, Some(level)))
        }
        "li" => Some((ChunkKind::List, None)),
        "pre" | "code" => Some((ChunkKind::Code, None)),
        "blockquote" => Some((ChunkKind::Quote, None)),
        _ => None,
    }
}

/// Role of the outermost role-bearing ancestor.
fn current_role(stack: &[Frame]) -> Option<(ChunkKind, Option<u8>)> {
    stack.iter().find_map(|frame| frame.role)
}

fn effective_role(stack: &[Frame]) -> (ChunkKind, Option<u8>) {
    current_role(stack).unwrap_or((ChunkKind::Paragraph, None))
}

fn is_hidden(stack: &[Frame]) -> bool {
    stack.iter().any(|frame| frame.hidden)
}

fn hides_element(e: &BytesStart<'_>) -> bool {
    let mut attributes = e.html_attributes();
    attributes.with_checks(false);

    for attr in attributes.flatten() {
        let key = attr.key.as_ref();
        if key.eq_ignore_ascii_case(b"hidden") {
            return true;
        }

        let value = String::from_utf8_lossy(&attr.value).to_ascii_lowercase();
        if key.eq_ignore_ascii_case(b"aria-hidden") && value.trim() == "true" {
            return true;
        }
        if key.eq_ignore_ascii_case(b"style") {
            let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
            if compact.contains("display:none") || compact.contains("visibility:hidden") {
                return true;
            }
        }
    }

    false
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    let mut attributes = e.html_attributes();
    attributes.with_checks(false);

    attributes
        .flatten()
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(name))
        .map(|attr| decode_entities(&String::from_utf8_lossy(&attr.value)))
}

/// Escape `&` and `<` that cannot start a reference or a tag.
fn escape_stray_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut chars = input.char_indices().peekable();

    while let Some((at, ch)) = chars.next() {
        match ch {
            '&' if reference_len(&input[at + 1..]).is_none() => out.push_str("&amp;"),
            '<' => match chars.peek() {
                Some((_, next)) if next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?') => {
                    out.push('<')
                }
                _ => out.push_str("&lt;"),
            },
            _ => out.push(ch),
        }
    }

    out
}

/// Length of a `name;` or `#123;` reference body following an `&`.
fn reference_len(rest: &str) -> Option<usize> {
    let body = rest.strip_prefix('#').unwrap_or(rest);
    let prefix = rest.len() - body.len();
    let name_len = body
        .bytes()
        .take(33)
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();

    if name_len == 0 || name_len > 32 || body.as_bytes().get(name_len) != Some(&b';') {
        return None;
    }
    Some(prefix + name_len + 1)
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match reference_len(after).and_then(|len| {
            decode_html_entity(&after[..len - 1]).map(|ch| (len, ch))
        }) {
            Some((len, ch)) => {
                out.push(ch);
                rest = &after[len..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Last-resort recovery: drop everything between `<` and `>`.
fn strip_tags(input: &str) -> Vec<TextBlock> {
    let mut text = String::with_capacity(input.len());
    let mut in_tag = false;

    for ch in input.chars() {
        match ch {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let text = decode_entities(&text);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    vec![TextBlock {
        kind: ChunkKind::Paragraph,
        level: None,
        text: trimmed.to_string(),
    }]
}
