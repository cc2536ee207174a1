//! In-memory rendered page used by the terminal host and the tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::content::{parse_blocks, ChunkKind};
use crate::error::HostError;

use super::{ContentHost, Mark};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub text: String,
    pub in_code: bool,
}

#[derive(Debug, Clone, Default)]
struct Container {
    html: String,
    nodes: Vec<TextNode>,
    marks: Vec<Mark>,
    /// Node and byte offset the next search starts from.
    cursor: (usize, usize),
}

impl Container {
    fn render(html: &str) -> Self {
        let nodes = parse_blocks(html)
            .into_iter()
            .filter(|block| !block.kind.is_marker())
            .map(|block| TextNode {
                in_code: block.kind == ChunkKind::Code,
                text: block.text,
            })
            .collect();

        Self {
            html: html.to_string(),
            nodes,
            ..Self::default()
        }
    }

    /// Search order starting at the cursor and wrapping around once.
    fn search_order(&self) -> Vec<(usize, usize, usize)> {
        let (node, offset) = self.cursor;
        let count = self.nodes.len();
        let mut order = Vec::with_capacity(count + 1);
        if node < count {
            order.push((node, offset, usize::MAX));
        }
        order.extend((node + 1..count).map(|i| (i, 0, usize::MAX)));
        order.extend((0..node.min(count)).map(|i| (i, 0, usize::MAX)));
        if node < count && offset > 0 {
            order.push((node, 0, offset));
        }
        order
    }

    fn find(&self, needle: &[char]) -> Option<(usize, usize, usize)> {
        let order = self.search_order();
        for whole_word in [true, false] {
            for &(node, from, until) in &order {
                let text_node = &self.nodes[node];
                if text_node.in_code {
                    continue;
                }
                if let Some((start, end)) =
                    find_in_text(&text_node.text, needle, from, until, whole_word)
                {
                    return Some((node, start, end));
                }
            }
        }
        None
    }
}

/// Case-insensitive search for `needle` starting in `[from, until)` bytes.
fn find_in_text(
    text: &str,
    needle: &[char],
    from: usize,
    until: usize,
    whole_word: bool,
) -> Option<(usize, usize)> {
    let chars: Vec<(usize, char)> = text
        .char_indices()
        .map(|(at, ch)| (at, fold(ch)))
        .collect();
    if needle.is_empty() || needle.len() > chars.len() {
        return None;
    }

    for i in 0..=chars.len() - needle.len() {
        let start = chars[i].0;
        if start < from {
            continue;
        }
        if start >= until {
            break;
        }

        let matches = chars[i..i + needle.len()]
            .iter()
            .zip(needle)
            .all(|((_, a), b)| a == b);
        if !matches {
            continue;
        }

        if whole_word {
            let before = i.checked_sub(1).map(|j| chars[j].1);
            let after = chars.get(i + needle.len()).map(|(_, ch)| *ch);
            if before.is_some_and(char::is_alphanumeric) || after.is_some_and(char::is_alphanumeric) {
                continue;
            }
        }

        let end = chars
            .get(i + needle.len())
            .map(|(at, _)| *at)
            .unwrap_or(text.len());
        return Some((start, end));
    }

    None
}

fn fold(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

/// Containers keyed by the selector that resolves them.
#[derive(Debug, Default)]
pub struct TextDocument {
    containers: BTreeMap<String, Container>,
}

impl TextDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `html` under `selector`, replacing (and unmarking) what was there.
    pub fn insert(&mut self, selector: impl Into<String>, html: &str) {
        self.containers.insert(selector.into(), Container::render(html));
    }

    pub fn remove(&mut self, selector: &str) -> bool {
        self.containers.remove(selector).is_some()
    }

    pub fn nodes(&self, selector: &str) -> Option<&[TextNode]> {
        self.containers
            .get(selector)
            .map(|container| container.nodes.as_slice())
    }

    pub fn marks(&self) -> Vec<Mark> {
        self.containers
            .values()
            .flat_map(|container| container.marks.iter().cloned())
            .collect()
    }
}

impl ContentHost for TextDocument {
    fn contains(&self, selector: &str) -> bool {
        self.containers.contains_key(selector)
    }

    fn inner_html(&self, selector: &str) -> Option<String> {
        self.containers
            .get(selector)
            .map(|container| container.html.clone())
    }

    fn mark(&mut self, selector: &str, text: &str) -> Result<Option<Mark>, HostError> {
        let container = self
            .containers
            .get_mut(selector)
            .ok_or_else(|| HostError::ContainerMissing(selector.to_string()))?;

        let needle: Vec<char> = text.trim().chars().map(fold).collect();
        let Some((node, start, end)) = container.find(&needle) else {
            return Ok(None);
        };

        let mark = Mark {
            container: selector.to_string(),
            node,
            start,
            end,
            text: container.nodes[node].text[start..end].to_string(),
        };
        container.cursor = (node, end);
        container.marks.push(mark.clone());
        Ok(Some(mark))
    }

    fn unmark(&mut self, mark: &Mark) -> Result<(), HostError> {
        let container = self
            .containers
            .get_mut(&mark.container)
            .ok_or_else(|| HostError::ContainerMissing(mark.container.clone()))?;

        let position = container
            .marks
            .iter()
            .position(|existing| existing == mark)
            .ok_or(HostError::StaleMark)?;
        container.marks.remove(position);
        Ok(())
    }

    fn clear_marks(&mut self) {
        for container in self.containers.values_mut() {
            container.marks.clear();
            container.cursor = (0, 0);
        }
    }
}

/// Shared handle so the host can keep re-rendering while a session reads.
#[derive(Debug, Clone, Default)]
pub struct DocumentHandle(Arc<Mutex<TextDocument>>);

impl DocumentHandle {
    pub fn new(document: TextDocument) -> Self {
        Self(Arc::new(Mutex::new(document)))
    }

    pub fn lock(&self) -> MutexGuard<'_, TextDocument> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, selector: impl Into<String>, html: &str) {
        self.lock().insert(selector, html);
    }

    pub fn remove(&self, selector: &str) -> bool {
        self.lock().remove(selector)
    }

    pub fn marks(&self) -> Vec<Mark> {
        self.lock().marks()
    }
}

impl ContentHost for DocumentHandle {
    fn contains(&self, selector: &str) -> bool {
        self.lock().contains(selector)
    }

    fn inner_html(&self, selector: &str) -> Option<String> {
        self.lock().inner_html(selector)
    }

    fn mark(&mut self, selector: &str, text: &str) -> Result<Option<Mark>, HostError> {
        self.lock().mark(selector, text)
    }

    fn unmark(&mut self, mark: &Mark) -> Result<(), HostError> {
        self.lock().unmark(mark)
    }

    fn clear_marks(&mut self) {
        self.lock().clear_marks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(html: &str) -> TextDocument {
        let mut doc = TextDocument::new();
        doc.insert("#post", html);
        doc
    }

    #[test]
    fn renders_text_nodes_and_flags_code() {
        let doc = post("<h1>Title</h1><p>Body text</p><pre><code>let x;</code></pre><img alt=\"x\">");
        let nodes = doc.nodes("#post").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].text, "Title");
        assert!(nodes[2].in_code);
    }

    #[test]
    fn marks_advance_through_repeated_words() {
        let mut doc = post("<p>the cat and the dog</p><p>the end</p>");

        let first = doc.mark("#post", "the").unwrap().unwrap();
        assert_eq!((first.node, first.start, first.end), (0, 0, 3));
        doc.unmark(&first).unwrap();

        let second = doc.mark("#post", "the").unwrap().unwrap();
        assert_eq!((second.node, second.start), (0, 12));

        let third = doc.mark("#post", "The").unwrap().unwrap();
        assert_eq!((third.node, third.start), (1, 0));

        let wrapped = doc.mark("#post", "the").unwrap().unwrap();
        assert_eq!((wrapped.node, wrapped.start), (0, 0));
    }

    #[test]
    fn prefers_whole_words_over_substrings() {
        let mut doc = post("<p>another other</p>");
        let mark = doc.mark("#post", "other").unwrap().unwrap();
        assert_eq!(mark.start, 8);

        let mut doc = post("<p>another</p>");
        let mark = doc.mark("#post", "other").unwrap().unwrap();
        assert_eq!((mark.start, mark.text.as_str()), (2, "other"));
    }

    #[test]
    fn code_nodes_are_not_searched() {
        let mut doc = post("<pre><code>value</code></pre><p>plain</p>");
        assert!(doc.mark("#post", "value").unwrap().is_none());
    }

    #[test]
    fn case_folding_keeps_byte_ranges_valid() {
        let mut doc = post("<p>Ünïcode Straße</p>");
        let mark = doc.mark("#post", "straße").unwrap().unwrap();
        assert_eq!(mark.text, "Straße");
    }

    #[test]
    fn missing_container_and_stale_marks_are_errors() {
        let mut doc = post("<p>word</p>");
        assert_eq!(
            doc.mark("#other", "word"),
            Err(HostError::ContainerMissing("#other".into()))
        );

        let mark = doc.mark("#post", "word").unwrap().unwrap();
        doc.insert("#post", "<p>word</p>");
        assert_eq!(doc.unmark(&mark), Err(HostError::StaleMark));
        assert!(doc.marks().is_empty());
    }

    #[test]
    fn clear_marks_resets_search() {
        let mut doc = post("<p>a b a</p>");
        doc.mark("#post", "a").unwrap();
        doc.clear_marks();
        assert!(doc.marks().is_empty());

        let mark = doc.mark("#post", "a").unwrap().unwrap();
        assert_eq!(mark.start, 0);
    }

    #[test]
    fn handle_shares_state() {
        let handle = DocumentHandle::default();
        let mut host = handle.clone();
        handle.insert("main", "<p>shared</p>");

        assert!(host.contains("main"));
        host.mark("main", "shared").unwrap();
        assert_eq!(handle.marks().len(), 1);
        assert!(handle.remove("main"));
        assert!(!host.contains("main"));
    }
}
