use serde::Serialize;

use super::state::PlaybackSnapshot;

/// Notifications other parts of the host observe.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ReadingEvent {
    Highlight {
        word: String,
        index: usize,
        total: usize,
    },
    Complete {
        total_words: usize,
    },
    StateChanged {
        snapshot: PlaybackSnapshot,
    },
}

impl ReadingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ReadingEvent::Highlight { .. } => "speed-reading-highlight",
            ReadingEvent::Complete { .. } => "speed-reading-complete",
            ReadingEvent::StateChanged { .. } => "speed-reading-state-changed",
        }
    }
}
