use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentChunk;

use super::options::ReadingOptions;
use super::timing::remaining_duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    Idle,
    Loaded,
    Playing,
    Paused,
    Completed,
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        PlaybackStatus::Idle
    }
}

impl PlaybackStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, PlaybackStatus::Idle)
    }

    pub fn is_paused(&self) -> bool {
        !matches!(self, PlaybackStatus::Playing)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub session_id: Option<String>,
    pub chunks: Arc<[ContentChunk]>,
    pub current_index: usize,
    pub progress: f64,
    pub options: ReadingOptions,
    pub started_at: Option<DateTime<Utc>>,
}

impl PlaybackState {
    pub fn new(options: ReadingOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.status.is_paused()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn current_chunk(&self) -> Option<&ContentChunk> {
        if !self.is_active() {
            return None;
        }
        self.chunks.get(self.current_index)
    }

    pub fn begin_session(
        &mut self,
        session_id: String,
        chunks: Arc<[ContentChunk]>,
        start_index: usize,
        started_at: DateTime<Utc>,
    ) {
        let options = self.options;
        *self = Self {
            status: PlaybackStatus::Loaded,
            session_id: Some(session_id),
            chunks,
            options,
            started_at: Some(started_at),
            ..Self::default()
        };
        self.set_index(start_index);
    }

    /// Move the read head, clamping into range and re-deriving progress.
    pub fn set_index(&mut self, index: usize) {
        let len = self.len();
        if len == 0 {
            self.current_index = 0;
            self.progress = 0.0;
            return;
        }

        self.current_index = index.min(len - 1);
        self.progress = self.current_index as f64 / len as f64;
    }

    pub fn complete(&mut self) {
        self.status = PlaybackStatus::Completed;
        self.progress = 1.0;
    }

    /// Drop the session but keep the reader's options.
    pub fn reset(&mut self) {
        *self = Self::new(self.options);
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let remaining_ms = if self.is_active() && self.status != PlaybackStatus::Completed {
            let current = self
                .current_chunk()
                .map(|chunk| super::timing::chunk_delay(chunk, &self.options))
                .unwrap_or_default();
            (current + remaining_duration(&self.chunks, self.current_index, &self.options)).as_millis()
                as u64
        } else {
            0
        };

        PlaybackSnapshot {
            status: self.status,
            session_id: self.session_id.clone(),
            current_index: self.current_index,
            total: self.len(),
            progress: self.progress,
            current_chunk: self.current_chunk().cloned(),
            options: self.options,
            is_active: self.is_active(),
            is_paused: self.is_paused(),
            remaining_ms,
        }
    }
}

/// Read-only view of the playback state handed to shells and events.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub session_id: Option<String>,
    pub current_index: usize,
    pub total: usize,
    pub progress: f64,
    pub current_chunk: Option<ContentChunk>,
    pub options: ReadingOptions,
    pub is_active: bool,
    pub is_paused: bool,
    pub remaining_ms: u64,
}
