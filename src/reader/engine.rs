//! Synchronous playback core.
//!
//! Everything that mutates a session lives here so the async controller only
//! decides *when* to call in. Time is passed in explicitly.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use uuid::Uuid;

use crate::content::ContentChunk;
use crate::highlight::Highlighter;

use super::events::ReadingEvent;
use super::options::{OptionsPatch, ReadingOptions};
use super::state::{PlaybackSnapshot, PlaybackState, PlaybackStatus};
use super::timing::chunk_delay;
use super::watchdog::{StallAction, StallMonitor, WatchdogConfig};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceCause {
    /// The scheduled delay elapsed.
    Timer,
    /// Caller asked for the next chunk; works while paused.
    Forced,
    /// Watchdog retry after a stall.
    Recovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Advanced(usize),
    Completed,
    Inactive,
}

pub struct ReaderCore {
    state: PlaybackState,
    highlighter: Highlighter,
    monitor: StallMonitor,
    events: broadcast::Sender<ReadingEvent>,
}

impl ReaderCore {
    pub fn new(
        highlighter: Highlighter,
        options: ReadingOptions,
        events: broadcast::Sender<ReadingEvent>,
    ) -> Self {
        Self {
            state: PlaybackState::new(options),
            highlighter,
            monitor: StallMonitor::new(),
            events,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    pub fn highlighter_mut(&mut self) -> &mut Highlighter {
        &mut self.highlighter
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.snapshot()
    }

    pub fn is_playing(&self) -> bool {
        self.state.status == PlaybackStatus::Playing
    }

    /// Replace the session with `chunks`, paused at `start_index`.
    ///
    /// Returns the number of chunks; zero leaves the reader idle.
    pub fn load(&mut self, chunks: Vec<ContentChunk>, start_index: usize) -> usize {
        self.highlighter.clear_all();
        self.monitor.disarm();

        if chunks.is_empty() {
            log::info!("Nothing to read; session left idle");
            self.state.reset();
            self.emit_state();
            return 0;
        }

        let len = chunks.len();
        let session_id = Uuid::new_v4().to_string();
        self.state
            .begin_session(session_id.clone(), chunks.into(), start_index, Utc::now());
        log_info!(
            "Loaded session {} with {} chunks at index {}",
            session_id,
            len,
            self.state.current_index
        );

        self.refresh_display();
        self.emit_state();
        len
    }

    /// Enter `Playing`. A completed session starts over from the top.
    pub fn play(&mut self, now: Instant) -> bool {
        match self.state.status {
            PlaybackStatus::Idle => return false,
            PlaybackStatus::Playing => return true,
            PlaybackStatus::Completed => {
                self.state.set_index(0);
                self.refresh_display();
            }
            PlaybackStatus::Loaded | PlaybackStatus::Paused => {}
        }

        self.state.status = PlaybackStatus::Playing;
        self.monitor.arm(self.state.current_index, now);
        self.emit_state();
        true
    }

    /// Leave `Playing`; a no-op in every other state.
    pub fn pause(&mut self) -> bool {
        if self.state.status != PlaybackStatus::Playing {
            return false;
        }

        self.state.status = PlaybackStatus::Paused;
        self.monitor.disarm();
        self.emit_state();
        true
    }

    pub fn stop(&mut self) {
        self.highlighter.clear_all();
        self.monitor.disarm();
        if self.state.is_active() {
            log_info!("Stopping session {:?}", self.state.session_id);
        }
        self.state.reset();
        self.emit_state();
    }

    /// Index for `fraction` of the way through the session.
    pub fn jump_index(&self, fraction: f64) -> Option<usize> {
        let len = self.state.len();
        if !self.state.is_active() || len == 0 {
            return None;
        }

        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        Some(((fraction * len as f64).floor() as usize).min(len - 1))
    }

    pub fn skip_index(&self, delta: i64) -> Option<usize> {
        let len = self.state.len();
        if !self.state.is_active() || len == 0 {
            return None;
        }

        let current = self.state.current_index as i64;
        let target = current.saturating_add(delta).clamp(0, len as i64 - 1);
        Some(target as usize)
    }

    /// Reposition the read head. A completed session becomes paused.
    pub fn seek(&mut self, index: usize, now: Instant) -> bool {
        if !self.state.is_active() {
            return false;
        }

        self.state.set_index(index);
        if self.state.status == PlaybackStatus::Completed {
            self.state.status = PlaybackStatus::Paused;
        }
        if self.is_playing() {
            self.monitor.arm(self.state.current_index, now);
        }

        self.refresh_display();
        self.emit_state();
        true
    }

    pub fn current_delay(&self) -> Option<Duration> {
        self.state
            .current_chunk()
            .map(|chunk| chunk_delay(chunk, &self.state.options))
    }

    pub fn advance(&mut self, cause: AdvanceCause, now: Instant) -> AdvanceOutcome {
        match self.state.status {
            PlaybackStatus::Idle | PlaybackStatus::Completed => return AdvanceOutcome::Inactive,
            PlaybackStatus::Playing => {}
            PlaybackStatus::Loaded | PlaybackStatus::Paused if cause == AdvanceCause::Forced => {}
            PlaybackStatus::Loaded | PlaybackStatus::Paused => return AdvanceOutcome::Inactive,
        }

        let len = self.state.len();
        let mut next = self.state.current_index + 1;
        if self.state.options.skip_code_blocks {
            while next < len && self.state.chunks[next].is_code() {
                next += 1;
            }
        }

        if next >= len {
            self.finish();
            return AdvanceOutcome::Completed;
        }

        self.state.set_index(next);
        match cause {
            AdvanceCause::Timer => self.monitor.record_advance(next, now),
            AdvanceCause::Forced | AdvanceCause::Recovery if self.is_playing() => {
                self.monitor.arm(next, now)
            }
            _ => {}
        }

        self.refresh_display();
        AdvanceOutcome::Advanced(next)
    }

    fn finish(&mut self) {
        let total = self.state.len();
        self.state.complete();
        self.monitor.disarm();
        log_info!("Finished session {:?} ({} chunks)", self.state.session_id, total);

        let _ = self.events.send(ReadingEvent::Complete { total_words: total });
        self.emit_state();
    }

    pub fn check_stall(&mut self, config: &WatchdogConfig, now: Instant) -> StallAction {
        if !self.is_playing() {
            return StallAction::None;
        }

        let expected = self.current_delay().unwrap_or_default();
        self.monitor
            .check(self.state.current_index, expected, config, now)
    }

    pub fn recover(
        &mut self,
        action: StallAction,
        config: &WatchdogConfig,
        now: Instant,
    ) -> AdvanceOutcome {
        let index = self.state.current_index;
        match action {
            StallAction::None => AdvanceOutcome::Advanced(index),
            StallAction::Retry => {
                log_warn!("Playback stalled at chunk {}; forcing an advance", index);
                self.advance(AdvanceCause::Recovery, now)
            }
            StallAction::Escalate => {
                let target = (index + config.coarse_skip).min(self.state.len().saturating_sub(1));
                log_warn!(
                    "Playback keeps stalling at chunk {}; skipping ahead to {}",
                    index,
                    target
                );
                self.state.set_index(target);
                self.monitor.arm(target, now);
                self.refresh_display();
                self.advance(AdvanceCause::Recovery, now)
            }
        }
    }

    /// Merge `patch` into the options. Delays pick it up on the next chunk.
    pub fn update_options(&mut self, patch: &OptionsPatch) -> ReadingOptions {
        let highlighted = self.state.options.highlight_text;
        self.state.options.merge(patch);

        if highlighted != self.state.options.highlight_text {
            if self.state.options.highlight_text {
                self.apply_highlight();
            } else {
                self.highlighter.clear();
            }
        }

        self.emit_state();
        self.state.options
    }

    /// Re-announce and re-highlight the current chunk.
    pub fn refresh_display(&mut self) {
        let Some(chunk) = self.state.current_chunk() else {
            return;
        };

        let _ = self.events.send(ReadingEvent::Highlight {
            word: chunk.content.clone(),
            index: self.state.current_index,
            total: self.state.len(),
        });
        self.apply_highlight();
    }

    fn apply_highlight(&mut self) {
        if !self.state.options.highlight_text {
            self.highlighter.clear();
            return;
        }

        if let Some(chunk) = self.state.current_chunk() {
            let text = chunk.content.clone();
            self.highlighter.highlight(&text);
        }
    }

    fn emit_state(&self) {
        let _ = self.events.send(ReadingEvent::StateChanged {
            snapshot: self.state.snapshot(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::parse_content;
    use crate::highlight::{ContainerTarget, DocumentHandle};

    fn core_with(doc: &DocumentHandle, options: ReadingOptions) -> (ReaderCore, broadcast::Receiver<ReadingEvent>) {
        let (events, rx) = broadcast::channel(256);
        let highlighter = Highlighter::new(Box::new(doc.clone()), ContainerTarget::selector("#post"));
        (ReaderCore::new(highlighter, options, events), rx)
    }

    fn words(n: usize) -> Vec<ContentChunk> {
        (0..n)
            .map(|i| ContentChunk::paragraph(format!("w{i}")))
            .collect()
    }

    fn words_from(list: &[&str]) -> Vec<ContentChunk> {
        list.iter().map(|w| ContentChunk::paragraph(*w)).collect()
    }

    fn assert_invariants(core: &ReaderCore) {
        let state = core.state();
        if state.is_active() {
            assert!(state.current_index < state.len());
            if state.status == PlaybackStatus::Completed {
                assert_eq!(state.progress, 1.0);
            } else {
                assert_eq!(state.progress, state.current_index as f64 / state.len() as f64);
            }
        }
    }

    #[test]
    fn load_starts_paused() {
        let (mut core, _rx) = core_with(&DocumentHandle::default(), ReadingOptions::default());
        assert_eq!(core.load(words(4), 0), 4);

        let state = core.state();
        assert_eq!(state.status, PlaybackStatus::Loaded);
        assert!(state.is_active() && state.is_paused());
        assert_eq!(state.current_index, 0);
        assert!(state.session_id.is_some());
    }

    #[test]
    fn empty_content_leaves_reader_idle() {
        let (mut core, _rx) = core_with(&DocumentHandle::default(), ReadingOptions::default());
        assert_eq!(core.load(parse_content("  "), 0), 0);
        assert!(!core.state().is_active());
        assert!(!core.play(Instant::now()));
    }

    #[test]
    fn advance_moves_one_step_and_completes() {
        let (mut core, mut rx) = core_with(&DocumentHandle::default(), ReadingOptions::default());
        core.load(words(3), 0);
        let now = Instant::now();
        assert!(core.play(now));

        assert_eq!(core.advance(AdvanceCause::Timer, now), AdvanceOutcome::Advanced(1));
        assert_eq!(core.advance(AdvanceCause::Timer, now), AdvanceOutcome::Advanced(2));
        assert_invariants(&core);
        assert_eq!(core.advance(AdvanceCause::Timer, now), AdvanceOutcome::Completed);

        let state = core.state();
        assert_eq!(state.status, PlaybackStatus::Completed);
        assert!(state.is_paused() && state.is_active());
        assert_eq!(state.progress, 1.0);
        assert_eq!(state.current_index, 2);
        assert_eq!(core.advance(AdvanceCause::Timer, now), AdvanceOutcome::Inactive);

        let mut completions = 0;
        while let Ok(event) = rx.try_recv() {
            if let ReadingEvent::Complete { total_words } = event {
                assert_eq!(total_words, 3);
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
    }

    #[test]
    fn timer_advance_requires_playing_but_forced_does_not() {
        let (mut core, _rx) = core_with(&DocumentHandle::default(), ReadingOptions::default());
        core.load(words(3), 0);
        let now = Instant::now();

        assert_eq!(core.advance(AdvanceCause::Timer, now), AdvanceOutcome::Inactive);
        assert_eq!(core.advance(AdvanceCause::Forced, now), AdvanceOutcome::Advanced(1));
        assert_eq!(core.state().status, PlaybackStatus::Loaded);
    }

    #[test]
    fn skip_code_lands_past_code_chunks() {
        let options = ReadingOptions {
            skip_code_blocks: true,
            ..ReadingOptions::default()
        };
        let (mut core, mut rx) = core_with(&DocumentHandle::default(), options);
        core.load(
            vec![
                ContentChunk::paragraph("A"),
                ContentChunk::code("x=1"),
                ContentChunk::paragraph("B"),
            ],
            0,
        );
        let now = Instant::now();
        core.play(now);
        while rx.try_recv().is_ok() {}

        assert_eq!(core.advance(AdvanceCause::Timer, now), AdvanceOutcome::Advanced(2));
        assert_eq!(core.state().current_chunk().unwrap().content, "B");
        while let Ok(event) = rx.try_recv() {
            if let ReadingEvent::Highlight { word, .. } = event {
                assert_ne!(word, "x=1");
            }
        }
    }

    #[test]
    fn trailing_code_completes_when_skipped() {
        let options = ReadingOptions {
            skip_code_blocks: true,
            ..ReadingOptions::default()
        };
        let (mut core, _rx) = core_with(&DocumentHandle::default(), options);
        core.load(
            vec![
                ContentChunk::paragraph("A"),
                ContentChunk::code("a"),
                ContentChunk::code("b"),
            ],
            0,
        );
        let now = Instant::now();
        core.play(now);
        assert_eq!(core.advance(AdvanceCause::Timer, now), AdvanceOutcome::Completed);
    }

    #[test]
    fn jump_and_skip_indices_clamp() {
        let (mut core, _rx) = core_with(&DocumentHandle::default(), ReadingOptions::default());
        assert_eq!(core.jump_index(0.5), None);
        core.load(words(10), 3);

        assert_eq!(core.jump_index(0.5), Some(5));
        assert_eq!(core.jump_index(1.0), Some(9));
        assert_eq!(core.jump_index(-2.0), Some(0));
        assert_eq!(core.jump_index(f64::NAN), Some(0));
        assert_eq!(core.skip_index(10_000), Some(9));
        assert_eq!(core.skip_index(-10_000), Some(0));
        assert_eq!(core.skip_index(i64::MAX), Some(9));
        assert_eq!(core.skip_index(i64::MIN), Some(0));
    }

    #[test]
    fn seeking_a_completed_session_pauses_it() {
        let (mut core, _rx) = core_with(&DocumentHandle::default(), ReadingOptions::default());
        core.load(words(2), 1);
        let now = Instant::now();
        core.play(now);
        assert_eq!(core.advance(AdvanceCause::Timer, now), AdvanceOutcome::Completed);

        assert!(core.seek(0, now));
        assert_eq!(core.state().status, PlaybackStatus::Paused);
        assert_eq!(core.state().progress, 0.0);
        assert_invariants(&core);
    }

    #[test]
    fn play_after_completion_restarts() {
        let (mut core, _rx) = core_with(&DocumentHandle::default(), ReadingOptions::default());
        core.load(words(2), 1);
        let now = Instant::now();
        core.play(now);
        core.advance(AdvanceCause::Timer, now);

        assert!(core.play(now));
        assert_eq!(core.state().status, PlaybackStatus::Playing);
        assert_eq!(core.state().current_index, 0);
    }

    #[test]
    fn pause_is_idempotent() {
        let (mut core, _rx) = core_with(&DocumentHandle::default(), ReadingOptions::default());
        core.load(words(3), 0);
        core.play(Instant::now());

        assert!(core.pause());
        let once = core.snapshot();
        assert!(!core.pause());
        assert_eq!(core.snapshot(), once);
    }

    #[test]
    fn highlights_follow_the_read_head() {
        let doc = DocumentHandle::default();
        doc.insert("#post", "<p>alpha beta gamma</p>");
        let (mut core, _rx) = core_with(&doc, ReadingOptions::default());
        core.load(parse_content("<p>alpha beta gamma</p>"), 0);
        assert_eq!(doc.marks()[0].text, "alpha");

        core.advance(AdvanceCause::Forced, Instant::now());
        let marks = doc.marks();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].text, "beta");
    }

    #[test]
    fn disabling_highlight_clears_the_mark() {
        let doc = DocumentHandle::default();
        doc.insert("#post", "<p>alpha beta</p>");
        let (mut core, mut rx) = core_with(&doc, ReadingOptions::default());
        core.load(words_from(&["alpha", "beta"]), 0);
        assert_eq!(doc.marks().len(), 1);

        let options = core.update_options(&OptionsPatch::highlight_text(false));
        assert!(!options.highlight_text);
        assert!(doc.marks().is_empty());

        while rx.try_recv().is_ok() {}
        core.advance(AdvanceCause::Forced, Instant::now());
        assert!(doc.marks().is_empty());
        assert!(matches!(rx.try_recv(), Ok(ReadingEvent::Highlight { index: 1, .. })));
    }

    #[test]
    fn stop_resets_everything() {
        let doc = DocumentHandle::default();
        doc.insert("#post", "<p>w0 w1 w2 w3</p>");
        let (mut core, _rx) = core_with(&doc, ReadingOptions::default());
        core.load(words(4), 0);
        let now = Instant::now();
        core.play(now);
        core.advance(AdvanceCause::Timer, now);
        core.seek(3, now);

        core.stop();
        let state = core.state();
        assert!(!state.is_active());
        assert!(state.chunks.is_empty());
        assert_eq!(state.current_index, 0);
        assert_eq!(state.progress, 0.0);
        assert!(doc.marks().is_empty());
    }

    #[test]
    fn escalation_skips_ahead_coarsely() {
        let (mut core, _rx) = core_with(&DocumentHandle::default(), ReadingOptions::default());
        core.load(words(10), 0);
        let config = WatchdogConfig::default();
        let start = Instant::now();
        core.play(start);

        assert_eq!(
            core.recover(StallAction::Escalate, &config, start),
            AdvanceOutcome::Advanced(4)
        );
        core.seek(5, start);
        assert_eq!(
            core.recover(StallAction::Escalate, &config, start),
            AdvanceOutcome::Advanced(9)
        );
        core.seek(8, start);
        assert_eq!(
            core.recover(StallAction::Escalate, &config, start),
            AdvanceOutcome::Completed
        );
        assert_eq!(core.state().status, PlaybackStatus::Completed);
    }
}
