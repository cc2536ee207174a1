use serde::Serialize;

use crate::content::{format_reading_time, split_at_orp, ChunkKind};
use crate::reader::{PlaybackSnapshot, PlaybackStatus};

use super::mini_player::MiniPlayer;
use super::ShellMode;

/// Everything a shell needs to draw one frame.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShellView {
    pub mode: ShellMode,
    pub status: PlaybackStatus,
    pub word: String,
    pub kind: Option<ChunkKind>,
    pub before_focus: String,
    pub focus: String,
    pub after_focus: String,
    /// One-based position of the current chunk; 0 when nothing is loaded.
    pub position: usize,
    pub total: usize,
    pub percent: u8,
    pub words_per_minute: u32,
    pub time_remaining: String,
    pub notice: Option<String>,
    pub show_shortcuts: bool,
    pub show_settings: bool,
    pub mini_player: Option<MiniPlayer>,
}

impl ShellView {
    pub fn new(snapshot: &PlaybackSnapshot, mode: ShellMode) -> Self {
        let word = snapshot
            .current_chunk
            .as_ref()
            .map(|chunk| chunk.content.clone())
            .unwrap_or_default();
        let is_marker = snapshot
            .current_chunk
            .as_ref()
            .is_some_and(|chunk| chunk.kind.is_marker());
        let (before, focus, after) = if is_marker {
            ("", word.as_str(), "")
        } else {
            split_at_orp(&word)
        };
        let (before_focus, focus, after_focus) =
            (before.to_string(), focus.to_string(), after.to_string());

        let position = if snapshot.total == 0 {
            0
        } else {
            snapshot.current_index + 1
        };

        Self {
            mode,
            status: snapshot.status,
            kind: snapshot.current_chunk.as_ref().map(|chunk| chunk.kind),
            word,
            before_focus,
            focus,
            after_focus,
            position,
            total: snapshot.total,
            percent: (snapshot.progress.clamp(0.0, 1.0) * 100.0).round() as u8,
            words_per_minute: snapshot.options.words_per_minute,
            time_remaining: format_reading_time(snapshot.remaining_ms as f64 / 60_000.0),
            notice: None,
            show_shortcuts: false,
            show_settings: false,
            mini_player: None,
        }
    }

    fn status_glyph(&self) -> &'static str {
        match self.status {
            PlaybackStatus::Playing => ">",
            PlaybackStatus::Completed => "#",
            PlaybackStatus::Idle => "-",
            PlaybackStatus::Loaded | PlaybackStatus::Paused => "||",
        }
    }

    /// Single-line rendering used by the terminal host.
    pub fn render_line(&self) -> String {
        if let Some(notice) = &self.notice {
            if self.total == 0 || self.status == PlaybackStatus::Idle {
                return notice.clone();
            }
        }

        let word = format!("{}[{}]{}", self.before_focus, self.focus, self.after_focus);
        let mut line = match self.mode {
            ShellMode::Focus => format!(
                "{} {:<24} {}/{} {:>3}% {} wpm, {} left",
                self.status_glyph(),
                word,
                self.position,
                self.total,
                self.percent,
                self.words_per_minute,
                self.time_remaining
            ),
            ShellMode::MiniPlayer => {
                if self.mini_player.is_some_and(|mini| mini.minimized) {
                    format!("{} {:>3}%", self.status_glyph(), self.percent)
                } else {
                    format!("{} {} {:>3}%", self.status_glyph(), word, self.percent)
                }
            }
        };

        if let Some(notice) = &self.notice {
            line.push_str("  ");
            line.push_str(notice);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentChunk;
    use crate::reader::ReadingOptions;

    fn snapshot(word: &str, index: usize, total: usize) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: PlaybackStatus::Playing,
            session_id: Some("s".into()),
            current_index: index,
            total,
            progress: index as f64 / total as f64,
            current_chunk: Some(ContentChunk::paragraph(word)),
            options: ReadingOptions::default(),
            is_active: true,
            is_paused: false,
            remaining_ms: 80_000,
        }
    }

    #[test]
    fn splits_word_at_recognition_point() {
        let view = ShellView::new(&snapshot("reading", 3, 12), ShellMode::Focus);
        assert_eq!(view.before_focus, "re");
        assert_eq!(view.focus, "a");
        assert_eq!(view.after_focus, "ding");
        assert_eq!(view.position, 4);
        assert_eq!(view.percent, 25);
        assert_eq!(view.time_remaining, "1 min 20 sec");
    }

    #[test]
    fn focus_line_shows_position_and_speed() {
        let view = ShellView::new(&snapshot("hello", 0, 4), ShellMode::Focus);
        let line = view.render_line();
        assert!(line.starts_with("> he[l]lo"));
        assert!(line.contains("1/4"));
        assert!(line.contains("300 wpm"));
    }

    #[test]
    fn idle_view_renders_notice_alone() {
        let mut snap = snapshot("", 0, 1);
        snap.status = PlaybackStatus::Idle;
        snap.total = 0;
        snap.current_chunk = None;

        let mut view = ShellView::new(&snap, ShellMode::Focus);
        view.notice = Some("Nothing to read".into());
        assert_eq!(view.position, 0);
        assert_eq!(view.render_line(), "Nothing to read");
    }

    #[test]
    fn markers_are_not_split() {
        let mut snap = snapshot("", 1, 2);
        snap.current_chunk = Some(ContentChunk::new("[Image]", ChunkKind::Image));
        let view = ShellView::new(&snap, ShellMode::MiniPlayer);
        assert_eq!(view.focus, "[Image]");
        assert!(view.render_line().contains("[[Image]]"));
    }
}
