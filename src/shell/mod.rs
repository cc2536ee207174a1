//! Focus and mini-player presentation over one shared reading session.
//!
//! Both modes drive the same [`ReadingController`]; switching between them
//! only changes chrome, never the session.

pub mod mini_player;
pub mod shortcuts;
pub mod view;

use serde::{Deserialize, Serialize};

use crate::content::ContentSource;
use crate::error::SpeedReadError;
use crate::log_info;
use crate::reader::{OptionsPatch, ReadingController, ReadingEvent, ReadingOptions};

pub use mini_player::{MiniPlayer, Viewport};
pub use shortcuts::{command_for_key, Key, SHORTCUTS};
pub use view::ShellView;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

pub const SKIP_STEP: i64 = 10;
pub const SPEED_STEP: u32 = 50;
pub const MIN_SHELL_WPM: u32 = 100;
pub const MAX_SHELL_WPM: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShellMode {
    Focus,
    MiniPlayer,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Focus
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    TogglePlay,
    SkipForward,
    SkipBackward,
    /// Jump to a fraction of the session.
    Seek(f64),
    SpeedUp,
    SpeedDown,
    SetSpeed(u32),
    SwitchMode(ShellMode),
    ToggleShortcuts,
    ToggleSettings,
    ToggleMinimized,
    Drag { dx: f64, dy: f64 },
    UpdateOptions(OptionsPatch),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellNotice {
    ContentNotFound,
    NothingToRead,
    Finished,
}

impl ShellNotice {
    pub fn message(&self) -> &'static str {
        match self {
            ShellNotice::ContentNotFound => "Could not find content to speed read",
            ShellNotice::NothingToRead => "Nothing to read",
            ShellNotice::Finished => "Finished",
        }
    }
}

pub struct PlayerShell {
    controller: ReadingController,
    mode: ShellMode,
    mini_player: MiniPlayer,
    show_shortcuts: bool,
    show_settings: bool,
    notice: Option<ShellNotice>,
    closed: bool,
}

impl PlayerShell {
    pub fn new(controller: ReadingController, mode: ShellMode) -> Self {
        Self::with_viewport(controller, mode, Viewport::default())
    }

    pub fn with_viewport(controller: ReadingController, mode: ShellMode, viewport: Viewport) -> Self {
        Self {
            controller,
            mode,
            mini_player: MiniPlayer::new(viewport),
            show_shortcuts: false,
            show_settings: false,
            notice: None,
            closed: false,
        }
    }

    pub fn controller(&self) -> &ReadingController {
        &self.controller
    }

    pub fn mode(&self) -> ShellMode {
        self.mode
    }

    pub fn mini_player(&self) -> &MiniPlayer {
        &self.mini_player
    }

    pub fn notice(&self) -> Option<ShellNotice> {
        self.notice
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Load `source` into a paused session. Failures leave a notice for the view.
    pub async fn open(
        &mut self,
        source: ContentSource,
        start_index: usize,
    ) -> Result<usize, SpeedReadError> {
        self.closed = false;
        self.notice = None;

        match self.controller.start_from(source, start_index).await {
            Ok(0) => {
                self.notice = Some(ShellNotice::NothingToRead);
                Ok(0)
            }
            Ok(total) => Ok(total),
            Err(err) => {
                if matches!(
                    err,
                    SpeedReadError::ContentNotFound(_) | SpeedReadError::NoContentSource
                ) {
                    self.notice = Some(ShellNotice::ContentNotFound);
                }
                Err(err)
            }
        }
    }

    pub async fn handle(&mut self, command: ShellCommand) -> Result<(), SpeedReadError> {
        match command {
            ShellCommand::TogglePlay => {
                if self.controller.toggle().await? && self.notice == Some(ShellNotice::Finished) {
                    self.notice = None;
                }
            }
            ShellCommand::SkipForward => self.controller.skip(SKIP_STEP).await,
            ShellCommand::SkipBackward => self.controller.skip(-SKIP_STEP).await,
            ShellCommand::Seek(fraction) => self.controller.jump_to(fraction).await,
            ShellCommand::SpeedUp => {
                let current = self.controller.options().await.words_per_minute;
                self.set_speed(current.saturating_add(SPEED_STEP)).await;
            }
            ShellCommand::SpeedDown => {
                let current = self.controller.options().await.words_per_minute;
                self.set_speed(current.saturating_sub(SPEED_STEP)).await;
            }
            ShellCommand::SetSpeed(wpm) => {
                self.set_speed(wpm).await;
            }
            ShellCommand::SwitchMode(mode) => {
                if self.mode != mode {
                    log_info!("Switching reader shell to {:?}", mode);
                    self.mode = mode;
                }
            }
            ShellCommand::ToggleShortcuts => self.show_shortcuts = !self.show_shortcuts,
            ShellCommand::ToggleSettings => self.show_settings = !self.show_settings,
            ShellCommand::ToggleMinimized => {
                if self.mode == ShellMode::MiniPlayer {
                    self.mini_player.toggle_minimized();
                }
            }
            ShellCommand::Drag { dx, dy } => {
                if self.mode == ShellMode::MiniPlayer {
                    self.mini_player.drag_by(dx, dy);
                }
            }
            ShellCommand::UpdateOptions(patch) => {
                self.controller.update_options(patch).await;
            }
            ShellCommand::Close => {
                self.controller.stop().await;
                self.closed = true;
            }
        }
        Ok(())
    }

    /// Returns false when the key has no binding.
    pub async fn handle_key(&mut self, key: Key) -> Result<bool, SpeedReadError> {
        match command_for_key(key) {
            Some(command) => {
                self.handle(command).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_speed(&self, words_per_minute: u32) -> ReadingOptions {
        let clamped = words_per_minute.clamp(MIN_SHELL_WPM, MAX_SHELL_WPM);
        self.controller
            .update_options(OptionsPatch::words_per_minute(clamped))
            .await
    }

    /// Track session events that change what the shell shows.
    pub fn observe(&mut self, event: &ReadingEvent) {
        if let ReadingEvent::Complete { .. } = event {
            self.notice = Some(ShellNotice::Finished);
        }
    }

    pub async fn view(&self) -> ShellView {
        let snapshot = self.controller.snapshot().await;
        let mut view = ShellView::new(&snapshot, self.mode);
        view.notice = self.notice.map(|notice| notice.message().to_string());
        view.show_shortcuts = self.show_shortcuts;
        view.show_settings = self.show_settings;
        if self.mode == ShellMode::MiniPlayer {
            view.mini_player = Some(self.mini_player);
        }
        view
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::highlight::{ContainerTarget, DocumentHandle};
    use crate::reader::{ControllerConfig, PlaybackStatus};

    fn shell(doc: &DocumentHandle) -> PlayerShell {
        let controller = ReadingController::new(
            Box::new(doc.clone()),
            ControllerConfig {
                target: ContainerTarget::selector("#post"),
                options: ReadingOptions {
                    slow_down_on_complexity: false,
                    ..ReadingOptions::default()
                },
                ..ControllerConfig::default()
            },
        );
        PlayerShell::new(controller, ShellMode::Focus)
    }

    fn words(n: usize) -> String {
        let body: String = (0..n).map(|i| format!("w{i} ")).collect();
        format!("<p>{body}</p>")
    }

    #[tokio::test]
    async fn missing_content_shows_notice() {
        let doc = DocumentHandle::default();
        let mut shell = shell(&doc);

        let err = shell
            .open(ContentSource::Selector("#post".into()), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, SpeedReadError::ContentNotFound(_)));
        assert_eq!(shell.notice(), Some(ShellNotice::ContentNotFound));
        assert_eq!(
            shell.view().await.render_line(),
            "Could not find content to speed read"
        );
    }

    #[tokio::test]
    async fn empty_content_shows_nothing_to_read() {
        let doc = DocumentHandle::default();
        doc.insert("#post", "<p>   </p>");
        let mut shell = shell(&doc);

        let total = shell
            .open(ContentSource::Selector("#post".into()), 0)
            .await
            .unwrap();
        assert_eq!(total, 0);
        assert_eq!(shell.notice(), Some(ShellNotice::NothingToRead));
    }

    #[tokio::test(start_paused = true)]
    async fn switching_modes_keeps_the_session() {
        let doc = DocumentHandle::default();
        doc.insert("#post", &words(20));
        let mut shell = shell(&doc);
        shell
            .open(ContentSource::Selector("#post".into()), 0)
            .await
            .unwrap();
        shell.handle(ShellCommand::TogglePlay).await.unwrap();
        tokio::time::sleep(Duration::from_millis(650)).await;
        shell.handle(ShellCommand::TogglePlay).await.unwrap();

        let before = shell.controller().snapshot().await;
        shell
            .handle(ShellCommand::SwitchMode(ShellMode::MiniPlayer))
            .await
            .unwrap();
        let after = shell.controller().snapshot().await;

        assert_eq!(shell.mode(), ShellMode::MiniPlayer);
        assert_eq!(before.session_id, after.session_id);
        assert_eq!(before.current_index, after.current_index);
        assert!(after.current_index > 0);
        assert!(shell.view().await.mini_player.is_some());
    }

    #[tokio::test]
    async fn skip_and_seek_move_the_session() {
        let doc = DocumentHandle::default();
        doc.insert("#post", &words(40));
        let mut shell = shell(&doc);
        shell
            .open(ContentSource::Selector("#post".into()), 0)
            .await
            .unwrap();

        shell.handle(ShellCommand::SkipForward).await.unwrap();
        assert_eq!(shell.controller().snapshot().await.current_index, 10);
        shell.handle_key(Key::Left).await.unwrap();
        shell.handle_key(Key::Left).await.unwrap();
        assert_eq!(shell.controller().snapshot().await.current_index, 0);

        shell.handle(ShellCommand::Seek(0.5)).await.unwrap();
        assert_eq!(shell.controller().snapshot().await.current_index, 20);
    }

    #[tokio::test]
    async fn speed_changes_are_clamped() {
        let doc = DocumentHandle::default();
        let mut shell = shell(&doc);

        shell.handle(ShellCommand::SpeedUp).await.unwrap();
        assert_eq!(shell.controller().options().await.words_per_minute, 350);

        shell.handle(ShellCommand::SetSpeed(5_000)).await.unwrap();
        assert_eq!(shell.controller().options().await.words_per_minute, 1000);

        shell.handle(ShellCommand::SetSpeed(120)).await.unwrap();
        shell.handle_key(Key::Char('-')).await.unwrap();
        assert_eq!(shell.controller().options().await.words_per_minute, 100);
    }

    #[tokio::test]
    async fn drag_only_applies_to_the_mini_player() {
        let doc = DocumentHandle::default();
        let mut shell = shell(&doc);

        shell
            .handle(ShellCommand::Drag { dx: 100.0, dy: 0.0 })
            .await
            .unwrap();
        assert_eq!(shell.mini_player().position(), (20.0, 20.0));

        shell.handle_key(Key::Char('m')).await.unwrap();
        shell
            .handle(ShellCommand::Drag { dx: 100.0, dy: 0.0 })
            .await
            .unwrap();
        assert_eq!(shell.mini_player().position(), (120.0, 20.0));
    }

    #[tokio::test]
    async fn finished_notice_clears_on_replay() {
        let doc = DocumentHandle::default();
        doc.insert("#post", &words(3));
        let mut shell = shell(&doc);
        shell
            .open(ContentSource::Selector("#post".into()), 0)
            .await
            .unwrap();

        shell.observe(&ReadingEvent::Complete { total_words: 3 });
        assert_eq!(shell.notice(), Some(ShellNotice::Finished));

        shell.handle(ShellCommand::TogglePlay).await.unwrap();
        assert_eq!(shell.notice(), None);
        shell.handle(ShellCommand::Close).await.unwrap();
    }

    #[tokio::test]
    async fn escape_closes_and_stops() {
        let doc = DocumentHandle::default();
        doc.insert("#post", &words(5));
        let mut shell = shell(&doc);
        shell
            .open(ContentSource::Selector("#post".into()), 0)
            .await
            .unwrap();

        assert!(shell.handle_key(Key::Escape).await.unwrap());
        assert!(shell.is_closed());
        assert_eq!(shell.controller().status().await, PlaybackStatus::Idle);
        assert!(doc.marks().is_empty());
        assert!(!shell.handle_key(Key::Char('z')).await.unwrap());
    }

    #[tokio::test]
    async fn toggling_without_a_session_is_not_active() {
        let mut shell = shell(&DocumentHandle::default());
        let err = shell.handle(ShellCommand::TogglePlay).await.unwrap_err();
        assert!(matches!(err, SpeedReadError::NotActive));
    }
}
