use std::sync::{Arc, Weak};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::content::{parse_content_with, ContentSource};
use crate::error::SpeedReadError;
use crate::highlight::{ContainerTarget, ContentHost, Highlighter};

use super::engine::{AdvanceCause, AdvanceOutcome, ReaderCore};
use super::events::ReadingEvent;
use super::options::{OptionsPatch, ReadingOptions};
use super::state::{PlaybackSnapshot, PlaybackState, PlaybackStatus};
use super::watchdog::{watchdog_loop, StallAction, WatchdogConfig};

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub target: ContainerTarget,
    pub options: ReadingOptions,
    pub watchdog: WatchdogConfig,
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            target: ContainerTarget::default(),
            options: ReadingOptions::default(),
            watchdog: WatchdogConfig::default(),
            event_capacity: 256,
        }
    }
}

struct WatchdogTask {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

struct Shared {
    core: ReaderCore,
    ticker: Option<JoinHandle<()>>,
    /// Bumped on every cancel so a woken task can tell it was superseded.
    generation: u64,
    watchdog: Option<WatchdogTask>,
}

impl Shared {
    fn cancel_ticker(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }

    fn arm_ticker(&mut self, controller: Weak<ControllerInner>) {
        self.cancel_ticker();
        let generation = self.generation;
        self.ticker = Some(tokio::spawn(advance_loop(controller, generation)));
    }

    fn ensure_watchdog(&mut self, controller: Weak<ControllerInner>, config: WatchdogConfig) {
        if self
            .watchdog
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
        {
            return;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(watchdog_loop(controller, config, cancel_token.clone()));
        self.watchdog = Some(WatchdogTask {
            cancel_token,
            handle,
        });
    }

    fn cancel_watchdog(&mut self) {
        if let Some(task) = self.watchdog.take() {
            task.cancel_token.cancel();
        }
    }

    fn cancel_all(&mut self) {
        self.cancel_ticker();
        self.cancel_watchdog();
    }
}

pub(crate) struct ControllerInner {
    shared: Mutex<Shared>,
    events: broadcast::Sender<ReadingEvent>,
    target: ContainerTarget,
    watchdog: WatchdogConfig,
}

impl ControllerInner {
    /// One watchdog pass. Returns false once there is nothing left to supervise.
    pub(crate) async fn supervise(this: &Arc<Self>) -> bool {
        let mut shared = this.shared.lock().await;
        if !shared.core.is_playing() {
            return false;
        }

        let now = Instant::now();
        let action = shared.core.check_stall(&this.watchdog, now);
        if action == StallAction::None {
            return true;
        }

        shared.cancel_ticker();
        match shared.core.recover(action, &this.watchdog, now) {
            AdvanceOutcome::Advanced(_) => {
                shared.arm_ticker(Arc::downgrade(this));
                true
            }
            AdvanceOutcome::Completed | AdvanceOutcome::Inactive => {
                shared.watchdog = None;
                false
            }
        }
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        let shared = self.shared.get_mut();
        shared.cancel_all();
        shared.core.stop();
    }
}

/// Sleeps for the shown chunk's delay, then advances, until superseded.
async fn advance_loop(controller: Weak<ControllerInner>, generation: u64) {
    loop {
        let delay = {
            let Some(inner) = controller.upgrade() else {
                return;
            };
            let shared = inner.shared.lock().await;
            if shared.generation != generation || !shared.core.is_playing() {
                return;
            }
            match shared.core.current_delay() {
                Some(delay) => delay,
                None => return,
            }
        };

        tokio::time::sleep(delay).await;

        let Some(inner) = controller.upgrade() else {
            return;
        };
        let mut shared = inner.shared.lock().await;
        if shared.generation != generation {
            return;
        }

        match shared.core.advance(AdvanceCause::Timer, Instant::now()) {
            AdvanceOutcome::Advanced(_) => {}
            AdvanceOutcome::Completed => {
                shared.cancel_watchdog();
                shared.ticker = None;
                return;
            }
            AdvanceOutcome::Inactive => return,
        }
    }
}

/// Handle to one reading session. Clones share the session.
#[derive(Clone)]
pub struct ReadingController {
    inner: Arc<ControllerInner>,
}

impl ReadingController {
    pub fn new(host: Box<dyn ContentHost>, config: ControllerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let highlighter = Highlighter::new(host, config.target.clone());
        let core = ReaderCore::new(highlighter, config.options, events.clone());

        Self {
            inner: Arc::new(ControllerInner {
                shared: Mutex::new(Shared {
                    core,
                    ticker: None,
                    generation: 0,
                    watchdog: None,
                }),
                events,
                target: config.target,
                watchdog: config.watchdog,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReadingEvent> {
        self.inner.events.subscribe()
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.shared.lock().await.core.snapshot()
    }

    pub async fn state(&self) -> PlaybackState {
        self.inner.shared.lock().await.core.state().clone()
    }

    pub async fn options(&self) -> ReadingOptions {
        self.inner.shared.lock().await.core.state().options
    }

    /// Start from the configured container.
    pub async fn start(&self) -> Result<usize, SpeedReadError> {
        let source = match (&self.inner.target.selector, &self.inner.target.slug) {
            (Some(selector), _) => ContentSource::Selector(selector.clone()),
            (None, Some(_)) => {
                let candidates = self.inner.target.candidates();
                ContentSource::Selector(candidates[0].clone())
            }
            (None, None) => return Err(SpeedReadError::NoContentSource),
        };
        self.start_from(source, 0).await
    }

    /// Parse `source` into a fresh paused session at `start_index`.
    pub async fn start_from(
        &self,
        source: ContentSource,
        start_index: usize,
    ) -> Result<usize, SpeedReadError> {
        let selector = match source {
            ContentSource::Html(content) => {
                return Ok(self.start_with_content(&content, start_index).await)
            }
            other => other.selector().ok_or(SpeedReadError::NoContentSource)?,
        };

        let mut shared = self.inner.shared.lock().await;
        let Some(html) = shared
            .core
            .highlighter()
            .host()
            .inner_html(&selector)
        else {
            log::warn!("Content container {} not found", selector);
            return Err(SpeedReadError::ContentNotFound(selector));
        };

        if shared.core.highlighter().target().selector.is_none() {
            let target = ContainerTarget {
                selector: Some(selector),
                ..shared.core.highlighter().target().clone()
            };
            shared.core.highlighter_mut().set_target(target);
        }

        shared.cancel_all();
        let chunks = parse_content_with(&html, shared.core.state().options.chunk_size);
        Ok(shared.core.load(chunks, start_index))
    }

    /// Start over pre-extracted content. Returns the chunk count.
    pub async fn start_with_content(&self, content: &str, start_index: usize) -> usize {
        let mut shared = self.inner.shared.lock().await;
        shared.cancel_all();
        let chunks = parse_content_with(content, shared.core.state().options.chunk_size);
        shared.core.load(chunks, start_index)
    }

    pub async fn resume(&self) -> Result<(), SpeedReadError> {
        let mut shared = self.inner.shared.lock().await;
        if shared.core.is_playing() {
            return Ok(());
        }
        if !shared.core.play(Instant::now()) {
            return Err(SpeedReadError::NotActive);
        }

        let controller = Arc::downgrade(&self.inner);
        shared.arm_ticker(controller.clone());
        shared.ensure_watchdog(controller, self.inner.watchdog);
        Ok(())
    }

    pub async fn pause(&self) {
        let mut shared = self.inner.shared.lock().await;
        shared.cancel_all();
        shared.core.pause();
    }

    /// Play or pause; returns whether playback is now running.
    pub async fn toggle(&self) -> Result<bool, SpeedReadError> {
        let playing = self.inner.shared.lock().await.core.is_playing();
        if playing {
            self.pause().await;
            Ok(false)
        } else {
            self.resume().await?;
            Ok(true)
        }
    }

    pub async fn stop(&self) {
        let mut shared = self.inner.shared.lock().await;
        shared.cancel_all();
        shared.core.stop();
    }

    pub async fn jump_to(&self, fraction: f64) {
        let mut shared = self.inner.shared.lock().await;
        if let Some(index) = shared.core.jump_index(fraction) {
            self.reposition(&mut shared, index);
        }
    }

    pub async fn skip(&self, delta: i64) {
        let mut shared = self.inner.shared.lock().await;
        if let Some(index) = shared.core.skip_index(delta) {
            self.reposition(&mut shared, index);
        }
    }

    pub async fn start_from_index(&self, index: usize) {
        let mut shared = self.inner.shared.lock().await;
        if shared.core.state().is_active() {
            self.reposition(&mut shared, index);
        }
    }

    fn reposition(&self, shared: &mut Shared, index: usize) {
        shared.cancel_ticker();
        shared.core.seek(index, Instant::now());
        if shared.core.is_playing() {
            shared.arm_ticker(Arc::downgrade(&self.inner));
        }
    }

    /// Advance exactly one chunk now, replacing any pending advance.
    pub async fn force_advance(&self) -> AdvanceOutcome {
        let mut shared = self.inner.shared.lock().await;
        shared.cancel_ticker();

        let outcome = shared.core.advance(AdvanceCause::Forced, Instant::now());
        match outcome {
            AdvanceOutcome::Advanced(_) if shared.core.is_playing() => {
                shared.arm_ticker(Arc::downgrade(&self.inner));
            }
            AdvanceOutcome::Completed => shared.cancel_watchdog(),
            _ => {}
        }
        outcome
    }

    /// Keep playback moving if it is supposed to be. Returns whether it is.
    pub async fn ensure_playing(&self) -> bool {
        ControllerInner::supervise(&self.inner).await
    }

    pub async fn update_options(&self, patch: OptionsPatch) -> ReadingOptions {
        self.inner.shared.lock().await.core.update_options(&patch)
    }

    pub async fn refresh_display(&self) {
        self.inner.shared.lock().await.core.refresh_display();
    }

    pub async fn status(&self) -> PlaybackStatus {
        self.inner.shared.lock().await.core.state().status
    }

    #[cfg(test)]
    async fn kill_ticker(&self) {
        if let Some(handle) = self.inner.shared.lock().await.ticker.take() {
            handle.abort();
        }
    }
}
