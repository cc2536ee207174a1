use std::sync::Weak;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::controller::ControllerInner;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct WatchdogConfig {
    pub check_interval: Duration,
    /// Slack on top of the current chunk's delay before playback counts as stalled.
    pub stall_threshold: Duration,
    /// Consecutive stalls tolerated before the coarse skip.
    pub escalate_after: u32,
    pub coarse_skip: usize,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(1),
            stall_threshold: Duration::from_secs(2),
            escalate_after: 2,
            coarse_skip: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallAction {
    None,
    /// Force a single advance and re-arm the timer.
    Retry,
    /// Jump ahead `coarse_skip` chunks and re-arm the timer.
    Escalate,
}

/// Tracks when playback last moved.
#[derive(Debug, Clone, Default)]
pub struct StallMonitor {
    last_advance: Option<Instant>,
    last_index: usize,
    consecutive_stalls: u32,
}

impl StallMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_stalls(&self) -> u32 {
        self.consecutive_stalls
    }

    /// Start watching from `index`, keeping the stall count.
    pub fn arm(&mut self, index: usize, now: Instant) {
        self.last_advance = Some(now);
        self.last_index = index;
    }

    /// A scheduled advance happened; playback is healthy again.
    pub fn record_advance(&mut self, index: usize, now: Instant) {
        self.arm(index, now);
        self.consecutive_stalls = 0;
    }

    pub fn disarm(&mut self) {
        self.last_advance = None;
        self.consecutive_stalls = 0;
    }

    pub fn check(
        &mut self,
        index: usize,
        expected_delay: Duration,
        config: &WatchdogConfig,
        now: Instant,
    ) -> StallAction {
        let Some(last_advance) = self.last_advance else {
            return StallAction::None;
        };

        if index != self.last_index {
            self.arm(index, now);
            return StallAction::None;
        }

        if now.saturating_duration_since(last_advance) <= expected_delay + config.stall_threshold {
            return StallAction::None;
        }

        self.consecutive_stalls += 1;
        if self.consecutive_stalls > config.escalate_after {
            self.consecutive_stalls = 0;
            StallAction::Escalate
        } else {
            StallAction::Retry
        }
    }
}

/// Supervises the advance task while a session is playing.
pub(crate) async fn watchdog_loop(
    controller: Weak<ControllerInner>,
    config: WatchdogConfig,
    cancel_token: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + config.check_interval, config.check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("watchdog shutting down");
                break;
            }
            _ = ticker.tick() => {
                let Some(inner) = controller.upgrade() else {
                    break;
                };
                if !ControllerInner::supervise(&inner).await {
                    break;
                }
            }
        }
    }
}
