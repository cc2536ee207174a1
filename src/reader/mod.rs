pub mod controller;
pub mod engine;
pub mod events;
pub mod options;
pub mod state;
pub mod timing;
pub mod watchdog;

pub use controller::{ControllerConfig, ReadingController};
pub use engine::{AdvanceCause, AdvanceOutcome};
pub use events::ReadingEvent;
pub use options::{OptionsPatch, ReadingOptions};
pub use state::{PlaybackSnapshot, PlaybackState, PlaybackStatus};
pub use watchdog::{StallAction, WatchdogConfig};
