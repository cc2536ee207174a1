pub mod progress;

pub use progress::ReadingProgress;
