use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far into an article the reader got.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub slug: String,
    /// Fraction of the article read, in `[0, 1]`.
    pub progress: f64,
    pub last_read: DateTime<Utc>,
}

impl ReadingProgress {
    /// Chunk index to resume from in a session of `total` chunks.
    pub fn resume_index(&self, total: usize) -> usize {
        if total == 0 || self.progress >= 1.0 {
            return 0;
        }
        ((self.progress * total as f64).floor() as usize).min(total - 1)
    }
}
