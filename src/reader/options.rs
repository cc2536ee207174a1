use serde::{Deserialize, Serialize};

pub const DEFAULT_WORDS_PER_MINUTE: u32 = 300;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadingOptions {
    pub words_per_minute: u32,
    pub chunk_size: usize,
    pub font_scale: f32,
    pub highlight_text: bool,
    pub skip_code_blocks: bool,
    pub pause_on_headings: bool,
    pub slow_down_on_complexity: bool,
}

impl Default for ReadingOptions {
    fn default() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            chunk_size: 1,
            font_scale: 1.0,
            highlight_text: true,
            skip_code_blocks: false,
            pause_on_headings: true,
            slow_down_on_complexity: true,
        }
    }
}

impl ReadingOptions {
    /// Apply the fields present in `patch`, leaving the rest untouched.
    pub fn merge(&mut self, patch: &OptionsPatch) {
        if let Some(wpm) = patch.words_per_minute {
            self.words_per_minute = wpm.max(1);
        }
        if let Some(chunk_size) = patch.chunk_size {
            self.chunk_size = chunk_size.max(1);
        }
        if let Some(font_scale) = patch.font_scale {
            self.font_scale = font_scale;
        }
        if let Some(highlight) = patch.highlight_text {
            self.highlight_text = highlight;
        }
        if let Some(skip) = patch.skip_code_blocks {
            self.skip_code_blocks = skip;
        }
        if let Some(pause) = patch.pause_on_headings {
            self.pause_on_headings = pause;
        }
        if let Some(slow) = patch.slow_down_on_complexity {
            self.slow_down_on_complexity = slow;
        }
    }

    pub fn merged(mut self, patch: &OptionsPatch) -> Self {
        self.merge(patch);
        self
    }
}

/// Partial update for [`ReadingOptions`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptionsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words_per_minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_text: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_code_blocks: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_on_headings: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_down_on_complexity: Option<bool>,
}

impl OptionsPatch {
    pub fn words_per_minute(wpm: u32) -> Self {
        Self {
            words_per_minute: Some(wpm),
            ..Self::default()
        }
    }

    pub fn highlight_text(enabled: bool) -> Self {
        Self {
            highlight_text: Some(enabled),
            ..Self::default()
        }
    }
}
