use std::time::Duration;

use crate::content::{text::has_pause_punctuation, ChunkKind, ContentChunk};

use super::options::ReadingOptions;

pub const HEADING_FACTOR: f64 = 2.5;
pub const CODE_FACTOR: f64 = 1.5;
pub const LIST_FACTOR: f64 = 1.2;
pub const LONG_TOKEN_FACTOR: f64 = 1.2;
pub const PUNCTUATION_FACTOR: f64 = 1.3;
pub const LONG_TOKEN_CHARS: usize = 8;

pub fn base_delay_ms(words_per_minute: u32) -> f64 {
    60_000.0 / f64::from(words_per_minute.max(1))
}

/// How long `chunk` stays on screen under `options`.
pub fn chunk_delay(chunk: &ContentChunk, options: &ReadingOptions) -> Duration {
    let mut delay = base_delay_ms(options.words_per_minute);

    match chunk.kind {
        ChunkKind::Heading if options.pause_on_headings => delay *= HEADING_FACTOR,
        ChunkKind::Code => delay *= CODE_FACTOR,
        ChunkKind::List => delay *= LIST_FACTOR,
        _ => {}
    }

    if options.slow_down_on_complexity {
        if chunk.content.chars().count() > LONG_TOKEN_CHARS {
            delay *= LONG_TOKEN_FACTOR;
        }
        if has_pause_punctuation(&chunk.content) {
            delay *= PUNCTUATION_FACTOR;
        }
    }

    Duration::from_micros((delay * 1000.0).round() as u64)
}

/// Total display time of every chunk after `index`, honouring skipped code.
pub fn remaining_duration(chunks: &[ContentChunk], index: usize, options: &ReadingOptions) -> Duration {
    chunks
        .iter()
        .skip(index.saturating_add(1))
        .filter(|chunk| !(options.skip_code_blocks && chunk.is_code()))
        .map(|chunk| chunk_delay(chunk, options))
        .sum()
}
