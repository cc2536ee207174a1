use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use crate::content::text::reading_time_minutes;
use crate::reader::ReadingOptions;

pub const MIN_PREFERRED_WPM: u32 = 50;
pub const MAX_PREFERRED_WPM: u32 = 800;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SpeedPreset {
    Slow,
    Normal,
    Fast,
    VeryFast,
    Custom,
}

impl Default for SpeedPreset {
    fn default() -> Self {
        SpeedPreset::Normal
    }
}

impl SpeedPreset {
    pub const NAMED: [SpeedPreset; 4] = [
        SpeedPreset::Slow,
        SpeedPreset::Normal,
        SpeedPreset::Fast,
        SpeedPreset::VeryFast,
    ];

    pub fn words_per_minute(&self) -> Option<u32> {
        match self {
            SpeedPreset::Slow => Some(150),
            SpeedPreset::Normal => Some(225),
            SpeedPreset::Fast => Some(300),
            SpeedPreset::VeryFast => Some(375),
            SpeedPreset::Custom => None,
        }
    }

    pub fn for_words_per_minute(wpm: u32) -> Self {
        Self::NAMED
            .into_iter()
            .find(|preset| preset.words_per_minute() == Some(wpm))
            .unwrap_or(SpeedPreset::Custom)
    }
}

/// The reader's preferred pace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSpeed {
    pub words_per_minute: u32,
    pub preset: SpeedPreset,
}

impl Default for ReadingSpeed {
    fn default() -> Self {
        Self {
            words_per_minute: 225,
            preset: SpeedPreset::Normal,
        }
    }
}

impl ReadingSpeed {
    pub fn from_words_per_minute(wpm: u32) -> Self {
        let words_per_minute = wpm.clamp(MIN_PREFERRED_WPM, MAX_PREFERRED_WPM);
        Self {
            words_per_minute,
            preset: SpeedPreset::for_words_per_minute(words_per_minute),
        }
    }

    /// Choosing `Custom` keeps the current rate.
    pub fn with_preset(self, preset: SpeedPreset) -> Self {
        match preset.words_per_minute() {
            Some(words_per_minute) => Self {
                words_per_minute,
                preset,
            },
            None => Self { preset, ..self },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserSettings {
    reading_speed: ReadingSpeed,
    reading_options: ReadingOptions,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    /// Open the settings file; a missing or unreadable file yields defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed settings in {}: {}", path.display(), err);
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reading_speed(&self) -> ReadingSpeed {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .reading_speed
    }

    pub fn set_words_per_minute(&self, wpm: u32) -> Result<ReadingSpeed> {
        self.update_reading_speed(ReadingSpeed::from_words_per_minute(wpm))
    }

    pub fn set_preset(&self, preset: SpeedPreset) -> Result<ReadingSpeed> {
        let speed = self.reading_speed().with_preset(preset);
        self.update_reading_speed(speed)
    }

    fn update_reading_speed(&self, speed: ReadingSpeed) -> Result<ReadingSpeed> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.reading_speed = speed;
        self.persist(&guard)?;
        Ok(speed)
    }

    /// Saved options with the preferred pace applied.
    pub fn reading_options(&self) -> ReadingOptions {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        ReadingOptions {
            words_per_minute: guard.reading_speed.words_per_minute,
            ..guard.reading_options
        }
    }

    pub fn update_reading_options(&self, options: ReadingOptions) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.reading_options = options;
        self.persist(&guard)
    }

    /// Whole minutes needed at the preferred pace.
    pub fn reading_time_minutes(&self, word_count: usize) -> u64 {
        reading_time_minutes(word_count, self.reading_speed().words_per_minute)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        assert_eq!(store.reading_speed(), ReadingSpeed::default());
        assert_eq!(store.reading_options().words_per_minute, 225);
        assert!(store.reading_options().highlight_text);
    }

    #[test]
    fn custom_rates_clamp_and_match_presets() {
        assert_eq!(
            ReadingSpeed::from_words_per_minute(10),
            ReadingSpeed {
                words_per_minute: 50,
                preset: SpeedPreset::Custom
            }
        );
        assert_eq!(ReadingSpeed::from_words_per_minute(2_000).words_per_minute, 800);
        assert_eq!(
            ReadingSpeed::from_words_per_minute(375).preset,
            SpeedPreset::VeryFast
        );
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store.set_preset(SpeedPreset::Fast).unwrap();
        store
            .update_reading_options(ReadingOptions {
                skip_code_blocks: true,
                ..ReadingOptions::default()
            })
            .unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(
            reopened.reading_speed(),
            ReadingSpeed {
                words_per_minute: 300,
                preset: SpeedPreset::Fast
            }
        );
        assert!(reopened.reading_options().skip_code_blocks);
        assert_eq!(reopened.reading_time_minutes(450), 2);
    }

    #[test]
    fn first_save_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        let speed = store.set_words_per_minute(400).unwrap();
        assert_eq!(speed.words_per_minute, 400);
        assert!(path.exists());

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.reading_speed().words_per_minute, 400);
    }

    #[test]
    fn custom_preset_keeps_rate() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        store.set_words_per_minute(410).unwrap();

        let speed = store.set_preset(SpeedPreset::Custom).unwrap();
        assert_eq!(speed.words_per_minute, 410);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.reading_speed(), ReadingSpeed::default());
        assert!(store.reload().is_err());
    }
}
