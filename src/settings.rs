use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::progression::TitleVocabulary;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressionSettings {
    /// Which title table every view renders; one per deployment.
    pub title_vocabulary: TitleVocabulary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerSettings {
    pub focus_minutes: u64,
    pub break_minutes: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            break_minutes: 5,
        }
    }
}

impl TimerSettings {
    fn validate(&self) -> Result<()> {
        if self.focus_minutes == 0 || self.break_minutes == 0 {
            bail!("Timer durations must be at least one minute");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct UserSettings {
    progression: ProgressionSettings,
    timer: TimerSettings,
}

/// `settings.json` in the data directory, cached in memory.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable settings at {}: {err}",
                    path.display()
                );
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

    pub fn title_vocabulary(&self) -> TitleVocabulary {
        self.read().progression.title_vocabulary
    }

    pub fn set_title_vocabulary(&self, vocabulary: TitleVocabulary) -> Result<()> {
        let mut guard = self.write();
        guard.progression.title_vocabulary = vocabulary;
        self.persist(&guard)
    }

    pub fn timer(&self) -> TimerSettings {
        self.read().timer.clone()
    }

    pub fn update_timer(&self, settings: TimerSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        guard.timer = settings;
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
