// Préférences utilisateur - derniers périphériques sélectionnés

use crate::store::persistence::write_document;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Output device index, `None` = system default
    pub selected_audio_device: Option<usize>,
    /// Input device index, `None` = microphone disabled
    pub selected_microphone_device: Option<usize>,
}

/// Settings document backed by a JSON file
///
/// Persistence is best effort: a broken document reads as defaults and a
/// failed save only logs a warning.
pub struct SettingsStore {
    path: PathBuf,
    settings: Mutex<Settings>,
}

impl SettingsStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = Self::read(&path);
        Self {
            path,
            settings: Mutex::new(settings),
        }
    }

    fn read(path: &Path) -> Settings {
        if !path.exists() {
            return Settings::default();
        }

        match std::fs::read(path).map(|bytes| serde_json::from_slice::<Settings>(&bytes)) {
            Ok(Ok(settings)) => settings,
            Ok(Err(e)) => {
                warn!("Ignoring unparsable settings {}: {}", path.display(), e);
                Settings::default()
            }
            Err(e) => {
                warn!("Could not read settings {}: {}", path.display(), e);
                Settings::default()
            }
        }
    }

    pub fn current(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn selected_audio_device(&self) -> Option<usize> {
        self.current().selected_audio_device
    }

    pub fn selected_microphone_device(&self) -> Option<usize> {
        self.current().selected_microphone_device
    }

    pub fn set_selected_audio_device(&self, index: Option<usize>) {
        self.modify(|s| s.selected_audio_device = index);
    }

    pub fn set_selected_microphone_device(&self, index: Option<usize>) {
        self.modify(|s| s.selected_microphone_device = index);
    }

    fn modify(&self, change: impl FnOnce(&mut Settings)) {
        let mut settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut settings);

        let saved = serde_json::to_vec_pretty(&*settings)
            .map_err(crate::store::StoreError::from)
            .and_then(|bytes| write_document(&self.path, &bytes));
        if let Err(e) = saved {
            warn!("Failed to save settings to {}: {}", self.path.display(), e);
        }
    }
}
