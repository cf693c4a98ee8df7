use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSettings {
    pub enabled: bool,
    /// Synthesizer voice name; platform default when unset.
    pub voice: Option<String>,
    /// Speaking rate in words per minute; platform default when unset.
    pub rate_wpm: Option<u32>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            voice: None,
            rate_wpm: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChimeSettings {
    pub enabled: bool,
}

impl Default for ChimeSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
struct UserSettings {
    speech: SpeechSettings,
    chime: ChimeSettings,
}

/// JSON-file-backed settings with an in-memory copy behind a lock.
/// Missing or unreadable files fall back to defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                log::warn!("settings file unreadable, using defaults: {err}");
                UserSettings::default()
            }),
            Err(_) => UserSettings::default(),
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn speech(&self) -> SpeechSettings {
        self.data
            .read()
            .map(|data| data.speech.clone())
            .unwrap_or_default()
    }

    pub fn chime(&self) -> ChimeSettings {
        self.data
            .read()
            .map(|data| data.chime.clone())
            .unwrap_or_default()
    }

    pub fn update_speech(&self, speech: SpeechSettings) -> Result<()> {
        {
            let mut data = self
                .data
                .write()
                .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
            data.speech = speech;
        }
        self.persist()
    }

    pub fn update_chime(&self, chime: ChimeSettings) -> Result<()> {
        {
            let mut data = self
                .data
                .write()
                .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
            data.chime = chime;
        }
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let data = self
            .data
            .read()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        let raw = serde_json::to_string_pretty(&*data).context("failed to serialize settings")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_path() -> PathBuf {
        std::env::temp_dir().join(format!("fitcare-settings-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(temp_settings_path()).unwrap();
        assert!(store.speech().enabled);
        assert!(store.chime().enabled);
    }

    #[test]
    fn updates_survive_a_reload() {
        let path = temp_settings_path();
        {
            let store = SettingsStore::new(path.clone()).unwrap();
            store
                .update_speech(SpeechSettings {
                    enabled: false,
                    voice: Some("Daniel".to_string()),
                    rate_wpm: Some(180),
                })
                .unwrap();
        }

        let reloaded = SettingsStore::new(path.clone()).unwrap();
        let speech = reloaded.speech();
        assert!(!speech.enabled);
        assert_eq!(speech.voice.as_deref(), Some("Daniel"));
        assert_eq!(speech.rate_wpm, Some(180));

        let _ = fs::remove_file(path);
    }
}
