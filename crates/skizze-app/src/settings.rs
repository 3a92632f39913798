use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Persisted session settings. Width/height of 0 mean "never saved"; the
/// sketch's own config is used then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub version: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub audio_device: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            width: 0,
            height: 0,
            audio_device: None,
        }
    }
}

impl Settings {
    pub fn load() -> Self {
        match settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn save(&self) {
        let Some(path) = settings_path() else {
            return;
        };
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = self.save_to(&path) {
            log::warn!("could not save settings: {e}");
        }
    }

    fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}

fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skizze").join("settings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mean_unsaved() {
        let s = Settings::default();
        assert_eq!(s.width, 0);
        assert_eq!(s.height, 0);
        assert!(s.audio_device.is_none());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let s = Settings {
            version: 1,
            width: 1280,
            height: 720,
            audio_device: Some("pipewire".into()),
        };
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), s);
    }

    #[test]
    fn missing_or_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert_eq!(Settings::load_from(&missing), Settings::default());

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{not json").unwrap();
        assert_eq!(Settings::load_from(&corrupt), Settings::default());
    }
}
