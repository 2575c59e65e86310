use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::ui::settings::{AppSettings, BACKEND_URL_ENV};

fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("companion_stream");
    path.push("settings.json");
    path
}

/// Settings from disk plus environment overrides. Never fails: a missing or
/// corrupt file means defaults.
pub fn load_settings() -> AppSettings {
    let path = settings_path();
    let mut settings = if path.exists() {
        load_from(&path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
            AppSettings::default()
        })
    } else {
        AppSettings::default()
    };

    settings.apply_env(std::env::var(BACKEND_URL_ENV).ok());
    settings
}

pub fn save_settings(settings: &AppSettings) -> Result<()> {
    save_to(&settings_path(), settings)
}

pub fn load_from(path: &Path) -> Result<AppSettings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

pub fn save_to(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = AppSettings::default();
        settings.companion_name = "Mai".into();
        settings.ghost_poll_interval_secs = 30;
        save_to(&path, &settings).unwrap();

        assert_eq!(load_from(&path).unwrap(), settings);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ nope").unwrap();

        assert!(load_from(&path).is_err());
    }
}
