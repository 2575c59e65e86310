use egui::Color32;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const BACKEND_URL_ENV: &str = "COMPANION_BACKEND_URL";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub backend_url: String,

    /// Root of the sprite and scene images.
    pub asset_root: PathBuf,

    pub ghost_poll_interval_secs: u64,
    pub companion_name: String,
    pub ui_scale: f32,

    // Role → color mapping
    pub speaker_colors: HashMap<String, [u8; 4]>,
}

impl Default for AppSettings {
    fn default() -> Self {
        let mut speaker_colors = HashMap::new();

        speaker_colors.insert("User".into(), [40, 70, 120, 255]);
        speaker_colors.insert("Agent".into(), [120, 50, 90, 255]);

        Self {
            backend_url: "http://localhost:5000/api".into(),
            asset_root: PathBuf::from("assets"),
            ghost_poll_interval_secs: 10,
            companion_name: "Linh".into(),
            ui_scale: 1.0,
            speaker_colors,
        }
    }
}

impl AppSettings {
    pub fn color(&self, key: &str) -> Color32 {
        self.speaker_colors
            .get(key)
            .map(|c| Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3]))
            .unwrap_or(Color32::DARK_GRAY)
    }

    pub fn set_color(&mut self, key: &str, color: Color32) {
        self.speaker_colors.insert(
            key.to_string(),
            [color.r(), color.g(), color.b(), color.a()],
        );
    }

    pub fn ghost_poll_interval(&self) -> Duration {
        Duration::from_secs(self.ghost_poll_interval_secs.max(1))
    }

    /// Environment beats the file.
    pub fn apply_env(&mut self, backend_url: Option<String>) {
        if let Some(url) = backend_url.filter(|u| !u.trim().is_empty()) {
            self.backend_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"backend_url":"http://example:8080/api"}"#).unwrap();
        assert_eq!(settings.backend_url, "http://example:8080/api");
        assert_eq!(settings.ghost_poll_interval_secs, 10);
        assert_eq!(settings.companion_name, "Linh");
    }

    #[test]
    fn env_override() {
        let mut settings = AppSettings::default();
        settings.apply_env(Some("   ".into()));
        assert_eq!(settings.backend_url, "http://localhost:5000/api");
        settings.apply_env(Some("http://remote/api".into()));
        assert_eq!(settings.backend_url, "http://remote/api");
    }

    #[test]
    fn colors_round_trip_through_the_map() {
        let mut settings = AppSettings::default();
        settings.set_color("User", Color32::from_rgb(1, 2, 3));
        assert_eq!(settings.color("User"), Color32::from_rgb(1, 2, 3));
        assert_eq!(settings.color("Nobody"), Color32::DARK_GRAY);
    }
}
