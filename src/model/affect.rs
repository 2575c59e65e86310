use serde::{Deserialize, Serialize};

/// Backend-supplied summary of the emotional/safety state of one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectSignal {
    pub status: AffectStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub scene: Option<Scene>,
}

impl AffectSignal {
    #[cfg(test)]
    pub fn new(status: AffectStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            scene: None,
        }
    }

    /// Case-insensitive keyword test against `reason`.
    pub fn reason_mentions(&self, keyword: &str) -> bool {
        self.reason
            .to_lowercase()
            .contains(&keyword.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffectStatus {
    Green,
    Yellow,
    Red,
    Sexual,
    Casual,
    Teasing,
    #[serde(other)]
    Unknown,
}

impl AffectStatus {
    pub fn label(self) -> &'static str {
        match self {
            AffectStatus::Green => "GREEN",
            AffectStatus::Yellow => "YELLOW",
            AffectStatus::Red => "RED",
            AffectStatus::Sexual => "SEXUAL",
            AffectStatus::Casual => "CASUAL",
            AffectStatus::Teasing => "TEASING",
            AffectStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            AffectStatus::Green => "🟢",
            AffectStatus::Yellow => "🟡",
            AffectStatus::Red => "🔴",
            _ => "⚪",
        }
    }

    pub fn rgb(self) -> [u8; 3] {
        match self {
            AffectStatus::Green => [0x4C, 0xAF, 0x50],
            AffectStatus::Yellow => [0xFF, 0x98, 0x00],
            AffectStatus::Red => [0xF4, 0x43, 0x36],
            _ => [0x9E, 0x9E, 0x9E],
        }
    }

    /// Caption shown under the avatar.
    pub fn mood_line(self) -> &'static str {
        match self {
            AffectStatus::Sexual => "Feeling intimate...",
            AffectStatus::Teasing => "Playfully teasing...",
            AffectStatus::Casual => "Chatting casually",
            AffectStatus::Yellow => "A bit concerned",
            AffectStatus::Red => "Very concerned",
            AffectStatus::Green => "Happy to chat",
            AffectStatus::Unknown => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scene {
    Room,
    Beach,
    Park,
}

impl Scene {
    /// Unrecognised tags mean "no scene" rather than a decode failure.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "room" => Some(Scene::Room),
            "beach" => Some(Scene::Beach),
            "park" => Some(Scene::Park),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_deserializes_to_unknown() {
        let signal: AffectSignal =
            serde_json::from_str(r#"{"status":"purple","reason":"?"}"#).unwrap();
        assert_eq!(signal.status, AffectStatus::Unknown);
        assert_eq!(signal.scene, None);
    }

    #[test]
    fn reason_matching_ignores_case() {
        let signal = AffectSignal::new(AffectStatus::Sexual, "Exhibitionism script, msg 2");
        assert!(signal.reason_mentions("exhibitionism"));
        assert!(!signal.reason_mentions("room"));
    }

    #[test]
    fn scene_tags() {
        assert_eq!(Scene::from_tag("Beach"), Some(Scene::Beach));
        assert_eq!(Scene::from_tag("moon"), None);
    }
}
