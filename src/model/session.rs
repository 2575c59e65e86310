use serde::{Deserialize, Serialize};

/// Reply to `POST /start`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub status: String,
    pub session_id: Option<String>,
    pub error: Option<String>,
}

/// An autonomous message queued by the backend while the user was idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GhostMessage {
    pub content: String,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub escalation_level: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GhostPoll {
    #[serde(default)]
    pub messages: Vec<GhostMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub energy_alerts: u32,
    #[serde(default)]
    pub safety_incidents: u32,
    #[serde(default)]
    pub avg_energy_intensity: f64,
    #[serde(default)]
    pub energy_trends: Option<EnergyTrend>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyTrend {
    #[serde(default)]
    pub trend: String,
}
