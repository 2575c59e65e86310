use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::model::affect::{AffectSignal, AffectStatus};
use crate::model::crisis::CrisisAlert;

/// How long an alert stays on screen without being dismissed.
pub const ALERT_LIFETIME: Duration = Duration::from_secs(8);

/// Matched case-sensitively against the reason of a red signal.
pub const CRISIS_KEYWORDS: [&str; 6] = [
    "crisis",
    "mental health",
    "extreme sadness",
    "Violent threat",
    "violence",
    "safety concern",
];

pub const SESSION_STOPPED_REASON: &str =
    "Session stopped by the backend for safety reasons";

/// Watches end-of-cycle signals and owns the single crisis alert.
#[derive(Debug, Default)]
pub struct CrisisMonitor {
    alert: CrisisAlert,
    expires_at: Option<Instant>,
}

impl CrisisMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alert(&self) -> &CrisisAlert {
        &self.alert
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Check one terminal event. Returns true when an alert was raised.
    pub fn inspect(
        &mut self,
        signal: Option<&AffectSignal>,
        session_stopped: bool,
        now: Instant,
    ) -> bool {
        let mut raised = false;

        if let Some(signal) = signal.filter(|s| is_crisis(s)) {
            warn!(reason = %signal.reason, "crisis signal detected");
            self.raise(signal.reason.clone(), now);
            raised = true;
        }

        if session_stopped {
            warn!("backend stopped the session");
            self.raise(SESSION_STOPPED_REASON.to_string(), now);
            raised = true;
        }

        raised
    }

    /// Show an alert. A second raise while one is visible replaces the text
    /// and restarts the lifetime.
    pub fn raise(&mut self, reason_text: String, now: Instant) {
        self.alert = CrisisAlert {
            visible: true,
            reason_text,
        };
        self.expires_at = Some(now + ALERT_LIFETIME);
    }

    pub fn dismiss(&mut self) {
        if self.alert.visible {
            info!("crisis alert dismissed");
        }
        self.clear();
    }

    /// Expire the alert if its lifetime is over. Returns true only on the
    /// tick that actually hides it.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) if now >= deadline => {
                self.clear();
                true
            }
            _ => false,
        }
    }

    /// Hide the alert and forget the pending expiry.
    pub fn clear(&mut self) {
        self.alert.visible = false;
        self.expires_at = None;
    }
}

pub fn is_crisis(signal: &AffectSignal) -> bool {
    signal.status == AffectStatus::Red
        && CRISIS_KEYWORDS
            .iter()
            .any(|keyword| signal.reason.contains(keyword))
}

/// Subtitle for the alert toast, keyed off the reason text.
pub fn headline(reason: &str) -> &'static str {
    const HEADLINES: [(&str, &str); 6] = [
        ("extreme sadness", "Crisis situation detected - user needs support"),
        ("mental health", "Serious mental health concern detected"),
        ("grief", "Grief/Trauma detection - user needs empathy"),
        ("Violent threat", "Violent threat detected - immediate human intervention needed"),
        ("violence", "Violence concern detected - safety intervention required"),
        ("safety concern", "Safety concern detected - human oversight needed"),
    ];

    HEADLINES
        .iter()
        .find(|(keyword, _)| reason.contains(keyword))
        .map(|(_, text)| *text)
        .unwrap_or("Critical emotional distress detected")
}
