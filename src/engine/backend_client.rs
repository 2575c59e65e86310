use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde_json::Value;

use crate::engine::error::TransportError;
use crate::model::session::{GhostMessage, GhostPoll, SessionInfo, SessionMetrics};

/// Whole-call limit for every call except the streaming one.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest silence tolerated between reads of the reply stream body.
pub const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a str,
}

/// Thin blocking client for the conversation backend. Cloning shares the
/// underlying connection pool.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_stream_idle_timeout(base_url, STREAM_IDLE_TIMEOUT)
    }

    /// The client-wide timeout bounds each read of a response body, so a
    /// stalled reply stream ends in a timed-out I/O error. Short calls
    /// override it with a whole-call limit.
    pub fn with_stream_idle_timeout(base_url: &str, idle: Duration) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(idle)
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    pub fn start(&self) -> Result<SessionInfo> {
        let info: SessionInfo = self
            .http
            .post(self.url("start"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .context("POST /start")?
            .json()
            .context("decoding /start reply")?;

        if let Some(error) = &info.error {
            return Err(anyhow!(error.clone()));
        }
        Ok(info)
    }

    pub fn stop(&self) -> Result<()> {
        self.http
            .post(self.url("stop"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .context("POST /stop")?
            .error_for_status()?;
        Ok(())
    }

    /// Open the reply stream for one user message. The body is left unread
    /// for the caller to decode incrementally; there is no whole-call limit,
    /// only the idle limit between reads.
    pub fn open_stream(&self, message: &str) -> Result<Response, TransportError> {
        let response = self
            .http
            .post(self.url("send-stream"))
            .json(&SendRequest { message })
            .send()?
            .error_for_status()?;
        Ok(response)
    }

    pub fn poll_ghost_messages(&self) -> Result<Vec<GhostMessage>> {
        let poll: GhostPoll = self
            .http
            .get(self.url("poll-messages"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .context("GET /poll-messages")?
            .json()
            .context("decoding /poll-messages reply")?;
        Ok(poll.messages)
    }

    pub fn metrics(&self) -> Result<SessionMetrics> {
        let value: Value = self
            .http
            .get(self.url("metrics"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .context("GET /metrics")?
            .json()
            .context("decoding /metrics reply")?;

        decode_metrics(value)
    }

    pub fn health(&self) -> Result<String> {
        let value: Value = self
            .http
            .get(self.url("health"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .context("GET /health")?
            .json()?;

        Ok(format!(
            "Backend {}",
            value["status"].as_str().unwrap_or("reachable")
        ))
    }
}

fn decode_metrics(value: Value) -> Result<SessionMetrics> {
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(anyhow!(error.to_string()));
    }
    serde_json::from_value(value).context("metrics have an unexpected shape")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = BackendClient::new("http://localhost:5000/api/").unwrap();
        assert_eq!(client.url("start"), "http://localhost:5000/api/start");
    }

    #[test]
    fn metrics_error_field_is_a_failure() {
        let err = decode_metrics(json!({ "error": "No active session" })).unwrap_err();
        assert_eq!(err.to_string(), "No active session");
    }

    #[test]
    fn metrics_tolerate_missing_fields() {
        let metrics = decode_metrics(json!({
            "session_id": "s1",
            "duration": 12.5,
            "message_count": 4,
            "energy_trends": { "trend": "rising" }
        }))
        .unwrap();

        assert_eq!(metrics.session_id, "s1");
        assert_eq!(metrics.safety_incidents, 0);
        assert_eq!(metrics.energy_trends.unwrap().trend, "rising");
    }
}
