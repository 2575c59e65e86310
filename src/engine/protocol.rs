use crate::model::session::{GhostMessage, SessionInfo, SessionMetrics};
use crate::model::stream_event::StreamEvent;

pub enum EngineCommand {
    StartSession,
    StopSession,
    SendMessage { cycle: u64, text: String },
    PollGhostMessages,
    FetchMetrics,
    CheckHealth,
}

pub enum EngineResponse {
    SessionStarted(SessionInfo),
    SessionStartFailed(String),
    SessionStopped,

    Stream {
        cycle: u64,
        event: StreamEvent,
    },
    TransportFailed {
        cycle: u64,
        error: String,
    },

    GhostMessages(Vec<GhostMessage>),
    Metrics(SessionMetrics),
    MetricsFailed(String),
    Health(Result<String, String>),
}
