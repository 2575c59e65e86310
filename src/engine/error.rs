use thiserror::Error;

/// A single record that could not be turned into a `StreamEvent`.
/// Recovered locally: the line is logged and skipped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("record is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("record has no `type` field")]
    MissingType,

    #[error("`{event_type}` record has the wrong shape: {source}")]
    Shape {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures that abandon a whole cycle.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("stream interrupted: {0}")]
    Io(#[from] std::io::Error),

    #[error("stream ended before a terminal record")]
    Truncated,
}
