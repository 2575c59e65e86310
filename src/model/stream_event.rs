use crate::model::affect::AffectSignal;

/// A single piece of a streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePart {
    pub content: String,
    pub index: usize,
    pub total: usize,
    /// Transient "thinking" text, never a final message.
    pub is_typing: bool,
}

/// Typed events decoded from the reply stream. Exactly one `Complete`
/// or `Error` ends a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    MessagePart(MessagePart),
    Complete {
        affect_signal: Option<AffectSignal>,
        session_stopped: bool,
    },
    Error {
        message: String,
    },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::MessagePart(_))
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            StreamEvent::MessagePart(_) => "message_part",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Error { .. } => "error",
        }
    }
}
