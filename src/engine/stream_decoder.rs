use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::error::{DecodeError, TransportError};
use crate::model::affect::{AffectSignal, AffectStatus, Scene};
use crate::model::stream_event::{MessagePart, StreamEvent};

/// Marker in front of every record line. Other lines are ignored.
pub const RECORD_PREFIX: &str = "data: ";

const READ_CHUNK: usize = 4096;

/* =========================
   Wire shapes
   ========================= */

#[derive(Deserialize)]
struct WireMessagePart {
    #[serde(default)]
    content: String,
    #[serde(default)]
    index: usize,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    is_typing: bool,
}

#[derive(Deserialize)]
struct WireComplete {
    #[serde(default)]
    energy_status: Option<Value>,
    #[serde(default)]
    session_stopped: Option<bool>,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct WireAffect {
    status: AffectStatus,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    scene: Option<String>,
}

/// Decode the JSON payload of one record line.
///
/// `Ok(None)` means the record was well-formed but of a type this client
/// does not know; it is logged and the stream carries on.
pub fn decode_record(payload: &str) -> Result<Option<StreamEvent>, DecodeError> {
    let value: Value = serde_json::from_str(payload)?;

    let event_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();

    let shape = |source: serde_json::Error| DecodeError::Shape {
        event_type: event_type.clone(),
        source,
    };

    let event = match event_type.as_str() {
        "message_part" => {
            let part: WireMessagePart = serde_json::from_value(value).map_err(shape)?;
            StreamEvent::MessagePart(MessagePart {
                content: part.content,
                index: part.index,
                total: part.total,
                is_typing: part.is_typing,
            })
        }
        "complete" => {
            let complete: WireComplete = serde_json::from_value(value).map_err(shape)?;
            StreamEvent::Complete {
                affect_signal: decode_affect(complete.energy_status),
                session_stopped: complete.session_stopped.unwrap_or(false),
            }
        }
        "error" => {
            let error: WireError = serde_json::from_value(value).map_err(shape)?;
            StreamEvent::Error {
                message: error.message,
            }
        }
        other => {
            warn!(event_type = other, "ignoring unknown stream event type");
            return Ok(None);
        }
    };

    Ok(Some(event))
}

/// A missing or malformed signal is treated as absent, never as an error.
fn decode_affect(raw: Option<Value>) -> Option<AffectSignal> {
    let raw = raw.filter(|v| !v.is_null())?;

    match serde_json::from_value::<WireAffect>(raw) {
        Ok(wire) => Some(AffectSignal {
            status: wire.status,
            reason: wire.reason.unwrap_or_default(),
            scene: wire.scene.as_deref().and_then(Scene::from_tag),
        }),
        Err(e) => {
            warn!(error = %e, "malformed energy_status, treating it as absent");
            None
        }
    }
}

/* =========================
   Incremental decoder
   ========================= */

/// Turns arbitrarily split chunks into events. Works on bytes so a
/// multi-byte character split across chunks is reassembled before
/// the line is read as text.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    skipped: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line[..pos], &mut events);
        }
        events
    }

    /// Flush the held-back tail once the source is exhausted.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        let mut events = Vec::new();
        if !rest.is_empty() {
            self.decode_line(&rest, &mut events);
        }
        events
    }

    /// Number of malformed records dropped so far.
    pub fn skipped_records(&self) -> usize {
        self.skipped
    }

    fn decode_line(&mut self, raw: &[u8], out: &mut Vec<StreamEvent>) {
        let text = String::from_utf8_lossy(raw);
        let line = text.strip_suffix('\r').unwrap_or(text.as_ref());

        let Some(payload) = line.strip_prefix(RECORD_PREFIX) else {
            return;
        };

        match decode_record(payload) {
            Ok(Some(event)) => {
                debug!(event = event.short_name(), "decoded stream record");
                out.push(event);
            }
            Ok(None) => {}
            Err(err) => {
                self.skipped += 1;
                warn!(error = %err, line = %line, "skipping malformed stream record");
            }
        }
    }
}

/* =========================
   Lazy event sequence
   ========================= */

/// Pulls chunks from `reader` on demand and yields decoded events in
/// arrival order. Ends after the first terminal event. A source that
/// runs dry before one yields `TransportError::Truncated`.
pub struct DecodedStream<R> {
    reader: R,
    decoder: StreamDecoder,
    pending: VecDeque<StreamEvent>,
    eof: bool,
    finished: bool,
}

impl<R: Read> DecodedStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: StreamDecoder::new(),
            pending: VecDeque::new(),
            eof: false,
            finished: false,
        }
    }

    /// Malformed records dropped so far on this stream.
    pub fn skipped_records(&self) -> usize {
        self.decoder.skipped_records()
    }
}

impl<R: Read> Iterator for DecodedStream<R> {
    type Item = Result<StreamEvent, TransportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(event) = self.pending.pop_front() {
                if event.is_terminal() {
                    self.finished = true;
                }
                return Some(Ok(event));
            }

            if self.eof {
                self.finished = true;
                return Some(Err(TransportError::Truncated));
            }

            let mut buf = [0u8; READ_CHUNK];
            match self.reader.read(&mut buf) {
                Ok(0) => {
                    self.eof = true;
                    self.pending.extend(self.decoder.finish());
                }
                Ok(n) => self.pending.extend(self.decoder.push(&buf[..n])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}
