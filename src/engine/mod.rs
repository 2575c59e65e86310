pub mod engine;
pub mod error;
pub mod protocol;

pub mod appearance;
pub mod backend_client;
pub mod content_classifier;
pub mod conversation;
pub mod crisis_monitor;
pub mod pacing;
pub mod stream_decoder;
