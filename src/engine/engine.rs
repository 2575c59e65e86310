use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::engine::backend_client::BackendClient;
use crate::engine::protocol::{EngineCommand, EngineResponse};
use crate::engine::stream_decoder::DecodedStream;

/// No reply stream is live.
const NO_CYCLE: u64 = 0;

/// Worker that owns all blocking network I/O. Control commands are handled
/// in order on this thread; each reply stream is read on its own thread so a
/// stalled body never holds up a stop or a restart.
pub struct Engine {
    rx: Receiver<EngineCommand>,
    tx: Sender<EngineResponse>,
    client: BackendClient,
    live_cycle: Arc<AtomicU64>,
}

impl Engine {
    pub fn new(
        rx: Receiver<EngineCommand>,
        tx: Sender<EngineResponse>,
        client: BackendClient,
    ) -> Self {
        Self {
            rx,
            tx,
            client,
            live_cycle: Arc::new(AtomicU64::new(NO_CYCLE)),
        }
    }

    /// Runs until the UI drops its command sender.
    pub fn run(&mut self) {
        info!(backend = self.client.base_url(), "engine started");

        while let Ok(cmd) = self.rx.recv() {
            match cmd {
                EngineCommand::StartSession => {
                    let response = match self.client.start() {
                        Ok(info) => EngineResponse::SessionStarted(info),
                        Err(e) => {
                            error!(error = %e, "failed to start session");
                            EngineResponse::SessionStartFailed(
                                "Failed to start conversation. Please try again.".into(),
                            )
                        }
                    };
                    self.send(response);
                }

                EngineCommand::StopSession => {
                    self.live_cycle.store(NO_CYCLE, Ordering::SeqCst);
                    if let Err(e) = self.client.stop() {
                        warn!(error = %e, "stop request failed");
                    }
                    self.send(EngineResponse::SessionStopped);
                }

                EngineCommand::SendMessage { cycle, text } => self.stream_reply(cycle, &text),

                EngineCommand::PollGhostMessages => match self.client.poll_ghost_messages() {
                    Ok(messages) if messages.is_empty() => {}
                    Ok(messages) => self.send(EngineResponse::GhostMessages(messages)),
                    Err(e) => debug!(error = %e, "ghost poll failed"),
                },

                EngineCommand::FetchMetrics => {
                    let response = match self.client.metrics() {
                        Ok(metrics) => EngineResponse::Metrics(metrics),
                        Err(e) => {
                            warn!(error = %e, "failed to fetch metrics");
                            EngineResponse::MetricsFailed(format!("Failed to get metrics: {e}"))
                        }
                    };
                    self.send(response);
                }

                EngineCommand::CheckHealth => {
                    let result = self.client.health().map_err(|e| format!("{e:#}"));
                    self.send(EngineResponse::Health(result));
                }
            }
        }

        info!("engine stopped");
    }

    fn stream_reply(&self, cycle: u64, text: &str) {
        self.live_cycle.store(cycle, Ordering::SeqCst);

        let reply = ReplyStream {
            cycle,
            live_cycle: Arc::clone(&self.live_cycle),
            tx: self.tx.clone(),
        };
        let client = self.client.clone();
        let text = text.to_string();

        let spawned = thread::Builder::new()
            .name(format!("reply-{cycle}"))
            .spawn(move || reply.run(&client, &text));
        if let Err(e) = spawned {
            error!(cycle, error = %e, "failed to spawn reply stream thread");
            self.send(EngineResponse::TransportFailed {
                cycle,
                error: e.to_string(),
            });
        }
    }

    fn send(&self, response: EngineResponse) {
        // The UI is gone; nothing left to tell.
        let _ = self.tx.send(response);
    }
}

/// One reply stream, read off the control thread. It stops forwarding as
/// soon as its cycle is no longer the live one and drops the body, which
/// closes the connection.
struct ReplyStream {
    cycle: u64,
    live_cycle: Arc<AtomicU64>,
    tx: Sender<EngineResponse>,
}

impl ReplyStream {
    fn is_live(&self) -> bool {
        self.live_cycle.load(Ordering::SeqCst) == self.cycle
    }

    fn run(self, client: &BackendClient, text: &str) {
        let cycle = self.cycle;
        let response = match client.open_stream(text) {
            Ok(response) => response,
            Err(e) => {
                self.forward_failure(e.to_string());
                return;
            }
        };

        let mut stream = DecodedStream::new(response);
        for item in stream.by_ref() {
            if !self.is_live() {
                info!(cycle, "reply stream abandoned after cancellation");
                return;
            }
            match item {
                Ok(event) => {
                    let _ = self.tx.send(EngineResponse::Stream { cycle, event });
                }
                Err(e) => self.forward_failure(e.to_string()),
            }
        }

        if stream.skipped_records() > 0 {
            warn!(cycle, skipped = stream.skipped_records(), "reply stream had malformed records");
        }
    }

    fn forward_failure(&self, error: String) {
        if !self.is_live() {
            debug!(cycle = self.cycle, error = %error, "ignoring failure of a cancelled stream");
            return;
        }
        let _ = self.tx.send(EngineResponse::TransportFailed {
            cycle: self.cycle,
            error,
        });
    }
}
