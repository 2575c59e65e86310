use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::engine::appearance::AppearanceStateMachine;
use crate::engine::content_classifier::{classify, Disposition};
use crate::engine::crisis_monitor::CrisisMonitor;
use crate::engine::pacing::PacingScheduler;
use crate::model::affect::AffectSignal;
use crate::model::appearance::{AppearanceState, Expression};
use crate::model::crisis::CrisisAlert;
use crate::model::message::Message;
use crate::model::session::{GhostMessage, SessionInfo};
use crate::model::stream_event::StreamEvent;

pub const WELCOME_MESSAGE: &str =
    "Hey baby! I'm here and ready to chat with you. What's on your mind? 💕";
pub const SEND_FAILED: &str = "Failed to send message. Please try again.";

/// One request/response round trip.
#[derive(Debug, Default)]
struct Cycle {
    id: u64,
    in_flight: bool,
    fragments: Vec<String>,
    typing_preview: Option<String>,
}

/// Session-side controller living on the UI thread.
///
/// It is the only writer of the message history. Replies and ghost messages
/// are two producers feeding it, and `is_busy` keeps them from
/// interleaving. Every stream event carries the id of the cycle it belongs
/// to; events for a cancelled cycle are dropped on arrival.
pub struct Conversation {
    active: bool,
    session_id: Option<String>,
    messages: Vec<Message>,
    cycle: Cycle,
    scheduler: PacingScheduler,
    appearance: AppearanceStateMachine,
    crisis: CrisisMonitor,
    last_signal: Option<AffectSignal>,
    error: Option<String>,
    ghost_interval: Duration,
    last_ghost_poll: Option<Instant>,
    deferred_ghosts: VecDeque<GhostMessage>,
}

impl Conversation {
    pub fn new(ghost_interval: Duration) -> Self {
        Self::with_rngs(
            ghost_interval,
            StdRng::from_entropy(),
            StdRng::from_entropy(),
        )
    }

    /// Separate random sources for pacing and expressions, so tests can pin
    /// both.
    pub fn with_rngs(ghost_interval: Duration, pacing: StdRng, appearance: StdRng) -> Self {
        Self {
            active: false,
            session_id: None,
            messages: Vec::new(),
            cycle: Cycle::default(),
            scheduler: PacingScheduler::with_rng(pacing),
            appearance: AppearanceStateMachine::with_rng(appearance),
            crisis: CrisisMonitor::new(),
            last_signal: None,
            error: None,
            ghost_interval,
            last_ghost_poll: None,
            deferred_ghosts: VecDeque::new(),
        }
    }

    /* =========================
       Session lifecycle
       ========================= */

    pub fn session_started(&mut self, info: SessionInfo, now: Instant) {
        self.cancel_cycle();
        self.crisis.clear();
        self.appearance.deactivate();
        self.deferred_ghosts.clear();

        info!(session_id = ?info.session_id, status = %info.status, "session started");
        self.active = true;
        self.session_id = info.session_id;
        self.error = None;
        self.last_signal = None;
        self.last_ghost_poll = Some(now);
        self.messages = vec![Message::agent(WELCOME_MESSAGE)];
    }

    pub fn session_start_failed(&mut self, reason: &str) {
        error!(reason, "session failed to start");
        self.error = Some(reason.to_string());
    }

    /// Deactivate and cancel everything pending. History stays visible.
    pub fn stop(&mut self) {
        if self.active {
            info!(session_id = ?self.session_id, "session stopped");
        }
        self.deactivate();
        self.crisis.clear();
    }

    /// Stop and forget everything, including the history.
    pub fn reset(&mut self) {
        self.stop();
        self.messages.clear();
        self.error = None;
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.session_id = None;
        self.last_signal = None;
        self.deferred_ghosts.clear();
        self.cancel_cycle();
        self.appearance.deactivate();
    }

    fn cancel_cycle(&mut self) {
        if self.is_busy() {
            debug!(cycle = self.cycle.id, "cancelling in-flight cycle");
        }
        self.scheduler.cancel();
        // Bumping the id orphans any events still on their way.
        self.cycle = Cycle {
            id: self.cycle.id + 1,
            ..Cycle::default()
        };
    }

    /* =========================
       Cycles
       ========================= */

    /// Accept a user message and open a new cycle. Returns the cycle id the
    /// reply must be tagged with, or `None` when input is not accepted.
    pub fn submit(&mut self, text: &str) -> Option<u64> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if !self.active {
            warn!("message submitted without an active session");
            return None;
        }
        if self.is_busy() {
            warn!(cycle = self.cycle.id, "message submitted while a reply is in progress");
            return None;
        }

        self.messages.push(Message::user(text));
        self.error = None;
        self.cycle = Cycle {
            id: self.cycle.id + 1,
            in_flight: true,
            ..Cycle::default()
        };
        debug!(cycle = self.cycle.id, "cycle opened");
        Some(self.cycle.id)
    }

    pub fn handle_stream_event(&mut self, cycle: u64, event: StreamEvent, now: Instant) {
        if !self.accepts(cycle) {
            debug!(cycle, event = event.short_name(), "dropping event for stale cycle");
            return;
        }

        match event {
            StreamEvent::MessagePart(part) => match classify(&part) {
                Disposition::TypingPreview(text) => self.cycle.typing_preview = Some(text),
                Disposition::Fragment(text) => {
                    debug!(index = part.index, total = part.total, "collected fragment");
                    self.cycle.fragments.push(text);
                }
                Disposition::Discard => debug!(content = %part.content, "discarded filler"),
            },
            StreamEvent::Complete {
                affect_signal,
                session_stopped,
            } => self.complete(affect_signal, session_stopped, now),
            StreamEvent::Error { message } => {
                error!(cycle, message = %message, "backend reported a stream error");
                self.abandon_cycle(message);
            }
        }
    }

    pub fn transport_failed(&mut self, cycle: u64, detail: &str) {
        if !self.accepts(cycle) {
            return;
        }
        error!(cycle, detail, "transport failure");
        self.abandon_cycle(format!("{SEND_FAILED} ({detail})"));
    }

    fn accepts(&self, cycle: u64) -> bool {
        cycle == self.cycle.id && self.cycle.in_flight
    }

    fn abandon_cycle(&mut self, error: String) {
        self.error = Some(error);
        self.scheduler.cancel();
        self.cycle.in_flight = false;
        self.cycle.fragments.clear();
        self.cycle.typing_preview = None;
    }

    /// The terminal signal, processed only after every fragment of the
    /// cycle has been classified.
    fn complete(&mut self, signal: Option<AffectSignal>, session_stopped: bool, now: Instant) {
        self.cycle.in_flight = false;
        self.cycle.typing_preview = None;
        let fragments = std::mem::take(&mut self.cycle.fragments);

        self.crisis.inspect(signal.as_ref(), session_stopped, now);

        if session_stopped {
            if !fragments.is_empty() {
                warn!(dropped = fragments.len(), "session stopped, discarding reply");
            }
            self.deactivate();
            return;
        }

        if let Some(signal) = &signal {
            self.appearance.apply(signal, self.active, !fragments.is_empty());
        }
        if signal.is_some() {
            self.last_signal = signal;
        }

        self.scheduler.begin(fragments, now);
    }

    /* =========================
       Event loop
       ========================= */

    /// Drive timers. Returns true if anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;

        if let Some(text) = self.scheduler.poll(now) {
            debug!(remaining = self.scheduler.remaining(), "replaying fragment");
            self.messages.push(Message::agent(text));
            changed = true;
        }

        if self.crisis.tick(now) {
            changed = true;
        }

        if !self.is_busy() && !self.deferred_ghosts.is_empty() {
            while let Some(ghost) = self.deferred_ghosts.pop_front() {
                self.append_ghost(ghost);
            }
            changed = true;
        }

        changed
    }

    /// Earliest instant at which `tick` has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scheduler.next_due(), self.crisis.expires_at()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /* =========================
       Ghost messages
       ========================= */

    /// True when an idle poll should be sent now. Records the attempt.
    pub fn ghost_poll_due(&mut self, now: Instant) -> bool {
        if !self.active || self.is_busy() {
            return false;
        }

        let due = self
            .last_ghost_poll
            .map_or(true, |last| now.duration_since(last) >= self.ghost_interval);
        if due {
            self.last_ghost_poll = Some(now);
        }
        due
    }

    pub fn set_ghost_interval(&mut self, interval: Duration) {
        self.ghost_interval = interval;
    }

    pub fn accept_ghost_messages(&mut self, ghosts: Vec<GhostMessage>) {
        if !self.active {
            return;
        }
        for ghost in ghosts {
            if ghost.content.trim().is_empty() {
                continue;
            }
            if self.is_busy() {
                self.deferred_ghosts.push_back(ghost);
            } else {
                self.append_ghost(ghost);
            }
        }
    }

    fn append_ghost(&mut self, ghost: GhostMessage) {
        info!(level = ?ghost.escalation_level, "ghost message received");
        let mut message = Message::agent(ghost.content);
        if ghost.timestamp > 0.0 {
            message.timestamp = ghost.timestamp;
        }
        self.messages.push(message);
    }

    /* =========================
       Read side
       ========================= */

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// A reply is being fetched or replayed. Input is gated on this.
    pub fn is_busy(&self) -> bool {
        self.cycle.in_flight || self.scheduler.is_active()
    }

    pub fn can_submit(&self) -> bool {
        self.active && !self.is_busy()
    }

    /// The companion looks like she is typing.
    pub fn is_composing(&self) -> bool {
        self.is_busy()
    }

    pub fn typing_preview(&self) -> Option<&str> {
        self.cycle.typing_preview.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn appearance(&self) -> &AppearanceState {
        self.appearance.state()
    }

    pub fn display_expression(&mut self) -> Expression {
        let composing = self.is_composing();
        self.appearance.display_expression(composing)
    }

    pub fn alert(&self) -> &CrisisAlert {
        self.crisis.alert()
    }

    pub fn dismiss_alert(&mut self) {
        self.crisis.dismiss();
    }

    pub fn last_signal(&self) -> Option<&AffectSignal> {
        self.last_signal.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::crisis_monitor::{ALERT_LIFETIME, SESSION_STOPPED_REASON};
    use crate::model::affect::AffectStatus;
    use crate::model::appearance::OutfitStage;
    use crate::model::message::Role;
    use crate::model::stream_event::MessagePart;

    fn conversation() -> Conversation {
        Conversation::with_rngs(
            Duration::from_secs(10),
            StdRng::seed_from_u64(1),
            StdRng::seed_from_u64(2),
        )
    }

    fn started(now: Instant) -> Conversation {
        let mut c = conversation();
        c.session_started(
            SessionInfo {
                status: "started".into(),
                session_id: Some("abc".into()),
                error: None,
            },
            now,
        );
        c
    }

    fn part(content: &str) -> StreamEvent {
        StreamEvent::MessagePart(MessagePart {
            content: content.into(),
            index: 0,
            total: 1,
            is_typing: false,
        })
    }

    fn typing(content: &str) -> StreamEvent {
        StreamEvent::MessagePart(MessagePart {
            content: content.into(),
            index: 0,
            total: 1,
            is_typing: true,
        })
    }

    fn complete(signal: Option<AffectSignal>) -> StreamEvent {
        StreamEvent::Complete {
            affect_signal: signal,
            session_stopped: false,
        }
    }

    /// Tick in 100ms steps until the replay is over.
    fn run_replay(c: &mut Conversation, mut now: Instant) -> Instant {
        for _ in 0..1_000 {
            if !c.is_busy() {
                break;
            }
            now += Duration::from_millis(100);
            c.tick(now);
        }
        now
    }

    fn agent_texts(c: &Conversation) -> Vec<&str> {
        c.messages()
            .iter()
            .filter(|m| m.role == Role::Agent)
            .map(|m| m.content.as_str())
            .collect()
    }

    #[test]
    fn start_posts_welcome() {
        let c = started(Instant::now());
        assert!(c.is_active());
        assert_eq!(c.session_id(), Some("abc"));
        assert_eq!(agent_texts(&c), vec![WELCOME_MESSAGE]);
    }

    #[test]
    fn fillers_are_not_replayed() {
        let now = Instant::now();
        let mut c = started(now);
        let cycle = c.submit("hi").unwrap();

        for text in [".", "so", "Hey, how are you?"] {
            c.handle_stream_event(cycle, part(text), now);
        }
        c.handle_stream_event(cycle, complete(None), now);
        assert!(c.is_busy());

        run_replay(&mut c, now);
        assert_eq!(agent_texts(&c), vec![WELCOME_MESSAGE, "Hey, how are you?"]);
        assert!(!c.is_composing());
    }

    #[test]
    fn replay_waits_for_complete() {
        let now = Instant::now();
        let mut c = started(now);
        let cycle = c.submit("hi").unwrap();
        c.handle_stream_event(cycle, typing("typing..."), now);
        c.handle_stream_event(cycle, part("first"), now);
        c.handle_stream_event(cycle, part("second"), now);
        assert_eq!(c.typing_preview(), Some("typing..."));

        c.tick(now + Duration::from_secs(30));
        assert_eq!(agent_texts(&c).len(), 1);

        c.handle_stream_event(cycle, complete(None), now);
        assert_eq!(c.typing_preview(), None);
        run_replay(&mut c, now);
        assert_eq!(agent_texts(&c), vec![WELCOME_MESSAGE, "first", "second"]);
    }

    #[test]
    fn input_is_gated_while_busy() {
        let now = Instant::now();
        let mut c = started(now);
        let cycle = c.submit("one").unwrap();
        assert!(!c.can_submit());
        assert_eq!(c.submit("two"), None);

        c.handle_stream_event(cycle, part("reply"), now);
        c.handle_stream_event(cycle, complete(None), now);
        assert_eq!(c.submit("three"), None);

        run_replay(&mut c, now);
        assert!(c.can_submit());
        assert!(c.submit("   ").is_none());
        assert!(c.submit("four").is_some());
    }

    #[test]
    fn session_stopped_deactivates_without_messages() {
        let now = Instant::now();
        let mut c = started(now);
        let cycle = c.submit("hello").unwrap();

        c.handle_stream_event(
            cycle,
            StreamEvent::Complete {
                affect_signal: None,
                session_stopped: true,
            },
            now,
        );

        assert!(!c.is_active());
        assert!(!c.is_busy());
        assert_eq!(agent_texts(&c), vec![WELCOME_MESSAGE]);
        assert!(c.alert().visible);
        assert_eq!(c.alert().reason_text, SESSION_STOPPED_REASON);
        assert_eq!(*c.appearance(), AppearanceState::default());
    }

    #[test]
    fn crisis_alert_rides_on_complete() {
        let now = Instant::now();
        let mut c = started(now);
        let cycle = c.submit("...").unwrap();
        let signal = AffectSignal::new(AffectStatus::Red, "Violent threat detected");
        c.handle_stream_event(cycle, complete(Some(signal)), now);

        assert!(c.alert().visible);
        assert_eq!(c.alert().reason_text, "Violent threat detected");
        assert_eq!(c.last_signal().map(|s| s.status), Some(AffectStatus::Red));

        c.tick(now + ALERT_LIFETIME);
        assert!(!c.alert().visible);
    }

    #[test]
    fn signal_drives_appearance() {
        let now = Instant::now();
        let mut c = started(now);
        let cycle = c.submit("hey").unwrap();
        c.handle_stream_event(cycle, part("come here"), now);
        c.handle_stream_event(
            cycle,
            complete(Some(AffectSignal::new(AffectStatus::Sexual, "room script, msg 3"))),
            now,
        );

        assert_eq!(c.appearance().progression_count, 1);
        assert_eq!(c.appearance().outfit_stage, OutfitStage::CasualPullshirt);
    }

    #[test]
    fn stream_error_clears_transient_state() {
        let now = Instant::now();
        let mut c = started(now);
        let cycle = c.submit("hey").unwrap();
        c.handle_stream_event(cycle, typing("one sec..."), now);
        c.handle_stream_event(cycle, part("partial"), now);
        c.handle_stream_event(
            cycle,
            StreamEvent::Error {
                message: "model overloaded".into(),
            },
            now,
        );

        assert_eq!(c.error(), Some("model overloaded"));
        assert!(!c.is_busy());
        assert_eq!(c.typing_preview(), None);
        c.tick(now + Duration::from_secs(10));
        assert_eq!(agent_texts(&c), vec![WELCOME_MESSAGE]);

        c.dismiss_error();
        assert_eq!(c.error(), None);
    }

    #[test]
    fn transport_failure_is_retryable() {
        let now = Instant::now();
        let mut c = started(now);
        let cycle = c.submit("hey").unwrap();
        c.transport_failed(cycle, "connection refused");

        assert!(c.error().unwrap().starts_with(SEND_FAILED));
        assert!(c.can_submit());
    }

    #[test]
    fn stop_cancels_replay_and_orphans_events() {
        let now = Instant::now();
        let mut c = started(now);
        let cycle = c.submit("hey").unwrap();
        c.handle_stream_event(cycle, part("a"), now);
        c.handle_stream_event(cycle, part("b"), now);
        c.handle_stream_event(cycle, complete(None), now);
        c.tick(now + Duration::from_millis(1_500));
        assert_eq!(agent_texts(&c).len(), 2);

        c.stop();
        assert!(!c.is_busy());
        run_replay(&mut c, now + Duration::from_secs(2));
        c.tick(now + Duration::from_secs(60));
        assert_eq!(agent_texts(&c).len(), 2);

        c.handle_stream_event(cycle, part("late"), now);
        c.handle_stream_event(cycle, complete(None), now);
        c.tick(now + Duration::from_secs(120));
        assert_eq!(agent_texts(&c).len(), 2);
    }

    #[test]
    fn stop_clears_pending_alert() {
        let now = Instant::now();
        let mut c = started(now);
        let cycle = c.submit("x").unwrap();
        c.handle_stream_event(
            cycle,
            complete(Some(AffectSignal::new(AffectStatus::Red, "crisis"))),
            now,
        );
        assert!(c.alert().visible);

        c.stop();
        assert!(!c.alert().visible);
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn reset_forgets_history() {
        let now = Instant::now();
        let mut c = started(now);
        c.submit("hi").unwrap();
        c.reset();
        assert!(c.messages().is_empty());
        assert!(!c.is_active());
    }

    #[test]
    fn ghost_poll_only_while_idle() {
        let now = Instant::now();
        let mut c = started(now);
        assert!(!c.ghost_poll_due(now + Duration::from_secs(5)));
        assert!(c.ghost_poll_due(now + Duration::from_secs(10)));
        assert!(!c.ghost_poll_due(now + Duration::from_secs(11)));

        c.submit("hi").unwrap();
        assert!(!c.ghost_poll_due(now + Duration::from_secs(60)));

        c.stop();
        assert!(!c.ghost_poll_due(now + Duration::from_secs(120)));
    }

    #[test]
    fn ghosts_never_interleave_with_a_reply() {
        let now = Instant::now();
        let mut c = started(now);
        let cycle = c.submit("hi").unwrap();
        c.handle_stream_event(cycle, part("one"), now);
        c.handle_stream_event(cycle, part("two"), now);
        c.handle_stream_event(cycle, complete(None), now);

        c.accept_ghost_messages(vec![GhostMessage {
            content: "still there?".into(),
            timestamp: 0.0,
            escalation_level: Some(1),
        }]);
        assert_eq!(agent_texts(&c), vec![WELCOME_MESSAGE]);

        run_replay(&mut c, now);
        c.tick(now + Duration::from_secs(30));
        assert_eq!(
            agent_texts(&c),
            vec![WELCOME_MESSAGE, "one", "two", "still there?"]
        );
    }

    #[test]
    fn idle_ghosts_append_immediately() {
        let mut c = started(Instant::now());
        c.accept_ghost_messages(vec![GhostMessage {
            content: "miss you".into(),
            timestamp: 1_700_000_000.0,
            escalation_level: None,
        }]);
        let last = c.messages().last().unwrap();
        assert_eq!(last.content, "miss you");
        assert_eq!(last.timestamp, 1_700_000_000.0);
    }
}
