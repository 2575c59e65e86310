use std::collections::VecDeque;
use std::ops::Range;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

/// Wait before the first fragment of a cycle, in milliseconds.
pub const INITIAL_DELAY_MS: Range<u64> = 800..1500;
/// Wait between consecutive fragments, in milliseconds.
pub const FOLLOW_UP_DELAY_MS: Range<u64> = 1500..2500;

/// Replays a fully collected cycle one fragment at a time.
///
/// Timer-free: the host calls `poll` from its event loop and the scheduler
/// hands back whatever is due. At most one fragment is released per poll and
/// the next deadline is measured from that release, so gaps between emitted
/// messages never drop below the lower bound even when the host polls late.
pub struct PacingScheduler {
    rng: StdRng,
    queue: VecDeque<String>,
    next_due: Option<Instant>,
}

impl PacingScheduler {
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            queue: VecDeque::new(),
            next_due: None,
        }
    }

    /// Start replaying `fragments`. Returns false (and stays idle) when there
    /// is nothing to show.
    pub fn begin(&mut self, fragments: Vec<String>, now: Instant) -> bool {
        self.cancel();
        if fragments.is_empty() {
            return false;
        }

        let delay = self.draw(INITIAL_DELAY_MS);
        debug!(
            fragments = fragments.len(),
            first_in_ms = delay.as_millis() as u64,
            "pacing replay scheduled"
        );
        self.queue = fragments.into();
        self.next_due = Some(now + delay);
        true
    }

    /// Release the next fragment if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let due = self.next_due?;
        if now < due {
            return None;
        }

        let fragment = self.queue.pop_front()?;
        self.next_due = if self.queue.is_empty() {
            None
        } else {
            Some(now + self.draw(FOLLOW_UP_DELAY_MS))
        };
        Some(fragment)
    }

    /// Drop every outstanding emission.
    pub fn cancel(&mut self) {
        self.queue.clear();
        self.next_due = None;
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    fn draw(&mut self, range: Range<u64>) -> Duration {
        Duration::from_millis(self.rng.gen_range(range))
    }
}
