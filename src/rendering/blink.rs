//! The blink clock.
//!
//! Blinking tiles are shown and hidden in lockstep. A single [`BlinkClock`] owned by the
//! renderer decides the current phase; the renderer applies it to the scene before hashing a
//! frame, so a phase flip simply shows up as changed frame hashes.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct BlinkClock {
    interval: Duration,
    last_flip: Instant,
    visible: bool,
}

impl BlinkClock {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    /// Creates a clock whose first phase starts at `now`, in the visible phase.
    pub fn starting_at(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_flip: now,
            visible: true,
        }
    }

    /// Whether blinking tiles are currently shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time until the next flip.
    pub fn until_next_flip(&self, now: Instant) -> Duration {
        (self.last_flip + self.interval).saturating_duration_since(now)
    }

    /// Advances the clock to `now`. Returns the new phase if it flipped.
    ///
    /// A zero interval disables blinking. After a long pause the clock flips only once and
    /// restarts its phase at `now`.
    pub fn tick(&mut self, now: Instant) -> Option<bool> {
        if self.interval.is_zero() || now.saturating_duration_since(self.last_flip) < self.interval {
            return None;
        }
        self.visible = !self.visible;
        self.last_flip = now;
        Some(self.visible)
    }
}

impl Default for BlinkClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}
