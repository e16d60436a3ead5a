//! Disciplined time axis for sensor samples.
//!
//! A once-per-second hardware pulse marks UTC second boundaries on the
//! local monotonic clock. The correlator anchors the two clocks to each
//! other so any monotonic instant maps to UTC, independent of when the
//! sample was processed.

pub mod correlator;
pub mod pulse;

pub use correlator::{ClockSync, DisciplineAnchor, PpsCorrelator, Timestamp};
pub use pulse::{pulse_loop, PulseSource, RawPulse, SystemWallClock, WallClock};

use crate::config::PpsConfig;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Shared clock facade used by sampler and reader threads.
///
/// Wraps the correlator behind a mutex held only for anchor arithmetic,
/// and falls back to the disciplined wall clock while no anchor exists.
pub struct ClockService {
    correlator: Mutex<PpsCorrelator>,
    wall: Box<dyn WallClock>,
}

impl ClockService {
    pub fn new(config: &PpsConfig, wall: Box<dyn WallClock>) -> Self {
        let tolerance = Duration::from_millis(config.jitter_tolerance_ms);
        Self {
            correlator: Mutex::new(PpsCorrelator::new(tolerance)),
            wall,
        }
    }

    /// Record a pulse edge, anchoring the local clock to UTC.
    pub fn on_pulse(&self, pulse: RawPulse) {
        let wall = self.wall.now();
        self.correlator.lock().on_pulse(pulse, wall);
    }

    /// Record a missed pulse (wait timeout).
    pub fn on_missed_pulse(&self) {
        self.correlator.lock().on_missed_pulse();
    }

    /// Map a local monotonic instant onto the disciplined UTC axis.
    ///
    /// Before the first pulse this falls back to the wall clock and the
    /// timestamp is flagged low-confidence.
    pub fn timestamp(&self, local: Instant) -> Timestamp {
        match self.correlator.lock().to_utc(local) {
            Some(ts) => ts,
            None => Timestamp {
                utc: self.wall.now(),
                low_confidence: true,
            },
        }
    }

    /// Current correlator synchronization state.
    pub fn sync_state(&self) -> ClockSync {
        self.correlator.lock().state()
    }
}
