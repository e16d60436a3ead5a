//! Simulated once-per-second pulse source.

use crate::clock::pulse::{PulseSource, RawPulse};
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Synthetic PPS line.
///
/// Emits one pulse per period with a monotonically increasing sequence.
/// Individual pulses can be suppressed to exercise the correlator's
/// unsynchronized path: a suppressed pulse consumes its sequence slot and
/// its wait times out, exactly like a missed hardware edge.
pub struct MockPulseSource {
    period: Duration,
    next_pulse: Option<Instant>,
    sequence: u64,
    suppressed: HashSet<u64>,
}

impl MockPulseSource {
    pub fn new() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    /// Shorter periods keep integration tests fast.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            next_pulse: None,
            sequence: 0,
            suppressed: HashSet::new(),
        }
    }

    /// Suppress the pulse with the given sequence number.
    pub fn suppress(mut self, sequence: u64) -> Self {
        self.suppressed.insert(sequence);
        self
    }
}

impl Default for MockPulseSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseSource for MockPulseSource {
    fn wait_pulse(&mut self, timeout: Duration) -> Result<RawPulse> {
        let now = Instant::now();
        let due = match self.next_pulse {
            Some(t) if t > now => t,
            _ => now,
        };

        self.sequence += 1;
        let sequence = self.sequence;
        self.next_pulse = Some(due + self.period);

        if due > now + timeout {
            std::thread::sleep(timeout);
            return Err(Error::SensorTimeout);
        }
        std::thread::sleep(due - now);

        if self.suppressed.contains(&sequence) {
            // The edge never arrives; the caller's wait runs out
            std::thread::sleep(timeout.saturating_sub(due - now));
            return Err(Error::SensorTimeout);
        }

        Ok(RawPulse {
            sequence,
            local: due,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_increment() {
        let mut src = MockPulseSource::with_period(Duration::from_millis(10));
        let a = src.wait_pulse(Duration::from_millis(100)).unwrap();
        let b = src.wait_pulse(Duration::from_millis(100)).unwrap();
        assert_eq!(b.sequence, a.sequence + 1);
        assert!(b.local > a.local);
    }

    #[test]
    fn test_suppressed_pulse_times_out_and_skips_sequence() {
        let mut src = MockPulseSource::with_period(Duration::from_millis(10)).suppress(2);
        let a = src.wait_pulse(Duration::from_millis(50)).unwrap();
        assert!(matches!(
            src.wait_pulse(Duration::from_millis(50)),
            Err(Error::SensorTimeout)
        ));
        let c = src.wait_pulse(Duration::from_millis(50)).unwrap();
        assert_eq!(c.sequence, a.sequence + 2);
    }
}
