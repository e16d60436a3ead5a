//! PPS time correlator.
//!
//! Each pulse pairs a local monotonic instant with the disciplined wall
//! clock snapped to the nearest whole second, forming a
//! [`DisciplineAnchor`]. Two anchors suffice: mapping an instant to UTC is
//! linear extrapolation from the newest anchor, and extrapolation error is
//! bounded by local clock drift over at most one second, far below the
//! sensors' own timing jitter.

use crate::clock::pulse::RawPulse;
use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use std::time::{Duration, Instant};

/// Correlator synchronization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSync {
    /// Pulses arriving on the 1-second cadence
    Synchronized,
    /// Cadence broken (missed/duplicated pulse); timestamps are still
    /// produced but flagged low-confidence
    Unsynchronized,
}

/// One pulse's pairing of the local and UTC clocks.
#[derive(Debug, Clone, Copy)]
pub struct DisciplineAnchor {
    pub pulse_sequence: u64,
    pub utc: DateTime<Utc>,
    pub local: Instant,
}

/// A UTC instant derived from the local clock.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    pub utc: DateTime<Utc>,
    /// Set while the correlator is unsynchronized (or has no anchor);
    /// consumers decide whether to display or discard
    pub low_confidence: bool,
}

/// Maps local monotonic instants onto the PPS-disciplined UTC axis.
pub struct PpsCorrelator {
    /// Newest anchor last; at most two retained
    anchors: Vec<DisciplineAnchor>,
    state: ClockSync,
    good_intervals: u32,
    jitter_tolerance: Duration,
}

impl PpsCorrelator {
    pub fn new(jitter_tolerance: Duration) -> Self {
        Self {
            anchors: Vec::with_capacity(2),
            state: ClockSync::Unsynchronized,
            good_intervals: 0,
            jitter_tolerance,
        }
    }

    pub fn state(&self) -> ClockSync {
        self.state
    }

    /// Newest anchor, if any pulse has been seen.
    pub fn latest_anchor(&self) -> Option<&DisciplineAnchor> {
        self.anchors.last()
    }

    /// Record a pulse edge.
    ///
    /// `wall` is the disciplined wall clock read at the edge; it is
    /// snapped to the nearest whole second because the pulse marks a UTC
    /// second boundary by definition.
    pub fn on_pulse(&mut self, pulse: RawPulse, wall: DateTime<Utc>) {
        let utc = snap_to_second(wall);

        if let Some(prev) = self.anchors.last() {
            let seq_ok = pulse.sequence == prev.pulse_sequence + 1;
            let utc_step = utc - prev.utc;
            let utc_ok = utc_step == ChronoDuration::seconds(1);
            let local_ok = self.local_gap_ok(prev.local, pulse.local);

            if seq_ok && utc_ok && local_ok {
                self.good_intervals += 1;
                if self.state == ClockSync::Unsynchronized && self.good_intervals >= 1 {
                    log::info!("PPS cadence established, clock synchronized");
                    self.state = ClockSync::Synchronized;
                }
            } else {
                if self.state == ClockSync::Synchronized {
                    log::warn!(
                        "PPS cadence broken (seq {} -> {}, utc step {} ms)",
                        prev.pulse_sequence,
                        pulse.sequence,
                        utc_step.num_milliseconds()
                    );
                }
                self.good_intervals = 0;
                self.state = ClockSync::Unsynchronized;
            }
        }

        if self.anchors.len() == 2 {
            self.anchors.remove(0);
        }
        self.anchors.push(DisciplineAnchor {
            pulse_sequence: pulse.sequence,
            utc,
            local: pulse.local,
        });
    }

    /// Record a missed pulse (wait timeout). The next pulse cannot form a
    /// good interval against a stale anchor, so cadence restarts.
    pub fn on_missed_pulse(&mut self) {
        if self.state == ClockSync::Synchronized {
            log::warn!("PPS pulse missed, clock unsynchronized");
        }
        self.good_intervals = 0;
        self.state = ClockSync::Unsynchronized;
    }

    /// Map a local instant to UTC by extrapolating from the newest anchor.
    ///
    /// Returns `None` before the first pulse. Instants earlier than the
    /// anchor (a sample captured just before the pulse was processed) map
    /// backwards across it.
    pub fn to_utc(&self, local: Instant) -> Option<Timestamp> {
        let anchor = self.anchors.last()?;
        let utc = match local.checked_duration_since(anchor.local) {
            Some(forward) => anchor.utc + chrono_from_std(forward),
            None => anchor.utc - chrono_from_std(anchor.local.duration_since(local)),
        };
        Some(Timestamp {
            utc,
            low_confidence: self.state == ClockSync::Unsynchronized,
        })
    }

    fn local_gap_ok(&self, prev: Instant, next: Instant) -> bool {
        let Some(gap) = next.checked_duration_since(prev) else {
            return false;
        };
        let second = Duration::from_secs(1);
        let deviation = if gap > second { gap - second } else { second - gap };
        deviation <= self.jitter_tolerance
    }
}

/// Round a wall-clock reading to the nearest whole second.
fn snap_to_second(wall: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = wall
        .with_nanosecond(0)
        .unwrap_or(wall);
    if wall.timestamp_subsec_nanos() >= 500_000_000 {
        truncated + ChronoDuration::seconds(1)
    } else {
        truncated
    }
}

fn chrono_from_std(d: Duration) -> ChronoDuration {
    ChronoDuration::from_std(d).unwrap_or_else(|_| ChronoDuration::seconds(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wall(secs: i64, millis: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, millis * 1_000_000)
            .unwrap()
    }

    fn feed_pulses(c: &mut PpsCorrelator, base: Instant, pulses: &[(u64, u64, i64, u32)]) {
        // (sequence, local offset ms, wall secs, wall millis)
        for &(seq, local_ms, wsec, wms) in pulses {
            c.on_pulse(
                RawPulse {
                    sequence: seq,
                    local: base + Duration::from_millis(local_ms),
                },
                wall(wsec, wms),
            );
        }
    }

    #[test]
    fn test_two_pulses_establish_sync() {
        let mut c = PpsCorrelator::new(Duration::from_millis(100));
        let base = Instant::now();
        assert_eq!(c.state(), ClockSync::Unsynchronized);

        feed_pulses(&mut c, base, &[(1, 0, 0, 2)]);
        assert_eq!(c.state(), ClockSync::Unsynchronized);

        feed_pulses(&mut c, base, &[(2, 1000, 1, 3)]);
        assert_eq!(c.state(), ClockSync::Synchronized);
    }

    #[test]
    fn test_anchors_one_second_apart() {
        let mut c = PpsCorrelator::new(Duration::from_millis(100));
        let base = Instant::now();
        feed_pulses(&mut c, base, &[(1, 0, 0, 0), (2, 1000, 1, 1), (3, 2001, 2, 0)]);
        assert_eq!(c.state(), ClockSync::Synchronized);
        let anchor = c.latest_anchor().unwrap();
        assert_eq!(anchor.pulse_sequence, 3);
        assert_eq!(anchor.utc, wall(2, 0));
    }

    #[test]
    fn test_sequence_gap_breaks_sync() {
        let mut c = PpsCorrelator::new(Duration::from_millis(100));
        let base = Instant::now();
        feed_pulses(&mut c, base, &[(1, 0, 0, 0), (2, 1000, 1, 0)]);
        assert_eq!(c.state(), ClockSync::Synchronized);

        // Sequence jumps from 2 to 4: one pulse went missing
        feed_pulses(&mut c, base, &[(4, 3000, 3, 0)]);
        assert_eq!(c.state(), ClockSync::Unsynchronized);
    }

    #[test]
    fn test_missed_pulse_then_recovery() {
        let mut c = PpsCorrelator::new(Duration::from_millis(100));
        let base = Instant::now();
        feed_pulses(&mut c, base, &[(1, 0, 0, 0), (2, 1000, 1, 0)]);
        c.on_missed_pulse();
        assert_eq!(c.state(), ClockSync::Unsynchronized);

        // Two consecutive on-time pulses flip it back
        feed_pulses(&mut c, base, &[(3, 3000, 3, 0)]);
        assert_eq!(c.state(), ClockSync::Unsynchronized);
        feed_pulses(&mut c, base, &[(4, 4000, 4, 0)]);
        assert_eq!(c.state(), ClockSync::Synchronized);
    }

    #[test]
    fn test_wrong_utc_step_breaks_sync() {
        let mut c = PpsCorrelator::new(Duration::from_millis(100));
        let base = Instant::now();
        // Wall clock stepped by 2 s between consecutive pulses
        feed_pulses(&mut c, base, &[(1, 0, 0, 0), (2, 1000, 2, 0)]);
        assert_eq!(c.state(), ClockSync::Unsynchronized);
    }

    #[test]
    fn test_to_utc_extrapolates_forward() {
        let mut c = PpsCorrelator::new(Duration::from_millis(100));
        let base = Instant::now();
        feed_pulses(&mut c, base, &[(1, 0, 0, 0), (2, 1000, 1, 0)]);

        let ts = c.to_utc(base + Duration::from_millis(1250)).unwrap();
        assert_eq!(ts.utc, wall(1, 250));
        assert!(!ts.low_confidence);
    }

    #[test]
    fn test_to_utc_before_anchor() {
        let mut c = PpsCorrelator::new(Duration::from_millis(100));
        let base = Instant::now();
        feed_pulses(&mut c, base, &[(1, 0, 0, 0), (2, 1000, 1, 0)]);

        // Edge captured 10 ms before the newest pulse was processed
        let ts = c.to_utc(base + Duration::from_millis(990)).unwrap();
        assert_eq!(ts.utc, wall(0, 990));
    }

    #[test]
    fn test_low_confidence_while_unsynchronized() {
        let mut c = PpsCorrelator::new(Duration::from_millis(100));
        let base = Instant::now();
        feed_pulses(&mut c, base, &[(1, 0, 0, 0)]);
        let ts = c.to_utc(base + Duration::from_millis(500)).unwrap();
        assert!(ts.low_confidence);
    }

    #[test]
    fn test_no_anchor_yields_none() {
        let c = PpsCorrelator::new(Duration::from_millis(100));
        assert!(c.to_utc(Instant::now()).is_none());
    }

    #[test]
    fn test_snap_to_second() {
        assert_eq!(snap_to_second(wall(5, 2)), wall(5, 0));
        assert_eq!(snap_to_second(wall(5, 998)), wall(6, 0));
    }
}
