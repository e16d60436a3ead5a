//! Fix-state tracker.
//!
//! Assembles sentences into per-reporting-interval fixes. Intervals are
//! keyed by the GGA time field; VTG sentences carry no time and merge into
//! whichever interval completes next (last-value-hold for velocity). The
//! tracker owns all fix state; downstream only ever sees immutable
//! snapshots.
//!
//! Interval lifecycle: `Empty -> Assembling -> Complete`, restarted by the
//! first sentence of a newer interval. An interval that never completed is
//! discarded when superseded, never merged.

use crate::nmea::{FixQuality, GgaData, Sentence, VtgData};
use std::time::{Duration, Instant};

/// Immutable fix snapshot presented downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct FixSnapshot {
    /// Receiver-reported UTC time, HHMMSS.ss
    pub utc_time: Option<String>,
    pub latitude_deg: Option<f64>,
    pub longitude_deg: Option<f64>,
    pub altitude_m: Option<f64>,
    pub fix_quality: FixQuality,
    pub num_satellites: Option<u32>,
    pub hdop: Option<f64>,
    /// Velocity validity from the VTG FAA mode
    pub vtg_valid: bool,
    pub speed_ms: Option<f64>,
    pub track_deg: Option<f64>,
}

impl Default for FixSnapshot {
    fn default() -> Self {
        Self {
            utc_time: None,
            latitude_deg: None,
            longitude_deg: None,
            altitude_m: None,
            fix_quality: FixQuality::Invalid,
            num_satellites: None,
            hdop: None,
            vtg_valid: false,
            speed_ms: None,
            track_deg: None,
        }
    }
}

/// Assembly state of the reporting interval being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalState {
    /// No sentence seen yet
    Empty,
    /// An interval is open but not yet presentable
    Assembling { utc_time: String },
    /// The interval's fix has been presented
    Complete { utc_time: String },
}

/// Pure assembly of a fix from one GGA and the held VTG.
///
/// Every GGA-owned slot is refreshed from the sentence, including to
/// `None`: an empty latitude on a no-fix interval means there is no
/// position, and holding coordinates from an older interval would mix
/// stale fields into the presented fix.
fn assemble(gga: &GgaData, vtg: Option<&VtgData>) -> FixSnapshot {
    FixSnapshot {
        utc_time: gga.utc_time.clone(),
        latitude_deg: gga.latitude_deg,
        longitude_deg: gga.longitude_deg,
        altitude_m: gga.altitude_m,
        fix_quality: gga.fix_quality,
        num_satellites: gga.num_satellites,
        hdop: gga.hdop,
        vtg_valid: vtg.is_some_and(|v| v.valid),
        speed_ms: vtg.and_then(|v| v.speed_ms),
        track_deg: vtg.and_then(|v| v.track_true_deg),
    }
}

/// Tracks the current fix across reporting intervals and detects feed
/// staleness.
pub struct FixTracker {
    state: IntervalState,
    current: FixSnapshot,
    held_vtg: Option<VtgData>,
    stale_after: Duration,
    last_advance: Instant,
    stale: bool,
}

impl FixTracker {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            state: IntervalState::Empty,
            current: FixSnapshot::default(),
            held_vtg: None,
            stale_after,
            last_advance: Instant::now(),
            stale: false,
        }
    }

    /// Last presented fix.
    pub fn current(&self) -> &FixSnapshot {
        &self.current
    }

    pub fn state(&self) -> &IntervalState {
        &self.state
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Apply one parsed sentence. Returns a snapshot when the presented
    /// fix changed (a new presentable interval, or recovery from stale).
    pub fn apply(&mut self, sentence: &Sentence, now: Instant) -> Option<FixSnapshot> {
        match sentence {
            Sentence::Vtg(v) => {
                // No embedded time; joins the interval that completes next
                self.held_vtg = Some(v.clone());
                None
            }
            Sentence::Gga(g) => self.apply_gga(g, now),
        }
    }

    fn apply_gga(&mut self, gga: &GgaData, now: Instant) -> Option<FixSnapshot> {
        // Without a time field the sentence cannot be grouped into an
        // interval, and an interval without time is never presentable
        let Some(interval) = gga.utc_time.clone() else {
            log::debug!("GGA without time field ignored");
            return None;
        };

        match &self.state {
            IntervalState::Assembling { utc_time } if *utc_time != interval => {
                log::debug!("Interval {} superseded before completion", utc_time);
            }
            _ => {}
        }
        self.state = IntervalState::Assembling {
            utc_time: interval.clone(),
        };

        // A GGA supplies quality, position, and time in one sentence, so
        // the interval is presentable as soon as it is assembled
        let candidate = assemble(gga, self.held_vtg.as_ref());
        self.state = IntervalState::Complete {
            utc_time: interval,
        };

        self.last_advance = now;
        let was_stale = self.stale;
        self.stale = false;

        if candidate != self.current || was_stale {
            self.current = candidate.clone();
            Some(candidate)
        } else {
            None
        }
    }

    /// Staleness check, called periodically by the reader thread.
    ///
    /// Staleness is a liveness property of the feed, independent of the
    /// last fix's validity. On transition into stale the presented fix is
    /// cleared: fields from an expired interval are not presented.
    pub fn check_stale(&mut self, now: Instant) -> Option<FixSnapshot> {
        if self.stale {
            return None;
        }
        if now.duration_since(self.last_advance) <= self.stale_after {
            return None;
        }

        log::warn!(
            "GNSS feed stale: no interval advance in {:?}",
            self.stale_after
        );
        self.stale = true;
        self.current = FixSnapshot::default();
        Some(self.current.clone())
    }
}
