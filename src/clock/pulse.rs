//! Pulse source and wall clock capabilities.

use crate::clock::ClockService;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One hardware pulse edge.
///
/// `sequence` is the source's own monotonic edge counter; `local` is the
/// monotonic instant the edge was captured.
#[derive(Debug, Clone, Copy)]
pub struct RawPulse {
    pub sequence: u64,
    pub local: Instant,
}

/// Once-per-second pulse edge capability (kernel PPS or equivalent).
pub trait PulseSource: Send {
    /// Block until the next pulse edge or timeout.
    ///
    /// Returns [`Error::SensorTimeout`] when no edge arrives in time,
    /// which the caller must treat as a missed pulse.
    fn wait_pulse(&mut self, timeout: Duration) -> Result<RawPulse>;
}

/// Disciplined wall clock capability.
///
/// The OS clock is assumed already locked to GNSS time (chrony or
/// equivalent); this trait only reads it.
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The operating system clock.
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pulse thread body: feeds edges and misses into the clock service.
pub fn pulse_loop(
    mut source: Box<dyn PulseSource>,
    clock: Arc<ClockService>,
    wait_timeout: Duration,
    shutdown: Arc<AtomicBool>,
) {
    let mut pulses = 0u64;
    let mut misses = 0u64;

    while !shutdown.load(Ordering::Relaxed) {
        match source.wait_pulse(wait_timeout) {
            Ok(pulse) => {
                clock.on_pulse(pulse);
                pulses += 1;
                if pulses % 60 == 0 {
                    log::debug!("PPS: {} pulses, {} missed", pulses, misses);
                }
            }
            Err(Error::SensorTimeout) => {
                misses += 1;
                clock.on_missed_pulse();
                log::warn!("PPS pulse missed ({} total)", misses);
            }
            Err(e) => {
                log::error!("Pulse source error: {}", e);
                std::thread::sleep(Duration::from_millis(100));
            }
        }
    }

    log::info!("Pulse thread exiting ({} pulses, {} missed)", pulses, misses);
}
