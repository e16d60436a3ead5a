//! GNSS serial line reader thread.
//!
//! Accumulates bytes from the transport into lines, parses each line, and
//! feeds accepted sentences to the fix tracker. Parse errors are counted
//! and dropped here; they never propagate upward or disturb tracker state.

use crate::clock::ClockService;
use crate::gnss::tracker::{FixSnapshot, FixTracker};
use crate::nmea::parse_sentence;
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest line accepted before the buffer is treated as garbage.
const MAX_LINE_LEN: usize = 1024;

/// A fix snapshot stamped onto the disciplined time axis at emission.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedFix {
    pub utc: DateTime<Utc>,
    pub low_confidence: bool,
    pub fix: FixSnapshot,
}

/// Reader thread state.
pub struct GnssReader {
    transport: Box<dyn Transport>,
    tracker: FixTracker,
    clock: Arc<ClockService>,
    out: Arc<ArrayQueue<StampedFix>>,
    line: Vec<u8>,
    parse_errors: u64,
    sentences: u64,
    displaced: u64,
}

impl GnssReader {
    pub fn new(
        transport: Box<dyn Transport>,
        tracker: FixTracker,
        clock: Arc<ClockService>,
        out: Arc<ArrayQueue<StampedFix>>,
    ) -> Self {
        Self {
            transport,
            tracker,
            clock,
            out,
            line: Vec::with_capacity(128),
            parse_errors: 0,
            sentences: 0,
            displaced: 0,
        }
    }

    /// Reader thread body.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        log::info!("GNSS reader started");
        let mut buf = [0u8; 512];

        while !shutdown.load(Ordering::Relaxed) {
            match self.transport.read(&mut buf) {
                Ok(0) => std::thread::sleep(Duration::from_millis(5)),
                Ok(n) => self.ingest(&buf[..n]),
                Err(e) => {
                    log::error!("GNSS transport read error: {}", e);
                    std::thread::sleep(Duration::from_millis(100));
                }
            }

            if let Some(snap) = self.tracker.check_stale(Instant::now()) {
                self.emit(snap);
            }
        }

        log::info!(
            "GNSS reader exiting: {} sentences, {} parse errors",
            self.sentences,
            self.parse_errors
        );
    }

    /// Feed raw receiver bytes into the line accumulator.
    fn ingest(&mut self, bytes: &[u8]) {
        for &b in bytes {
            match b {
                b'\n' => {
                    let line = std::mem::take(&mut self.line);
                    if !line.is_empty() {
                        self.process_line(&line);
                    }
                }
                b'\r' => {}
                _ => {
                    self.line.push(b);
                    if self.line.len() > MAX_LINE_LEN {
                        log::debug!("Discarding oversized line buffer");
                        self.line.clear();
                    }
                }
            }
        }
    }

    fn process_line(&mut self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        match parse_sentence(&text) {
            Ok(sentence) => {
                self.sentences += 1;
                if let Some(snap) = self.tracker.apply(&sentence, Instant::now()) {
                    self.emit(snap);
                }
            }
            Err(e) => {
                self.parse_errors += 1;
                log::debug!("Sentence discarded ({}): {}", e, text.trim());
            }
        }
    }

    fn emit(&mut self, fix: FixSnapshot) {
        let stamp = self.clock.timestamp(Instant::now());
        let stamped = StampedFix {
            utc: stamp.utc,
            low_confidence: stamp.low_confidence,
            fix,
        };
        if self.out.force_push(stamped).is_some() {
            self.displaced += 1;
            log::warn!("Fix queue full, displaced oldest ({} total)", self.displaced);
        }
    }
}
