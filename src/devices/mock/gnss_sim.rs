//! Simulated GNSS byte feed.
//!
//! Implements [`Transport`] over an in-memory byte queue. Tests push
//! sentences through a [`MockGnssHandle`]; the simulated daemon mode uses
//! [`MockGnssFeed::simulated`], which emits a GGA+VTG pair once per
//! second along a small deterministic track.

use crate::error::Result;
use crate::nmea::checksum::checksum;
use crate::transport::Transport;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Wrap a sentence body in `$...*XX\r\n` framing with a real checksum.
pub fn frame_sentence(body: &str) -> String {
    format!("${}*{:02X}\r\n", body, checksum(body))
}

/// Test-side handle for pushing bytes into the feed.
#[derive(Clone)]
pub struct MockGnssHandle {
    buffer: Arc<Mutex<VecDeque<u8>>>,
}

impl MockGnssHandle {
    /// Push a complete sentence body (no `$`, checksum, or line ending).
    pub fn push_sentence(&self, body: &str) {
        self.push_raw(frame_sentence(body).as_bytes());
    }

    /// Push raw bytes verbatim (for malformed-input tests).
    pub fn push_raw(&self, bytes: &[u8]) {
        self.buffer.lock().unwrap().extend(bytes);
    }
}

/// Simulated GNSS receiver transport.
pub struct MockGnssFeed {
    buffer: Arc<Mutex<VecDeque<u8>>>,
    simulation: Option<Simulation>,
}

struct Simulation {
    latitude: f64,
    longitude: f64,
    interval: Duration,
    next_emit: Instant,
    seconds: u64,
}

impl MockGnssFeed {
    /// Script-driven feed; bytes arrive only via the handle.
    pub fn scripted() -> (Self, MockGnssHandle) {
        let buffer = Arc::new(Mutex::new(VecDeque::new()));
        let feed = Self {
            buffer: Arc::clone(&buffer),
            simulation: None,
        };
        (feed, MockGnssHandle { buffer })
    }

    /// Self-generating feed: one GGA+VTG pair per second, drifting
    /// north-east from the given origin.
    pub fn simulated(latitude: f64, longitude: f64) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            simulation: Some(Simulation {
                latitude,
                longitude,
                interval: Duration::from_secs(1),
                next_emit: Instant::now(),
                seconds: 0,
            }),
        }
    }

    fn step_simulation(&mut self) {
        let Some(sim) = self.simulation.as_mut() else {
            return;
        };
        let now = Instant::now();
        if now < sim.next_emit {
            return;
        }
        sim.next_emit = now + sim.interval;

        let utc = format!(
            "{:02}{:02}{:02}.00",
            (sim.seconds / 3600) % 24,
            (sim.seconds / 60) % 60,
            sim.seconds % 60
        );
        sim.seconds += 1;
        sim.latitude += 0.000_01;
        sim.longitude += 0.000_01;

        let lat_deg = sim.latitude.trunc();
        let lat_min = (sim.latitude - lat_deg) * 60.0;
        let lon_deg = sim.longitude.trunc();
        let lon_min = (sim.longitude - lon_deg) * 60.0;

        let gga = format!(
            "GNGGA,{},{:02.0}{:07.4},N,{:03.0}{:07.4},E,1,08,0.9,12.0,M,47.0,M,,",
            utc, lat_deg, lat_min, lon_deg, lon_min
        );
        let vtg = "GNVTG,045.0,T,,M,2.1,N,3.9,K,A".to_string();

        let mut buffer = self.buffer.lock().unwrap();
        buffer.extend(frame_sentence(&gga).as_bytes());
        buffer.extend(frame_sentence(&vtg).as_bytes());
    }
}

impl Transport for MockGnssFeed {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        self.step_simulation();

        let mut queue = self.buffer.lock().unwrap();
        let n = queue.len().min(buffer.len());
        for slot in buffer.iter_mut().take(n) {
            *slot = queue.pop_front().unwrap_or(0);
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.buffer.lock().unwrap().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::{parse_sentence, Sentence};

    #[test]
    fn test_frame_sentence_checksum() {
        let framed = frame_sentence("GNVTG,054.7,T,034.4,M,005.5,N,010.2,K,A");
        assert_eq!(framed, "$GNVTG,054.7,T,034.4,M,005.5,N,010.2,K,A*3B\r\n");
    }

    #[test]
    fn test_scripted_feed_round_trip() {
        let (mut feed, handle) = MockGnssFeed::scripted();
        handle.push_sentence("GNVTG,054.7,T,034.4,M,005.5,N,010.2,K,A");

        let mut buf = [0u8; 256];
        let n = feed.read(&mut buf).unwrap();
        let line = std::str::from_utf8(&buf[..n]).unwrap();
        assert!(parse_sentence(line).is_ok());
    }

    #[test]
    fn test_simulated_feed_emits_valid_pair() {
        let mut feed = MockGnssFeed::simulated(48.1173, 11.5167);
        let mut buf = [0u8; 512];
        let n = feed.read(&mut buf).unwrap();
        assert!(n > 0);

        let text = std::str::from_utf8(&buf[..n]).unwrap();
        let mut lines = text.lines();
        let gga = parse_sentence(lines.next().unwrap()).unwrap();
        let vtg = parse_sentence(lines.next().unwrap()).unwrap();
        match (gga, vtg) {
            (Sentence::Gga(g), Sentence::Vtg(v)) => {
                assert!(g.valid);
                assert!((g.latitude_deg.unwrap() - 48.117_31).abs() < 1e-4);
                assert!(v.valid);
            }
            other => panic!("unexpected sentences: {:?}", other),
        }
    }
}
