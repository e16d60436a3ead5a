//! Edge-triggered IMU sampler.
//!
//! Runs on a dedicated thread blocking on the data-ready line; no polling.
//! Exactly one burst read per edge, one [`ImuSample`] per completed read.
//! Nothing here may terminate the process: timeouts drop the sample and
//! continue, repeated bus faults only degrade.

use crate::clock::ClockService;
use crate::error::Error;
use crate::imu::driver::{Ism330Dhcx, OUTPUT_DATA_RATE_HZ};
use chrono::{DateTime, Utc};
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One inertial sample on the disciplined time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// Sample instant on the disciplined UTC axis (data-ready edge time)
    pub utc: DateTime<Utc>,
    /// True while the correlator was unsynchronized at stamping time
    pub low_confidence: bool,
    /// Acceleration in milli-g, [x, y, z]
    pub accel_mg: [f64; 3],
    /// Angular rate in degrees per second, [x, y, z]
    pub gyro_dps: [f64; 3],
    /// Monotonic counter of accepted samples since startup
    pub raw_sequence: u64,
}

/// Sampler health: degraded after too many consecutive bus faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerHealth {
    Nominal,
    Degraded,
}

/// Acquisition counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerStats {
    /// Samples read and forwarded
    pub samples: u64,
    /// Data-ready waits that timed out (sample dropped)
    pub timeouts: u64,
    /// Failed bus transactions
    pub bus_faults: u64,
    /// Edges the hardware signaled but we could not service in time
    pub missed_edges: u64,
    /// Samples displaced from a full downstream queue
    pub dropped_downstream: u64,
}

/// Edge-triggered sampler for the ISM330DHCX.
pub struct EdgeSampler {
    driver: Ism330Dhcx,
    clock: Arc<ClockService>,
    out: Arc<ArrayQueue<ImuSample>>,
    drdy_timeout: Duration,
    max_consecutive_faults: u32,
    period: Duration,
    stats: SamplerStats,
    health: SamplerHealth,
    consecutive_faults: u32,
    sequence: u64,
    last_edge: Option<Instant>,
}

impl EdgeSampler {
    pub fn new(
        driver: Ism330Dhcx,
        clock: Arc<ClockService>,
        out: Arc<ArrayQueue<ImuSample>>,
        drdy_timeout: Duration,
        max_consecutive_faults: u32,
    ) -> Self {
        Self {
            driver,
            clock,
            out,
            drdy_timeout,
            max_consecutive_faults,
            period: Duration::from_secs_f64(1.0 / OUTPUT_DATA_RATE_HZ),
            stats: SamplerStats::default(),
            health: SamplerHealth::Nominal,
            consecutive_faults: 0,
            sequence: 0,
            last_edge: None,
        }
    }

    /// Sampler thread body.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        log::info!("IMU sampler started ({} Hz)", OUTPUT_DATA_RATE_HZ);

        while !shutdown.load(Ordering::Relaxed) {
            self.poll_once();
        }

        let s = self.stats;
        log::info!(
            "IMU sampler exiting: {} samples, {} timeouts, {} bus faults, {} missed edges",
            s.samples,
            s.timeouts,
            s.bus_faults,
            s.missed_edges
        );
    }

    /// Wait for one edge and service it. One call never produces more than
    /// one sample.
    pub fn poll_once(&mut self) {
        match self.driver.wait_sample(self.drdy_timeout) {
            Ok((edge, reading)) => {
                self.note_missed_edges(edge);
                self.note_recovered();

                let read_time = edge.elapsed();
                if read_time > self.period {
                    log::warn!(
                        "IMU burst read took {:?}, longer than the {:?} sample period",
                        read_time,
                        self.period
                    );
                }

                let stamp = self.clock.timestamp(edge);
                let sample = ImuSample {
                    utc: stamp.utc,
                    low_confidence: stamp.low_confidence,
                    accel_mg: reading.accel_mg,
                    gyro_dps: reading.gyro_dps,
                    raw_sequence: self.sequence,
                };
                self.sequence += 1;
                self.stats.samples += 1;
                self.last_edge = Some(edge);

                if self.out.force_push(sample).is_some() {
                    self.stats.dropped_downstream += 1;
                }
            }
            Err(Error::SensorTimeout) => {
                // Dropped sample; the next edge starts clean
                self.stats.timeouts += 1;
                log::debug!("IMU data-ready timeout ({} total)", self.stats.timeouts);
            }
            Err(e) => self.note_fault(&e),
        }
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    pub fn health(&self) -> SamplerHealth {
        self.health
    }

    /// Count edges the hardware fired while we were not ready to read.
    /// Missed samples are reported, never interpolated.
    fn note_missed_edges(&mut self, edge: Instant) {
        let Some(prev) = self.last_edge else {
            return;
        };
        let Some(gap) = edge.checked_duration_since(prev) else {
            return;
        };
        if gap > self.period + self.period / 2 {
            let missed = (gap.as_secs_f64() / self.period.as_secs_f64()).round() as u64 - 1;
            self.stats.missed_edges += missed;
            log::warn!(
                "{} IMU edge(s) missed (gap {:?}, {} total)",
                missed,
                gap,
                self.stats.missed_edges
            );
        }
    }

    fn note_fault(&mut self, e: &Error) {
        self.stats.bus_faults += 1;
        self.consecutive_faults += 1;

        if self.consecutive_faults == self.max_consecutive_faults
            && self.health == SamplerHealth::Nominal
        {
            self.health = SamplerHealth::Degraded;
            log::error!(
                "IMU sampler degraded after {} consecutive bus faults (latest: {})",
                self.consecutive_faults,
                e
            );
        } else {
            log::warn!("IMU bus fault: {}", e);
        }

        // Brief backoff so a wedged bus does not spin the thread
        std::thread::sleep(Duration::from_millis(5));
    }

    fn note_recovered(&mut self) {
        if self.health == SamplerHealth::Degraded {
            log::info!(
                "IMU sampler recovered after {} consecutive bus faults",
                self.consecutive_faults
            );
        }
        self.health = SamplerHealth::Nominal;
        self.consecutive_faults = 0;
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::clock::{ClockService, SystemWallClock};
    use crate::config::PpsConfig;
    use crate::devices::mock::{MockImuBus, MockImuEvent};

    fn test_clock() -> Arc<ClockService> {
        let config = PpsConfig {
            source: "mock".to_string(),
            wait_timeout_ms: 1500,
            jitter_tolerance_ms: 100,
        };
        Arc::new(ClockService::new(&config, Box::new(SystemWallClock)))
    }

    fn sampler_with(
        bus: MockImuBus,
        queue_len: usize,
        max_faults: u32,
    ) -> (EdgeSampler, Arc<ArrayQueue<ImuSample>>) {
        let mut driver = Ism330Dhcx::new(Box::new(bus));
        driver.initialize().unwrap();
        let queue = Arc::new(ArrayQueue::new(queue_len));
        let sampler = EdgeSampler::new(
            driver,
            test_clock(),
            Arc::clone(&queue),
            Duration::from_millis(50),
            max_faults,
        );
        (sampler, queue)
    }

    #[test]
    fn test_one_sample_per_edge() {
        let bus = MockImuBus::new().with_script(vec![
            MockImuEvent::Edge,
            MockImuEvent::Edge,
            MockImuEvent::Edge,
        ]);
        let (mut sampler, queue) = sampler_with(bus, 16, 3);

        for _ in 0..3 {
            sampler.poll_once();
        }
        assert_eq!(sampler.stats().samples, 3);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_timeout_drops_sample_and_continues() {
        let bus = MockImuBus::new().with_script(vec![
            MockImuEvent::Edge,
            MockImuEvent::Timeout,
            MockImuEvent::Edge,
        ]);
        let (mut sampler, _queue) = sampler_with(bus, 16, 3);

        for _ in 0..3 {
            sampler.poll_once();
        }
        let s = sampler.stats();
        assert_eq!(s.samples, 2);
        assert_eq!(s.timeouts, 1);
        assert_eq!(sampler.health(), SamplerHealth::Nominal);
    }

    #[test]
    fn test_consecutive_faults_degrade_but_recover() {
        let bus = MockImuBus::new().with_script(vec![
            MockImuEvent::FaultyEdge,
            MockImuEvent::FaultyEdge,
            MockImuEvent::FaultyEdge,
            MockImuEvent::Edge,
        ]);
        let (mut sampler, _queue) = sampler_with(bus, 16, 3);

        for _ in 0..3 {
            sampler.poll_once();
        }
        assert_eq!(sampler.health(), SamplerHealth::Degraded);
        assert_eq!(sampler.stats().bus_faults, 3);
        assert_eq!(sampler.stats().samples, 0);

        sampler.poll_once();
        assert_eq!(sampler.health(), SamplerHealth::Nominal);
        assert_eq!(sampler.stats().samples, 1);
    }

    #[test]
    fn test_sequence_numbers_are_contiguous() {
        let bus = MockImuBus::new().with_script(vec![
            MockImuEvent::Edge,
            MockImuEvent::Timeout,
            MockImuEvent::Edge,
        ]);
        let (mut sampler, queue) = sampler_with(bus, 16, 3);
        for _ in 0..3 {
            sampler.poll_once();
        }

        let first = queue.pop().unwrap();
        let second = queue.pop().unwrap();
        assert_eq!(first.raw_sequence, 0);
        assert_eq!(second.raw_sequence, 1);
    }

    #[test]
    fn test_full_queue_drops_oldest() {
        let bus = MockImuBus::new().with_script(vec![MockImuEvent::Edge; 4]);
        let (mut sampler, queue) = sampler_with(bus, 2, 3);
        for _ in 0..4 {
            sampler.poll_once();
        }
        assert_eq!(sampler.stats().dropped_downstream, 2);
        // The queue retains the newest samples
        assert_eq!(queue.pop().unwrap().raw_sequence, 2);
        assert_eq!(queue.pop().unwrap().raw_sequence, 3);
    }
}
