//! Fusion multiplexer.
//!
//! Merges the IMU sample stream and GNSS snapshot stream into one
//! utc-ordered outbound sequence and publishes it to the broadcast hub.
//! GNSS snapshots arrive change-only from the tracker; IMU samples are
//! forwarded one message per accepted sample (subject to the configured
//! decimation), never coalesced.

use crate::gnss::reader::StampedFix;
use crate::imu::sampler::ImuSample;
use crate::streaming::hub::BroadcastHub;
use crate::streaming::messages::{GnssReport, ImuReport, OutboundMessage};
use chrono::{DateTime, Utc};
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-iteration batch caps, keeping either stream from starving the other.
const GNSS_BATCH: usize = 10;
const IMU_BATCH: usize = 64;

/// Merges both sensor streams into the hub.
pub struct FusionMux {
    imu_rx: Arc<ArrayQueue<ImuSample>>,
    gnss_rx: Arc<ArrayQueue<StampedFix>>,
    hub: Arc<BroadcastHub>,
    /// Forward every Nth accepted IMU sample; 1 = full rate
    decimation: u32,
    imu_seen: u64,
    published: u64,
}

impl FusionMux {
    pub fn new(
        imu_rx: Arc<ArrayQueue<ImuSample>>,
        gnss_rx: Arc<ArrayQueue<StampedFix>>,
        hub: Arc<BroadcastHub>,
        decimation: u32,
    ) -> Self {
        Self {
            imu_rx,
            gnss_rx,
            hub,
            decimation: decimation.max(1),
            imu_seen: 0,
            published: 0,
        }
    }

    /// Fusion thread body. `stop` is raised only after the producer
    /// threads have exited, so the final drain flushes every in-flight
    /// message before the hub goes down.
    pub fn run(&mut self, stop: &AtomicBool) {
        log::info!("Fusion multiplexer started");

        while !stop.load(Ordering::Relaxed) {
            if self.pump() == 0 {
                std::thread::sleep(Duration::from_millis(2));
            }
        }

        // Producers are gone; drain whatever is left
        while self.pump() > 0 {}

        log::info!("Fusion multiplexer exiting ({} messages published)", self.published);
    }

    /// Drain one batch from both queues, order it by utc, publish.
    /// Returns the number of messages published.
    pub fn pump(&mut self) -> usize {
        let mut batch: Vec<(DateTime<Utc>, OutboundMessage)> = Vec::new();

        for _ in 0..GNSS_BATCH {
            let Some(stamped) = self.gnss_rx.pop() else {
                break;
            };
            batch.push((
                stamped.utc,
                OutboundMessage::Gnss(GnssReport::from(&stamped.fix)),
            ));
        }

        for _ in 0..IMU_BATCH {
            let Some(sample) = self.imu_rx.pop() else {
                break;
            };
            self.imu_seen += 1;
            if (self.imu_seen - 1) % self.decimation as u64 == 0 {
                batch.push((sample.utc, OutboundMessage::Imu(ImuReport::from(&sample))));
            }
        }

        // Stable by timestamp: order within each stream is preserved, the
        // two streams interleave by derived utc instant
        batch.sort_by_key(|(utc, _)| *utc);

        let published = batch.len();
        for (_, msg) in batch {
            self.hub.publish(&msg);
        }
        self.published += published as u64;
        published
    }
}
