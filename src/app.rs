//! Application orchestration for the TriveniIO daemon.
//!
//! Wires the acquisition threads to the broadcast hub and owns the
//! shutdown sequence. Teardown drains leaf-first: the pulse, sampler, and
//! reader threads stop producing, the fusion thread flushes what is in
//! flight to the hub, and only then do subscriber sessions close.

use crate::clock::{pulse_loop, ClockService, PulseSource, SystemWallClock};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::fusion::FusionMux;
use crate::gnss::reader::{GnssReader, StampedFix};
use crate::gnss::tracker::FixTracker;
use crate::imu::driver::Ism330Dhcx;
use crate::imu::sampler::{EdgeSampler, ImuSample};
use crate::imu::ImuBus;
use crate::streaming::hub::BroadcastHub;
use crate::streaming::server::TelemetryServer;
use crate::transport::{SerialTransport, Transport};
use crossbeam_queue::ArrayQueue;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Capacity of the sampler-to-fusion queue (~5 s at 104 Hz).
const IMU_QUEUE_CAPACITY: usize = 512;
/// Capacity of the tracker-to-fusion queue (snapshots are ~1 Hz).
const GNSS_QUEUE_CAPACITY: usize = 16;

/// Daemon application: hardware init, thread lifecycle, shutdown.
pub struct App {
    config: AppConfig,
    hub: Arc<BroadcastHub>,
    clock: Arc<ClockService>,
    shutdown: Arc<AtomicBool>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let hub = Arc::new(BroadcastHub::new(
            config.streaming.queue_capacity,
            config.streaming.overflow_cap,
        ));
        let clock = Arc::new(ClockService::new(&config.pps, Box::new(SystemWallClock)));
        Self {
            config,
            hub,
            clock,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Initialize hardware, start all threads, and block until shutdown.
    pub fn run(&mut self) -> Result<()> {
        log::info!("Initializing TriveniIO");

        // Hardware bring-up failure here is the only fatal error path
        let mut driver = Ism330Dhcx::new(build_imu_bus(&self.config)?);
        driver.initialize()?;
        let drdy_timeout = Duration::from_millis(self.config.imu.drdy_timeout_ms);
        driver.calibrate_gyro(self.config.imu.calibration_samples, drdy_timeout)?;

        let gnss_transport = build_gnss_transport(&self.config)?;
        let pulse_source = build_pulse_source(&self.config)?;

        let imu_queue: Arc<ArrayQueue<ImuSample>> = Arc::new(ArrayQueue::new(IMU_QUEUE_CAPACITY));
        let gnss_queue: Arc<ArrayQueue<StampedFix>> =
            Arc::new(ArrayQueue::new(GNSS_QUEUE_CAPACITY));

        let fusion_stop = Arc::new(AtomicBool::new(false));
        let server_stop = Arc::new(AtomicBool::new(false));

        let mut server = TelemetryServer::start(
            &self.config.streaming.bind_address,
            Arc::clone(&self.hub),
            Arc::clone(&server_stop),
        )?;

        // Pulse thread
        let pulse_clock = Arc::clone(&self.clock);
        let pulse_shutdown = Arc::clone(&self.shutdown);
        let pulse_timeout = Duration::from_millis(self.config.pps.wait_timeout_ms);
        let pulse_handle = spawn_named("pps-correlator", move || {
            pulse_loop(pulse_source, pulse_clock, pulse_timeout, pulse_shutdown)
        })?;

        // IMU sampler thread
        let mut sampler = EdgeSampler::new(
            driver,
            Arc::clone(&self.clock),
            Arc::clone(&imu_queue),
            drdy_timeout,
            self.config.imu.max_consecutive_faults,
        );
        let sampler_shutdown = Arc::clone(&self.shutdown);
        let sampler_handle = spawn_named("imu-sampler", move || {
            sampler.run(&sampler_shutdown);
        })?;

        // GNSS reader thread
        let tracker = FixTracker::new(Duration::from_millis(self.config.tracker.stale_after_ms));
        let mut reader = GnssReader::new(
            gnss_transport,
            tracker,
            Arc::clone(&self.clock),
            Arc::clone(&gnss_queue),
        );
        let reader_shutdown = Arc::clone(&self.shutdown);
        let reader_handle = spawn_named("gnss-reader", move || {
            reader.run(&reader_shutdown);
        })?;

        // Fusion thread, stopped only after the producers are gone
        let mut mux = FusionMux::new(
            imu_queue,
            gnss_queue,
            Arc::clone(&self.hub),
            self.config.imu.decimation,
        );
        let fusion_stop_clone = Arc::clone(&fusion_stop);
        let fusion_handle = spawn_named("fusion", move || {
            mux.run(&fusion_stop_clone);
        })?;

        self.install_signal_handler()?;

        log::info!(
            "TriveniIO running, streaming on {}. Press Ctrl-C to stop.",
            self.config.streaming.bind_address
        );

        let mut last_stats = Instant::now();
        while !self.shutdown.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(100));
            if last_stats.elapsed().as_secs() >= 10 {
                log::info!(
                    "Status: {} subscriber(s), clock {:?}",
                    self.hub.subscriber_count(),
                    self.clock.sync_state()
                );
                last_stats = Instant::now();
            }
        }

        log::info!("Shutdown requested, draining");

        // Leaf-first: producers stop...
        join_quietly(pulse_handle, "pps-correlator");
        join_quietly(sampler_handle, "imu-sampler");
        join_quietly(reader_handle, "gnss-reader");

        // ...fusion flushes in-flight messages to the hub...
        fusion_stop.store(true, Ordering::Relaxed);
        join_quietly(fusion_handle, "fusion");

        // ...then subscriber sessions close
        server_stop.store(true, Ordering::Relaxed);
        server.join();
        thread::sleep(Duration::from_millis(200));

        log::info!("TriveniIO stopped");
        Ok(())
    }

    /// Request shutdown from another thread.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    fn install_signal_handler(&self) -> Result<()> {
        let shutdown = Arc::clone(&self.shutdown);
        thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                let mut signals = match Signals::new([SIGINT, SIGTERM]) {
                    Ok(s) => s,
                    Err(e) => {
                        log::error!("Failed to register signal handlers: {}", e);
                        return;
                    }
                };
                if let Some(sig) = signals.forever().next() {
                    log::info!("Received signal {:?}, initiating shutdown", sig);
                    shutdown.store(true, Ordering::Relaxed);
                }
            })?;
        Ok(())
    }
}

fn spawn_named<F>(name: &str, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    Ok(thread::Builder::new().name(name.to_string()).spawn(f)?)
}

fn join_quietly(handle: JoinHandle<()>, name: &str) {
    if handle.join().is_err() {
        log::error!("Thread {} panicked", name);
    }
}

fn build_gnss_transport(config: &AppConfig) -> Result<Box<dyn Transport>> {
    match config.gnss.source.as_str() {
        "serial" => Ok(Box::new(SerialTransport::open(
            &config.gnss.port,
            config.gnss.baud_rate,
        )?)),
        #[cfg(feature = "mock")]
        "mock" => Ok(Box::new(crate::devices::mock::MockGnssFeed::simulated(
            48.1173, 11.5167,
        ))),
        other => Err(Error::Config(format!("unknown gnss source: {}", other))),
    }
}

fn build_imu_bus(config: &AppConfig) -> Result<Box<dyn ImuBus>> {
    match config.imu.source.as_str() {
        #[cfg(feature = "mock")]
        "mock" => Ok(Box::new(crate::devices::mock::MockImuBus::new())),
        other => Err(Error::Config(format!(
            "unknown imu source: {} (register-level SPI is supplied by the platform integration)",
            other
        ))),
    }
}

fn build_pulse_source(config: &AppConfig) -> Result<Box<dyn PulseSource>> {
    match config.pps.source.as_str() {
        #[cfg(feature = "mock")]
        "mock" => Ok(Box::new(crate::devices::mock::MockPulseSource::new())),
        other => Err(Error::Config(format!("unknown pps source: {}", other))),
    }
}
