//! IMU bus capability.
//!
//! Register-level SPI transactions and the data-ready GPIO line are
//! platform integrations; the daemon consumes them through this trait.

use crate::error::Result;
use std::time::{Duration, Instant};

/// Register access plus data-ready edge wait for the IMU.
pub trait ImuBus: Send {
    /// Read one register.
    fn read_register(&mut self, reg: u8) -> Result<u8>;

    /// Write one register.
    fn write_register(&mut self, reg: u8, value: u8) -> Result<()>;

    /// Burst-read consecutive registers starting at `start`.
    ///
    /// Requires device-side address auto-increment; the driver enables it
    /// during bring-up.
    fn read_burst(&mut self, start: u8, buf: &mut [u8]) -> Result<()>;

    /// Block until the data-ready line pulses, returning the edge instant.
    ///
    /// Implementations must drain edges queued while the caller was busy,
    /// so a burst of edges coalesces into at most one outstanding read.
    /// Returns [`crate::error::Error::SensorTimeout`] when no edge arrives
    /// within `timeout`.
    fn wait_data_ready(&mut self, timeout: Duration) -> Result<Instant>;
}

impl ImuBus for Box<dyn ImuBus> {
    fn read_register(&mut self, reg: u8) -> Result<u8> {
        (**self).read_register(reg)
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<()> {
        (**self).write_register(reg, value)
    }

    fn read_burst(&mut self, start: u8, buf: &mut [u8]) -> Result<()> {
        (**self).read_burst(start, buf)
    }

    fn wait_data_ready(&mut self, timeout: Duration) -> Result<Instant> {
        (**self).wait_data_ready(timeout)
    }
}
