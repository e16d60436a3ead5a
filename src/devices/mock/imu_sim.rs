//! Simulated ISM330DHCX bus.
//!
//! Behaves like the real device at the register level: WHO_AM_I answers,
//! configuration writes are recorded, and burst reads return little-endian
//! i16 output registers. Data-ready edges free-run at the configured ODR,
//! or follow a test script of edges, timeouts, and faults.

use crate::error::{Error, Result};
use crate::imu::bus::ImuBus;
use crate::imu::driver::{DEVICE_ID, OUTPUT_DATA_RATE_HZ, REG_OUTX_L_G, REG_WHO_AM_I};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One scripted data-ready event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockImuEvent {
    /// Edge fires, burst read succeeds
    Edge,
    /// No edge within the caller's timeout
    Timeout,
    /// Edge fires but the following burst read fails
    FaultyEdge,
}

/// Mock IMU bus for unit tests and hardware-free runs.
pub struct MockImuBus {
    device_id: u8,
    registers: [u8; 128],
    write_log: Arc<Mutex<Vec<(u8, u8)>>>,
    script: Arc<Mutex<VecDeque<MockImuEvent>>>,
    /// Raw gyro output words, [x, y, z]
    gyro_raw: [i16; 3],
    /// Raw accel output words, [x, y, z]; default is ~1 g on z
    accel_raw: [i16; 3],
    fault_next_read: bool,
    period: Duration,
    next_edge: Option<Instant>,
}

impl MockImuBus {
    pub fn new() -> Self {
        Self {
            device_id: DEVICE_ID,
            registers: [0; 128],
            write_log: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            gyro_raw: [0, 0, 0],
            accel_raw: [0, 0, 16393],
            fault_next_read: false,
            period: Duration::from_secs_f64(1.0 / OUTPUT_DATA_RATE_HZ),
            next_edge: None,
        }
    }

    /// Respond to WHO_AM_I with a different id (probe-failure tests).
    pub fn with_device_id(mut self, id: u8) -> Self {
        self.device_id = id;
        self
    }

    /// Fixed raw gyro output words.
    pub fn with_constant_gyro(mut self, raw: [i16; 3]) -> Self {
        self.gyro_raw = raw;
        self
    }

    /// Fixed raw accel output words.
    pub fn with_constant_accel(mut self, raw: [i16; 3]) -> Self {
        self.accel_raw = raw;
        self
    }

    /// Script the next data-ready events. When the script is exhausted the
    /// bus free-runs at the ODR.
    pub fn with_script(self, events: Vec<MockImuEvent>) -> Self {
        self.script.lock().unwrap().extend(events);
        self
    }

    /// Handle to the register write log, for asserting bring-up order.
    pub fn write_log(&self) -> Arc<Mutex<Vec<(u8, u8)>>> {
        Arc::clone(&self.write_log)
    }

    /// Handle to the event script, for feeding events after the bus has
    /// been moved into a driver.
    pub fn script_handle(&self) -> Arc<Mutex<VecDeque<MockImuEvent>>> {
        Arc::clone(&self.script)
    }
}

impl Default for MockImuBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ImuBus for MockImuBus {
    fn read_register(&mut self, reg: u8) -> Result<u8> {
        if reg == REG_WHO_AM_I {
            return Ok(self.device_id);
        }
        Ok(self.registers.get(reg as usize).copied().unwrap_or(0))
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<()> {
        if let Some(slot) = self.registers.get_mut(reg as usize) {
            *slot = value;
        }
        self.write_log.lock().unwrap().push((reg, value));
        Ok(())
    }

    fn read_burst(&mut self, start: u8, buf: &mut [u8]) -> Result<()> {
        if self.fault_next_read {
            self.fault_next_read = false;
            return Err(Error::SensorBusFault("simulated burst failure".to_string()));
        }
        if start != REG_OUTX_L_G || buf.len() != 12 {
            return Err(Error::SensorBusFault(format!(
                "unexpected burst: reg {:#04x}, {} bytes",
                start,
                buf.len()
            )));
        }

        let words = [
            self.gyro_raw[0],
            self.gyro_raw[1],
            self.gyro_raw[2],
            self.accel_raw[0],
            self.accel_raw[1],
            self.accel_raw[2],
        ];
        for (i, w) in words.iter().enumerate() {
            buf[2 * i..2 * i + 2].copy_from_slice(&w.to_le_bytes());
        }
        Ok(())
    }

    fn wait_data_ready(&mut self, timeout: Duration) -> Result<Instant> {
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(MockImuEvent::Edge) => Ok(Instant::now()),
            Some(MockImuEvent::FaultyEdge) => {
                self.fault_next_read = true;
                Ok(Instant::now())
            }
            Some(MockImuEvent::Timeout) => Err(Error::SensorTimeout),
            None => {
                // Free-running: pace edges at the ODR
                let now = Instant::now();
                let edge_at = match self.next_edge {
                    Some(t) if t > now => t,
                    _ => now,
                };
                if edge_at > now + timeout {
                    std::thread::sleep(timeout);
                    return Err(Error::SensorTimeout);
                }
                std::thread::sleep(edge_at - now);
                self.next_edge = Some(edge_at + self.period);
                Ok(edge_at)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_who_am_i() {
        let mut bus = MockImuBus::new();
        assert_eq!(bus.read_register(REG_WHO_AM_I).unwrap(), DEVICE_ID);
        let mut wrong = MockImuBus::new().with_device_id(0x00);
        assert_eq!(wrong.read_register(REG_WHO_AM_I).unwrap(), 0x00);
    }

    #[test]
    fn test_burst_layout() {
        let mut bus = MockImuBus::new()
            .with_constant_gyro([1, 2, 3])
            .with_constant_accel([4, 5, 6]);
        let mut buf = [0u8; 12];
        bus.read_burst(REG_OUTX_L_G, &mut buf).unwrap();
        assert_eq!(i16::from_le_bytes([buf[0], buf[1]]), 1);
        assert_eq!(i16::from_le_bytes([buf[10], buf[11]]), 6);
    }

    #[test]
    fn test_scripted_events_in_order() {
        let mut bus = MockImuBus::new().with_script(vec![
            MockImuEvent::Timeout,
            MockImuEvent::Edge,
        ]);
        assert!(matches!(
            bus.wait_data_ready(Duration::from_millis(10)),
            Err(Error::SensorTimeout)
        ));
        assert!(bus.wait_data_ready(Duration::from_millis(10)).is_ok());
    }

    #[test]
    fn test_faulty_edge_fails_read_once() {
        let mut bus = MockImuBus::new().with_script(vec![MockImuEvent::FaultyEdge]);
        bus.wait_data_ready(Duration::from_millis(10)).unwrap();
        let mut buf = [0u8; 12];
        assert!(bus.read_burst(REG_OUTX_L_G, &mut buf).is_err());
        assert!(bus.read_burst(REG_OUTX_L_G, &mut buf).is_ok());
    }
}
