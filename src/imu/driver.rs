//! ISM330DHCX register driver.
//!
//! Fixed configuration: accelerometer 104 Hz FS=±2 g, gyroscope 104 Hz
//! FS=±2000 dps, accelerometer data-ready routed to INT1.
//!
//! The gyro FS=±2000 dps label is nominal. The datasheet sensitivity is
//! 70 mdps/LSB, so int16 full scale decodes to ±2293.7 dps; physical
//! values always derive from the sensitivity constant, never the range
//! label.

use crate::error::{Error, Result};
use crate::imu::bus::ImuBus;
use std::time::Duration;

pub const REG_WHO_AM_I: u8 = 0x0F;
pub const REG_INT1_CTRL: u8 = 0x0D;
pub const REG_CTRL1_XL: u8 = 0x10;
pub const REG_CTRL2_G: u8 = 0x11;
pub const REG_CTRL3_C: u8 = 0x12;
/// First output register: gyro X/Y/Z (0x22-0x27) then accel X/Y/Z (0x28-0x2D)
pub const REG_OUTX_L_G: u8 = 0x22;

pub const DEVICE_ID: u8 = 0x6B;

const CTRL3_SW_RESET: u8 = 0x01;
/// BDU=1, IF_INC=1
const CTRL3_BDU_IF_INC: u8 = 0x44;
/// DRDY_A on INT1
const INT1_DRDY_XL: u8 = 0x01;
/// Gyro 104 Hz, FS=±2000 dps
const CTRL2_G_104HZ_2000DPS: u8 = 0x4C;
/// Accel 104 Hz, FS=±2 g
const CTRL1_XL_104HZ_2G: u8 = 0x40;

/// Accelerometer sensitivity at FS=±2 g: 0.061 mg/LSB
pub const ACCEL_SENSITIVITY_MG: f64 = 0.061;
/// Gyroscope sensitivity at FS=±2000 dps: 70 mdps/LSB
pub const GYRO_SENSITIVITY_DPS: f64 = 0.070;

/// Configured output data rate
pub const OUTPUT_DATA_RATE_HZ: f64 = 104.0;

const RESET_SETTLE: Duration = Duration::from_millis(100);

/// One decoded burst read, zero-rate offset already applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuReading {
    /// Acceleration in milli-g, [x, y, z]
    pub accel_mg: [f64; 3],
    /// Angular rate in degrees per second, [x, y, z]
    pub gyro_dps: [f64; 3],
}

/// ISM330DHCX over an [`ImuBus`].
pub struct Ism330Dhcx {
    bus: Box<dyn ImuBus>,
    gyro_offset_dps: [f64; 3],
}

impl Ism330Dhcx {
    pub fn new(bus: Box<dyn ImuBus>) -> Self {
        Self {
            bus,
            gyro_offset_dps: [0.0; 3],
        }
    }

    /// Probe and configure the device.
    ///
    /// Fails with [`Error::InitializationFailed`] on a wrong device id;
    /// that aborts startup, it is the one fatal condition in the
    /// acquisition path. CTRL1_XL is written last because it starts the
    /// shared measurement cycle, so data-ready routing must already be in
    /// place.
    pub fn initialize(&mut self) -> Result<()> {
        let id = self.bus.read_register(REG_WHO_AM_I)?;
        if id != DEVICE_ID {
            return Err(Error::InitializationFailed(format!(
                "IMU device id {:#04x}, expected {:#04x}",
                id, DEVICE_ID
            )));
        }

        self.bus.write_register(REG_CTRL3_C, CTRL3_SW_RESET)?;
        std::thread::sleep(RESET_SETTLE);
        self.bus.write_register(REG_CTRL3_C, CTRL3_BDU_IF_INC)?;

        self.bus.write_register(REG_INT1_CTRL, INT1_DRDY_XL)?;
        self.bus.write_register(REG_CTRL2_G, CTRL2_G_104HZ_2000DPS)?;
        self.bus.write_register(REG_CTRL1_XL, CTRL1_XL_104HZ_2G)?;

        log::info!("ISM330DHCX initialized (104 Hz, accel ±2 g, gyro ±2000 dps)");
        Ok(())
    }

    /// Measure the gyro zero-rate offset from stationary samples.
    ///
    /// Averages `samples` data-ready-paced readings and subtracts the mean
    /// from subsequent samples. The device must be stationary.
    pub fn calibrate_gyro(&mut self, samples: u32, drdy_timeout: Duration) -> Result<()> {
        if samples == 0 {
            return Ok(());
        }
        log::info!("Calibrating gyro zero-rate offset ({} samples)", samples);

        let mut sums = [0.0f64; 3];
        for _ in 0..samples {
            self.bus.wait_data_ready(drdy_timeout)?;
            let reading = self.read_raw()?;
            for axis in 0..3 {
                sums[axis] += reading.gyro_dps[axis];
            }
        }
        for axis in 0..3 {
            self.gyro_offset_dps[axis] = sums[axis] / samples as f64;
        }

        log::info!(
            "Gyro offset [dps]: x={:.3} y={:.3} z={:.3}",
            self.gyro_offset_dps[0],
            self.gyro_offset_dps[1],
            self.gyro_offset_dps[2]
        );
        Ok(())
    }

    /// Block until the next data-ready edge, then burst-read one sample.
    ///
    /// Returns the edge instant alongside the offset-corrected reading.
    pub fn wait_sample(&mut self, drdy_timeout: Duration) -> Result<(std::time::Instant, ImuReading)> {
        let edge = self.bus.wait_data_ready(drdy_timeout)?;
        let mut reading = self.read_raw()?;
        for axis in 0..3 {
            reading.gyro_dps[axis] -= self.gyro_offset_dps[axis];
        }
        Ok((edge, reading))
    }

    /// Burst-read the 12 output registers and decode to physical units.
    fn read_raw(&mut self) -> Result<ImuReading> {
        let mut raw = [0u8; 12];
        self.bus.read_burst(REG_OUTX_L_G, &mut raw)?;
        Ok(decode_sample(&raw))
    }
}

/// Decode 12 output-register bytes: six little-endian i16 in the order
/// gyro X, Y, Z then accel X, Y, Z.
pub fn decode_sample(raw: &[u8; 12]) -> ImuReading {
    let word = |i: usize| i16::from_le_bytes([raw[2 * i], raw[2 * i + 1]]) as f64;
    ImuReading {
        gyro_dps: [
            word(0) * GYRO_SENSITIVITY_DPS,
            word(1) * GYRO_SENSITIVITY_DPS,
            word(2) * GYRO_SENSITIVITY_DPS,
        ],
        accel_mg: [
            word(3) * ACCEL_SENSITIVITY_MG,
            word(4) * ACCEL_SENSITIVITY_MG,
            word(5) * ACCEL_SENSITIVITY_MG,
        ],
    }
}

#[cfg(test)]
mod decode_tests {
    use super::*;

    #[test]
    fn test_decode_sample() {
        // gyro x = 100 LSB, accel z = 16393 LSB (~1 g), rest zero
        let mut raw = [0u8; 12];
        raw[0..2].copy_from_slice(&100i16.to_le_bytes());
        raw[10..12].copy_from_slice(&16393i16.to_le_bytes());

        let r = decode_sample(&raw);
        assert!((r.gyro_dps[0] - 7.0).abs() < 1e-9);
        assert!((r.accel_mg[2] - 999.973).abs() < 1e-3);
        assert_eq!(r.gyro_dps[1], 0.0);
        assert_eq!(r.accel_mg[0], 0.0);
    }

    #[test]
    fn test_decode_negative_full_scale() {
        // Raw int16 min decodes past the nominal ±2000 dps label; the
        // sensitivity constant is authoritative and nothing clamps.
        let mut raw = [0u8; 12];
        raw[0..2].copy_from_slice(&i16::MIN.to_le_bytes());
        let r = decode_sample(&raw);
        assert!((r.gyro_dps[0] + 2293.76).abs() < 0.01);
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::devices::mock::MockImuBus;

    #[test]
    fn test_initialize_sequence() {
        let bus = MockImuBus::new();
        let writes = bus.write_log();
        let mut driver = Ism330Dhcx::new(Box::new(bus));
        driver.initialize().unwrap();

        let log = writes.lock().unwrap().clone();
        // Reset, then BDU/IF_INC, then DRDY routing and rate config with
        // the accelerometer started last
        assert_eq!(
            log,
            vec![
                (REG_CTRL3_C, 0x01),
                (REG_CTRL3_C, 0x44),
                (REG_INT1_CTRL, 0x01),
                (REG_CTRL2_G, 0x4C),
                (REG_CTRL1_XL, 0x40),
            ]
        );
    }

    #[test]
    fn test_initialize_rejects_wrong_device() {
        let bus = MockImuBus::new().with_device_id(0x69);
        let mut driver = Ism330Dhcx::new(Box::new(bus));
        let err = driver.initialize().unwrap_err();
        assert!(matches!(err, Error::InitializationFailed(_)));
    }

    #[test]
    fn test_calibration_subtracts_offset() {
        // Mock gyro output is constant per axis, so the offset cancels it
        let bus = MockImuBus::new().with_constant_gyro([20, -10, 5]);
        let mut driver = Ism330Dhcx::new(Box::new(bus));
        driver.initialize().unwrap();
        driver
            .calibrate_gyro(4, Duration::from_millis(100))
            .unwrap();

        let (_, reading) = driver.wait_sample(Duration::from_millis(100)).unwrap();
        for axis in 0..3 {
            assert!(reading.gyro_dps[axis].abs() < 1e-9);
        }
    }
}
