//! Configuration for the TriveniIO daemon
//!
//! Loads configuration from a TOML file. Every section has defaults that
//! match the reference hardware (ISM330DHCX at 104 Hz, NMEA receiver at
//! 9600 baud, kernel PPS at 1 Hz).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub gnss: GnssConfig,
    pub imu: ImuConfig,
    pub pps: PpsConfig,
    pub tracker: TrackerConfig,
    pub streaming: StreamingConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

/// GNSS receiver configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GnssConfig {
    /// Byte source: "serial" for a real receiver, "mock" for the simulator
    pub source: String,
    /// Serial port path for the receiver's NMEA output
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
}

/// IMU configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImuConfig {
    /// Bus source: "mock" for the simulator (register-level SPI is a
    /// platform integration supplied by the deployment)
    pub source: String,
    /// Maximum wait for the data-ready edge before a sample is declared
    /// dropped, milliseconds
    pub drdy_timeout_ms: u64,
    /// Consecutive bus faults before the sampler reports itself degraded
    pub max_consecutive_faults: u32,
    /// Stationary samples averaged for gyro zero-rate calibration at
    /// startup; 0 skips calibration
    pub calibration_samples: u32,
    /// Forward every Nth accepted sample to subscribers; 1 streams the
    /// full rate
    pub decimation: u32,
}

/// PPS pulse source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PpsConfig {
    /// Pulse source: "mock" for the simulator
    pub source: String,
    /// Maximum wait for the next pulse before it counts as missed,
    /// milliseconds. Must exceed the 1 s pulse period.
    pub wait_timeout_ms: u64,
    /// Tolerated deviation of the pulse-to-pulse gap from one second,
    /// milliseconds
    pub jitter_tolerance_ms: u64,
}

/// Fix tracker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    /// Window without an interval advance after which the GNSS feed is
    /// reported stale, milliseconds
    pub stale_after_ms: u64,
}

/// Telemetry streaming configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// TCP bind address for subscriber connections
    ///
    /// Examples:
    /// - `0.0.0.0:5599` - all interfaces
    /// - `127.0.0.1:5599` - localhost only
    pub bind_address: String,
    /// Per-subscriber outbound queue capacity in messages
    pub queue_capacity: usize,
    /// Consecutive displaced messages on a full queue before the
    /// subscriber is dropped
    pub overflow_cap: u64,
}

/// Subscriber session (client side) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Fixed reconnect backoff, seconds
    pub reconnect_secs: u64,
    /// Silence on an open connection before the view is marked stale,
    /// seconds
    pub stale_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Defaults for the reference rover setup.
    ///
    /// Suitable for development with mock devices; deployments should use
    /// a TOML configuration file.
    pub fn rover_defaults() -> Self {
        Self {
            gnss: GnssConfig {
                source: "serial".to_string(),
                port: "/dev/ttyAMA0".to_string(),
                baud_rate: 9600,
            },
            imu: ImuConfig {
                source: "mock".to_string(),
                drdy_timeout_ms: 1000,
                max_consecutive_faults: 5,
                calibration_samples: 100,
                decimation: 1,
            },
            pps: PpsConfig {
                source: "mock".to_string(),
                wait_timeout_ms: 1500,
                jitter_tolerance_ms: 100,
            },
            tracker: TrackerConfig {
                stale_after_ms: 3000,
            },
            streaming: StreamingConfig {
                bind_address: "0.0.0.0:5599".to_string(),
                queue_capacity: 256,
                overflow_cap: 1024,
            },
            client: ClientConfig {
                reconnect_secs: 2,
                stale_secs: 3,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::rover_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::rover_defaults();
        assert_eq!(config.gnss.port, "/dev/ttyAMA0");
        assert_eq!(config.gnss.baud_rate, 9600);
        assert_eq!(config.imu.drdy_timeout_ms, 1000);
        assert_eq!(config.streaming.bind_address, "0.0.0.0:5599");
        assert_eq!(config.client.reconnect_secs, 2);
        assert_eq!(config.client.stale_secs, 3);
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::rover_defaults();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[gnss]"));
        assert!(toml_string.contains("[imu]"));
        assert!(toml_string.contains("[pps]"));
        assert!(toml_string.contains("[streaming]"));
        assert!(toml_string.contains("baud_rate = 9600"));
        assert!(toml_string.contains("queue_capacity = 256"));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[gnss]
source = "serial"
port = "/dev/ttyUSB0"
baud_rate = 115200

[imu]
source = "mock"
drdy_timeout_ms = 500
max_consecutive_faults = 3
calibration_samples = 0
decimation = 5

[pps]
source = "mock"
wait_timeout_ms = 1500
jitter_tolerance_ms = 50

[tracker]
stale_after_ms = 5000

[streaming]
bind_address = "127.0.0.1:6000"
queue_capacity = 64
overflow_cap = 128

[client]
reconnect_secs = 2
stale_secs = 3

[logging]
level = "debug"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.gnss.port, "/dev/ttyUSB0");
        assert_eq!(config.imu.decimation, 5);
        assert_eq!(config.streaming.queue_capacity, 64);
        assert_eq!(config.tracker.stale_after_ms, 5000);
        assert_eq!(config.logging.level, "debug");
    }
}
