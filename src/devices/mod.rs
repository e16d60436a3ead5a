//! Device implementations.
//!
//! Real GNSS receivers attach through the serial transport; the IMU bus
//! and PPS line are platform integrations supplied by the deployment.
//! The `mock` feature provides deterministic simulations of all three so
//! the daemon runs end-to-end without hardware.

#[cfg(feature = "mock")]
pub mod mock;
