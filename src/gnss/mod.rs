//! GNSS acquisition: serial line reader and fix-state tracker.

pub mod reader;
pub mod tracker;

pub use reader::{GnssReader, StampedFix};
pub use tracker::{FixSnapshot, FixTracker, IntervalState};
