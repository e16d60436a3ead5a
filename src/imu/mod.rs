//! ISM330DHCX acquisition: bus capability, register driver, edge sampler.

pub mod bus;
pub mod driver;
pub mod sampler;

pub use bus::ImuBus;
pub use driver::{Ism330Dhcx, ImuReading};
pub use sampler::{EdgeSampler, ImuSample, SamplerHealth, SamplerStats};
