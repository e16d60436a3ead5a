//! Telemetry streaming: wire format, broadcast hub, and TCP endpoint.

pub mod hub;
pub mod messages;
pub mod server;
pub mod wire;

pub use hub::{BroadcastHub, Liveness, SubscriberFeed, SubscriberHandle};
pub use messages::{GnssReport, ImuReport, OutboundMessage};
pub use server::TelemetryServer;
pub use wire::{decode_message, encode_message, MAX_FRAME_SIZE};
