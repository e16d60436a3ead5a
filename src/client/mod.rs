//! Subscriber session: the client side of the telemetry feed.

pub mod session;
pub mod view;

pub use session::{SessionState, SubscriberSession};
pub use view::{MarkerAction, ViewState};
