//! Terminal telemetry monitor.
//!
//! Connects to a TriveniIO daemon and renders the live feed as status
//! lines: fix state once per GNSS update, marker actions, and staleness
//! transitions. Reconnects forever on a fixed backoff, like any
//! subscriber session.

use std::env;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use triveni_io::client::{MarkerAction, SubscriberSession, ViewState};
use triveni_io::config::AppConfig;
use triveni_io::error::Result;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5599".to_string());
    let config = AppConfig::default();

    let mut session = SubscriberSession::new(
        &addr,
        Duration::from_secs(config.client.reconnect_secs),
        Duration::from_secs(config.client.stale_secs),
    )?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    signal_hook::flag::register(signal_hook::consts::SIGINT, flag)
        .map_err(triveni_io::Error::Io)?;

    log::info!("Monitoring {}", addr);

    let mut view = ViewState::new();
    session.run(&mut view, &shutdown, |v, action| {
        if let MarkerAction::Center { lat, lon } = action {
            log::info!("Map centered on first fix: {:.6}, {:.6}", lat, lon);
        }

        // Fix updates and staleness transitions redraw the status line;
        // the 104 Hz IMU stream only ticks a heartbeat
        if !matches!(action, MarkerAction::None)
            || v.is_stale()
            || v.messages_received() % 200 == 1
        {
            log::info!("{} | messages: {}", v.status_line(), v.messages_received());
        }
    });

    Ok(())
}
