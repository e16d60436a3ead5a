//! Subscriber session state machine.
//!
//! `Disconnected -> Connecting -> Open -> Disconnected`, reconnecting
//! after a fixed backoff forever; there is no exponential cutoff and no
//! give-up. While open, every inbound message resets the staleness timer;
//! expiry marks the view stale without closing the connection, and the
//! next message clears it immediately.

use crate::client::view::{MarkerAction, ViewState};
use crate::error::{Error, Result};
use crate::streaming::wire::{decode_message, read_frame};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Read timeout granularity; bounds staleness-check latency while blocked.
const READ_TICK: Duration = Duration::from_millis(250);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Open,
}

/// One client connection to the telemetry feed.
pub struct SubscriberSession {
    addr: SocketAddr,
    reconnect_backoff: Duration,
    stale_after: Duration,
    state: SessionState,
}

impl SubscriberSession {
    pub fn new(
        addr: &str,
        reconnect_backoff: Duration,
        stale_after: Duration,
    ) -> Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::Config(format!("invalid address {}: {}", addr, e)))?;
        Ok(Self {
            addr,
            reconnect_backoff,
            stale_after,
            state: SessionState::Disconnected,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Connect-receive-reconnect loop. `on_update` fires after every
    /// applied message and on staleness transitions, with the marker
    /// action of the triggering event.
    pub fn run<F>(&mut self, view: &mut ViewState, shutdown: &AtomicBool, mut on_update: F)
    where
        F: FnMut(&ViewState, MarkerAction),
    {
        while !shutdown.load(Ordering::Relaxed) {
            self.state = SessionState::Connecting;
            log::info!("Connecting to {}", self.addr);

            match TcpStream::connect_timeout(&self.addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    self.state = SessionState::Open;
                    log::info!("Connected to {}", self.addr);
                    match self.receive_loop(stream, view, shutdown, &mut on_update) {
                        Ok(()) => {}
                        Err(e) => log::warn!("Connection lost: {}", e),
                    }
                    self.state = SessionState::Disconnected;
                }
                Err(e) => {
                    log::warn!("Connect to {} failed: {}", self.addr, e);
                    self.state = SessionState::Disconnected;
                }
            }

            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            // Fixed backoff, retried indefinitely
            std::thread::sleep(self.reconnect_backoff);
        }
    }

    fn receive_loop<F>(
        &mut self,
        stream: TcpStream,
        view: &mut ViewState,
        shutdown: &AtomicBool,
        on_update: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&ViewState, MarkerAction),
    {
        let mut stream = stream;
        stream.set_read_timeout(Some(READ_TICK))?;
        let mut last_message = Instant::now();

        loop {
            if shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }

            match read_frame(&mut stream)? {
                Some(payload) => match decode_message(&payload) {
                    Ok(msg) => {
                        last_message = Instant::now();
                        if view.is_stale() {
                            // Any message clears staleness immediately
                            view.set_stale(false);
                            log::info!("Telemetry feed live again");
                        }
                        let action = view.update(&msg);
                        on_update(view, action);
                    }
                    Err(e) => {
                        // Keep the connection; one bad payload is not fatal
                        log::warn!("Undecodable frame discarded: {}", e);
                    }
                },
                None => {}
            }

            if !view.is_stale() && last_message.elapsed() > self.stale_after {
                view.set_stale(true);
                log::warn!(
                    "No telemetry for {:?}, marking view stale",
                    self.stale_after
                );
                on_update(view, MarkerAction::None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::messages::{ImuReport, OutboundMessage};
    use crate::streaming::wire::{encode_message, write_frame};
    use std::io::Write;
    use std::net::TcpListener;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn imu_frame() -> Vec<u8> {
        let msg = OutboundMessage::Imu(ImuReport {
            utc_time: "2025-03-01T12:00:00.000Z".to_string(),
            accel_mg: [0.0, 0.0, 1000.0],
            gyro_dps: [0.0, 0.0, 0.0],
        });
        let payload = encode_message(&msg).unwrap();
        let mut framed = Vec::new();
        write_frame(&mut framed, &payload).unwrap();
        framed
    }

    #[test]
    fn test_invalid_address_rejected() {
        let s = SubscriberSession::new(
            "not-an-address",
            Duration::from_secs(2),
            Duration::from_secs(3),
        );
        assert!(matches!(s, Err(Error::Config(_))));
    }

    #[test]
    fn test_session_receives_and_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let frame = imu_frame();

        // Server side: two short-lived connections, one message each
        let server = std::thread::spawn(move || {
            for _ in 0..2 {
                let (mut stream, _) = listener.accept().unwrap();
                stream.write_all(&frame).unwrap();
                // Dropping the stream forces the client to reconnect
            }
        });

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);
        let client = std::thread::spawn(move || {
            let mut session = SubscriberSession::new(
                &addr.to_string(),
                Duration::from_millis(50),
                Duration::from_secs(3),
            )
            .unwrap();
            let mut view = ViewState::new();
            let shutdown_inner = Arc::clone(&shutdown_clone);
            session.run(&mut view, &shutdown_clone, move |v, _| {
                if v.messages_received() >= 2 {
                    shutdown_inner.store(true, Ordering::Relaxed);
                }
            });
            view.messages_received()
        });

        server.join().unwrap();
        let received = client.join().unwrap();
        assert_eq!(received, 2);
    }

    #[test]
    fn test_staleness_marks_and_clears() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let frame = imu_frame();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(&frame).unwrap();
            // Silence long enough to trip the staleness timer
            std::thread::sleep(Duration::from_millis(900));
            stream.write_all(&frame).unwrap();
            std::thread::sleep(Duration::from_millis(200));
        });

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);
        let client = std::thread::spawn(move || {
            let mut session = SubscriberSession::new(
                &addr.to_string(),
                Duration::from_millis(50),
                Duration::from_millis(500),
            )
            .unwrap();
            let mut view = ViewState::new();
            let mut went_stale = false;
            let shutdown_inner = Arc::clone(&shutdown_clone);
            session.run(&mut view, &shutdown_clone, move |v, _| {
                if v.is_stale() {
                    went_stale = true;
                }
                // The second message must have cleared staleness
                if v.messages_received() >= 2 {
                    assert!(went_stale);
                    assert!(!v.is_stale());
                    shutdown_inner.store(true, Ordering::Relaxed);
                }
            });
            view.messages_received()
        });

        server.join().unwrap();
        assert_eq!(client.join().unwrap(), 2);
    }
}
