//! TCP telemetry endpoint.
//!
//! A dedicated listener thread accepts subscriber connections; each
//! connection gets its own writer thread that drains its hub feed to the
//! socket. Sensor threads never touch a socket: a slow or dead client can
//! only ever stall its own writer.

use crate::error::Result;
use crate::streaming::hub::{BroadcastHub, SubscriberFeed};
use crate::streaming::wire::{encode_message, write_frame};
use crate::streaming::OutboundMessage;
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Messages written per writer wakeup before re-checking the fix latch.
const WRITE_BATCH: usize = 50;

/// TCP server front-end for the broadcast hub.
pub struct TelemetryServer {
    thread: Option<JoinHandle<()>>,
}

impl TelemetryServer {
    /// Bind the listener and start accepting subscribers.
    ///
    /// A bind failure is a startup error; everything after that is
    /// per-connection and never fatal.
    pub fn start(
        bind_address: &str,
        hub: Arc<BroadcastHub>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)?;
        listener.set_nonblocking(true)?;
        log::info!("Telemetry server listening on {}", bind_address);

        let thread = thread::Builder::new()
            .name("telemetry-server".to_string())
            .spawn(move || accept_loop(listener, hub, shutdown))?;

        Ok(Self {
            thread: Some(thread),
        })
    }

    /// Wait for the accept loop to finish (after shutdown is signaled).
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn accept_loop(
    listener: TcpListener,
    hub: Arc<BroadcastHub>,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                log::info!("Subscriber connected: {}", addr);
                if let Err(e) = stream.set_nodelay(true) {
                    log::debug!("set_nodelay failed for {}: {}", addr, e);
                }

                let feed = hub.subscribe();
                let handle = feed.handle;
                hub.mark_open(handle);

                let hub_clone = Arc::clone(&hub);
                let shutdown_clone = Arc::clone(&shutdown);
                let spawned = thread::Builder::new()
                    .name("subscriber-writer".to_string())
                    .spawn(move || {
                        writer_loop(stream, &feed, &shutdown_clone);
                        hub_clone.unsubscribe(handle);
                        log::info!("Subscriber disconnected: {}", addr);
                    });
                if let Err(e) = spawned {
                    log::error!("Failed to spawn subscriber writer: {}", e);
                    hub.unsubscribe(handle);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                log::error!("Accept error: {}", e);
                thread::sleep(Duration::from_millis(100));
            }
        }
    }

    log::info!("Telemetry server exiting");
}

/// Drain one subscriber's feed to its socket until it dies or shutdown.
///
/// The fix latch is flushed before each IMU batch so a reconnecting or
/// slow client always gets current GNSS state promptly.
fn writer_loop(mut stream: TcpStream, feed: &SubscriberFeed, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::Relaxed) && feed.alive.load(Ordering::Relaxed) {
        let mut wrote = false;

        let pending_fix = feed.latest_fix.lock().take();
        if let Some(msg) = pending_fix {
            if !send(&mut stream, &msg) {
                break;
            }
            wrote = true;
        }

        for _ in 0..WRITE_BATCH {
            let Some(msg) = feed.queue.pop() else {
                break;
            };
            if !send(&mut stream, &msg) {
                feed.alive.store(false, Ordering::Relaxed);
                return;
            }
            wrote = true;
        }

        if !wrote {
            thread::sleep(Duration::from_millis(5));
        }
    }

    feed.alive.store(false, Ordering::Relaxed);
    let _ = stream.flush();
}

/// Returns false on a write failure; the connection is then torn down.
fn send(stream: &mut TcpStream, msg: &OutboundMessage) -> bool {
    let payload = match encode_message(msg) {
        Ok(p) => p,
        Err(e) => {
            // Skip the message, keep the subscriber
            log::error!("Failed to serialize outbound message: {}", e);
            return true;
        }
    };
    match write_frame(stream, &payload) {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Subscriber write failed: {}", e);
            false
        }
    }
}
