//! Connection manager: owns the transport lifecycle and the single worker
//! task that drives framing, decoding, and state reconciliation.
//!
//! The worker is the sole writer of the snapshot. It connects, reads, applies
//! messages, and republishes; on any transport failure it loops through an
//! exponential backoff and reconnects until [`TelemetryClient::stop`] is
//! called. Transient errors never escape to the caller.

use crate::config::LinkConfig;
use crate::decode::TypedMessage;
use crate::error::{LinkError, Result};
use crate::framing::{FrameReader, TelemetryFrame};
use crate::modes;
use crate::snapshot::TelemetrySnapshot;
use mavlink::Message;
use parking_lot::{Mutex, RwLock};
use std::cmp;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

// A link that drops this soon after opening usually means another client
// already holds the vehicle's TCP port.
const QUICK_DROP_WINDOW: Duration = Duration::from_secs(2);

/// Consumer-side callbacks. All three are invoked from the worker task; hosts
/// redispatch to their own execution context if they need to.
pub trait TelemetryEvents: Send + Sync {
    /// A new snapshot was published. The value is immutable; clone it to
    /// keep it.
    fn on_state_update(&self, _snapshot: &TelemetrySnapshot) {}

    /// A human-readable log line (status texts, connection activity).
    fn on_log_line(&self, _line: &str) {}

    /// The link came up or went down.
    fn on_connection_state(&self, _connected: bool) {}
}

/// Doubling reconnect backoff, capped, reset to the floor after a
/// successful connect.
struct Backoff {
    current: Duration,
    floor: Duration,
    ceiling: Duration,
}

impl Backoff {
    fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            current: floor,
            floor,
            ceiling,
        }
    }

    /// Returns the delay to wait now and doubles the stored delay for the
    /// next call, capped at the ceiling.
    fn next_delay(&mut self) -> Duration {
        let wait = self.current;
        self.current = cmp::min(self.ceiling, self.current.saturating_mul(2));
        wait
    }

    fn reset(&mut self) {
        self.current = self.floor;
    }
}

struct Worker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Receive-only MAVLink telemetry client.
///
/// One instance owns one TCP link and one snapshot. `start` launches the
/// worker task; `stop` cancels it and unblocks any pending connect, read, or
/// backoff sleep. Both are idempotent and callable from any thread.
pub struct TelemetryClient {
    config: LinkConfig,
    events: Arc<dyn TelemetryEvents>,
    state: Arc<RwLock<TelemetrySnapshot>>,
    worker: Mutex<Option<Worker>>,
}

impl TelemetryClient {
    pub fn new(config: LinkConfig, events: Arc<dyn TelemetryEvents>) -> Self {
        Self {
            config,
            events,
            state: Arc::new(RwLock::new(TelemetrySnapshot::default())),
            worker: Mutex::new(None),
        }
    }

    /// The most recently published snapshot. Poll this at any cadence
    /// instead of (or in addition to) the callback stream.
    pub fn latest(&self) -> TelemetrySnapshot {
        self.state.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Launches the worker task. No-op when already running. Must be called
    /// from within a Tokio runtime.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return;
        }
        let token = CancellationToken::new();
        let run_loop = RunLoop {
            config: self.config.clone(),
            events: self.events.clone(),
            state: self.state.clone(),
            token: token.clone(),
        };
        let handle = tokio::spawn(run_loop.run());
        *worker = Some(Worker { token, handle });
    }

    /// Cancels the worker and waits for it to exit. After `stop` returns no
    /// further callbacks fire. Safe to call repeatedly or when never started.
    pub async fn stop(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.token.cancel();
            let _ = worker.handle.await;
        }
    }
}

/// State owned by the worker task.
struct RunLoop {
    config: LinkConfig,
    events: Arc<dyn TelemetryEvents>,
    state: Arc<RwLock<TelemetrySnapshot>>,
    token: CancellationToken,
}

impl RunLoop {
    async fn run(self) {
        let addr = self.config.addr();
        let mut backoff = Backoff::new(self.config.backoff_floor(), self.config.backoff_ceiling());

        while !self.token.is_cancelled() {
            self.events.on_log_line(&format!("mavlink: connecting to {addr}"));
            let attempt_started = Instant::now();

            match self.run_connection(&addr, &mut backoff).await {
                // Only cancellation ends a connection without an error.
                Ok(()) => break,
                Err(e) => {
                    if self.token.is_cancelled() {
                        break;
                    }
                    self.set_connected(false);
                    self.events.on_log_line(&format!("mavlink: disconnected ({e})"));
                    if attempt_started.elapsed() < QUICK_DROP_WINDOW {
                        self.events.on_log_line(
                            "mavlink: hint: link dropped right away, the vehicle may accept only one TCP client",
                        );
                    }
                }
            }

            let wait = backoff.next_delay();
            debug!(wait_ms = wait.as_millis() as u64, "reconnect backoff");
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        // Final transition so a stopped client never reports a live link.
        let still_connected = self.state.read().connected;
        if still_connected {
            self.set_connected(false);
        }
        debug!("telemetry worker exited");
    }

    /// One connection attempt plus its read loop. Returns `Ok(())` only on
    /// cancellation.
    async fn run_connection(&self, addr: &str, backoff: &mut Backoff) -> Result<()> {
        let stream = tokio::select! {
            _ = self.token.cancelled() => return Ok(()),
            res = tokio::time::timeout(self.config.connect_timeout(), TcpStream::connect(addr)) => {
                match res {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(e)) => return Err(LinkError::connect(addr, e)),
                    Err(_) => return Err(LinkError::connect_timeout(addr)),
                }
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {}", e);
        }
        info!(%addr, "telemetry link established");
        backoff.reset();
        self.set_connected(true);

        self.read_stream(stream).await
    }

    async fn read_stream(&self, mut stream: TcpStream) -> Result<()> {
        let mut reader = FrameReader::new();
        let mut buf = [0u8; 4096];

        loop {
            tokio::select! {
                _ = self.token.cancelled() => return Ok(()),
                read_res = stream.read(&mut buf) => {
                    match read_res {
                        Ok(0) => return Err(LinkError::stream("connection closed by peer")),
                        Ok(n) => {
                            reader.push(&buf[..n]);
                            while let Some(frame) = reader.next_frame() {
                                self.handle_frame(frame);
                            }
                        }
                        Err(e) => return Err(LinkError::Io(e)),
                    }
                }
            }
        }
    }

    fn handle_frame(&self, frame: TelemetryFrame) {
        match TypedMessage::from_wire(&frame.message) {
            TypedMessage::Unrecognized => {
                trace!(
                    msg_id = frame.message.message_id(),
                    "ignoring unrecognized message"
                );
            }
            // Status texts bypass the snapshot and go to the log side channel.
            TypedMessage::StatusText { severity, text } => {
                if let Some(line) = modes::format_status_text(severity, &text) {
                    self.events.on_log_line(&line);
                }
            }
            msg => self.publish(msg),
        }
    }

    /// Read-modify-publish of the snapshot. The lock covers only the swap,
    /// never I/O or callbacks.
    fn publish(&self, msg: TypedMessage) {
        let next = {
            let mut state = self.state.write();
            let next = state.apply(&msg, Instant::now());
            *state = next.clone();
            next
        };
        self.events.on_state_update(&next);
    }

    fn set_connected(&self, connected: bool) {
        let next = {
            let mut state = self.state.write();
            let mut next = state.clone();
            next.connected = connected;
            *state = next.clone();
            next
        };
        self.events.on_state_update(&next);
        self.events.on_connection_state(connected);
    }
}
