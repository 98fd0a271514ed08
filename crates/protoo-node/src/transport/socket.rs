//! Message transport over one physical connection.
//!
//! `start` spawns two tasks:
//! - read loop: frames -> inbound queue, enforces the frame limit and the
//!   pong-refreshed read deadline
//! - write loop: outbound queue + keepalive ping -> connection; sole owner of
//!   the physical close
//!
//! Shutdown: `stop()` flips the shutdown flag under a lock and fires a
//! one-shot to the write loop. The write loop closes the connection, wakes the
//! read loop, then emits the close event. The first recorded cause wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::Instrument;

use protoo_core::error::{ProtooError, Result};
use protoo_core::TransportError;

use crate::config::TransportConfig;
use crate::transport::connection::{Connection, Frame, FrameReader, FrameWriter};

/// Floor for the keepalive period; tokio rejects a zero period.
const MIN_PING_INTERVAL: Duration = Duration::from_millis(1);

/// An unstarted transport. `start` consumes it, so it runs at most once.
pub struct WebSocketTransport<C: Connection> {
    conn: C,
    cfg: TransportConfig,
}

/// Cloneable send/close side of a running transport.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    shared: Arc<Shared>,
    tx: mpsc::Sender<Bytes>,
}

/// Inbound side of a running transport.
pub struct TransportEvents {
    /// Data frames in receipt order.
    pub messages: mpsc::Receiver<Bytes>,
    /// Fires once, after the connection is torn down.
    pub closed: oneshot::Receiver<TransportError>,
}

#[derive(Debug)]
struct Shared {
    // `None` once shutdown has begun.
    stop: Mutex<Option<oneshot::Sender<()>>>,
    cause: Mutex<Option<TransportError>>,
    closed: AtomicBool,
}

impl Shared {
    fn stop(&self) {
        if let Ok(mut g) = self.stop.lock() {
            if let Some(tx) = g.take() {
                let _ = tx.send(());
            }
        }
    }

    fn is_stopping(&self) -> bool {
        match self.stop.lock() {
            Ok(g) => g.is_none(),
            Err(_) => true,
        }
    }

    fn record(&self, err: TransportError) {
        if let Ok(mut g) = self.cause.lock() {
            if g.is_none() {
                *g = Some(err);
            }
        }
    }

    fn take_cause(&self) -> Option<TransportError> {
        self.cause.lock().ok().and_then(|mut g| g.take())
    }
}

impl<C: Connection> WebSocketTransport<C> {
    pub fn new(conn: C, cfg: TransportConfig) -> Self {
        Self { conn, cfg }
    }

    /// Spawn the read and write loops. Must run inside a tokio runtime.
    ///
    /// Both loops inherit the caller's tracing span.
    pub fn start(self) -> (TransportHandle, TransportEvents) {
        let capacity = self.cfg.send_queue.max(1);
        let (out_tx, out_rx) = mpsc::channel::<Bytes>(capacity);
        let (in_tx, in_rx) = mpsc::channel::<Bytes>(capacity);
        let (stop_tx, stop_rx) = oneshot::channel();
        let (closed_tx, closed_rx) = oneshot::channel();
        let (torn_tx, torn_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            stop: Mutex::new(Some(stop_tx)),
            cause: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let (reader, writer) = self.conn.split();

        tokio::spawn(
            read_loop(reader, Arc::clone(&shared), in_tx, torn_rx, self.cfg.clone())
                .in_current_span(),
        );
        tokio::spawn(
            write_loop(
                writer,
                Arc::clone(&shared),
                out_rx,
                stop_rx,
                torn_tx,
                closed_tx,
                self.cfg,
            )
            .in_current_span(),
        );

        (
            TransportHandle { shared, tx: out_tx },
            TransportEvents {
                messages: in_rx,
                closed: closed_rx,
            },
        )
    }
}

impl TransportHandle {
    /// Queue one message. Waits while the queue is full; never drops.
    pub async fn send(&self, message: Bytes) -> Result<()> {
        if self.shared.is_stopping() {
            return Err(ProtooError::Closed);
        }
        self.tx.send(message).await.map_err(|_| ProtooError::Closed)
    }

    /// Begin shutdown. Idempotent, callable from anywhere.
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn close(&self) {
        self.stop();
    }

    /// True once the physical connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

async fn read_loop<R: FrameReader>(
    mut reader: R,
    shared: Arc<Shared>,
    inbound: mpsc::Sender<Bytes>,
    mut torn_down: watch::Receiver<bool>,
    cfg: TransportConfig,
) {
    let mut deadline = Instant::now() + cfg.pong_wait;

    loop {
        let next = tokio::select! {
            _ = torn_down.changed() => break,
            next = time::timeout_at(deadline, reader.read()) => next,
        };
        // A local close owns the cause; the remote's echo is not news.
        if shared.is_stopping() {
            break;
        }

        let frame = match next {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                shared.record(e);
                break;
            }
            Err(_) => {
                shared.record(TransportError::abnormal("pong timeout"));
                break;
            }
        };

        match frame {
            Frame::Data(bytes) => {
                if bytes.len() > cfg.max_message_bytes {
                    tracing::warn!(len = bytes.len(), max = cfg.max_message_bytes, "inbound frame too large");
                    shared.record(TransportError::new(
                        TransportError::MESSAGE_TOO_BIG,
                        "message too big",
                    ));
                    break;
                }
                tokio::select! {
                    _ = torn_down.changed() => break,
                    sent = inbound.send(bytes) => {
                        if sent.is_err() {
                            tracing::trace!("inbound receiver gone, frame discarded");
                        }
                    }
                }
            }
            Frame::Pong(_) => deadline = Instant::now() + cfg.pong_wait,
            Frame::Ping(_) => {}
            Frame::Close(reason) => {
                let reason = reason.unwrap_or_else(|| {
                    TransportError::new(TransportError::NO_STATUS, "no status")
                });
                tracing::debug!(code = reason.code, text = %reason.text, "remote close");
                shared.record(reason);
                break;
            }
        }

        if shared.is_stopping() {
            break;
        }
    }

    shared.stop();
}

async fn write_loop<W: FrameWriter>(
    mut writer: W,
    shared: Arc<Shared>,
    mut outbound: mpsc::Receiver<Bytes>,
    mut stop: oneshot::Receiver<()>,
    torn_down: watch::Sender<bool>,
    closed: oneshot::Sender<TransportError>,
    cfg: TransportConfig,
) {
    let period = cfg.ping_interval.max(MIN_PING_INTERVAL);
    let mut ping = time::interval_at(Instant::now() + period, period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = &mut stop => break,

            _ = ping.tick() => {
                if let Err(e) = write_bounded(&mut writer, Frame::Ping(Bytes::new()), &cfg).await {
                    shared.record(e);
                    break;
                }
            }

            next = outbound.recv() => {
                let Some(message) = next else { break; };
                if let Err(e) = write_bounded(&mut writer, Frame::Data(message), &cfg).await {
                    shared.record(e);
                    break;
                }
            }
        }
    }

    shared.stop();

    match time::timeout(cfg.write_wait, writer.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(code = e.code, text = %e.text, "connection close failed"),
        Err(_) => tracing::debug!("connection close timed out"),
    }
    shared.closed.store(true, Ordering::Release);
    let _ = torn_down.send(true);

    let cause = shared.take_cause().unwrap_or_else(TransportError::closed);
    tracing::debug!(code = cause.code, text = %cause.text, "transport closed");
    let _ = closed.send(cause);
}

async fn write_bounded<W: FrameWriter>(
    writer: &mut W,
    frame: Frame,
    cfg: &TransportConfig,
) -> std::result::Result<(), TransportError> {
    match time::timeout(cfg.write_wait, writer.write(frame)).await {
        Ok(res) => res,
        Err(_) => Err(TransportError::abnormal("write timeout")),
    }
}
