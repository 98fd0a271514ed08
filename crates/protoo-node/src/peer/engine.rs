use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde_json::value::RawValue;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use protoo_core::protocol::{to_raw, Message, Notification, Request, TransactionId};
use protoo_core::{PeerError, TransportError};

use crate::config::PeerConfig;
use crate::peer::events::{DropReason, DroppedMessage, IncomingRequest, PeerEvents};
use crate::peer::transaction::{Completion, PendingResponse, Transaction, TransactionTable};
use crate::transport::{Connection, TransportEvents, TransportHandle, WebSocketTransport};

/// Capacity of the lossy diagnostic stream.
const DROPPED_QUEUE: usize = 32;

/// Work handed to the peer task by `Peer` handles.
enum Command {
    Request {
        request: Request,
        transaction: Transaction,
    },
    PendingCount(oneshot::Sender<usize>),
}

impl Command {
    fn fail(self, err: PeerError) {
        match self {
            Command::Request { transaction, .. } => transaction.resolve(Err(err)),
            Command::PendingCount(tx) => {
                let _ = tx.send(0);
            }
        }
    }
}

/// One protocol endpoint over one transport.
///
/// Cheap to clone; all clones drive the same task. Protocol state lives on
/// that task and is never shared.
#[derive(Clone)]
pub struct Peer {
    inner: Arc<PeerInner>,
}

struct PeerInner {
    id: String,
    transport: TransportHandle,
    commands: mpsc::Sender<Command>,
    next_id: AtomicU32,
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer").field("id", &self.inner.id).finish()
    }
}

impl Peer {
    /// Start `transport` and attach a peer to it.
    pub fn new<C: Connection>(
        id: impl Into<String>,
        transport: WebSocketTransport<C>,
        cfg: PeerConfig,
    ) -> (Peer, PeerEvents) {
        let (handle, events) = transport.start();
        Peer::attach(id, handle, events, cfg)
    }

    /// Attach a peer to an already running transport. Spawns the peer task.
    pub fn attach(
        id: impl Into<String>,
        transport: TransportHandle,
        events: TransportEvents,
        cfg: PeerConfig,
    ) -> (Peer, PeerEvents) {
        let id = id.into();
        let (cmd_tx, cmd_rx) = mpsc::channel(cfg.command_queue.max(1));
        let (req_tx, req_rx) = mpsc::channel(cfg.event_queue.max(1));
        let (note_tx, note_rx) = mpsc::channel(cfg.event_queue.max(1));
        let (drop_tx, drop_rx) = mpsc::channel(DROPPED_QUEUE);
        let (closed_tx, closed_rx) = oneshot::channel();

        let task = PeerTask {
            id: id.clone(),
            transport: transport.clone(),
            transactions: TransactionTable::new(),
            requests: req_tx,
            notifications: note_tx,
            dropped: drop_tx,
            closed: Some(closed_tx),
        };
        tokio::spawn(
            task.run(events, cmd_rx)
                .instrument(tracing::debug_span!("peer", peer = %id)),
        );

        let peer = Peer {
            inner: Arc::new(PeerInner {
                id,
                transport,
                commands: cmd_tx,
                next_id: AtomicU32::new(1),
            }),
        };
        let events = PeerEvents {
            requests: req_rx,
            notifications: note_rx,
            closed: closed_rx,
            dropped: drop_rx,
        };
        (peer, events)
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// True if both handles drive the same peer task.
    pub fn ptr_eq(a: &Peer, b: &Peer) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Positive, never reused while this peer lives (modulo `u32` wrap).
    fn next_transaction_id(&self) -> TransactionId {
        loop {
            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }

    /// Send a request; the returned future yields the response.
    ///
    /// Waits only while the command queue is full. A payload that fails to
    /// serialize resolves immediately with `ENCODE_FAILED`; a closed peer
    /// resolves with `PEER_CLOSED`.
    pub async fn request<T: Serialize + ?Sized>(&self, method: &str, data: &T) -> PendingResponse {
        let id = self.next_transaction_id();
        let (tx, rx) = oneshot::channel();
        self.submit(Transaction::new(id, method, Completion::Channel(tx)), data)
            .await;
        PendingResponse::new(id, rx)
    }

    /// Send a request whose outcome is delivered to callbacks instead.
    ///
    /// The callbacks run on the peer task and must not block. Exactly one of
    /// them runs, including on serialization failure and on closure.
    pub async fn request_with<T, A, R>(
        &self,
        method: &str,
        data: &T,
        on_accept: A,
        on_reject: R,
    ) -> TransactionId
    where
        T: Serialize + ?Sized,
        A: FnOnce(Box<RawValue>) + Send + 'static,
        R: FnOnce(PeerError) + Send + 'static,
    {
        let id = self.next_transaction_id();
        let completion = Completion::Callbacks {
            on_accept: Box::new(on_accept),
            on_reject: Box::new(on_reject),
        };
        self.submit(Transaction::new(id, method, completion), data).await;
        id
    }

    async fn submit<T: Serialize + ?Sized>(&self, transaction: Transaction, data: &T) {
        let data = match to_raw(data) {
            Ok(d) => d,
            Err(e) => {
                tracing::debug!(peer = %self.inner.id, method = transaction.method(), error = %e, "request payload encode failed");
                transaction.resolve(Err(PeerError::from(e)));
                return;
            }
        };
        let request = Request {
            id: transaction.id(),
            method: transaction.method().to_owned(),
            data,
        };
        let cmd = Command::Request {
            request,
            transaction,
        };
        if let Err(mpsc::error::SendError(cmd)) = self.inner.commands.send(cmd).await {
            cmd.fail(PeerError::peer_closed());
        }
    }

    /// Fire-and-forget notification. Dropped silently if `data` does not
    /// serialize or the transport is gone.
    pub async fn notify<T: Serialize + ?Sized>(&self, method: &str, data: &T) {
        let encoded = to_raw(data).and_then(|data| {
            Message::Notification(Notification {
                method: method.to_owned(),
                data,
            })
            .encode()
        });
        match encoded {
            Ok(bytes) => self.send_encoded(bytes).await,
            Err(e) => {
                tracing::debug!(peer = %self.inner.id, method, error = %e, "notification encode failed");
            }
        }
    }

    /// Queue an already encoded message on the transport.
    pub(crate) async fn send_encoded(&self, bytes: Bytes) {
        if self.inner.transport.send(bytes).await.is_err() {
            tracing::debug!(peer = %self.inner.id, "send on closed transport dropped");
        }
    }

    /// Number of requests still awaiting a response.
    pub async fn pending_transactions(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.inner.commands.send(Command::PendingCount(tx)).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Close the transport. The peer task finishes once the transport
    /// reports closure.
    pub fn close(&self) {
        self.inner.transport.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.transport.is_closed()
    }
}

/// Owns all protocol state of one peer.
struct PeerTask {
    id: String,
    transport: TransportHandle,
    transactions: TransactionTable,
    requests: mpsc::Sender<IncomingRequest>,
    notifications: mpsc::Sender<Notification>,
    dropped: mpsc::Sender<DroppedMessage>,
    closed: Option<oneshot::Sender<TransportError>>,
}

impl PeerTask {
    async fn run(mut self, events: TransportEvents, mut commands: mpsc::Receiver<Command>) {
        let TransportEvents {
            mut messages,
            closed: mut transport_closed,
        } = events;

        loop {
            tokio::select! {
                biased;

                Some(raw) = messages.recv() => self.handle_message(raw).await,

                reason = &mut transport_closed => {
                    let reason = reason.unwrap_or_else(|_| TransportError::closed());
                    // Frames read before teardown still count.
                    while let Ok(raw) = messages.try_recv() {
                        self.handle_message(raw).await;
                    }
                    self.shutdown(reason, &mut commands).await;
                    return;
                }

                Some(cmd) = commands.recv() => self.handle_command(cmd).await,
            }
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Request {
                request,
                transaction,
            } => self.send_request(request, transaction).await,
            Command::PendingCount(tx) => {
                let _ = tx.send(self.transactions.len());
            }
        }
    }

    async fn send_request(&mut self, request: Request, transaction: Transaction) {
        let id = request.id;
        let bytes = match Message::Request(request).encode() {
            Ok(b) => b,
            Err(e) => {
                transaction.resolve(Err(PeerError::from(e)));
                return;
            }
        };

        if let Err(transaction) = self.transactions.insert(transaction) {
            tracing::warn!(id, "transaction id still outstanding");
            transaction.resolve(Err(PeerError::new(
                PeerError::INTERNAL,
                "transaction id in use",
            )));
            return;
        }

        tracing::trace!(id, "request sent");
        if self.transport.send(bytes).await.is_err() {
            if let Some(t) = self.transactions.take(id) {
                t.resolve(Err(PeerError::peer_closed()));
            }
        }
    }

    async fn handle_message(&mut self, raw: Bytes) {
        let msg = match Message::decode(&raw) {
            Ok(m) => m,
            Err(e) => {
                self.report_drop(DropReason::Malformed(e.to_string()), raw);
                return;
            }
        };

        match msg {
            Message::Request(request) => {
                let incoming = IncomingRequest::new(request, self.transport.clone());
                if self.requests.send(incoming).await.is_err() {
                    tracing::debug!("no request listener, request discarded");
                }
            }
            Message::Response(response) => {
                self.resolve(response.id, Ok(response.data), raw);
            }
            Message::ResponseError(e) => {
                let err = PeerError::new(e.error_code, e.error_reason);
                self.resolve(e.id, Err(err), raw);
            }
            Message::Notification(notification) => {
                if self.notifications.send(notification).await.is_err() {
                    tracing::debug!("no notification listener, notification discarded");
                }
            }
        }
    }

    fn resolve(&mut self, id: TransactionId, result: Result<Box<RawValue>, PeerError>, raw: Bytes) {
        match self.transactions.take(id) {
            Some(t) => {
                tracing::trace!(id, method = t.method(), ok = result.is_ok(), "transaction resolved");
                t.resolve(result);
            }
            None => self.report_drop(DropReason::UnknownTransaction(id), raw),
        }
    }

    fn report_drop(&self, reason: DropReason, raw: Bytes) {
        tracing::debug!(reason = ?reason, len = raw.len(), "inbound message dropped");
        let _ = self.dropped.try_send(DroppedMessage { reason, raw });
    }

    async fn shutdown(&mut self, reason: TransportError, commands: &mut mpsc::Receiver<Command>) {
        commands.close();
        while let Some(cmd) = commands.recv().await {
            cmd.fail(PeerError::peer_closed());
        }

        let pending = self.transactions.len();
        self.transactions.fail_all(&PeerError::peer_closed());

        tracing::debug!(code = reason.code, text = %reason.text, pending, "peer closed");
        if let Some(tx) = self.closed.take() {
            let _ = tx.send(reason);
        }
    }
}
