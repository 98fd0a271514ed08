//! Outstanding request bookkeeping.
//!
//! The table is owned by the peer task alone; nothing here is locked.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::value::RawValue;
use tokio::sync::oneshot;

use protoo_core::protocol::TransactionId;
use protoo_core::PeerError;

/// Outcome of one request: the accepted payload or the rejection.
pub type RequestResult = Result<Box<RawValue>, PeerError>;

pub type AcceptFn = Box<dyn FnOnce(Box<RawValue>) + Send + 'static>;
pub type RejectFn = Box<dyn FnOnce(PeerError) + Send + 'static>;

/// Where a transaction's result goes.
pub enum Completion {
    /// Invoked on the peer task; must not block.
    Callbacks { on_accept: AcceptFn, on_reject: RejectFn },
    Channel(oneshot::Sender<RequestResult>),
}

pub struct Transaction {
    id: TransactionId,
    method: String,
    completion: Completion,
}

impl Transaction {
    pub fn new(id: TransactionId, method: impl Into<String>, completion: Completion) -> Self {
        Self {
            id,
            method: method.into(),
            completion,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Deliver the result. Consumes the transaction, so it runs once.
    pub fn resolve(self, result: RequestResult) {
        match self.completion {
            Completion::Callbacks {
                on_accept,
                on_reject,
            } => match result {
                Ok(data) => on_accept(data),
                Err(e) => on_reject(e),
            },
            Completion::Channel(tx) => {
                let _ = tx.send(result);
            }
        }
    }
}

#[derive(Default)]
pub struct TransactionTable {
    pending: HashMap<TransactionId, Transaction>,
}

impl TransactionTable {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Register a transaction. Hands it back if its id is still outstanding.
    pub fn insert(&mut self, transaction: Transaction) -> Result<(), Transaction> {
        if self.pending.contains_key(&transaction.id) {
            return Err(transaction);
        }
        self.pending.insert(transaction.id, transaction);
        Ok(())
    }

    /// Remove and return the entry, if any. A second call for the same id
    /// returns `None`.
    pub fn take(&mut self, id: TransactionId) -> Option<Transaction> {
        self.pending.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Resolve every outstanding entry with `err` and empty the table.
    pub fn fail_all(&mut self, err: &PeerError) {
        for (_, t) in self.pending.drain() {
            t.resolve(Err(err.clone()));
        }
    }
}

/// Result of `Peer::request`, resolved once by the peer task.
///
/// If the peer goes away without resolving it, yields `PEER_CLOSED`.
pub struct PendingResponse {
    id: TransactionId,
    rx: oneshot::Receiver<RequestResult>,
}

impl PendingResponse {
    pub(crate) fn new(id: TransactionId, rx: oneshot::Receiver<RequestResult>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }
}

impl Future for PendingResponse {
    type Output = RequestResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or_else(|_| Err(PeerError::peer_closed())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn raw(s: &str) -> Box<RawValue> {
        RawValue::from_string(s.to_owned()).unwrap()
    }

    #[test]
    fn take_is_at_most_once() {
        let mut table = TransactionTable::new();
        let (tx, mut rx) = oneshot::channel();
        assert!(table.insert(Transaction::new(7, "ping", Completion::Channel(tx))).is_ok());

        let t = table.take(7);
        assert!(t.is_some());
        assert!(table.take(7).is_none());

        if let Some(t) = t {
            t.resolve(Ok(raw("{}")));
        }
        assert!(matches!(rx.try_recv(), Ok(Ok(_))));
    }

    #[test]
    fn duplicate_id_is_handed_back() {
        let mut table = TransactionTable::new();
        let (a, _ra) = oneshot::channel();
        let (b, _rb) = oneshot::channel();
        assert!(table.insert(Transaction::new(1, "a", Completion::Channel(a))).is_ok());
        let back = table.insert(Transaction::new(1, "b", Completion::Channel(b)));
        assert!(matches!(back, Err(t) if t.method() == "b"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn fail_all_reaches_callbacks_and_channels() {
        let mut table = TransactionTable::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let cb = Completion::Callbacks {
            on_accept: Box::new(|_| {}),
            on_reject: Box::new(move |e| sink.lock().unwrap().push(e.code)),
        };
        let (tx, mut rx) = oneshot::channel();
        assert!(table.insert(Transaction::new(1, "cb", cb)).is_ok());
        assert!(table.insert(Transaction::new(2, "ch", Completion::Channel(tx))).is_ok());

        table.fail_all(&PeerError::peer_closed());

        assert!(table.is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![PeerError::PEER_CLOSED]);
        assert!(matches!(rx.try_recv(), Ok(Err(e)) if e.code == PeerError::PEER_CLOSED));
    }
}
