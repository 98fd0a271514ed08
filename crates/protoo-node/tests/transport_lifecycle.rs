#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use protoo_core::{ProtooError, TransportError};
use protoo_node::config::TransportConfig;
use protoo_node::transport::memory::{self, MemoryConnection, NORMAL_CLOSURE};
use protoo_node::transport::{
    Connection, Frame, FrameReader, FrameWriter, TransportEvents, TransportHandle,
    WebSocketTransport,
};

/// How `BrokenWriter::write` misbehaves.
#[derive(Clone, Copy)]
enum WriteFault {
    Hang,
    Fail,
}

/// A connection that never delivers anything and cannot be written to.
struct BrokenConnection {
    fault: WriteFault,
    closes: Arc<AtomicUsize>,
}

struct SilentReader;

struct BrokenWriter {
    fault: WriteFault,
    closes: Arc<AtomicUsize>,
}

impl Connection for BrokenConnection {
    type Reader = SilentReader;
    type Writer = BrokenWriter;

    fn split(self) -> (SilentReader, BrokenWriter) {
        (
            SilentReader,
            BrokenWriter {
                fault: self.fault,
                closes: self.closes,
            },
        )
    }
}

#[async_trait]
impl FrameReader for SilentReader {
    async fn read(&mut self) -> Result<Frame, TransportError> {
        std::future::pending().await
    }
}

#[async_trait]
impl FrameWriter for BrokenWriter {
    async fn write(&mut self, _frame: Frame) -> Result<(), TransportError> {
        match self.fault {
            WriteFault::Hang => std::future::pending().await,
            WriteFault::Fail => Err(TransportError::abnormal("broken pipe")),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn start_broken(fault: WriteFault) -> (TransportHandle, TransportEvents, Arc<AtomicUsize>) {
    let closes = Arc::new(AtomicUsize::new(0));
    let conn = BrokenConnection {
        fault,
        closes: Arc::clone(&closes),
    };
    let cfg = TransportConfig {
        ping_interval: Duration::from_secs(600),
        pong_wait: Duration::from_secs(3600),
        write_wait: Duration::from_secs(1),
        ..TransportConfig::default()
    };
    let (handle, events) = WebSocketTransport::new(conn, cfg).start();
    (handle, events, closes)
}

fn start(conn: MemoryConnection) -> (TransportHandle, TransportEvents) {
    WebSocketTransport::new(conn, TransportConfig::default()).start()
}

#[tokio::test]
async fn delivers_messages_in_send_order() {
    let (a, b) = memory::pair();
    let (ha, _ea) = start(a);
    let (_hb, mut eb) = start(b);

    for i in 0..50 {
        ha.send(Bytes::from(format!("m{i}"))).await.unwrap();
    }
    for i in 0..50 {
        let got = eb.messages.recv().await.unwrap();
        assert_eq!(got, Bytes::from(format!("m{i}")));
    }
}

#[tokio::test]
async fn concurrent_close_tears_down_once() {
    let (a, b) = memory::pair();
    let closes = a.close_counter();
    let (ha, ea) = start(a);
    let (_hb, eb) = start(b);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let h = ha.clone();
            tokio::spawn(async move { h.close() })
        })
        .collect();
    for t in tasks {
        t.await.unwrap();
    }

    let reason = ea.closed.await.unwrap();
    assert_eq!(reason.code, TransportError::CLOSED);
    assert!(ha.is_closed());
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    let remote = eb.closed.await.unwrap();
    assert_eq!(remote.code, NORMAL_CLOSURE);
}

#[tokio::test]
async fn send_after_close_is_rejected() {
    let (a, _b) = memory::pair();
    let (ha, ea) = start(a);

    ha.close();
    assert!(matches!(
        ha.send(Bytes::from_static(b"late")).await,
        Err(ProtooError::Closed)
    ));

    ea.closed.await.unwrap();
    assert!(matches!(
        ha.send(Bytes::from_static(b"later")).await,
        Err(ProtooError::Closed)
    ));
}

#[tokio::test]
async fn remote_vanishing_is_abnormal() {
    let (a, b) = memory::pair();
    let (ha, ea) = start(a);

    drop(b);

    let reason = ea.closed.await.unwrap();
    assert_eq!(reason.code, TransportError::ABNORMAL);
    assert!(ha.is_closed());
}

#[tokio::test]
async fn close_frame_without_status() {
    let (a, b) = memory::pair();
    let (_ha, ea) = start(a);
    let (_rb, mut wb) = b.split();

    wb.write(Frame::Close(None)).await.unwrap();

    let reason = ea.closed.await.unwrap();
    assert_eq!(reason.code, TransportError::NO_STATUS);
}

#[tokio::test]
async fn oversized_frame_closes_with_message_too_big() {
    let (a, b) = memory::pair();
    let cfg = TransportConfig {
        max_message_bytes: 16,
        ..TransportConfig::default()
    };
    let (_ha, mut ea) = WebSocketTransport::new(a, cfg).start();
    let (_rb, mut wb) = b.split();

    // At the limit is fine.
    wb.write(Frame::Data(Bytes::from(vec![b'x'; 16]))).await.unwrap();
    assert_eq!(ea.messages.recv().await.unwrap().len(), 16);

    wb.write(Frame::Data(Bytes::from(vec![b'x'; 17]))).await.unwrap();
    let reason = ea.closed.await.unwrap();
    assert_eq!(reason.code, TransportError::MESSAGE_TOO_BIG);
}

#[tokio::test(start_paused = true)]
async fn answered_pings_keep_the_connection_alive() {
    let (a, b) = memory::pair();
    let cfg = TransportConfig {
        ping_interval: Duration::from_secs(1),
        pong_wait: Duration::from_secs(3),
        ..TransportConfig::default()
    };
    let (ha, _ea) = WebSocketTransport::new(a, cfg.clone()).start();
    let (hb, _eb) = WebSocketTransport::new(b, cfg).start();

    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(!ha.is_closed());
    assert!(!hb.is_closed());
}

#[tokio::test(start_paused = true)]
async fn unanswered_pings_time_out() {
    let (a, b) = memory::pair();
    let cfg = TransportConfig {
        ping_interval: Duration::from_secs(1),
        pong_wait: Duration::from_secs(3),
        ..TransportConfig::default()
    };
    let (_ha, ea) = WebSocketTransport::new(a, cfg).start();
    // Held open but never read, so nothing answers.
    let (_rb, _wb) = b.without_auto_pong().split();

    let reason = ea.closed.await.unwrap();
    assert_eq!(reason.code, TransportError::ABNORMAL);
    assert_eq!(reason.text, "pong timeout");
}

#[tokio::test(start_paused = true)]
async fn stalled_write_hits_the_write_deadline() {
    let (h, ev, closes) = start_broken(WriteFault::Hang);

    h.send(Bytes::from_static(b"stuck")).await.unwrap();

    let reason = ev.closed.await.unwrap();
    assert_eq!(reason.code, TransportError::ABNORMAL);
    assert_eq!(reason.text, "write timeout");
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(h.is_closed());
}

#[tokio::test(start_paused = true)]
async fn failed_write_is_terminal() {
    let (h, ev, closes) = start_broken(WriteFault::Fail);

    h.send(Bytes::from_static(b"lost")).await.unwrap();

    let reason = ev.closed.await.unwrap();
    assert_eq!(reason.code, TransportError::ABNORMAL);
    assert_eq!(reason.text, "broken pipe");
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(matches!(
        h.send(Bytes::from_static(b"after")).await,
        Err(ProtooError::Closed)
    ));
}

#[tokio::test(start_paused = true)]
async fn zero_ping_interval_is_clamped() {
    let (a, b) = memory::pair();
    let cfg = TransportConfig {
        ping_interval: Duration::ZERO,
        ..TransportConfig::default()
    };
    let (ha, _ea) = WebSocketTransport::new(a, cfg).start();
    let (_hb, mut eb) = start(b);

    tokio::time::sleep(Duration::from_millis(20)).await;
    ha.send(Bytes::from_static(b"still here")).await.unwrap();

    assert_eq!(eb.messages.recv().await.unwrap(), Bytes::from_static(b"still here"));
    assert!(!ha.is_closed());
}
