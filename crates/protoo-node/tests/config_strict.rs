#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use protoo_node::config::{self, TransportConfig};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
transport:
  ping_interval_ms: 5000
  pong_wiat_ms: 60000 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    assert_eq!(cfg.transport.max_message_bytes, 131072);
    assert_eq!(cfg.peer.command_queue, 100);
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.kind().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn pong_wait_must_exceed_ping_interval() {
    let bad = r#"
version: 1
transport:
  ping_interval_ms: 60000
  pong_wait_ms: 5000
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn runtime_defaults_match_protocol() {
    let t = TransportConfig::default();
    assert_eq!(t.ping_interval, Duration::from_secs(5));
    assert_eq!(t.pong_wait, Duration::from_secs(60));
    assert_eq!(t.write_wait, Duration::from_secs(10));
    assert_eq!(t.send_queue, 100);
}
