//! End-to-end relay tests: mock device -> reader -> flusher -> broadcaster
//! -> real TCP subscribers.

use sensor_relay::app::RelayApp;
use sensor_relay::config::AppConfig;
use sensor_relay::relay::wire;
use sensor_relay::transport::MockTransport;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Relay wired to a mock device, flushing every 50 ms on an ephemeral port
fn start_relay() -> (MockTransport, SocketAddr, RelayApp) {
    let mut config = AppConfig::default();
    config.network.bind_address = "127.0.0.1:0".to_string();
    config.relay.flush_interval_ms = 50;

    let transport = MockTransport::new();
    let mut app = RelayApp::with_transport(&config, Box::new(transport.clone())).unwrap();
    let addr = app.local_addr().unwrap();
    app.start_threads().unwrap();

    (transport, addr, app)
}

fn connect(addr: SocketAddr) -> TcpStream {
    let conn = TcpStream::connect(addr).unwrap();
    conn.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    conn
}

#[test]
fn readings_within_one_window_arrive_as_one_batch_to_all_subscribers() {
    let (device, addr, _app) = start_relay();

    let mut sub_a = connect(addr);
    let mut sub_b = connect(addr);

    // Let both subscribers register before data arrives
    std::thread::sleep(Duration::from_millis(100));

    // Two readings arriving within one flush window: one chunk from the
    // device side, so the whole thing lands in a single batch.
    device.inject_read(b"TDS : 812.5\npH : 6.2\n");

    let frame_a = wire::read_frame(&mut sub_a).unwrap().unwrap();
    let frame_b = wire::read_frame(&mut sub_b).unwrap().unwrap();

    // Each subscriber sees a single identical batch containing both readings.
    assert_eq!(frame_a, frame_b);
    let text = String::from_utf8(frame_a).unwrap();
    assert!(text.contains("TDS : 812.5"));
    assert!(text.contains("pH : 6.2"));
}

#[test]
fn delivered_bytes_equal_device_bytes_in_order() {
    let (device, addr, _app) = start_relay();

    let mut sub = connect(addr);
    std::thread::sleep(Duration::from_millis(100));

    // Spread chunks across several flush windows
    let chunks: Vec<String> = (0..6).map(|i| format!("reading {};", i)).collect();
    for chunk in &chunks {
        device.inject_read(chunk.as_bytes());
        std::thread::sleep(Duration::from_millis(80));
    }

    let expected: String = chunks.concat();
    let mut delivered = Vec::new();
    while delivered.len() < expected.len() {
        match wire::read_frame(&mut sub) {
            Ok(Some(frame)) => delivered.extend(frame),
            other => panic!("stream ended early: {:?}", other.map(|f| f.map(|v| v.len()))),
        }
    }

    // Batches concatenate to exactly the injected byte sequence: nothing
    // dropped, duplicated, or reordered.
    assert_eq!(String::from_utf8(delivered).unwrap(), expected);
}

#[test]
fn disconnected_subscriber_does_not_affect_remaining_one() {
    let (device, addr, _app) = start_relay();

    let sub_a = connect(addr);
    let mut sub_b = connect(addr);
    std::thread::sleep(Duration::from_millis(100));

    drop(sub_a);

    device.inject_read(b"after disconnect");
    let frame = wire::read_frame(&mut sub_b).unwrap().unwrap();
    assert_eq!(frame, b"after disconnect");

    // And the relay keeps going for later batches
    device.inject_read(b"second batch");
    let frame = wire::read_frame(&mut sub_b).unwrap().unwrap();
    assert_eq!(frame, b"second batch");
}

#[test]
fn zero_subscribers_discards_batches_without_breaking_later_ones() {
    let (device, addr, _app) = start_relay();

    // No subscribers yet: this batch is flushed into the void
    device.inject_read(b"unheard");
    std::thread::sleep(Duration::from_millis(150));

    let mut sub = connect(addr);
    std::thread::sleep(Duration::from_millis(100));

    device.inject_read(b"heard");
    let frame = wire::read_frame(&mut sub).unwrap().unwrap();
    assert_eq!(frame, b"heard");
}

#[test]
fn subscriber_observes_batches_in_flush_order() {
    let (device, addr, _app) = start_relay();

    let mut sub = connect(addr);
    std::thread::sleep(Duration::from_millis(100));

    device.inject_read(b"B1");
    std::thread::sleep(Duration::from_millis(120));
    device.inject_read(b"B2");

    let first = wire::read_frame(&mut sub).unwrap().unwrap();
    let second = wire::read_frame(&mut sub).unwrap().unwrap();
    assert_eq!(first, b"B1");
    assert_eq!(second, b"B2");
}

#[test]
fn chatty_subscriber_is_tolerated() {
    use std::io::Write;

    let (device, addr, _app) = start_relay();

    let mut sub = connect(addr);
    std::thread::sleep(Duration::from_millis(100));

    // The protocol is output-only; inbound bytes must be ignored
    sub.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();

    device.inject_read(b"TDS : 440.0");
    let frame = wire::read_frame(&mut sub).unwrap().unwrap();
    assert_eq!(frame, b"TDS : 440.0");
}
