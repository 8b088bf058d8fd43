//! Broker specs: listener identity, channel symmetry, failure paths.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use tectonic_client::{
    request_channel, request_tcp_listener, request_worker_std_pair, ClientError,
};
use tectonic_wire::send_message;

use crate::prelude::*;

#[test]
fn repeated_listener_requests_return_the_same_socket() {
    let broker = BrokerHarness::start();

    let first = request_tcp_listener("127.0.0.1", 0, 16, &broker.socket_path).unwrap();
    let second = request_tcp_listener("127.0.0.1", 0, 16, &broker.socket_path).unwrap();

    // Port 0 picks an ephemeral port at bind time; both descriptors naming
    // the same bound port proves they are the same kernel socket.
    let first_addr = first.local_addr().unwrap();
    assert_ne!(first_addr.port(), 0);
    assert_eq!(first_addr, second.local_addr().unwrap());
}

#[test]
fn echo_through_a_brokered_listener() {
    let broker = BrokerHarness::start();

    let listener = request_tcp_listener("127.0.0.1", 0, 16, &broker.socket_path).unwrap();
    let addr = listener.local_addr().unwrap();

    let server = std::thread::spawn(move || {
        let (mut connection, _) = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        connection.read_exact(&mut buf).unwrap();
        connection.write_all(&buf).unwrap();
    });

    let mut client = TcpStream::connect(addr).unwrap();
    client.write_all(b"hello").unwrap();
    let mut echoed = [0u8; 5];
    client.read_exact(&mut echoed).unwrap();
    assert_eq!(&echoed, b"hello");
    server.join().unwrap();
}

#[test]
fn channel_peers_get_opposite_ends_regardless_of_order() {
    let broker = BrokerHarness::start();

    let mut thing1 = request_channel("thing1", "thing2", &broker.socket_path).unwrap();
    let mut thing2 = request_channel("thing2", "thing1", &broker.socket_path).unwrap();

    thing1.write_all(b"thing1 ping").unwrap();
    let mut buf = [0u8; 11];
    thing2.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"thing1 ping");

    thing2.write_all(b"thing2 ping").unwrap();
    thing1.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"thing2 ping");
}

#[test]
fn channel_with_self_is_refused() {
    let broker = BrokerHarness::start();

    let err = request_channel("thing1", "thing1", &broker.socket_path).unwrap_err();
    assert!(matches!(err, ClientError::Refused));
}

#[test]
fn unbindable_address_yields_failure_not_silence() {
    let broker = BrokerHarness::start();

    // Hold the port hostage so the broker's bind fails.
    let squatter = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = squatter.local_addr().unwrap().port();

    let err = request_tcp_listener("127.0.0.1", port, 16, &broker.socket_path).unwrap_err();
    assert!(matches!(err, ClientError::Refused));
}

#[test]
fn unparseable_host_yields_failure() {
    let broker = BrokerHarness::start();

    let err = request_tcp_listener("not-a-host", 9998, 16, &broker.socket_path).unwrap_err();
    assert!(matches!(err, ClientError::Refused));
}

#[test]
fn std_pair_writes_land_in_the_live_files() {
    let broker = BrokerHarness::start();

    let pair = request_worker_std_pair(&broker.socket_path).unwrap();
    nix::unistd::write(&pair.stdout, b"to stdout").unwrap();
    nix::unistd::write(&pair.stderr, b"to stderr").unwrap();

    assert_eq!(std::fs::read_to_string(broker.workers_log("stdout")).unwrap(), "to stdout");
    assert_eq!(std::fs::read_to_string(broker.workers_log("stderr")).unwrap(), "to stderr");
}

#[test]
fn malformed_request_does_not_take_the_broker_down() {
    let broker = BrokerHarness::start();

    let mut rogue = std::os::unix::net::UnixStream::connect(&broker.socket_path).unwrap();
    rogue.write_all(b"this is no netstring").unwrap();
    drop(rogue);

    // The broker dropped that client and keeps serving.
    let pair = request_worker_std_pair(&broker.socket_path).unwrap();
    nix::unistd::write(&pair.stdout, b"still alive").unwrap();
    assert_eq!(std::fs::read_to_string(broker.workers_log("stdout")).unwrap(), "still alive");
}

#[test]
fn response_messages_are_rejected_as_requests() {
    let broker = BrokerHarness::start();

    let mut rogue = std::os::unix::net::UnixStream::connect(&broker.socket_path).unwrap();
    rogue.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    send_message(
        &mut rogue,
        &tectonic_wire::Message::HaveTCPListener { host: "127.0.0.1".to_string(), port: 1 },
    )
    .unwrap();

    // Connection is dropped without a response.
    let mut buf = [0u8; 1];
    assert_eq!(rogue.read(&mut buf).unwrap(), 0);

    // And the broker keeps serving.
    request_worker_std_pair(&broker.socket_path).unwrap();
}
