// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry tests: listener identity and channel symmetry.

use std::io::{Read, Write};

use super::*;

#[test]
fn repeated_listener_requests_share_one_socket() {
    let mut registry = Registry::new();
    let key = ListenerKey { host: "127.0.0.1".to_string(), port: 0, listen: 16 };

    let first_addr = registry.tcp_listener(key.clone()).unwrap().local_addr().unwrap();
    let second_addr = registry.tcp_listener(key).unwrap().local_addr().unwrap();

    assert_eq!(first_addr, second_addr);
    assert_eq!(registry.listener_count(), 1);
}

#[test]
fn distinct_triples_get_distinct_listeners() {
    let mut registry = Registry::new();

    registry
        .tcp_listener(ListenerKey { host: "127.0.0.1".to_string(), port: 0, listen: 16 })
        .unwrap();
    registry
        .tcp_listener(ListenerKey { host: "127.0.0.1".to_string(), port: 0, listen: 32 })
        .unwrap();

    assert_eq!(registry.listener_count(), 2);
}

#[test]
fn unparseable_host_is_an_error() {
    let mut registry = Registry::new();
    let key = ListenerKey { host: "not-an-address".to_string(), port: 0, listen: 16 };

    assert!(registry.tcp_listener(key).is_err());
}

#[test]
fn channel_key_is_unordered() {
    assert_eq!(ChannelKey::new("thing1", "thing2"), ChannelKey::new("thing2", "thing1"));
}

#[test]
fn peers_receive_opposite_connected_ends() {
    let mut registry = Registry::new();

    let mut for_thing1 = registry.channel_end("thing1", "thing2").unwrap().try_clone().unwrap();
    let mut for_thing2 = registry.channel_end("thing2", "thing1").unwrap().try_clone().unwrap();

    for_thing1.write_all(b"thing1 ping").unwrap();
    let mut received = [0u8; 11];
    for_thing2.read_exact(&mut received).unwrap();
    assert_eq!(&received, b"thing1 ping");

    for_thing2.write_all(b"thing2 ping").unwrap();
    for_thing1.read_exact(&mut received).unwrap();
    assert_eq!(&received, b"thing2 ping");
}

#[test]
fn request_order_does_not_change_the_pair() {
    let mut registry = Registry::new();

    // thing2 asks first; thing1's later request must join the same pair.
    let mut for_thing2 = registry.channel_end("thing2", "thing1").unwrap().try_clone().unwrap();
    let mut for_thing1 = registry.channel_end("thing1", "thing2").unwrap().try_clone().unwrap();

    for_thing2.write_all(b"hello").unwrap();
    let mut received = [0u8; 5];
    for_thing1.read_exact(&mut received).unwrap();
    assert_eq!(&received, b"hello");
}
