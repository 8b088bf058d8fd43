// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests: serialize → frame → parse is the identity for every tag.

use proptest::prelude::*;
use serde_json::json;

use crate::{read_message, send_message, Message};

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,16}"
}

fn message() -> impl Strategy<Value = Message> {
    prop_oneof![
        (name(), any::<u16>(), 0..=1024i32).prop_map(|(host, port, listen)| {
            Message::WantTCPListener { host, port, listen }
        }),
        (name(), any::<u16>()).prop_map(|(host, port)| Message::HaveTCPListener { host, port }),
        (name(), name()).prop_map(|(identity, partner)| Message::WantChannel { identity, partner }),
        (name(), name()).prop_map(|(identity, partner)| Message::HaveChannel { identity, partner }),
        any::<bool>().prop_map(|ignored| Message::WantWorkerStandardPair { ignored }),
        any::<bool>().prop_map(|ignored| Message::HaveWorkerStandardPair { ignored }),
        (name(), any::<u16>()).prop_map(|(host, port)| Message::Failure {
            request_message: json!({
                "__name__": "WantTCPListener",
                "__pid__": 1,
                "host": host,
                "port": port,
                "listen": 1,
            }),
        }),
    ]
}

proptest! {
    #[test]
    fn framed_roundtrip(message in message()) {
        let mut buffer = Vec::new();
        send_message(&mut buffer, &message).unwrap();

        let (decoded, pid) = read_message(&mut std::io::Cursor::new(buffer)).unwrap();
        prop_assert_eq!(decoded, message);
        prop_assert_eq!(pid, std::process::id());
    }
}
