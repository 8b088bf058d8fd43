//! Rotation specs: the shared worker logs rotate under load without losing
//! bytes, and re-requesting the pair lands writes in the live file.

use std::time::Duration;

use tectonic_client::request_worker_std_pair;

use crate::prelude::*;

#[test]
fn rotation_under_load_preserves_every_byte() {
    let broker = BrokerHarness::start_with(|config| {
        config.max_size = 64;
        config.rotate_interval = Duration::from_millis(50);
    });

    // First burst overflows the threshold.
    let pair = request_worker_std_pair(&broker.socket_path).unwrap();
    let first: Vec<u8> = (0..128u8).collect();
    nix::unistd::write(&pair.stdout, &first).unwrap();

    let rotated = wait_for(Duration::from_secs(5), || broker.workers_log("stdout.1").exists());
    assert!(rotated, "oversized log should rotate within a few ticks");

    // A fresh request gets the new live file.
    let refreshed = request_worker_std_pair(&broker.socket_path).unwrap();
    let second = b"after rotation".to_vec();
    nix::unistd::write(&refreshed.stdout, &second).unwrap();

    let archive = std::fs::read(broker.workers_log("stdout.1")).unwrap();
    let live = std::fs::read(broker.workers_log("stdout")).unwrap();

    assert_eq!(archive, first, "archive holds exactly the pre-rotation bytes");
    assert_eq!(live, second, "live file holds exactly the post-rotation bytes");

    // Reverse-order concatenation reproduces the full stream.
    let mut stream = archive;
    stream.extend_from_slice(&live);
    let mut expected = first;
    expected.extend_from_slice(&second);
    assert_eq!(stream, expected);
}

#[test]
fn stale_descriptors_keep_writing_to_the_archived_file() {
    let broker = BrokerHarness::start_with(|config| {
        config.max_size = 8;
        config.rotate_interval = Duration::from_millis(50);
    });

    let stale = request_worker_std_pair(&broker.socket_path).unwrap();
    nix::unistd::write(&stale.stdout, b"0123456789").unwrap();

    assert!(wait_for(Duration::from_secs(5), || broker.workers_log("stdout.1").exists()));

    // The old descriptor follows the rename: its bytes append to the
    // archive, never interleaving into the new live file.
    nix::unistd::write(&stale.stdout, b"late").unwrap();
    assert_eq!(
        std::fs::read_to_string(broker.workers_log("stdout.1")).unwrap(),
        "0123456789late"
    );
    assert_eq!(std::fs::read_to_string(broker.workers_log("stdout")).unwrap(), "");
}
