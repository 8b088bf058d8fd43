// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broker's resource registry.
//!
//! Listeners and channel pairs are created on first request and retained
//! until the broker exits; workers only ever receive kernel duplicates, so
//! every entry here stays valid for the life of the process.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::os::unix::net::UnixStream;

use socket2::{Domain, Protocol, Socket, Type};

/// Key for shared TCP listeners: the full request triple. Two requests
/// share a listener only when host, port, and backlog all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub host: String,
    pub port: u16,
    pub listen: i32,
}

/// Key for channel pairs: the unordered peer names, so either peer's
/// request addresses the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey(String, String);

impl ChannelKey {
    pub fn new(identity: &str, partner: &str) -> Self {
        if identity <= partner {
            Self(identity.to_string(), partner.to_string())
        } else {
            Self(partner.to_string(), identity.to_string())
        }
    }
}

/// Both ends of one channel, keyed by the peer each end belongs to.
#[derive(Debug)]
struct ChannelPair {
    ends: HashMap<String, UnixStream>,
}

/// Process-local registry of shared resources.
#[derive(Debug, Default)]
pub struct Registry {
    listeners: HashMap<ListenerKey, TcpListener>,
    channels: HashMap<ChannelKey, ChannelPair>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared listener for `key`, bound and listening on first request.
    pub fn tcp_listener(&mut self, key: ListenerKey) -> io::Result<&TcpListener> {
        match self.listeners.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let listener = bind_listener(entry.key())?;
                Ok(entry.insert(listener))
            }
        }
    }

    /// The channel end to hand to `identity`, creating the pair on whichever
    /// peer asks first. Each requester receives the end recorded under its
    /// partner's name, so the two peers end up with opposite ends.
    pub fn channel_end(&mut self, identity: &str, partner: &str) -> io::Result<&UnixStream> {
        let pair = match self.channels.entry(ChannelKey::new(identity, partner)) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (one, two) = UnixStream::pair()?;
                let mut ends = HashMap::new();
                ends.insert(identity.to_string(), one);
                ends.insert(partner.to_string(), two);
                entry.insert(ChannelPair { ends })
            }
        };
        pair.ends
            .get(partner)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no channel end for peer"))
    }

    #[cfg(test)]
    fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Bind a fresh listening socket with `SO_REUSEADDR` set before bind.
fn bind_listener(key: &ListenerKey) -> io::Result<TcpListener> {
    let ip = key
        .host
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "unparseable listener host"))?;
    let addr = SocketAddr::new(ip, key.port);

    let domain = Domain::for_address(addr);
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(key.listen)?;
    Ok(socket.into())
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
