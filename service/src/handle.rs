//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Handle to a running connection
//!
//! A [`ConnectionHandle`] is the only way code outside the connection task can reach the
//! peer. Every message is queued to the connection task, which routes it through the telnet
//! codec; the handle never touches the transport.

use crate::{ConnectionId, ConnectionInfo, ConnectionState, EngineError, Features, Result};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;

/// Work queued for a connection task
#[derive(Debug)]
pub(crate) enum Outbound {
    /// Text, converted for the negotiated character set and sent as NVT text
    Text(String),
    /// Raw application bytes, `IAC` escaped only
    Data(Bytes),
    /// Request teardown once everything queued before it has been written
    Close,
}

/// State shared between a connection task and its handles (lock-free)
#[derive(Debug)]
pub(crate) struct ConnectionShared {
    id: ConnectionId,
    peer_addr: SocketAddr,
    created_at: Instant,
    state: AtomicU8,
    utf8: AtomicBool,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    messages_received: AtomicU64,
}

/// Clonable handle to one connection.
///
/// Two handles refer to the same connection when they share an outbound channel; a new
/// connection that happens to reuse an id never compares equal to an old handle.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    tx: mpsc::UnboundedSender<Outbound>,
    shared: Arc<ConnectionShared>,
}

impl ConnectionHandle {
    /// Create a handle and the receiving end its connection task drains.
    pub(crate) fn channel(
        id: ConnectionId,
        peer_addr: SocketAddr,
    ) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(ConnectionShared {
            id,
            peer_addr,
            created_at: Instant::now(),
            state: AtomicU8::new(ConnectionState::Connecting.as_u8()),
            utf8: AtomicBool::new(false),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
        });
        (Self { tx, shared }, rx)
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.shared.peer_addr
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Get the negotiated features
    pub fn features(&self) -> Features {
        Features {
            utf8: self.shared.utf8.load(Ordering::Acquire),
        }
    }

    /// Check whether both handles refer to the same connection
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }

    /// Queue text for the peer.
    ///
    /// Newlines are sent as `CR LF`. Without negotiated UTF-8, characters outside Latin-1
    /// are replaced by `?`.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.queue(Outbound::Text(text.into()))
    }

    /// Queue raw application bytes for the peer.
    pub fn send(&self, data: impl Into<Bytes>) -> Result<()> {
        self.queue(Outbound::Data(data.into()))
    }

    /// Ask the connection to close after everything already queued is written.
    pub fn close(&self) -> Result<()> {
        self.queue(Outbound::Close)
    }

    /// Snapshot of the connection's state and counters
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.shared.id,
            state: self.state(),
            peer_addr: self.shared.peer_addr,
            features: self.features(),
            created_at: self.shared.created_at,
            bytes_sent: self.shared.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.shared.bytes_received.load(Ordering::Relaxed),
            messages_received: self.shared.messages_received.load(Ordering::Relaxed),
        }
    }

    fn queue(&self, message: Outbound) -> Result<()> {
        if self.state().is_terminal() {
            return Err(EngineError::ConnectionClosed);
        }
        self.tx
            .send(message)
            .map_err(|_| EngineError::ConnectionClosed)
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.shared.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn set_utf8(&self, enabled: bool) {
        self.shared.utf8.store(enabled, Ordering::Release);
    }

    pub(crate) fn record_sent(&self, bytes: usize) {
        self.shared
            .bytes_sent
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self, bytes: usize) {
        self.shared
            .bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_message(&self) {
        self.shared.messages_received.fetch_add(1, Ordering::Relaxed);
    }
}
