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

//! Registry of live connections
//!
//! The registry holds the strong handle that keeps a connection reachable while its client
//! task is suspended. An entry is added once the connection is accepted and removed exactly
//! once during teardown. Misuse is a programming error: it panics in debug builds and is
//! refused without touching other entries in release builds.

use crate::{ConnectionHandle, ConnectionId, RegistryError};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::gauge;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error};

/// Connections keyed by id
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionHandle>,
    next_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a fresh connection id
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Insert the strong entry for a connection. Never overwrites an existing entry.
    pub fn register(&self, handle: ConnectionHandle) -> Result<(), RegistryError> {
        let id = handle.id();
        match self.connections.entry(id) {
            Entry::Occupied(_) => Self::misuse(RegistryError::AlreadyRegistered(id)),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                gauge!("whatmud.registry.size").increment(1.0);
                debug!(connection_id = %id, "Registered connection");
                Ok(())
            }
        }
    }

    /// Remove the entry for a connection, only if it is this connection's entry.
    pub fn release(&self, handle: &ConnectionHandle) -> Result<(), RegistryError> {
        let id = handle.id();
        if self
            .connections
            .remove_if(&id, |_, existing| existing.same_connection(handle))
            .is_some()
        {
            gauge!("whatmud.registry.size").decrement(1.0);
            debug!(connection_id = %id, "Released connection");
            return Ok(());
        }
        if self.connections.contains_key(&id) {
            Self::misuse(RegistryError::StaleHandle(id))
        } else {
            Self::misuse(RegistryError::NotRegistered(id))
        }
    }

    /// Get the handle registered under an id
    pub fn get(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.connections.get(&id).map(|entry| entry.value().clone())
    }

    /// Check whether an id is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check whether no connection is registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Handles of every registered connection
    pub fn handles(&self) -> Vec<ConnectionHandle> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn misuse(err: RegistryError) -> Result<(), RegistryError> {
        error!(error = %err, "Connection registry misuse");
        debug_assert!(false, "{}", err);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn handle(registry: &ConnectionRegistry) -> ConnectionHandle {
        handle_with_id(registry.next_id())
    }

    fn handle_with_id(id: ConnectionId) -> ConnectionHandle {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        ConnectionHandle::channel(id, addr).0
    }

    /// Run a misuse path: `None` when it panicked (debug builds), otherwise its result.
    fn misuse<T>(f: impl FnOnce() -> T) -> Option<T> {
        catch_unwind(AssertUnwindSafe(f)).ok()
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = ConnectionRegistry::new();
        let first = registry.next_id();
        let second = registry.next_id();
        assert_eq!(first, ConnectionId::new(1));
        assert!(second > first);
    }

    #[test]
    fn test_register_and_release() {
        let registry = ConnectionRegistry::new();
        let conn = handle(&registry);
        registry.register(conn.clone()).unwrap();
        assert!(registry.contains(conn.id()));
        assert!(registry.get(conn.id()).unwrap().same_connection(&conn));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.handles().len(), 1);

        registry.release(&conn).unwrap();
        assert!(registry.is_empty());
        assert!(registry.get(conn.id()).is_none());
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "already registered"))]
    fn test_double_register_is_refused() {
        let registry = ConnectionRegistry::new();
        let conn = handle(&registry);
        registry.register(conn.clone()).unwrap();
        assert_eq!(
            registry.register(conn.clone()),
            Err(RegistryError::AlreadyRegistered(conn.id()))
        );
    }

    #[test]
    fn test_double_release_is_refused() {
        let registry = ConnectionRegistry::new();
        let conn = handle(&registry);
        registry.register(conn.clone()).unwrap();
        registry.release(&conn).unwrap();

        if let Some(result) = misuse(|| registry.release(&conn)) {
            assert_eq!(result, Err(RegistryError::NotRegistered(conn.id())));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stale_release_keeps_newer_connection() {
        let registry = ConnectionRegistry::new();
        let old = handle_with_id(ConnectionId::new(9));
        registry.register(old.clone()).unwrap();
        registry.release(&old).unwrap();

        let newer = handle_with_id(ConnectionId::new(9));
        registry.register(newer.clone()).unwrap();

        if let Some(result) = misuse(|| registry.release(&old)) {
            assert_eq!(result, Err(RegistryError::StaleHandle(old.id())));
        }
        assert!(registry.get(newer.id()).unwrap().same_connection(&newer));
    }

    #[test]
    fn test_overwrite_is_refused() {
        let registry = ConnectionRegistry::new();
        let first = handle_with_id(ConnectionId::new(5));
        let second = handle_with_id(ConnectionId::new(5));
        registry.register(first.clone()).unwrap();

        if let Some(result) = misuse(|| registry.register(second.clone())) {
            assert_eq!(result, Err(RegistryError::AlreadyRegistered(second.id())));
        }
        assert!(registry.get(first.id()).unwrap().same_connection(&first));
    }
}
