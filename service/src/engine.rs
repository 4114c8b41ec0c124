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

//! Engine: the listener boundary
//!
//! The [`Engine`] turns accepted transports into running [`Connection`] tasks. It must be
//! driven from inside a [`tokio::task::LocalSet`]: every connection, the registry mutations
//! and the scripting runtime live on that single event loop.

use crate::script::ScriptRuntime;
use crate::{Acceptor, Connection, ConnectionHandle, ConnectionRegistry, EngineConfig, Transport};
use metrics::counter;
use std::cell::RefCell;
use std::future::Future;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Connection engine
pub struct Engine<R: ScriptRuntime> {
    config: Arc<EngineConfig>,
    registry: Arc<ConnectionRegistry>,
    runtime: Rc<RefCell<R>>,
}

impl<R: ScriptRuntime> Engine<R> {
    /// Create an engine running client tasks on `runtime`
    pub fn new(config: EngineConfig, runtime: R) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(ConnectionRegistry::new()),
            runtime: Rc::new(RefCell::new(runtime)),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registry of live connections
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Scripting runtime shared by every client task
    pub fn runtime(&self) -> &Rc<RefCell<R>> {
        &self.runtime
    }

    /// Start serving a newly accepted transport.
    ///
    /// Spawns the connection task on the current `LocalSet` and returns its handle along
    /// with the task's join handle.
    #[instrument(skip(self, stream), fields(peer_addr = %peer_addr))]
    pub fn on_new_connection<T: Transport>(
        &self,
        stream: T,
        peer_addr: SocketAddr,
    ) -> (ConnectionHandle, JoinHandle<()>) {
        let id = self.registry.next_id();
        let connection = Connection::new(
            id,
            stream,
            peer_addr,
            self.config.clone(),
            self.registry.clone(),
            self.runtime.clone(),
        );
        let handle = connection.handle();
        debug!(connection_id = %id, "Spawning connection task");
        (handle, tokio::task::spawn_local(connection.run()))
    }

    /// Accept connections until `shutdown` completes.
    ///
    /// Accept errors are logged and the loop continues.
    pub async fn serve<A, S>(&self, acceptor: A, shutdown: S)
    where
        A: Acceptor,
        S: Future<Output = ()>,
    {
        match acceptor.local_addr() {
            Some(addr) => info!(%addr, "Accepting connections"),
            None => info!("Accepting connections"),
        }
        tokio::pin!(shutdown);
        loop {
            let accepted = tokio::select! {
                result = acceptor.accept() => result,
                _ = &mut shutdown => break,
            };
            match accepted {
                Ok((stream, peer_addr)) => {
                    self.on_new_connection(stream, peer_addr);
                }
                Err(err) => {
                    counter!("whatmud.errors.accept").increment(1);
                    error!(error = %err, "Failed to accept connection");
                }
            }
        }
        info!(
            connections = self.registry.len(),
            "Stopped accepting connections"
        );
    }
}
