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

//! WhatMUD connection engine
//!
//! Terminates telnet connections, negotiates terminal capabilities, frames input into
//! lines and hands every connection to a cooperative scripted client task.
//!
//! # Architecture
//!
//! ```text
//! Engine (accept loop)
//!     ↓
//! Connection task ── TelnetCodec → LineFramer → ClientTask
//!     ↑
//! ConnectionHandle ← ConnectionRegistry
//! ```
//!
//! Everything runs on one thread: the engine spawns connection tasks with
//! [`tokio::task::spawn_local`], so it must be driven inside a [`tokio::task::LocalSet`].
//!
//! # Example
//!
//! ```no_run
//! use tokio::net::TcpListener;
//! use tokio::task::LocalSet;
//! use whatmud_service::{Engine, EngineConfig, NativeRuntime, Step, script_fn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> std::io::Result<()> {
//!     let mut runtime = NativeRuntime::new();
//!     runtime.register_script("client_handler", || {
//!         script_fn(|cx, args| {
//!             if let Some(line) = args.first() {
//!                 cx.print(line.clone())?;
//!             }
//!             Ok(Step::Yield(Vec::new()))
//!         })
//!     });
//!
//!     let engine = Engine::new(EngineConfig::default(), runtime);
//!     let listener = TcpListener::bind("0.0.0.0:4000").await?;
//!     LocalSet::new()
//!         .run_until(engine.serve(listener, async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         }))
//!         .await;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod engine;
mod error;
mod framer;
mod handle;
mod registry;
pub mod script;
mod transport;
mod types;

pub use config::{DEFAULT_CLIENT_HANDLER, DEFAULT_MAX_LINE_LENGTH, EngineConfig};
pub use connection::Connection;
pub use engine::Engine;
pub use error::{EngineError, RegistryError, Result, ScriptError, ScriptResult};
pub use framer::LineFramer;
pub use handle::ConnectionHandle;
pub use registry::ConnectionRegistry;
pub use script::{
    ClientTask, NativeRuntime, NativeScript, NativeTable, NativeValue, ScriptContext,
    ScriptRuntime, ScriptValue, Step, TaskStatus, script_fn,
};
pub use transport::{Acceptor, Transport};
pub use types::{ConnectionId, ConnectionInfo, ConnectionState, Features};
