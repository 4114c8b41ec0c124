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

//! Error types for the connection engine

use crate::types::ConnectionId;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Result type for scripting operations
pub type ScriptResult<T> = std::result::Result<T, ScriptError>;

/// Engine error types
#[derive(Debug, Error)]
pub enum EngineError {
    /// I/O error from the underlying transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unrecoverable protocol error from the codec layer
    #[error("Protocol error: {0}")]
    Protocol(#[from] whatmud_telnetcodec::CodecError),

    /// Received line exceeded the configured maximum
    #[error("Line exceeds {limit} bytes")]
    LineTooLong {
        /// Configured maximum line length
        limit: usize,
    },

    /// Error raised at the scripting boundary
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Registry invariant violation
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,
}

impl EngineError {
    /// Check if the error ends the connection it happened on
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::Script(_))
    }

    /// Check if the error is a protocol error
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            EngineError::Protocol(_) | EngineError::LineTooLong { .. }
        )
    }
}

/// Misuse of the connection registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An entry already exists for the connection id
    #[error("Connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// No entry exists for the connection id
    #[error("Connection {0} is not registered")]
    NotRegistered(ConnectionId),

    /// The entry for the connection id belongs to another connection
    #[error("Connection {0} is registered to a different connection")]
    StaleHandle(ConnectionId),
}

/// Errors raised at the scripting boundary
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptError {
    /// No script is known under the name
    #[error("Script '{0}' not found")]
    NotFound(String),

    /// The script raised an error while running
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// A value had the wrong type for the operation
    #[error("Type error: expected {expected}, got {found}")]
    Type {
        /// Expected type name
        expected: &'static str,
        /// Actual type name
        found: &'static str,
    },

    /// Resumed a task that already returned or failed
    #[error("Cannot resume dead task")]
    DeadTask,
}

impl ScriptError {
    /// Shorthand for a runtime error with a message
    pub fn runtime(message: impl Into<String>) -> Self {
        ScriptError::Runtime(message.into())
    }
}
