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

//! Engine configuration
//!
//! ```
//! use whatmud_service::EngineConfig;
//!
//! let config = EngineConfig::new()
//!     .with_client_handler("login")
//!     .with_max_line_length(4096);
//! assert_eq!(config.client_handler, "login");
//! ```

use whatmud_telnetcodec::{DEFAULT_MAX_SUBNEGOTIATION_LENGTH, NegotiationTable, TelnetCodec};

/// Default name of the script each connection's client task runs.
pub const DEFAULT_CLIENT_HANDLER: &str = "client_handler";

/// Default maximum length of one received line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 16 * 1024;

/// Settings shared by every connection an engine accepts.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Script loaded for every connection's client task
    pub client_handler: String,

    /// Options offered and accepted during negotiation
    pub negotiation: NegotiationTable,

    /// Largest line accepted before the connection is torn down
    pub max_line_length: usize,

    /// Largest subnegotiation payload accepted before the connection is torn down
    pub max_subnegotiation_length: usize,

    /// Size of each socket read
    pub read_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            client_handler: DEFAULT_CLIENT_HANDLER.to_string(),
            negotiation: NegotiationTable::server_default(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_subnegotiation_length: DEFAULT_MAX_SUBNEGOTIATION_LENGTH,
            read_buffer_size: 4096,
        }
    }
}

impl EngineConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the client handler script name
    pub fn with_client_handler(mut self, name: impl Into<String>) -> Self {
        self.client_handler = name.into();
        self
    }

    /// Set the negotiation table
    pub fn with_negotiation(mut self, table: NegotiationTable) -> Self {
        self.negotiation = table;
        self
    }

    /// Set the maximum line length
    pub fn with_max_line_length(mut self, length: usize) -> Self {
        self.max_line_length = length;
        self
    }

    /// Set the maximum subnegotiation payload length
    pub fn with_max_subnegotiation_length(mut self, length: usize) -> Self {
        self.max_subnegotiation_length = length;
        self
    }

    /// Set the socket read size
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// A codec configured for one connection
    pub(crate) fn codec(&self) -> TelnetCodec {
        TelnetCodec::with_table(self.negotiation.clone())
            .with_max_subnegotiation_length(self.max_subnegotiation_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.client_handler, "client_handler");
        assert_eq!(config.negotiation, NegotiationTable::server_default());
        assert_eq!(config.max_line_length, DEFAULT_MAX_LINE_LENGTH);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_negotiation(NegotiationTable::empty())
            .with_max_subnegotiation_length(64)
            .with_read_buffer_size(0);
        assert!(config.negotiation.is_empty());
        assert_eq!(config.max_subnegotiation_length, 64);
        assert_eq!(config.read_buffer_size, 1);
        assert!(config.codec().table().is_empty());
    }
}
