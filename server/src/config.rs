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

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use whatmud_service::{DEFAULT_CLIENT_HANDLER, DEFAULT_MAX_LINE_LENGTH, EngineConfig};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        env = "WHATMUD_CONFIG",
        help = "Path to configuration file",
        default_value = "whatmud.yaml"
    )]
    pub config_file: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub listener: ListenerConfig,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub log: LogConfig,
}

impl Configuration {
    /// Load configuration from a YAML file. A missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self, String> {
        if !Path::new(path).exists() {
            return Ok(Configuration::default());
        }
        let file =
            std::fs::File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?;

        let conf = serde_yaml::from_reader(file)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        Ok(conf)
    }

    /// Engine settings for the service crate
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_client_handler(self.engine.client_handler.clone())
            .with_max_line_length(self.engine.max_line_length)
            .with_max_subnegotiation_length(self.engine.max_subnegotiation_length)
            .with_read_buffer_size(self.engine.read_buffer_size)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Address the telnet listener binds to (default: 0.0.0.0:4000)
    #[serde(default = "default_listener_addr")]
    pub addr: SocketAddr,
}

fn default_listener_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 4000))
}

impl Default for ListenerConfig {
    fn default() -> Self {
        ListenerConfig {
            addr: default_listener_addr(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EngineSection {
    /// Script run for every connection
    #[serde(default = "default_client_handler")]
    pub client_handler: String,

    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    #[serde(default = "default_max_subnegotiation_length")]
    pub max_subnegotiation_length: usize,

    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

fn default_client_handler() -> String {
    DEFAULT_CLIENT_HANDLER.to_string()
}

fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

fn default_max_subnegotiation_length() -> usize {
    EngineConfig::default().max_subnegotiation_length
}

fn default_read_buffer_size() -> usize {
    EngineConfig::default().read_buffer_size
}

impl Default for EngineSection {
    fn default() -> Self {
        EngineSection {
            client_handler: default_client_handler(),
            max_line_length: default_max_line_length(),
            max_subnegotiation_length: default_max_subnegotiation_length(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log filter used when `RUST_LOG` is not set (default: info)
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: default_log_filter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Configuration::load("does/not/exist.yaml").unwrap();
        assert_eq!(config.listener.addr, "0.0.0.0:4000".parse().unwrap());
        assert_eq!(config.engine.client_handler, "client_handler");
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_partial_yaml() {
        let config: Configuration = serde_yaml::from_str(
            "listener:\n  addr: 127.0.0.1:2323\nengine:\n  max_line_length: 512\n",
        )
        .unwrap();
        assert_eq!(config.listener.addr, "127.0.0.1:2323".parse().unwrap());
        assert_eq!(config.engine.client_handler, "client_handler");

        let engine = config.engine_config();
        assert_eq!(engine.max_line_length, 512);
        assert_eq!(engine.max_subnegotiation_length, 8192);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let path = std::env::temp_dir().join("whatmud-invalid-config.yaml");
        std::fs::write(&path, "listener: [not, a, map]\n").unwrap();
        let result = Configuration::load(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();
        assert!(result.unwrap_err().starts_with("Failed to parse config file"));
    }
}
