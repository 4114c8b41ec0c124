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

mod config;
mod handlers;

use crate::config::{Arguments, Configuration};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::task::LocalSet;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use whatmud_service::{Engine, NativeRuntime};

fn main() {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Load configuration; a missing file means defaults
    let config: Configuration = Configuration::load(&arguments.config_file)
        .inspect_err(|err| eprintln!("Configuration load error: {}", err))
        .expect("Unable to load configuration file");

    // Initialize tracing/logging, RUST_LOG overrides the configured filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .with_level(true)
        .with_ansi(true)
        .init();

    debug!("Configuration loaded: {:?}", config);
    info!("Starting WhatMUD Server...");

    // Every connection shares one thread and one scripting runtime
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Unable to build async runtime");
    LocalSet::new().block_on(&runtime, run(config));
}

async fn run(config: Configuration) {
    let mut scripts = NativeRuntime::new();
    handlers::register(&mut scripts);
    let engine = Engine::new(config.engine_config(), scripts);

    info!("Binding telnet listener to {}", config.listener.addr);
    let listener = TcpListener::bind(config.listener.addr)
        .await
        .expect("Unable to bind telnet listener");

    engine
        .serve(listener, async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown requested"),
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await;

    info!(
        "WhatMUD Server stopped with {} connections still open",
        engine.registry().len()
    );
}
