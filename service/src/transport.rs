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

//! Transport and listener abstractions
//!
//! A connection only needs an ordered byte stream it can read, write and close. Plain TCP is
//! the production transport; in-memory duplex pipes stand in for it in tests.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::net::{TcpListener, TcpStream};

/// Byte stream a connection runs over.
#[async_trait(?Send)]
pub trait Transport: AsyncRead + AsyncWrite + Unpin + 'static {
    /// Short name of the transport for logs
    fn kind(&self) -> &'static str;

    /// Shut down the write half. Reads already in flight complete naturally.
    async fn close(&mut self) -> io::Result<()> {
        self.shutdown().await
    }
}

#[async_trait(?Send)]
impl Transport for TcpStream {
    fn kind(&self) -> &'static str {
        "tcp"
    }
}

#[async_trait(?Send)]
impl Transport for DuplexStream {
    fn kind(&self) -> &'static str {
        "duplex"
    }
}

/// Source of new transports, typically a bound listener.
#[async_trait(?Send)]
pub trait Acceptor {
    /// Transport produced for each accepted peer
    type Stream: Transport;

    /// Wait for the next peer
    async fn accept(&self) -> io::Result<(Self::Stream, SocketAddr)>;

    /// Address being listened on, when there is one
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

#[async_trait(?Send)]
impl Acceptor for TcpListener {
    type Stream = TcpStream;

    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let (stream, peer_addr) = TcpListener::accept(self).await?;
        stream.set_nodelay(true)?;
        Ok((stream, peer_addr))
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        TcpListener::local_addr(self).ok()
    }
}
