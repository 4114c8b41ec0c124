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

//! Connection actor
//!
//! One [`Connection`] task runs per peer on the event loop's `LocalSet`. It owns the
//! transport, the telnet codec, the line framer and the client task, and is the only code
//! that writes to the transport.
//!
//! Received bytes are decoded as they arrive, but lines are only extracted in a deferred
//! flush: the task yields to the scheduler first, so a busy peer cannot starve its siblings.

use crate::framer::LineFramer;
use crate::handle::Outbound;
use crate::script::{ClientTask, ScriptRuntime};
use crate::{
    ConnectionHandle, ConnectionId, ConnectionRegistry, ConnectionState, EngineConfig,
    EngineError, Result, Transport,
};
use bytes::{BufMut, Bytes, BytesMut};
use metrics::{counter, gauge};
use std::cell::RefCell;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::Decoder;
use tracing::{debug, error, info, instrument, trace, warn};
use whatmud_telnetcodec::{
    CharsetResponse, LocalStance, Negotiation, RemoteStance, TelnetCodec, TelnetEvent,
    TelnetOption,
};

/// What woke the event loop
enum Wake {
    Outbound(Option<Outbound>),
    Read(io::Result<usize>),
}

/// The task serving one peer
pub struct Connection<T: Transport, R: ScriptRuntime> {
    id: ConnectionId,
    transport: T,
    codec: TelnetCodec,
    /// Raw bytes awaiting the codec
    wire_buf: BytesMut,
    framer: LineFramer,
    /// Decoded application bytes awaiting the flush step
    recv_buf: BytesMut,
    flush_pending: bool,
    /// Size of each socket read, at least one byte
    read_size: usize,
    /// A CHARSET REQUEST is outstanding
    charset_requested: bool,
    handle: ConnectionHandle,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    registry: Arc<ConnectionRegistry>,
    runtime: Rc<RefCell<R>>,
    config: Arc<EngineConfig>,
    client: Option<ClientTask<R>>,
    registered: bool,
    torn_down: bool,
}

impl<T: Transport, R: ScriptRuntime> Connection<T, R> {
    /// Build the actor for an accepted transport.
    pub fn new(
        id: ConnectionId,
        transport: T,
        peer_addr: SocketAddr,
        config: Arc<EngineConfig>,
        registry: Arc<ConnectionRegistry>,
        runtime: Rc<RefCell<R>>,
    ) -> Self {
        let (handle, outbound) = ConnectionHandle::channel(id, peer_addr);
        Self {
            id,
            transport,
            codec: config.codec(),
            wire_buf: BytesMut::with_capacity(config.read_buffer_size),
            framer: LineFramer::new(config.max_line_length),
            recv_buf: BytesMut::new(),
            flush_pending: false,
            read_size: config.read_buffer_size.max(1),
            charset_requested: false,
            handle,
            outbound,
            registry,
            runtime,
            config,
            client: None,
            registered: false,
            torn_down: false,
        }
    }

    /// Handle to this connection
    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Serve the peer until it disconnects, a fatal error occurs or a close is requested.
    #[instrument(
        skip(self),
        fields(connection_id = %self.id, peer_addr = %self.handle.peer_addr(), transport = self.transport.kind())
    )]
    pub async fn run(mut self) {
        counter!("whatmud.connections.total").increment(1);
        gauge!("whatmud.connections.active").increment(1.0);

        let result = match self.accept().await {
            Ok(()) => self.event_loop().await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => debug!("Connection finished"),
            Err(err) if err.is_protocol_error() => {
                counter!("whatmud.errors.protocol").increment(1);
                warn!(error = %err, "Closing connection after protocol error");
            }
            Err(EngineError::Io(err)) => {
                debug!(error = %err, "Closing connection after transport error");
            }
            Err(err) => error!(error = %err, "Closing connection"),
        }
        self.on_eof().await;

        gauge!("whatmud.connections.active").decrement(1.0);
    }

    /// Initial negotiation, client task start and registration.
    async fn accept(&mut self) -> Result<()> {
        info!("Accepted connection");

        let table = self.codec.table().clone();
        for telopt in table.iter() {
            if telopt.local == LocalStance::Will {
                self.codec.negotiate(Negotiation::Will, telopt.option);
            }
            if telopt.remote == RemoteStance::Do {
                self.codec.negotiate(Negotiation::Do, telopt.option);
            }
        }
        self.pump_codec().await?;

        let mut client = ClientTask::spawn(
            self.runtime.clone(),
            &self.config.client_handler,
            &self.handle,
        )?;
        client.start();
        self.client = Some(client);

        self.registry.register(self.handle.clone())?;
        self.registered = true;
        self.handle.set_state(ConnectionState::Active);
        debug!("Connection active");
        Ok(())
    }

    async fn event_loop(&mut self) -> Result<()> {
        let mut chunk = vec![0u8; self.read_size];
        loop {
            if self.flush_pending {
                tokio::task::yield_now().await;
                self.flush()?;
                continue;
            }

            let wake = tokio::select! {
                biased;
                message = self.outbound.recv() => Wake::Outbound(message),
                read = self.transport.read(&mut chunk) => Wake::Read(read),
            };

            match wake {
                Wake::Outbound(Some(Outbound::Close) | None) => {
                    debug!("Close requested");
                    return Ok(());
                }
                Wake::Outbound(Some(message)) => self.on_outbound(message).await?,
                Wake::Read(Ok(0)) => {
                    debug!("Peer closed the connection");
                    return Ok(());
                }
                Wake::Read(Ok(len)) => self.on_read(&chunk[..len]).await?,
                Wake::Read(Err(err)) => return Err(err.into()),
            }
        }
    }

    async fn on_read(&mut self, chunk: &[u8]) -> Result<()> {
        trace!(len = chunk.len(), "Received bytes");
        self.handle.record_received(chunk.len());
        counter!("whatmud.bytes.received").increment(chunk.len() as u64);
        self.wire_buf.extend_from_slice(chunk);
        self.pump_codec().await
    }

    async fn on_outbound(&mut self, message: Outbound) -> Result<()> {
        match message {
            Outbound::Text(text) => {
                let bytes = self.handle.features().encode_text(&text);
                self.codec.send_text(&bytes);
            }
            Outbound::Data(data) => self.codec.send(&data),
            Outbound::Close => {}
        }
        self.pump_codec().await
    }

    /// Decode everything buffered, handling events in order.
    async fn pump_codec(&mut self) -> Result<()> {
        while let Some(event) = self.codec.decode(&mut self.wire_buf)? {
            self.on_event(event).await?;
        }
        Ok(())
    }

    async fn on_event(&mut self, event: TelnetEvent) -> Result<()> {
        match event {
            TelnetEvent::Send(bytes) => self.write(bytes).await?,
            TelnetEvent::Data(byte) => {
                self.recv_buf.put_u8(byte);
                self.schedule_flush();
            }
            TelnetEvent::Warning(err) => warn!(error = %err, "Telnet protocol warning"),
            TelnetEvent::Error(err) => {
                // Lines completed before the fatal bytes are still dispatched.
                self.flush()?;
                return Err(EngineError::Protocol(err));
            }
            TelnetEvent::Do(TelnetOption::Charset) => {
                debug!("Peer enabled CHARSET, requesting UTF-8");
                self.codec.request_charsets(&["UTF-8"]);
                self.charset_requested = true;
            }
            TelnetEvent::Subnegotiation(TelnetOption::Charset, payload) => {
                self.on_charset(&payload)
            }
            TelnetEvent::Subnegotiation(option, payload) => {
                trace!(%option, len = payload.len(), "Ignoring subnegotiation");
            }
            TelnetEvent::Will(option) => debug!(%option, "Peer enabled option"),
            TelnetEvent::Wont(option) => debug!(%option, "Peer disabled option"),
            TelnetEvent::Do(option) => debug!(%option, "Enabled option locally"),
            TelnetEvent::Dont(option) => debug!(%option, "Disabled option locally"),
            other => trace!(event = ?other, "Ignoring telnet command"),
        }
        Ok(())
    }

    fn on_charset(&mut self, payload: &Bytes) {
        let solicited =
            self.charset_requested && self.codec.is_enabled_local(TelnetOption::Charset);
        match CharsetResponse::parse(payload) {
            reply @ (CharsetResponse::Accepted(_) | CharsetResponse::Rejected) if !solicited => {
                warn!(response = ?reply, "Ignoring unsolicited CHARSET reply");
            }
            CharsetResponse::Accepted(charset) => {
                info!(charset = %String::from_utf8_lossy(&charset), "Peer accepted UTF-8");
                self.charset_requested = false;
                self.handle.set_utf8(true);
            }
            CharsetResponse::Rejected => {
                warn!("Peer rejected UTF-8, falling back to Latin-1");
                self.charset_requested = false;
                self.handle.set_utf8(false);
            }
            other => warn!(response = ?other, "Unrecognized CHARSET subnegotiation"),
        }
    }

    fn schedule_flush(&mut self) {
        if !self.flush_pending {
            self.flush_pending = true;
            trace!("Flush scheduled");
        }
    }

    /// Extract every complete line and hand each one to the client task.
    fn flush(&mut self) -> Result<()> {
        self.flush_pending = false;
        let features = self.handle.features();
        while let Some(line) = self.framer.decode(&mut self.recv_buf)? {
            let text = features.decode_text(&line);
            self.handle.record_message();
            counter!("whatmud.messages.received").increment(1);
            trace!(line = %text, "Dispatching line");
            if let Some(client) = self.client.as_mut() {
                client.deliver(&text);
            }
        }
        Ok(())
    }

    async fn write(&mut self, bytes: Bytes) -> Result<()> {
        let result = match self.transport.write_all(&bytes).await {
            Ok(()) => self.transport.flush().await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            counter!("whatmud.errors.write").increment(1);
            error!(error = %err, "Write failed");
            return Err(err.into());
        }
        self.handle.record_sent(bytes.len());
        counter!("whatmud.bytes.sent").increment(bytes.len() as u64);
        Ok(())
    }

    /// Tear the connection down. Runs once; later calls do nothing.
    async fn on_eof(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.handle.set_state(ConnectionState::Closing);

        self.outbound.close();
        let mut dropped = 0usize;
        while self.outbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "Discarded queued output");
        }
        self.recv_buf.clear();

        if let Err(err) = self.transport.close().await {
            debug!(error = %err, "Transport shutdown failed");
        }
        if self.registered {
            self.registered = false;
            if let Err(err) = self.registry.release(&self.handle) {
                error!(error = %err, "Failed to release connection");
            }
        }
        self.handle.set_state(ConnectionState::Closed);
        info!("Connection closed");
    }
}
