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

use crate::options::{Negotiation, NegotiationTable, Outcome, TelnetOptions};
use crate::result::SubnegotiationErrorKind;
use crate::{CodecError, TelnetEvent, TelnetFrame, TelnetOption, consts};
use bytes::{Buf, BufMut, BytesMut};
use std::collections::VecDeque;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// Default upper bound for a received subnegotiation payload.
pub const DEFAULT_MAX_SUBNEGOTIATION_LENGTH: usize = 8192;

/// A codec for the Telnet protocol, translating between raw bytes and [`TelnetEvent`]s.
///
/// One instance serves one ordered byte stream. It holds the partial-sequence state of the
/// decoder between calls, the per-option negotiation state, and a FIFO of events that have
/// been produced but not yet handed out. Negotiation replies produced while decoding are
/// queued as [`TelnetEvent::Send`] ahead of the event that caused them. Outbound operations
/// ([`negotiate`](Self::negotiate), [`send`](Self::send), [`send_text`](Self::send_text)
/// and the subnegotiation framing calls) queue `Send` events on the same FIFO; drain it
/// with [`poll_event`](Self::poll_event) or the next call to `decode`.
#[derive(Debug)]
pub struct TelnetCodec {
    decoder_buffer: BytesMut,
    decoder_state: DecoderState,
    options: TelnetOptions,
    pending: VecDeque<TelnetEvent>,
    outbound_subnegotiation: Option<(TelnetOption, BytesMut)>,
    max_subnegotiation_length: usize,
}

impl TelnetCodec {
    /// Creates a codec negotiating against [`NegotiationTable::server_default`].
    ///
    /// # Example
    /// ```
    /// use whatmud_telnetcodec::TelnetCodec;
    ///
    /// let codec = TelnetCodec::new();
    /// assert_eq!(codec.table().len(), 3);
    /// ```
    pub fn new() -> TelnetCodec {
        TelnetCodec::default()
    }

    /// Creates a codec negotiating against `table`.
    pub fn with_table(table: NegotiationTable) -> TelnetCodec {
        TelnetCodec {
            decoder_buffer: BytesMut::new(),
            decoder_state: DecoderState::NormalData,
            options: TelnetOptions::new(table),
            pending: VecDeque::new(),
            outbound_subnegotiation: None,
            max_subnegotiation_length: DEFAULT_MAX_SUBNEGOTIATION_LENGTH,
        }
    }

    /// Set the largest subnegotiation payload accepted from the peer.
    pub fn with_max_subnegotiation_length(mut self, limit: usize) -> TelnetCodec {
        self.max_subnegotiation_length = limit;
        self
    }

    /// The negotiation table this codec was built with.
    pub fn table(&self) -> &NegotiationTable {
        self.options.table()
    }

    /// Checks if a specific Telnet option is enabled locally.
    ///
    /// # Example
    /// ```
    /// use whatmud_telnetcodec::{TelnetCodec, TelnetOption};
    ///
    /// let codec = TelnetCodec::new();
    /// assert!(!codec.is_enabled_local(TelnetOption::SuppressGoAhead));
    /// ```
    pub fn is_enabled_local(&self, option: TelnetOption) -> bool {
        self.options.local_enabled(option)
    }

    /// Checks if a specific Telnet option is enabled on the remote side.
    pub fn is_enabled_remote(&self, option: TelnetOption) -> bool {
        self.options.remote_enabled(option)
    }

    /// True if events are waiting to be handed out.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Take the oldest queued event without consuming any input.
    pub fn poll_event(&mut self) -> Option<TelnetEvent> {
        self.pending.pop_front()
    }

    /// Queue a locally initiated negotiation command.
    ///
    /// The Q-method decides whether anything is actually sent: asking for a state that is
    /// already reached, or already being negotiated, queues nothing. Offering `WILL`/`DO`
    /// for an option the table does not support queues a [`TelnetEvent::Warning`] instead.
    ///
    /// # Example
    /// ```
    /// use whatmud_telnetcodec::{Negotiation, TelnetCodec, TelnetEvent, TelnetOption};
    ///
    /// let mut codec = TelnetCodec::new();
    /// codec.negotiate(Negotiation::Will, TelnetOption::SuppressGoAhead);
    /// assert_eq!(
    ///     codec.poll_event(),
    ///     Some(TelnetEvent::Send(bytes::Bytes::from_static(&[255, 251, 3])))
    /// );
    /// ```
    pub fn negotiate(&mut self, command: Negotiation, option: TelnetOption) {
        let offered = match command {
            Negotiation::Will => self.options.table().supports_local(option),
            Negotiation::Do => self.options.table().supports_remote(option),
            Negotiation::Wont | Negotiation::Dont => true,
        };
        if !offered {
            warn!("Refusing to negotiate {:?} {}: not in negotiation table", command, option);
            self.pending
                .push_back(TelnetEvent::Warning(CodecError::NegotiationError {
                    reason: "option not offered by negotiation table".into(),
                    frame_type: Some(format!("{:?} {}", command, option)),
                }));
            return;
        }
        if let Some(frame) = self.options.request(command, option) {
            self.queue_frame(&frame);
        }
    }

    /// Queue application bytes for sending, escaping `IAC`.
    pub fn send(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let mut buffer = BytesMut::with_capacity(data.len() + 8);
        escape_data(data, &mut buffer);
        self.pending.push_back(TelnetEvent::Send(buffer.freeze()));
    }

    /// Queue NVT text for sending: `IAC` escaped, `LF` sent as `CR LF`, bare `CR` as `CR NUL`.
    pub fn send_text(&mut self, text: &[u8]) {
        if text.is_empty() {
            return;
        }
        let mut buffer = BytesMut::with_capacity(text.len() + 8);
        escape_text(text, &mut buffer);
        self.pending.push_back(TelnetEvent::Send(buffer.freeze()));
    }

    /// Open an outbound subnegotiation block for `option`.
    pub fn begin_subnegotiation(&mut self, option: TelnetOption) {
        if let Some((open, _)) = &self.outbound_subnegotiation {
            let description = format!("begin {} while {} is open", option, open);
            self.framing_warning(option, description);
            return;
        }
        let mut buffer = BytesMut::with_capacity(16);
        buffer.put_slice(&[consts::IAC, consts::SB, option.to_u8()]);
        self.outbound_subnegotiation = Some((option, buffer));
    }

    /// Append payload to the open subnegotiation block, escaping `IAC`.
    pub fn write_payload(&mut self, payload: &[u8]) {
        match &mut self.outbound_subnegotiation {
            Some((_, buffer)) => escape_data(payload, buffer),
            None => self.framing_warning(
                TelnetOption::Unknown(0),
                "payload without an open block".to_string(),
            ),
        }
    }

    /// Close the open subnegotiation block and queue it as one [`TelnetEvent::Send`].
    pub fn end_subnegotiation(&mut self) {
        match self.outbound_subnegotiation.take() {
            Some((_, mut buffer)) => {
                buffer.put_slice(&[consts::IAC, consts::SE]);
                self.pending.push_back(TelnetEvent::Send(buffer.freeze()));
            }
            None => self.framing_warning(
                TelnetOption::Unknown(0),
                "end without an open block".to_string(),
            ),
        }
    }

    fn framing_warning(&mut self, option: TelnetOption, description: String) {
        warn!("Subnegotiation framing misuse: {}", description);
        self.pending
            .push_back(TelnetEvent::Warning(CodecError::SubnegotiationError {
                option: Some(option.to_u8()),
                reason: SubnegotiationErrorKind::Unbalanced { description },
            }));
    }

    fn queue_frame(&mut self, frame: &TelnetFrame) {
        let mut buffer = BytesMut::with_capacity(3);
        write_frame(frame, &mut buffer);
        self.pending.push_back(TelnetEvent::Send(buffer.freeze()));
    }

    fn queue_event(&mut self, event: TelnetEvent) {
        self.pending.push_back(event);
    }

    /// Run one input byte through the decoder state machine.
    fn step(&mut self, byte: u8) {
        match (self.decoder_state, byte) {
            (DecoderState::NormalData, consts::IAC) => {
                self.decoder_state = DecoderState::InterpretAsCommand;
            }
            (DecoderState::NormalData, _) => {
                if byte > 0x7F && !self.options.remote_enabled(TelnetOption::TransmitBinary) {
                    trace!("Non-ASCII byte 0x{:02X} without BINARY", byte);
                }
                self.queue_event(TelnetEvent::Data(byte));
            }
            (DecoderState::InterpretAsCommand, _) => {
                self.decoder_state = DecoderState::NormalData;
                match byte {
                    consts::IAC => self.queue_event(TelnetEvent::Data(consts::IAC)),
                    consts::NOP => self.queue_event(TelnetEvent::NoOperation),
                    consts::DM => self.queue_event(TelnetEvent::DataMark),
                    consts::BRK => self.queue_event(TelnetEvent::Break),
                    consts::IP => self.queue_event(TelnetEvent::InterruptProcess),
                    consts::AO => self.queue_event(TelnetEvent::AbortOutput),
                    consts::AYT => self.queue_event(TelnetEvent::AreYouThere),
                    consts::EC => self.queue_event(TelnetEvent::EraseCharacter),
                    consts::EL => self.queue_event(TelnetEvent::EraseLine),
                    consts::GA => self.queue_event(TelnetEvent::GoAhead),
                    consts::EOR => self.queue_event(TelnetEvent::EndOfRecord),
                    consts::DO => self.decoder_state = DecoderState::NegotiateDo,
                    consts::DONT => self.decoder_state = DecoderState::NegotiateDont,
                    consts::WILL => self.decoder_state = DecoderState::NegotiateWill,
                    consts::WONT => self.decoder_state = DecoderState::NegotiateWont,
                    consts::SB => self.decoder_state = DecoderState::Subnegotiate,
                    _ => {
                        warn!("Received Unknown Command {:#X}", byte);
                        self.queue_event(TelnetEvent::Warning(CodecError::UnknownCommand(byte)));
                    }
                }
            }
            (DecoderState::NegotiateDo, _) => {
                self.decoder_state = DecoderState::NormalData;
                self.receive_negotiation(Negotiation::Do, TelnetOption::from_u8(byte));
            }
            (DecoderState::NegotiateDont, _) => {
                self.decoder_state = DecoderState::NormalData;
                self.receive_negotiation(Negotiation::Dont, TelnetOption::from_u8(byte));
            }
            (DecoderState::NegotiateWill, _) => {
                self.decoder_state = DecoderState::NormalData;
                self.receive_negotiation(Negotiation::Will, TelnetOption::from_u8(byte));
            }
            (DecoderState::NegotiateWont, _) => {
                self.decoder_state = DecoderState::NormalData;
                self.receive_negotiation(Negotiation::Wont, TelnetOption::from_u8(byte));
            }
            (DecoderState::Subnegotiate, _) => {
                self.decoder_buffer.clear();
                self.decoder_state = DecoderState::SubnegotiateArgument(byte);
            }
            (DecoderState::SubnegotiateArgument(option), consts::IAC) => {
                self.decoder_state = DecoderState::SubnegotiateArgumentIAC(option);
            }
            (DecoderState::SubnegotiateArgument(option), _) => {
                self.push_subnegotiation_byte(option, byte);
            }
            (DecoderState::SubnegotiateArgumentIAC(option), consts::IAC) => {
                self.decoder_state = DecoderState::SubnegotiateArgument(option);
                self.push_subnegotiation_byte(option, consts::IAC);
            }
            (DecoderState::SubnegotiateArgumentIAC(option), consts::SE) => {
                self.decoder_state = DecoderState::NormalData;
                let payload = self.decoder_buffer.split().freeze();
                self.queue_event(TelnetEvent::Subnegotiation(
                    TelnetOption::from_u8(option),
                    payload,
                ));
            }
            (DecoderState::SubnegotiateArgumentIAC(option), _) => {
                // Abandon the block and treat the byte as the command it names.
                warn!(
                    "Received Unknown or invalid Command during Subnegotiation {:#X}. Aborting",
                    byte
                );
                self.decoder_buffer.clear();
                self.queue_event(TelnetEvent::Warning(CodecError::SubnegotiationError {
                    option: Some(option),
                    reason: SubnegotiationErrorKind::InvalidCommand { command: byte },
                }));
                self.decoder_state = DecoderState::InterpretAsCommand;
                self.step(byte);
            }
        }
    }

    fn push_subnegotiation_byte(&mut self, option: u8, byte: u8) {
        if self.decoder_buffer.len() >= self.max_subnegotiation_length {
            self.decoder_buffer.clear();
            self.decoder_state = DecoderState::NormalData;
            self.queue_event(TelnetEvent::Error(CodecError::SubnegotiationError {
                option: Some(option),
                reason: SubnegotiationErrorKind::Overflow {
                    limit: self.max_subnegotiation_length,
                },
            }));
            return;
        }
        self.decoder_buffer.put_u8(byte);
    }

    /// Feed a peer negotiation command through the Q-method. Replies are queued before the
    /// event, and an event is only produced when the option's enabled state changes.
    fn receive_negotiation(&mut self, command: Negotiation, option: TelnetOption) {
        let local = matches!(command, Negotiation::Do | Negotiation::Dont);
        let was_enabled = self.enabled(local, option);
        let Outcome { reply, violation } = match command {
            Negotiation::Do => self.options.recv_do(option),
            Negotiation::Dont => self.options.recv_dont(option),
            Negotiation::Will => self.options.recv_will(option),
            Negotiation::Wont => self.options.recv_wont(option),
        };
        let is_enabled = self.enabled(local, option);

        if let Some(reason) = violation {
            warn!("Negotiation violation on {}: {}", option, reason);
            self.queue_event(TelnetEvent::Warning(CodecError::NegotiationError {
                reason: reason.into(),
                frame_type: Some(format!("{:?} {}", command, option)),
            }));
        }
        if let Some(frame) = reply {
            self.queue_frame(&frame);
        }
        if was_enabled != is_enabled {
            let event = match (local, is_enabled) {
                (true, true) => TelnetEvent::Do(option),
                (true, false) => TelnetEvent::Dont(option),
                (false, true) => TelnetEvent::Will(option),
                (false, false) => TelnetEvent::Wont(option),
            };
            self.queue_event(event);
        }
    }

    fn enabled(&self, local: bool, option: TelnetOption) -> bool {
        if local {
            self.options.local_enabled(option)
        } else {
            self.options.remote_enabled(option)
        }
    }
}

impl Default for TelnetCodec {
    fn default() -> Self {
        TelnetCodec::with_table(NegotiationTable::default())
    }
}

impl Decoder for TelnetCodec {
    type Item = TelnetEvent;
    type Error = CodecError;

    /// Hands out the next event, consuming input from `src` only when none is queued.
    ///
    /// Bytes are consumed one at a time, so the sequence of events produced for a stream
    /// does not depend on how the stream was split into chunks. Protocol problems are
    /// reported in-band as [`TelnetEvent::Warning`] or [`TelnetEvent::Error`]; the
    /// `Err` side is never used.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<TelnetEvent>, Self::Error> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if !src.has_remaining() {
                return Ok(None);
            }
            let byte = src.get_u8();
            self.step(byte);
        }
    }
}

impl<'a> Encoder<&'a [u8]> for TelnetCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        escape_data(item, dst);
        Ok(())
    }
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = CodecError;

    /// Encodes a `TelnetFrame` into its wire form, escaping `IAC` in data and payloads.
    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_frame(&item, dst);
        Ok(())
    }
}

fn escape_data(data: &[u8], dst: &mut BytesMut) {
    dst.reserve(data.len());
    for &byte in data {
        if byte == consts::IAC {
            dst.put_u8(consts::IAC);
        }
        dst.put_u8(byte);
    }
}

fn escape_text(text: &[u8], dst: &mut BytesMut) {
    dst.reserve(text.len());
    let mut bytes = text.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        match byte {
            consts::IAC => dst.put_slice(&[consts::IAC, consts::IAC]),
            consts::CR if bytes.peek() == Some(&consts::LF) => {
                bytes.next();
                dst.put_slice(&[consts::CR, consts::LF]);
            }
            consts::CR => dst.put_slice(&[consts::CR, consts::NUL]),
            consts::LF => dst.put_slice(&[consts::CR, consts::LF]),
            _ => dst.put_u8(byte),
        }
    }
}

fn write_command(command: u8, dst: &mut BytesMut) {
    dst.reserve(2);
    dst.put_u8(consts::IAC);
    dst.put_u8(command);
}

fn write_negotiation(command: u8, option: TelnetOption, dst: &mut BytesMut) {
    dst.reserve(3);
    dst.put_u8(consts::IAC);
    dst.put_u8(command);
    dst.put_u8(option.to_u8());
}

fn write_frame(frame: &TelnetFrame, dst: &mut BytesMut) {
    match frame {
        TelnetFrame::Data(byte) => escape_data(&[*byte], dst),
        TelnetFrame::NoOperation => write_command(consts::NOP, dst),
        TelnetFrame::DataMark => write_command(consts::DM, dst),
        TelnetFrame::Break => write_command(consts::BRK, dst),
        TelnetFrame::InterruptProcess => write_command(consts::IP, dst),
        TelnetFrame::AbortOutput => write_command(consts::AO, dst),
        TelnetFrame::AreYouThere => write_command(consts::AYT, dst),
        TelnetFrame::EraseCharacter => write_command(consts::EC, dst),
        TelnetFrame::EraseLine => write_command(consts::EL, dst),
        TelnetFrame::GoAhead => write_command(consts::GA, dst),
        TelnetFrame::EndOfRecord => write_command(consts::EOR, dst),
        TelnetFrame::Do(option) => write_negotiation(consts::DO, *option, dst),
        TelnetFrame::Dont(option) => write_negotiation(consts::DONT, *option, dst),
        TelnetFrame::Will(option) => write_negotiation(consts::WILL, *option, dst),
        TelnetFrame::Wont(option) => write_negotiation(consts::WONT, *option, dst),
        TelnetFrame::Subnegotiate(option, payload) => {
            dst.reserve(payload.len() + 5);
            dst.put_slice(&[consts::IAC, consts::SB, option.to_u8()]);
            escape_data(payload, dst);
            dst.put_slice(&[consts::IAC, consts::SE]);
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum DecoderState {
    NormalData,
    InterpretAsCommand,
    NegotiateDo,
    NegotiateDont,
    NegotiateWill,
    NegotiateWont,
    Subnegotiate,
    SubnegotiateArgument(u8),
    SubnegotiateArgumentIAC(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{DO, DONT, IAC, SB, SE, WILL, WONT};
    use bytes::Bytes;

    fn decode_all(codec: &mut TelnetCodec, input: &[u8]) -> Vec<TelnetEvent> {
        let mut buffer = BytesMut::from(input);
        let mut events = Vec::new();
        while let Some(event) = codec.decode(&mut buffer).unwrap() {
            events.push(event);
        }
        events
    }

    fn send(bytes: &'static [u8]) -> TelnetEvent {
        TelnetEvent::Send(Bytes::from_static(bytes))
    }

    #[test]
    fn test_data_and_escaped_iac() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, &[b'a', IAC, IAC, b'b']);
        assert_eq!(
            events,
            vec![
                TelnetEvent::Data(b'a'),
                TelnetEvent::Data(IAC),
                TelnetEvent::Data(b'b')
            ]
        );
    }

    #[test]
    fn test_peer_do_for_offered_option_replies_before_event() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, &[IAC, DO, consts::option::SGA]);
        assert_eq!(
            events,
            vec![
                send(&[IAC, WILL, consts::option::SGA]),
                TelnetEvent::Do(TelnetOption::SuppressGoAhead),
            ]
        );
        assert!(codec.is_enabled_local(TelnetOption::SuppressGoAhead));
    }

    #[test]
    fn test_peer_do_after_our_will_completes_silently() {
        let mut codec = TelnetCodec::new();
        codec.negotiate(Negotiation::Will, TelnetOption::Charset);
        assert_eq!(codec.poll_event(), Some(send(&[IAC, WILL, 42])));
        let events = decode_all(&mut codec, &[IAC, DO, 42]);
        assert_eq!(events, vec![TelnetEvent::Do(TelnetOption::Charset)]);
    }

    #[test]
    fn test_unsupported_option_is_refused_without_event() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, &[IAC, DO, consts::option::ECHO]);
        assert_eq!(events, vec![send(&[IAC, WONT, consts::option::ECHO])]);
        let events = decode_all(&mut codec, &[IAC, WILL, consts::option::NAWS]);
        assert_eq!(events, vec![send(&[IAC, DONT, consts::option::NAWS])]);
    }

    #[test]
    fn test_peer_refusal_of_offer_produces_no_event() {
        let mut codec = TelnetCodec::new();
        codec.negotiate(Negotiation::Do, TelnetOption::TransmitBinary);
        codec.poll_event();
        let events = decode_all(&mut codec, &[IAC, WONT, consts::option::BINARY]);
        assert!(events.is_empty());
        assert!(!codec.is_enabled_remote(TelnetOption::TransmitBinary));
    }

    #[test]
    fn test_enabled_option_disabled_by_peer() {
        let mut codec = TelnetCodec::new();
        decode_all(&mut codec, &[IAC, WILL, consts::option::SGA]);
        let events = decode_all(&mut codec, &[IAC, WONT, consts::option::SGA]);
        assert_eq!(
            events,
            vec![
                send(&[IAC, DONT, consts::option::SGA]),
                TelnetEvent::Wont(TelnetOption::SuppressGoAhead),
            ]
        );
    }

    #[test]
    fn test_negotiate_unoffered_option_warns() {
        let mut codec = TelnetCodec::new();
        codec.negotiate(Negotiation::Will, TelnetOption::Echo);
        assert!(matches!(
            codec.poll_event(),
            Some(TelnetEvent::Warning(CodecError::NegotiationError { .. }))
        ));
        assert!(!codec.has_pending());
    }

    #[test]
    fn test_subnegotiation_payload() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            &[IAC, SB, 42, 2, b'U', IAC, IAC, b'8', IAC, SE, b'x'],
        );
        assert_eq!(
            events,
            vec![
                TelnetEvent::Subnegotiation(
                    TelnetOption::Charset,
                    Bytes::from_static(&[2, b'U', IAC, b'8'])
                ),
                TelnetEvent::Data(b'x'),
            ]
        );
    }

    #[test]
    fn test_subnegotiation_overflow_is_fatal() {
        let mut codec = TelnetCodec::new().with_max_subnegotiation_length(4);
        let events = decode_all(&mut codec, &[IAC, SB, 42, 1, 2, 3, 4, 5]);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_fatal());
        assert_eq!(
            events[0],
            TelnetEvent::Error(CodecError::SubnegotiationError {
                option: Some(42),
                reason: SubnegotiationErrorKind::Overflow { limit: 4 },
            })
        );
    }

    #[test]
    fn test_unknown_command_warns() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, &[IAC, 0x10, b'z']);
        assert_eq!(
            events,
            vec![
                TelnetEvent::Warning(CodecError::UnknownCommand(0x10)),
                TelnetEvent::Data(b'z')
            ]
        );
    }

    #[test]
    fn test_command_inside_subnegotiation_aborts_block() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, &[IAC, SB, 42, 2, IAC, consts::NOP, b'k']);
        assert_eq!(
            events,
            vec![
                TelnetEvent::Warning(CodecError::SubnegotiationError {
                    option: Some(42),
                    reason: SubnegotiationErrorKind::InvalidCommand {
                        command: consts::NOP
                    },
                }),
                TelnetEvent::NoOperation,
                TelnetEvent::Data(b'k'),
            ]
        );
    }

    #[test]
    fn test_send_escapes_iac() {
        let mut codec = TelnetCodec::new();
        codec.send(&[1, IAC, 2]);
        assert_eq!(codec.poll_event(), Some(send(&[1, IAC, IAC, 2])));
        codec.send(&[]);
        assert!(!codec.has_pending());
    }

    #[test]
    fn test_send_text_newlines() {
        let mut codec = TelnetCodec::new();
        codec.send_text(b"a\nb\r\nc\rd");
        assert_eq!(codec.poll_event(), Some(send(b"a\r\nb\r\nc\r\0d")));
    }

    #[test]
    fn test_outbound_subnegotiation_block() {
        let mut codec = TelnetCodec::new();
        codec.begin_subnegotiation(TelnetOption::Charset);
        codec.write_payload(&[consts::charset::REQUEST]);
        codec.write_payload(b" UTF-8");
        codec.write_payload(&[IAC]);
        codec.end_subnegotiation();
        assert_eq!(
            codec.poll_event(),
            Some(send(&[
                IAC, SB, 42, 1, b' ', b'U', b'T', b'F', b'-', b'8', IAC, IAC, IAC, SE
            ]))
        );
    }

    #[test]
    fn test_unbalanced_subnegotiation_framing_warns() {
        let mut codec = TelnetCodec::new();
        codec.end_subnegotiation();
        codec.write_payload(b"x");
        codec.begin_subnegotiation(TelnetOption::Charset);
        codec.begin_subnegotiation(TelnetOption::GMCP);
        let warnings: Vec<_> = std::iter::from_fn(|| codec.poll_event()).collect();
        assert_eq!(warnings.len(), 3);
        assert!(warnings
            .iter()
            .all(|event| matches!(event, TelnetEvent::Warning(_))));
        // The first block is still open and can be completed.
        codec.end_subnegotiation();
        assert_eq!(codec.poll_event(), Some(send(&[IAC, SB, 42, IAC, SE])));
    }

    #[test]
    fn test_encode_frames() {
        let mut codec = TelnetCodec::new();
        let mut buffer = BytesMut::new();
        codec.encode(TelnetFrame::Data(IAC), &mut buffer).unwrap();
        codec
            .encode(TelnetFrame::Will(TelnetOption::Charset), &mut buffer)
            .unwrap();
        codec
            .encode(
                TelnetFrame::Subnegotiate(TelnetOption::Charset, Bytes::from_static(&[2])),
                &mut buffer,
            )
            .unwrap();
        codec.encode(&b"ok"[..], &mut buffer).unwrap();
        assert_eq!(
            &buffer[..],
            &[IAC, IAC, IAC, WILL, 42, IAC, SB, 42, 2, IAC, SE, b'o', b'k']
        );
    }
}
