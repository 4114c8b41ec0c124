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

use crate::{CodecError, TelnetOption};
use bytes::Bytes;

///
/// `TelnetEvent` is what the codec hands to the connection that owns it.
///
/// Events come out of [`Decoder::decode`](tokio_util::codec::Decoder::decode) in input order.
/// Outbound operations on the codec (negotiation, escaped sends, subnegotiation framing)
/// queue [`TelnetEvent::Send`] events on the same queue, so a connection that drains the
/// codec and writes every `Send` verbatim never reorders protocol replies.
///
#[derive(Clone, Debug, PartialEq)]
pub enum TelnetEvent {
    /// Encoded bytes that must be written to the peer verbatim.
    Send(Bytes),
    /// Telnet Data Byte
    Data(u8),
    /// Non-fatal protocol violation.
    Warning(CodecError),
    /// Unrecoverable protocol violation. The connection should be torn down.
    Error(CodecError),
    /// Peer now performs an option.
    Will(TelnetOption),
    /// Peer no longer performs an option.
    Wont(TelnetOption),
    /// We now perform an option at the peer's request.
    Do(TelnetOption),
    /// We no longer perform an option at the peer's request.
    Dont(TelnetOption),
    /// Subnegotiation payload for an option, `IAC IAC` already collapsed.
    Subnegotiation(TelnetOption, Bytes),
    /// No Operation
    NoOperation,
    /// End of urgent Data Stream
    DataMark,
    /// Operator pressed the Break key or the Attention key.
    Break,
    /// Interrupt current process.
    InterruptProcess,
    /// Cancel output from the current process.
    AbortOutput,
    /// Request acknowledgment.
    AreYouThere,
    /// Request that the operator erase the previous character.
    EraseCharacter,
    /// Request that the operator erase the previous line.
    EraseLine,
    /// End of input for half-duplex connections.
    GoAhead,
    /// End of Record - marks the end of a prompt
    EndOfRecord,
}

impl TelnetEvent {
    /// True for [`TelnetEvent::Error`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, TelnetEvent::Error(_))
    }
}
