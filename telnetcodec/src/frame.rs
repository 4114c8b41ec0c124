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

use crate::TelnetOption;
use bytes::Bytes;

/// Wire level telnet frame, as written by the encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetFrame {
    /// A single application byte. `IAC` is escaped when encoded.
    Data(u8),
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
    /// End of Record
    EndOfRecord,
    /// Ask the receiver to perform an option.
    Do(TelnetOption),
    /// Ask the receiver to stop performing an option.
    Dont(TelnetOption),
    /// Offer to perform an option.
    Will(TelnetOption),
    /// Refuse to perform an option.
    Wont(TelnetOption),
    /// Complete subnegotiation block with its unescaped payload.
    Subnegotiate(TelnetOption, Bytes),
}
