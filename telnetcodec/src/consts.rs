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

//! Telnet wire constants ([RFC854](https://tools.ietf.org/html/rfc854))

/// Null
pub const NUL: u8 = 0;
/// Line Feed
pub const LF: u8 = 10;
/// Carriage Return
pub const CR: u8 = 13;

/// End of Record
pub const EOR: u8 = 239;
/// End of subnegotiation parameters.
pub const SE: u8 = 240;
/// No operation.
pub const NOP: u8 = 241;
/// The data stream portion of a Synch.
pub const DM: u8 = 242;
/// NVT character BRK.
pub const BRK: u8 = 243;
/// Interrupt Process.
pub const IP: u8 = 244;
/// Abort output.
pub const AO: u8 = 245;
/// Are You There.
pub const AYT: u8 = 246;
/// Erase character.
pub const EC: u8 = 247;
/// Erase line.
pub const EL: u8 = 248;
/// Go ahead.
pub const GA: u8 = 249;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Sender wants to begin performing an option.
pub const WILL: u8 = 251;
/// Sender refuses to perform an option.
pub const WONT: u8 = 252;
/// Sender asks the receiver to perform an option.
pub const DO: u8 = 253;
/// Sender asks the receiver to stop performing an option.
pub const DONT: u8 = 254;
/// Interpret As Command.
pub const IAC: u8 = 255;

/// Option codes for the options this codec names.
pub mod option {
    /// Binary Transmission [RFC856](https://tools.ietf.org/html/rfc856)
    pub const BINARY: u8 = 0;
    /// Echo [RFC857](https://tools.ietf.org/html/rfc857)
    pub const ECHO: u8 = 1;
    /// Suppress Go Ahead [RFC858](https://tools.ietf.org/html/rfc858)
    pub const SGA: u8 = 3;
    /// Status [RFC859](https://tools.ietf.org/html/rfc859)
    pub const STATUS: u8 = 5;
    /// Timing Mark [RFC860](https://tools.ietf.org/html/rfc860)
    pub const TM: u8 = 6;
    /// Terminal Type [RFC1091](https://tools.ietf.org/html/rfc1091)
    pub const TTYPE: u8 = 24;
    /// End of Record [RFC885](https://tools.ietf.org/html/rfc885)
    pub const EOR: u8 = 25;
    /// Negotiate About Window Size [RFC1073](https://tools.ietf.org/html/rfc1073)
    pub const NAWS: u8 = 31;
    /// Linemode [RFC1184](https://tools.ietf.org/html/rfc1184)
    pub const LINEMODE: u8 = 34;
    /// New Environment [RFC1572](https://tools.ietf.org/html/rfc1572)
    pub const NEW_ENVIRONMENT: u8 = 39;
    /// Charset [RFC2066](https://tools.ietf.org/html/rfc2066)
    pub const CHARSET: u8 = 42;
    /// Mud Server Data Protocol
    pub const MSDP: u8 = 69;
    /// Mud Server Status Protocol
    pub const MSSP: u8 = 70;
    /// Mud Client Compression Protocol v2
    pub const COMPRESS2: u8 = 86;
    /// Generic Mud Communication Protocol
    pub const GMCP: u8 = 201;
}

/// CHARSET subnegotiation codes ([RFC2066](https://tools.ietf.org/html/rfc2066))
pub mod charset {
    /// Sender requests one of the listed character sets.
    pub const REQUEST: u8 = 1;
    /// Receiver accepts the named character set.
    pub const ACCEPTED: u8 = 2;
    /// Receiver accepts none of the offered character sets.
    pub const REJECTED: u8 = 3;
    /// Translation table follows.
    pub const TTABLE_IS: u8 = 4;
    /// Translation table was refused.
    pub const TTABLE_REJECTED: u8 = 5;
    /// Translation table acknowledged.
    pub const TTABLE_ACK: u8 = 6;
    /// Translation table was not received correctly.
    pub const TTABLE_NAK: u8 = 7;
}
