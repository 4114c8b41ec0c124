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

//! # WhatMUD Telnet Protocol Codec
//!
//! A stateful, byte-oriented implementation of the Telnet protocol (RFC 854) for use with
//! `tokio_util::codec`. One [`TelnetCodec`] serves one connection.
//!
//! ## Overview
//!
//! - **Data transmission**: raw bytes with `IAC` escaping, plus NVT newline handling for text
//! - **Control commands**: Break, Interrupt Process, Abort Output, etc.
//! - **Option negotiation**: DO, DONT, WILL, WONT, run through the RFC 1143 Q-method
//!   against a fixed [`NegotiationTable`]
//! - **Subnegotiation**: inbound payload collection and outbound block framing
//!
//! ## Events
//!
//! Everything the codec produces is a [`TelnetEvent`], in order. Outbound bytes (negotiation
//! replies as well as escaped application data) appear as [`TelnetEvent::Send`] and must be
//! written to the peer verbatim by the owner of the socket. Nothing in this crate performs
//! I/O.
//!
//! ```rust
//! use whatmud_telnetcodec::{Negotiation, TelnetCodec, TelnetEvent, TelnetOption};
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut codec = TelnetCodec::new();
//! for entry in codec.table().clone().iter() {
//!     codec.negotiate(Negotiation::Will, entry.option);
//! }
//!
//! // Peer: "hi" followed by DO CHARSET
//! let mut input = BytesMut::from(&b"hi\xFF\xFD\x2A"[..]);
//! while let Some(event) = codec.decode(&mut input).unwrap() {
//!     match event {
//!         TelnetEvent::Send(bytes) => { /* write to socket */ }
//!         TelnetEvent::Data(byte) => println!("Received: {}", byte as char),
//!         TelnetEvent::Do(TelnetOption::Charset) => codec.request_charsets(&["UTF-8"]),
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Related RFCs
//!
//! - RFC 854: Telnet Protocol Specification
//! - RFC 856: Telnet Binary Transmission
//! - RFC 858: Telnet Suppress Go Ahead Option
//! - RFC 1143: The Q Method of Implementing TELNET Option Negotiation
//! - RFC 2066: TELNET CHARSET Option

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod charset;
mod codec;
pub mod consts;
mod event;
mod frame;
mod options;
mod result;

pub use self::charset::CharsetResponse;
pub use self::codec::{DEFAULT_MAX_SUBNEGOTIATION_LENGTH, TelnetCodec};
pub use self::event::TelnetEvent;
pub use self::frame::TelnetFrame;
pub use self::options::{
    LocalStance, Negotiation, NegotiationTable, RemoteStance, TelnetOption, TelnetOptions, Telopt,
};
pub use self::result::{CodecError, CodecResult, SubnegotiationErrorKind};
