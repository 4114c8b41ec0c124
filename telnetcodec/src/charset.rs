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

//! CHARSET option helpers ([RFC2066](https://tools.ietf.org/html/rfc2066))

use crate::consts::charset::{ACCEPTED, REJECTED, REQUEST, TTABLE_IS};
use crate::{TelnetCodec, TelnetOption};
use bytes::Bytes;

/// Classification of a CHARSET subnegotiation payload received from the peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CharsetResponse {
    /// The peer accepted a character set; the bytes after the status code name it.
    Accepted(Bytes),
    /// The peer accepted none of the offered character sets.
    Rejected,
    /// The peer is itself requesting one of the listed character sets.
    Request(Bytes),
    /// The peer sent a translation table.
    TranslationTable(Bytes),
    /// Any other status code.
    Unrecognized(u8),
    /// Payload carried no status code.
    Empty,
}

impl CharsetResponse {
    /// Classify a payload by its first byte.
    pub fn parse(payload: &Bytes) -> CharsetResponse {
        match payload.first() {
            None => CharsetResponse::Empty,
            Some(&ACCEPTED) => CharsetResponse::Accepted(payload.slice(1..)),
            Some(&REJECTED) => CharsetResponse::Rejected,
            Some(&REQUEST) => CharsetResponse::Request(payload.slice(1..)),
            Some(&TTABLE_IS) => CharsetResponse::TranslationTable(payload.slice(1..)),
            Some(&code) => CharsetResponse::Unrecognized(code),
        }
    }
}

impl TelnetCodec {
    /// Queue a CHARSET `REQUEST` offering `names` in preference order, each preceded by a
    /// space separator.
    ///
    /// # Example
    /// ```
    /// use whatmud_telnetcodec::{TelnetCodec, TelnetEvent};
    ///
    /// let mut codec = TelnetCodec::new();
    /// codec.request_charsets(&["UTF-8"]);
    /// let Some(TelnetEvent::Send(bytes)) = codec.poll_event() else { panic!() };
    /// assert_eq!(&bytes[..], b"\xFF\xFA\x2A\x01 UTF-8\xFF\xF0");
    /// ```
    pub fn request_charsets(&mut self, names: &[&str]) {
        self.begin_subnegotiation(TelnetOption::Charset);
        self.write_payload(&[REQUEST]);
        for name in names {
            self.write_payload(b" ");
            self.write_payload(name.as_bytes());
        }
        self.end_subnegotiation();
    }
}
