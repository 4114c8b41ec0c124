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

//! Line framing over decoded telnet data

use crate::EngineError;
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// Splits the receive accumulator into newline-terminated lines.
///
/// Each line is returned without its `\n`, and without a single `\r` before it. A partial
/// tail stays in the accumulator until more data arrives. A line whose content is longer
/// than the limit is an error, whether or not its newline has arrived yet.
#[derive(Debug, Clone)]
pub struct LineFramer {
    max_length: usize,
    /// Bytes of the current tail already scanned for a newline
    scanned: usize,
}

impl LineFramer {
    /// Framer rejecting lines longer than `max_length` bytes.
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            scanned: 0,
        }
    }

    /// Configured maximum line length
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Decoder for LineFramer {
    type Item = BytesMut;
    type Error = EngineError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, EngineError> {
        let unscanned = &src[self.scanned.min(src.len())..];
        match unscanned.iter().position(|&byte| byte == b'\n') {
            Some(offset) => {
                let newline = self.scanned + offset;
                self.scanned = 0;
                if content_length(&src[..newline]) > self.max_length {
                    return Err(EngineError::LineTooLong {
                        limit: self.max_length,
                    });
                }
                let mut line = src.split_to(newline);
                src.advance(1);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                Ok(Some(line))
            }
            None if content_length(src) > self.max_length => Err(EngineError::LineTooLong {
                limit: self.max_length,
            }),
            None => {
                self.scanned = src.len();
                Ok(None)
            }
        }
    }
}

/// Length of a line without the single `\r` that may end it
fn content_length(line: &[u8]) -> usize {
    match line.last() {
        Some(&b'\r') => line.len() - 1,
        _ => line.len(),
    }
}
