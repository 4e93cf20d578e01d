// src/connection/codec.rs

//! A `tokio_util` codec for the newline-delimited text protocol.

use crate::core::GatewayError;
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// The longest line accepted, terminator excluded.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Splits the byte stream on `\n`, dropping one trailing `\r` if present.
/// Outgoing lines get a single `\n` appended.
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_length: usize,
    /// How far the current buffer has already been scanned for a newline.
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = GatewayError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, GatewayError> {
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');
            let Some(offset) = newline else {
                // A pending `\r` may still turn out to be part of the terminator.
                if src.len() > self.max_length + 1
                    || (src.len() == self.max_length + 1 && src.last() != Some(&b'\r'))
                {
                    return Err(GatewayError::LineTooLong(self.max_length));
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let end = self.next_index + offset;
            self.next_index = 0;
            let mut line = src.split_to(end + 1);
            line.truncate(end);
            if line.last() == Some(&b'\r') {
                line.truncate(end - 1);
            }
            if line.len() > self.max_length {
                return Err(GatewayError::LineTooLong(self.max_length));
            }
            if let Some(line) = utf8_line(&line) {
                return Ok(Some(line));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, GatewayError> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            // A final line without terminator still counts.
            None if !src.is_empty() => {
                self.next_index = 0;
                let line = src.split();
                Ok(utf8_line(&line).map(|l| l.trim_end_matches('\r').to_string()))
            }
            None => Ok(None),
        }
    }
}

/// Lines that are not UTF-8 are dropped; the connection stays usable.
fn utf8_line(line: &[u8]) -> Option<String> {
    match std::str::from_utf8(line) {
        Ok(text) => Some(text.to_string()),
        Err(e) => {
            warn!("Dropping a {}-byte line that is not valid UTF-8: {}", line.len(), e);
            None
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = GatewayError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), GatewayError> {
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
