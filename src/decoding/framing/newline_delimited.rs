use bytes::{Buf, Bytes, BytesMut};
use memchr::memchr;
use serde::{Deserialize, Serialize};
use tokio_util::codec::Decoder;

use super::BoxedFramingError;

/// Config used to build a `NewlineDelimitedDecoder`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NewlineDelimitedDecoderConfig {
    /// Options for the newline delimited decoder.
    #[serde(default, skip_serializing_if = "crate::serde::is_default")]
    pub newline_delimited: NewlineDelimitedDecoderOptions,
}

/// Options for building a `NewlineDelimitedDecoder`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewlineDelimitedDecoderOptions {
    /// The maximum length of the byte buffer.
    ///
    /// This length does *not* include the trailing delimiter. Longer lines are
    /// discarded.
    #[serde(default = "crate::serde::default_max_length")]
    pub max_length: usize,
}

impl Default for NewlineDelimitedDecoderOptions {
    fn default() -> Self {
        Self {
            max_length: crate::serde::default_max_length(),
        }
    }
}

impl NewlineDelimitedDecoderOptions {
    /// Creates a `NewlineDelimitedDecoderOptions` with a maximum frame length limit.
    pub const fn new_with_max_length(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl NewlineDelimitedDecoderConfig {
    /// Creates a new `NewlineDelimitedDecoderConfig`.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a `NewlineDelimitedDecoderConfig` with a maximum frame length limit.
    pub const fn new_with_max_length(max_length: usize) -> Self {
        Self {
            newline_delimited: NewlineDelimitedDecoderOptions::new_with_max_length(max_length),
        }
    }

    /// Build the `NewlineDelimitedDecoder` from this configuration.
    pub const fn build(&self) -> NewlineDelimitedDecoder {
        NewlineDelimitedDecoder::new_with_max_length(self.newline_delimited.max_length)
    }
}

/// A decoder for handling bytes that are delimited by (a) newline(s).
///
/// A `\r` in front of the newline is removed and blank lines are skipped.
#[derive(Debug, Clone)]
pub struct NewlineDelimitedDecoder {
    max_length: usize,
    /// Set while the remainder of an overlong line is being dropped.
    is_discarding: bool,
}

impl NewlineDelimitedDecoder {
    /// Creates a new `NewlineDelimitedDecoder` without a length limit.
    pub const fn new() -> Self {
        Self::new_with_max_length(usize::MAX)
    }

    /// Creates a `NewlineDelimitedDecoder` with a maximum frame length limit.
    ///
    /// Any frames longer than `max_length` bytes will be discarded entirely.
    pub const fn new_with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            is_discarding: false,
        }
    }

    /// Returns the max length of this decoder.
    pub const fn max_length(&self) -> usize {
        self.max_length
    }

    fn discard_warning(&self, buf_len: usize) {
        warn!(
            message = "Discarding frame larger than max_length.",
            buf_len,
            max_length = self.max_length,
        );
    }
}

impl Default for NewlineDelimitedDecoder {
    fn default() -> Self {
        NewlineDelimitedDecoderConfig::new().build()
    }
}

fn trim_carriage_return(mut frame: Bytes) -> Bytes {
    if frame.last() == Some(&b'\r') {
        frame.truncate(frame.len() - 1);
    }
    frame
}

impl Decoder for NewlineDelimitedDecoder {
    type Item = Bytes;
    type Error = BoxedFramingError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match memchr(b'\n', buf) {
                None => {
                    if buf.len() > self.max_length {
                        if !self.is_discarding {
                            self.discard_warning(buf.len());
                        }
                        buf.clear();
                        self.is_discarding = true;
                    }
                    return Ok(None);
                }
                Some(next_delimiter_idx) => {
                    if self.is_discarding {
                        buf.advance(next_delimiter_idx + 1);
                        self.is_discarding = false;
                        continue;
                    }

                    let frame = trim_carriage_return(buf.split_to(next_delimiter_idx).freeze());
                    buf.advance(1);

                    if frame.len() > self.max_length {
                        self.discard_warning(frame.len());
                    } else if !frame.is_empty() {
                        return Ok(Some(frame));
                    }
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }

        if self.is_discarding {
            buf.clear();
            self.is_discarding = false;
            return Ok(None);
        }

        let frame = trim_carriage_return(buf.split().freeze());
        if frame.is_empty() {
            Ok(None)
        } else {
            Ok(Some(frame))
        }
    }
}
