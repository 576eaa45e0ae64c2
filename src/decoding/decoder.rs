use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;
use tokio_util::codec::Decoder as _;

use super::{BoxedFramingError, Deserializer, Error, LeefDeserializer, NewlineDelimitedDecoder};
use crate::{
    event::LogEvent,
    internal_events::{DecoderDeserializeError, DecoderFramingError, EventsReceived},
};

/// A decoder that can decode structured events from a byte stream / byte
/// messages.
///
/// Lines are framed on newlines and each frame is handed to the deserializer.
#[derive(Debug, Clone, Default)]
pub struct Decoder<D = LeefDeserializer> {
    /// The framer being used.
    framer: NewlineDelimitedDecoder,
    /// The deserializer being used.
    deserializer: D,
}

impl<D: Deserializer> Decoder<D> {
    /// Creates a new `Decoder` with the specified framer to produce byte
    /// frames from the byte stream / byte messages and deserializer to parse
    /// structured events from a byte frame.
    pub const fn new(framer: NewlineDelimitedDecoder, deserializer: D) -> Self {
        Self {
            framer,
            deserializer,
        }
    }

    /// Get a reference to the framer.
    pub const fn framer(&self) -> &NewlineDelimitedDecoder {
        &self.framer
    }

    /// Parses a single frame into events.
    ///
    /// On success the byte length of the frame is returned along with the
    /// events. Failures are reported through internal events before they are
    /// returned.
    pub fn deserializer_parse(
        &self,
        frame: Bytes,
    ) -> Result<(SmallVec<[LogEvent; 1]>, usize), Error> {
        let byte_size = frame.len();

        match self.deserializer.parse(frame) {
            Ok(events) => {
                emit!(EventsReceived {
                    count: events.len(),
                    byte_size,
                });
                Ok((events, byte_size))
            }
            Err(error) => {
                emit!(DecoderDeserializeError { error: &error });
                Err(Error::ParsingError(error))
            }
        }
    }

    /// Handles the framing result and parses it into a structured event, if
    /// possible.
    fn handle_framing_result(
        &self,
        frame: Result<Option<Bytes>, BoxedFramingError>,
    ) -> Result<Option<(SmallVec<[LogEvent; 1]>, usize)>, Error> {
        let frame = frame.map_err(|error| {
            emit!(DecoderFramingError { error: &error });
            Error::FramingError(error)
        })?;

        frame
            .map(|frame| self.deserializer_parse(frame))
            .transpose()
    }
}

impl<D: Deserializer> tokio_util::codec::Decoder for Decoder<D> {
    type Item = (SmallVec<[LogEvent; 1]>, usize);
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let frame = self.framer.decode(buf);
        self.handle_framing_result(frame)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let frame = self.framer.decode_eof(buf);
        self.handle_framing_result(frame)
    }
}
