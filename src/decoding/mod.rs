//! A collection of support structures that are used in the process of decoding
//! bytes into events.

mod decoder;
pub mod format;
pub mod framing;

pub use decoder::Decoder;
pub use format::{
    Deserializer, LeefDecodeError, LeefDeserializer, LeefDeserializerConfig,
    LeefDeserializerOptions, LeefHeader, LeefMessage,
};
pub use framing::{
    BoxedFramingError, FramingError, NewlineDelimitedDecoder, NewlineDelimitedDecoderConfig,
    NewlineDelimitedDecoderOptions,
};

/// An error that occurs while decoding a stream.
pub trait StreamDecodingError {
    /// Whether it is reasonable to assume that continuing to read from the
    /// stream in which this error occurred will not result in an indefinite
    /// hang up.
    ///
    /// This can occur e.g. when reading the header of a length-delimited codec
    /// failed and it can no longer be determined where the next header starts.
    fn can_continue(&self) -> bool;
}

/// An error that occurred while decoding structured events from a byte stream /
/// byte messages.
#[derive(Debug)]
pub enum Error {
    /// The error occurred while producing byte frames from the byte stream /
    /// byte messages.
    FramingError(BoxedFramingError),
    /// The error occurred while parsing structured events from a byte frame.
    ParsingError(crate::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FramingError(error) => write!(formatter, "FramingError({error})"),
            Self::ParsingError(error) => write!(formatter, "ParsingError({error})"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::FramingError(Box::new(error))
    }
}

impl StreamDecodingError for Error {
    fn can_continue(&self) -> bool {
        match self {
            Self::FramingError(error) => error.can_continue(),
            Self::ParsingError(_) => true,
        }
    }
}
