//! Codecs that convert between LEEF (Log Event Extended Format) lines and
//! structured log events.
//!
//! A LEEF line is a pipe-delimited header followed by `key=value` extension
//! pairs:
//!
//! ```text
//! LEEF:1.0|Elastic|Logstash|2.3.3|Logstash|src=10.0.0.1	dst=10.0.0.2
//! ```
//!
//! [`LeefDeserializer`] turns one such line into a [`LogEvent`], and
//! [`LeefSerializer`] renders a [`LogEvent`] back into a line. Both can be
//! plugged into `tokio_util` framed streams through [`decoding::Decoder`] and
//! the [`tokio_util::codec::Encoder`] implementation of the serializer.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

#[macro_use]
mod internal_events;

pub mod app;
pub mod cli;
pub mod config;
pub mod decoding;
pub mod encoding;
pub mod event;
pub mod leef;
pub mod serde;
pub mod template;
pub mod trace;

pub use decoding::{
    Decoder, LeefDecodeError, LeefDeserializer, LeefDeserializerConfig, LeefDeserializerOptions,
    LeefHeader, LeefMessage, NewlineDelimitedDecoder, NewlineDelimitedDecoderConfig,
    StreamDecodingError,
};
pub use encoding::{LeefEncodeError, LeefSerializer, LeefSerializerConfig, LeefSerializerOptions};
pub use event::{LogEvent, Value};
pub use leef::leef_fields;

/// A boxed error that can be sent across threads.
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A result whose error is the crate's boxed [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
