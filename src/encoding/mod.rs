//! A collection of support structures that are used in the process of encoding
//! events into bytes.

pub mod format;

pub use format::{LeefEncodeError, LeefSerializer, LeefSerializerConfig, LeefSerializerOptions};

/// An error that occurred while building an encoder.
pub type BuildError = Box<dyn std::error::Error + Send + Sync + 'static>;
