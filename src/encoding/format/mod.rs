//! A collection of formats that can be used to convert from structured events
//! to byte frames.

mod leef;

pub use leef::{LeefEncodeError, LeefSerializer, LeefSerializerConfig, LeefSerializerOptions};
