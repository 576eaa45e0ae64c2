//! A collection of formats that can be used to convert from byte frames to
//! structured events.

mod leef;

use bytes::Bytes;
pub use leef::{
    LeefDecodeError, LeefDeserializer, LeefDeserializerConfig, LeefDeserializerOptions,
    LeefHeader, LeefMessage,
};
use smallvec::SmallVec;

use crate::event::LogEvent;

/// Parse structured events from bytes.
pub trait Deserializer: Send + Sync {
    /// Parses structured events from bytes.
    ///
    /// It returns a `SmallVec` rather than an `Event` directly, since one byte
    /// frame can potentially hold multiple events, e.g. when parsing a JSON
    /// array. However, we optimize the most common case of emitting one event
    /// by not requiring heap allocations for it.
    fn parse(&self, bytes: Bytes) -> crate::Result<SmallVec<[LogEvent; 1]>>;
}

/// Default value for the UTF-8 lossy option.
pub const fn default_lossy() -> bool {
    true
}
