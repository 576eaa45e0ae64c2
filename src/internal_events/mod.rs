//! Events the codecs emit about their own operation.
//!
//! Each event is a plain struct implementing [`InternalEvent`]. Emitting it
//! writes a structured `tracing` record and updates the matching `metrics`
//! counters, so call sites never touch either facade directly.

/// An event describing something the codecs observed.
pub trait InternalEvent: Sized {
    /// Logs the event and records its metrics.
    fn emit(self);
}

/// Emits `event`. Prefer the `emit!` macro.
pub fn emit(event: impl InternalEvent) {
    event.emit();
}

/// Emits an internal event.
macro_rules! emit {
    ($event:expr) => {
        $crate::internal_events::emit($event)
    };
}

/// Values for the `stage` field of error events.
pub mod error_stage {
    /// The error happened while receiving or framing input.
    pub const RECEIVING: &str = "receiving";
    /// The error happened while turning input into events.
    pub const PROCESSING: &str = "processing";
    /// The error happened while turning events into output.
    pub const SENDING: &str = "sending";
}

/// Values for the `error_type` field of error events.
pub mod error_type {
    /// Input could not be parsed.
    pub const PARSER_FAILED: &str = "parser_failed";
    /// An event could not be encoded.
    pub const ENCODER_FAILED: &str = "encoder_failed";
    /// A template could not be rendered.
    pub const TEMPLATE_FAILED: &str = "template_failed";
    /// Reading or writing failed.
    pub const IO_FAILED: &str = "io_failed";
}

// Modules that require emit! macro so they need to be defined after the macro.
mod codecs;
mod template;

pub use self::codecs::*;
pub use self::template::*;
