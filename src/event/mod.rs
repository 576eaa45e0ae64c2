//! The in-memory event record that LEEF lines are decoded into and encoded from.

mod log_event;
mod value;

pub use log_event::LogEvent;
pub use value::{ObjectMap, Value};
pub(crate) use value::timestamp_to_string;
