//! Value Types
//!
//! Typed scalar values and raw-string classification.

mod value;

pub use value::{detect_type, CastError, Value, ValueKind};
