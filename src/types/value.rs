//! Typed Values
//!
//! Closed set of scalar variants stored by the repository.

use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Conversion failure between value variants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot cast {value:?} to {target}")]
pub struct CastError {
    pub value: String,
    pub target: ValueKind,
}

impl CastError {
    fn new(value: impl Into<String>, target: ValueKind) -> Self {
        Self {
            value: value.into(),
            target,
        }
    }
}

/// Variant tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Float,
    String,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::String => write!(f, "string"),
        }
    }
}

/// Stored value
///
/// Immutable once constructed. Numeric-looking input is classified by
/// [`detect_type`], everything else is kept as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
        }
    }

    /// Canonical textual form, never fails
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Integer(i) => Cow::Owned(i.to_string()),
            Value::Float(f) => Cow::Owned(f.to_string()),
            Value::String(s) => Cow::Borrowed(s),
        }
    }

    /// Integer view of the value
    ///
    /// Floats are truncated toward zero; non-finite or out-of-range floats
    /// and non-integer text are not castable.
    pub fn as_int(&self) -> Result<i64, CastError> {
        match self {
            Value::Integer(i) => Ok(*i),
            Value::Float(f) => {
                if f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Ok(f.trunc() as i64)
                } else {
                    Err(CastError::new(f.to_string(), ValueKind::Integer))
                }
            }
            Value::String(s) => s
                .parse::<i64>()
                .map_err(|_| CastError::new(s.as_str(), ValueKind::Integer)),
        }
    }

    /// Floating-point view of the value
    pub fn as_float(&self) -> Result<f64, CastError> {
        match self {
            Value::Integer(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::String(s) => s
                .parse::<f64>()
                .map_err(|_| CastError::new(s.as_str(), ValueKind::Float)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Classify raw input as the best-fitting variant
///
/// Integer is tried first, then float, and text is the fallback, so
/// classification never fails.
pub fn detect_type(input: &str) -> Value {
    if let Ok(i) = input.parse::<i64>() {
        return Value::Integer(i);
    }

    if let Ok(f) = input.parse::<f64>() {
        return Value::Float(f);
    }

    Value::String(input.to_string())
}
