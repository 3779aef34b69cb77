//! Error types for Veneer core.

use std::fmt;

use crate::value::Cid;

/// Errors from the object registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The explicit id is already registered to a live object.
    IdInUse(Cid),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdInUse(cid) => write!(f, "Object id '{cid}' is already registered"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// A specialized Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Errors raised by a codec's encode step.
///
/// Decoding is total over whatever the native peer actually returns and does
/// not produce errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The value cannot be encoded by this codec.
    InvalidValue {
        /// The codec's registered name.
        codec: &'static str,
        /// What was wrong with the value.
        message: String,
    },
    /// No codec is registered under the requested name.
    UnknownCodec(String),
}

impl CodecError {
    /// Create an invalid-value error.
    pub fn invalid(codec: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            codec,
            message: message.into(),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { codec, message } => {
                write!(f, "Invalid value for codec '{codec}': {message}")
            }
            Self::UnknownCodec(name) => write!(f, "Unknown codec '{name}'"),
        }
    }
}

impl std::error::Error for CodecError {}

/// A specialized Result type for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;
