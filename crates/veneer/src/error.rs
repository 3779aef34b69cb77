//! Error types for the proxy and widget layer.

use veneer_core::{Cid, CodecError, RegistryError};

/// Result type alias for proxy and widget operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the proxy and widget layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operation was attempted on a disposed object.
    #[error("{type_name} '{cid}' is disposed")]
    Disposed { type_name: String, cid: Cid },

    /// A second instance of a singleton type was created.
    #[error("'{0}' is a singleton and already exists")]
    SingletonExists(String),

    /// A write to a read-only property.
    #[error("property '{0}' is read-only")]
    ReadOnly(String),

    /// A custom property setter rejected the value.
    #[error("cannot set property '{property}': {message}")]
    SetterFailed { property: String, message: String },

    /// A child was appended to a parent that cannot contain it.
    #[error("{parent_type} cannot contain {child_type}")]
    CannotContain {
        parent_type: String,
        child_type: String,
    },

    /// Selector parsing error.
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// An explicit object id collided with a live object.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A property value could not be encoded where failure is fatal.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl Error {
    /// Create a setter error.
    pub fn setter_failed(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetterFailed {
            property: property.into(),
            message: message.into(),
        }
    }

    /// Create a selector error.
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }
}
