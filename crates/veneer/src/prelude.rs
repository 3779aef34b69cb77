//! Prelude module for Veneer.
//!
//! Re-exports the types most applications need:
//!
//! ```ignore
//! use veneer::prelude::*;
//! ```

// ============================================================================
// Context and objects
// ============================================================================

pub use crate::context::Context;
pub use crate::proxy::Proxy;
pub use crate::widget::Widget;

// ============================================================================
// Type declaration
// ============================================================================

pub use crate::descriptor::{
    ChildPolicy, DefaultValue, EventDescriptor, PropertyDescriptor, TypeDescriptor, TypeInfo,
};

// ============================================================================
// Events and selectors
// ============================================================================

pub use crate::event::{Event, ListenerId};
pub use crate::selector::Selector;

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{Error, Result};

// ============================================================================
// Core wire types
// ============================================================================

pub use veneer_core::{Cid, PropertyType, Value, ValueMap};
