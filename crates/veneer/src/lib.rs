//! Veneer - a declarative bridge between app code and native mobile widgets.
//!
//! Application code works with [`Proxy`] and [`Widget`] handles; every
//! mutation becomes an operation in a batch queue that is flushed to an
//! opaque native peer, and every read is served from a property cache or a
//! synchronous round-trip. Object types are not subclasses but data: a
//! [`TypeDescriptor`](descriptor::TypeDescriptor) declares properties
//! (with codecs, defaults, and flags), events (with aliases and hooks),
//! and a child policy, resolved once into an immutable
//! [`TypeInfo`](descriptor::TypeInfo).
//!
//! # Example
//!
//! ```
//! use veneer::prelude::*;
//! use veneer_core::RecordingPeer;
//!
//! let context = Context::new(Box::new(RecordingPeer::new()));
//! let button = context.resolve(
//!     TypeDescriptor::new("Button")
//!         .property("text", PropertyDescriptor::new(PropertyType::named("string")).default(""))
//!         .event("select", EventDescriptor::new()),
//! ).unwrap();
//!
//! let ok = Widget::create(&context, button, ValueMap::new()).unwrap();
//! ok.set("text", "OK").unwrap();
//! let _listener = ok.on("select", |event| {
//!     println!("selected: {}", event.target);
//! }).unwrap();
//!
//! context.flush();
//! ```

pub mod context;
pub mod descriptor;
mod error;
pub mod event;
pub mod prelude;
pub mod proxy;
pub mod selector;
pub mod widget;

pub use context::Context;
pub use error::{Error, Result};
pub use event::{Event, ListenerId};
pub use proxy::Proxy;
pub use selector::Selector;
pub use widget::Widget;

// Re-export the core wire and bridge types that users need directly.
pub use veneer_core::{
    Cid, Codec, CodecRegistry, NativeBacked, NativeBridge, NativePeer, Operation, PropertyType,
    Value, ValueMap,
};
