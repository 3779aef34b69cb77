//! Core systems for Veneer.
//!
//! This crate provides the low-level machinery of the Veneer mobile UI
//! bridge, independent of any widget vocabulary:
//!
//! - **Value Model**: The `Value` union exchanged with the native side
//! - **Proxy Store**: The cid-to-object registry for event dispatch
//! - **Bridge**: The operation queue with set-merging and a property cache
//! - **Codecs**: Declarative encoders/decoders for property values
//!
//! # Bridge Example
//!
//! ```
//! use veneer_core::{NativeBridge, RecordingPeer, Cid, Value, ValueMap};
//!
//! let peer = RecordingPeer::new();
//! let bridge = NativeBridge::new(Box::new(peer.clone()));
//!
//! // Queue a create and a couple of property updates.
//! let cid = Cid::new("o1");
//! bridge.create(&cid, "Button", ValueMap::new());
//! bridge.set(&cid, [("text".to_string(), Value::from("OK"))].into());
//! bridge.set(&cid, [("visible".to_string(), Value::from(true))].into());
//!
//! // Nothing has reached the native side yet; flush sends the whole batch,
//! // with the consecutive sets folded into the create.
//! bridge.flush();
//! assert_eq!(peer.calls().len(), 1);
//! ```
//!
//! # Codec Example
//!
//! ```
//! use veneer_core::{CodecRegistry, PropertyType, Value};
//!
//! let codecs = CodecRegistry::with_builtins();
//! let color = codecs.resolve(&PropertyType::named("color")).unwrap();
//!
//! let wire = color.encode(&Value::from("#ff0000")).unwrap();
//! assert_eq!(wire, Value::List(vec![
//!     Value::Int(255), Value::Int(0), Value::Int(0), Value::Int(255),
//! ]));
//! ```

mod bridge;
pub mod codec;
mod error;
pub mod logging;
mod registry;
mod value;

pub use bridge::{NativeBridge, NativePeer, Operation, PeerCall, RecordingPeer};
pub use codec::{Codec, CodecRegistry, PropertyType, ResolvedCodec};
pub use error::{CodecError, CodecResult, RegistryError, RegistryResult};
pub use registry::{NativeBacked, ProxyStore};
pub use value::{Cid, Value, ValueMap};
