//! The type coding table.
//!
//! Every property declaration names how its values translate to and from
//! the wire: a [`Codec`] exposes `encode` (application value to native
//! value, fallible) and `decode` (native value back, total). Codecs are
//! registered by name in a [`CodecRegistry`]; a property's
//! [`PropertyType`] refers to one by name, by name with static arguments
//! (partially applied to both directions), or inline as an ad hoc codec.
//!
//! Type references are resolved once, at descriptor-registration time, into
//! a [`ResolvedCodec`] — the hot path never re-parses the declaration.
//!
//! The wire shape each built-in codec produces (colors as 0-255 4-tuples,
//! fonts as structured arrays, ...) is a compatibility contract with an
//! existing native peer; see [`builtin`].
//!
//! # Example
//!
//! ```
//! use veneer_core::codec::{CodecRegistry, PropertyType};
//! use veneer_core::Value;
//!
//! let registry = CodecRegistry::with_builtins();
//! let color = registry.resolve(&PropertyType::named("color")).unwrap();
//!
//! let wire = color.encode(&Value::from("#ff0000")).unwrap();
//! assert_eq!(wire.as_list().map(|l| l.len()), Some(4));
//! ```

mod builtin;

pub use builtin::{
    AnyCodec, BooleanCodec, ChoiceCodec, ColorCodec, FontCodec, ImageCodec, IntegerCodec,
    NaturalCodec, NumberCodec, ProxyCodec, StringCodec,
};

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// A named encode/decode pair for one property value shape.
///
/// `encode` validates: a value the codec cannot represent is rejected, and
/// the property-set path abandons that key with a warning ("validate before
/// commit"). `decode` is total over whatever the native peer actually
/// returns; unrecognized shapes pass through unchanged.
pub trait Codec: Send + Sync {
    /// The codec's name, for diagnostics.
    fn name(&self) -> &'static str {
        "custom"
    }

    /// Translate an application value to its native wire shape.
    fn encode(&self, value: &Value, args: &[Value]) -> CodecResult<Value>;

    /// Translate a native wire value back to its application shape.
    fn decode(&self, value: &Value, args: &[Value]) -> Value;
}

/// How a property declaration refers to its codec.
///
/// Resolved once into a [`ResolvedCodec`] so the get/set hot path only ever
/// deals with one canonical shape.
#[derive(Clone)]
pub enum PropertyType {
    /// A bare codec name, no static arguments.
    Named(String),
    /// A codec name with static arguments partially applied to both
    /// `encode` and `decode`.
    WithArgs(String, Vec<Value>),
    /// An ad hoc codec used as-is.
    Inline(Arc<dyn Codec>),
}

impl PropertyType {
    /// Refer to a registered codec by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Refer to a registered codec by name, with static arguments.
    pub fn with_args(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::WithArgs(name.into(), args)
    }

    /// Use an ad hoc codec for a single property.
    pub fn inline(codec: impl Codec + 'static) -> Self {
        Self::Inline(Arc::new(codec))
    }
}

impl std::fmt::Debug for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "PropertyType::Named({name})"),
            Self::WithArgs(name, args) => {
                write!(f, "PropertyType::WithArgs({name}, {} args)", args.len())
            }
            Self::Inline(codec) => write!(f, "PropertyType::Inline({})", codec.name()),
        }
    }
}

/// A codec with its static arguments already applied.
#[derive(Clone)]
pub struct ResolvedCodec {
    codec: Arc<dyn Codec>,
    args: Vec<Value>,
}

impl ResolvedCodec {
    /// The underlying codec's name.
    pub fn name(&self) -> &'static str {
        self.codec.name()
    }

    /// Encode an application value.
    pub fn encode(&self, value: &Value) -> CodecResult<Value> {
        self.codec.encode(value, &self.args)
    }

    /// Decode a native value.
    pub fn decode(&self, value: &Value) -> Value {
        self.codec.decode(value, &self.args)
    }
}

impl std::fmt::Debug for ResolvedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResolvedCodec({})", self.codec.name())
    }
}

/// The named lookup table of codecs.
///
/// # Related Types
///
/// - [`Codec`] - What gets registered
/// - [`PropertyType`] - How properties refer to entries
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Create a registry with the stock codecs installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("any", AnyCodec);
        registry.register("boolean", BooleanCodec);
        registry.register("string", StringCodec);
        registry.register("integer", IntegerCodec);
        registry.register("number", NumberCodec);
        registry.register("natural", NaturalCodec);
        registry.register("choice", ChoiceCodec);
        registry.register("color", ColorCodec);
        registry.register("font", FontCodec);
        registry.register("image", ImageCodec);
        registry.register("proxy", ProxyCodec);
        registry
    }

    /// Register a codec under a name, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, codec: impl Codec + 'static) {
        let name = name.into();
        tracing::trace!(target: "veneer_core::codec", name = %name, "registered codec");
        self.codecs.insert(name, Arc::new(codec));
    }

    /// Look up a codec by name.
    pub fn find(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(name).cloned()
    }

    /// Resolve a property's type reference into its canonical form.
    pub fn resolve(&self, property_type: &PropertyType) -> CodecResult<ResolvedCodec> {
        match property_type {
            PropertyType::Named(name) => Ok(ResolvedCodec {
                codec: self
                    .find(name)
                    .ok_or_else(|| CodecError::UnknownCodec(name.clone()))?,
                args: Vec::new(),
            }),
            PropertyType::WithArgs(name, args) => Ok(ResolvedCodec {
                codec: self
                    .find(name)
                    .ok_or_else(|| CodecError::UnknownCodec(name.clone()))?,
                args: args.clone(),
            }),
            PropertyType::Inline(codec) => Ok(ResolvedCodec {
                codec: codec.clone(),
                args: Vec::new(),
            }),
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
