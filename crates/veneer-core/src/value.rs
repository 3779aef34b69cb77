//! Wire values for Veneer.
//!
//! Everything that crosses the native peer boundary is a [`Value`]: a small
//! dynamically-typed tree of scalars, lists and maps, plus [`Value::Reference`]
//! for pointing at another bridge-backed object by its [`Cid`].
//!
//! The shape a codec produces (for example the 4-tuple a color encodes to) is
//! a compatibility contract with the peer; see [`crate::codec`].
//!
//! # Key Types
//!
//! - [`Cid`] - Opaque identifier binding an object to its native counterpart
//! - [`Value`] - The dynamically-typed wire value
//!
//! # Example
//!
//! ```
//! use veneer_core::Value;
//!
//! let v: Value = 23.into();
//! assert_eq!(v.as_i64(), Some(23));
//!
//! let list = Value::from(vec![Value::from(1), Value::from(2)]);
//! assert_eq!(list.as_list().map(|l| l.len()), Some(2));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// An opaque identifier binding an in-process object to its native-side
/// counterpart.
///
/// Cids are unique for the process lifetime. They are generated monotonically
/// by [`crate::registry::ProxyStore::next_cid`], or fixed for singleton
/// service objects. A cid is registered at most once at any time; it may be
/// reused only after the prior object has been removed from the registry.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cid(Arc<str>);

impl Cid {
    /// Create a cid from a string.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The cid as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self.0)
    }
}

impl From<&str> for Cid {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Cid {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// A property map, as carried by `create` and `set` operations.
pub type ValueMap = BTreeMap<String, Value>;

/// A dynamically-typed value crossing the bridge.
///
/// Values are fully encoded/decoded by the [type coding table](crate::codec)
/// before they reach the peer; the bridge itself treats them as opaque.
///
/// `Reference` serializes as its bare id string, which is the shape a
/// serialized RPC peer sees.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// The absent value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A string-keyed map of values.
    Map(ValueMap),
    /// A reference to another bridge-backed object.
    Reference(Cid),
}

impl Value {
    /// Whether this is [`Value::Null`].
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean value, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer value, if this is an `Int` (or an integral `Float`).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    /// The numeric value, if this is an `Int` or `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// The string value, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The list contents, if this is a `List`.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The map contents, if this is a `Map`.
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The referenced cid, if this is a `Reference`.
    pub fn as_reference(&self) -> Option<&Cid> {
        match self {
            Value::Reference(cid) => Some(cid),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

impl From<Cid> for Value {
    fn from(cid: Cid) -> Self {
        Value::Reference(cid)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Reference(cid) => write!(f, "@{cid}"),
        }
    }
}
