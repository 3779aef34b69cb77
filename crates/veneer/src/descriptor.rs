//! Declarative type descriptors.
//!
//! A concrete object type is not a subclass; it is data. A
//! [`TypeDescriptor`] declares the type's name, its property table (codec,
//! default, flags, optional custom accessors), its event table (native
//! name, alias, hooks), fixed init properties, an optional singleton id,
//! and a child policy. [`TypeDescriptor::resolve`] normalizes the whole
//! declaration once against a [`CodecRegistry`] into an immutable
//! [`TypeInfo`], so the property hot path never re-parses codec references.
//!
//! # Example
//!
//! ```
//! use veneer::descriptor::{TypeDescriptor, PropertyDescriptor, EventDescriptor};
//! use veneer_core::{CodecRegistry, PropertyType, Value};
//!
//! let codecs = CodecRegistry::with_builtins();
//! let info = TypeDescriptor::new("Button")
//!     .property("text", PropertyDescriptor::new(PropertyType::named("string"))
//!         .default(Value::from("")))
//!     .property("textColor", PropertyDescriptor::new(PropertyType::named("color")))
//!     .event("select", EventDescriptor::new())
//!     .resolve(&codecs)
//!     .unwrap();
//! assert_eq!(info.type_name(), "Button");
//! ```
//!
//! # Key Types
//!
//! - [`PropertyDescriptor`] / [`EventDescriptor`] - Per-member declarations
//! - [`TypeDescriptor`] - The builder
//! - [`TypeInfo`] - The resolved, shareable form
//! - [`ChildPolicy`] - What a type accepts in [`append`](crate::widget::Widget::append)

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use veneer_core::{Cid, CodecRegistry, CodecResult, PropertyType, ResolvedCodec, Value, ValueMap};

use crate::error::Result;
use crate::event::Event;
use crate::proxy::Proxy;

// =============================================================================
// Hook signatures
// =============================================================================

/// Replaces the whole read pipeline for a property.
pub type GetHook = Arc<dyn Fn(&Proxy) -> Value + Send + Sync>;

/// Replaces the whole write pipeline for a property; the hook owns all side
/// effects (native operations, change events). Errors propagate to the
/// `set` caller.
pub type SetHook = Arc<dyn Fn(&Proxy, &Value) -> Result<()> + Send + Sync>;

/// Overrides native listen toggling. Called on the 0-to-1 and 1-to-0
/// listener transitions with `(enabled, is_alias_subscription)`.
pub type ListenHook = Arc<dyn Fn(&Proxy, bool, bool) + Send + Sync>;

/// Overrides inbound event handling for one event. The returned value is
/// handed back to the native caller.
pub type TriggerHook = Arc<dyn Fn(&Proxy, &Event) -> Option<Value> + Send + Sync>;

/// A child-acceptance predicate for [`ChildPolicy::Filter`].
pub type ChildFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

// =============================================================================
// Property declarations
// =============================================================================

/// The default a property reports before it is ever assigned.
#[derive(Clone, Default)]
pub enum DefaultValue {
    /// No declared default; the first read round-trips to native.
    #[default]
    None,
    /// A fixed value, cloned on every read.
    Static(Value),
    /// Invoked fresh on every read, so callers never observe shared
    /// mutable state.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Produce the default, if one is declared.
    pub fn produce(&self) -> Option<Value> {
        match self {
            DefaultValue::None => None,
            DefaultValue::Static(value) => Some(value.clone()),
            DefaultValue::Factory(factory) => Some(factory()),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::None => f.write_str("None"),
            DefaultValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Declares one property of a type.
#[derive(Clone)]
pub struct PropertyDescriptor {
    property_type: PropertyType,
    default: DefaultValue,
    readonly: bool,
    nocache: bool,
    get: Option<GetHook>,
    set: Option<SetHook>,
}

impl PropertyDescriptor {
    pub fn new(property_type: PropertyType) -> Self {
        Self {
            property_type,
            default: DefaultValue::None,
            readonly: false,
            nocache: false,
            get: None,
            set: None,
        }
    }

    /// Declare a static default value.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Static(value.into());
        self
    }

    /// Declare a factory default, produced fresh on every read.
    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultValue::Factory(Arc::new(factory));
        self
    }

    /// Writes fail with a read-only error.
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Reads never trust the cache; every read round-trips.
    pub fn nocache(mut self) -> Self {
        self.nocache = true;
        self
    }

    /// Install a custom read pipeline.
    pub fn on_get<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Proxy) -> Value + Send + Sync + 'static,
    {
        self.get = Some(Arc::new(hook));
        self
    }

    /// Install a custom write pipeline.
    pub fn on_set<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Proxy, &Value) -> Result<()> + Send + Sync + 'static,
    {
        self.set = Some(Arc::new(hook));
        self
    }
}

// =============================================================================
// Event declarations
// =============================================================================

/// Declares one event of a type.
#[derive(Clone, Default)]
pub struct EventDescriptor {
    native_name: Option<String>,
    alias: Option<String>,
    listen: Option<ListenHook>,
    trigger: Option<TriggerHook>,
    changes: Option<(String, String)>,
}

impl EventDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The event name the native side uses, when it differs from the local
    /// name.
    pub fn native_name(mut self, name: impl Into<String>) -> Self {
        self.native_name = Some(name.into());
        self
    }

    /// A second local name sharing this event's listen bookkeeping.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Override native listen toggling.
    pub fn on_listen<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Proxy, bool, bool) + Send + Sync + 'static,
    {
        self.listen = Some(Arc::new(hook));
        self
    }

    /// Override inbound handling.
    pub fn on_trigger<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Proxy, &Event) -> Option<Value> + Send + Sync + 'static,
    {
        self.trigger = Some(Arc::new(hook));
        self
    }

    /// Declare that this event reports a new value for `property` under
    /// `payload_key`; inbound events refresh the cache and fire the
    /// property's change event.
    pub fn changes(mut self, property: impl Into<String>, payload_key: impl Into<String>) -> Self {
        self.changes = Some((property.into(), payload_key.into()));
        self
    }
}

// =============================================================================
// Child policy
// =============================================================================

/// What a type accepts as children.
#[derive(Clone, Default)]
pub enum ChildPolicy {
    /// Not a container; every append fails.
    #[default]
    None,
    /// Accepts any widget.
    Any,
    /// Accepts only the listed type names.
    Types(BTreeSet<String>),
    /// Accepts whatever the predicate approves, by child type name.
    Filter(ChildFilter),
}

impl ChildPolicy {
    /// Build a [`ChildPolicy::Types`] from type names.
    pub fn types<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Types(names.into_iter().map(Into::into).collect())
    }

    /// Whether a child of the named type may be appended.
    pub fn accepts(&self, child_type: &str) -> bool {
        match self {
            ChildPolicy::None => false,
            ChildPolicy::Any => true,
            ChildPolicy::Types(names) => names.contains(child_type),
            ChildPolicy::Filter(filter) => filter(child_type),
        }
    }
}

impl fmt::Debug for ChildPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildPolicy::None => f.write_str("None"),
            ChildPolicy::Any => f.write_str("Any"),
            ChildPolicy::Types(names) => f.debug_tuple("Types").field(names).finish(),
            ChildPolicy::Filter(_) => f.write_str("Filter(..)"),
        }
    }
}

// =============================================================================
// The type descriptor and its resolved form
// =============================================================================

/// The declarative description of an object type.
#[derive(Default)]
pub struct TypeDescriptor {
    type_name: String,
    singleton_id: Option<Cid>,
    init_properties: ValueMap,
    properties: BTreeMap<String, PropertyDescriptor>,
    events: BTreeMap<String, EventDescriptor>,
    child_policy: ChildPolicy,
}

impl TypeDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Declare this type a singleton with a fixed id; at most one instance
    /// may exist at a time, and construction enqueues no `create`.
    pub fn singleton(mut self, id: impl AsRef<str>) -> Self {
        self.singleton_id = Some(Cid::new(id));
        self
    }

    /// A property always sent at creation, winning over any
    /// application-supplied value for the same key.
    pub fn init_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.init_properties.insert(name.into(), value.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, descriptor: PropertyDescriptor) -> Self {
        self.properties.insert(name.into(), descriptor);
        self
    }

    pub fn event(mut self, name: impl Into<String>, descriptor: EventDescriptor) -> Self {
        self.events.insert(name.into(), descriptor);
        self
    }

    pub fn child_policy(mut self, policy: ChildPolicy) -> Self {
        self.child_policy = policy;
        self
    }

    /// Normalize the declaration against a codec registry.
    ///
    /// Every property's codec reference is resolved here, once; an unknown
    /// codec name fails the whole type rather than surfacing later on the
    /// hot path.
    pub fn resolve(self, codecs: &CodecRegistry) -> CodecResult<Arc<TypeInfo>> {
        let mut properties = HashMap::new();
        for (name, descriptor) in self.properties {
            let codec = codecs.resolve(&descriptor.property_type)?;
            properties.insert(
                name,
                PropertyInfo {
                    codec,
                    default: descriptor.default,
                    readonly: descriptor.readonly,
                    nocache: descriptor.nocache,
                    get: descriptor.get,
                    set: descriptor.set,
                },
            );
        }

        let mut aliases = HashMap::new();
        let mut events = HashMap::new();
        for (name, descriptor) in self.events {
            if let Some(alias) = &descriptor.alias {
                aliases.insert(alias.clone(), name.clone());
            }
            events.insert(
                name.clone(),
                EventInfo {
                    native_name: descriptor.native_name.unwrap_or_else(|| name.clone()),
                    listen: descriptor.listen,
                    trigger: descriptor.trigger,
                    changes: descriptor.changes,
                },
            );
        }

        Ok(Arc::new(TypeInfo {
            type_name: self.type_name,
            singleton_id: self.singleton_id,
            init_properties: self.init_properties,
            properties,
            events,
            aliases,
            child_policy: self.child_policy,
        }))
    }
}

/// A resolved property: one canonical shape for the get/set hot path.
pub struct PropertyInfo {
    pub(crate) codec: ResolvedCodec,
    pub(crate) default: DefaultValue,
    pub(crate) readonly: bool,
    pub(crate) nocache: bool,
    pub(crate) get: Option<GetHook>,
    pub(crate) set: Option<SetHook>,
}

/// A resolved event.
pub struct EventInfo {
    pub(crate) native_name: String,
    pub(crate) listen: Option<ListenHook>,
    pub(crate) trigger: Option<TriggerHook>,
    pub(crate) changes: Option<(String, String)>,
}

/// The immutable, resolved form of a [`TypeDescriptor`], shared by every
/// instance of the type.
pub struct TypeInfo {
    type_name: String,
    singleton_id: Option<Cid>,
    init_properties: ValueMap,
    properties: HashMap<String, PropertyInfo>,
    events: HashMap<String, EventInfo>,
    aliases: HashMap<String, String>,
    child_policy: ChildPolicy,
}

impl TypeInfo {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn singleton_id(&self) -> Option<&Cid> {
        self.singleton_id.as_ref()
    }

    pub(crate) fn init_properties(&self) -> &ValueMap {
        &self.init_properties
    }

    pub(crate) fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.get(name)
    }

    pub(crate) fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub(crate) fn event(&self, canonical: &str) -> Option<&EventInfo> {
        self.events.get(canonical)
    }

    /// Resolve a subscribed name to `(canonical_name, is_alias)`.
    pub(crate) fn canonical_event<'a>(&'a self, name: &'a str) -> Option<(&'a str, bool)> {
        if self.events.contains_key(name) {
            Some((name, false))
        } else {
            self.aliases
                .get(name)
                .map(|canonical| (canonical.as_str(), true))
        }
    }

    pub fn child_policy(&self) -> &ChildPolicy {
        &self.child_policy
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("type_name", &self.type_name)
            .field("singleton_id", &self.singleton_id)
            .field("properties", &self.properties.keys())
            .field("events", &self.events.keys())
            .finish_non_exhaustive()
    }
}
