//! Native-backed objects.
//!
//! A [`Proxy`] is the local handle for one object living on the native
//! side: it owns the property pipeline (validate, encode, enqueue, cache,
//! change events), the listener bookkeeping that drives native
//! `listen` toggling, the inbound-event entry point, and the Live to
//! Disposed lifecycle. Behavior is entirely data-driven by the resolved
//! [`TypeInfo`] the proxy is constructed with; no subclassing.
//!
//! Handles are cheap to clone and share one underlying object.
//!
//! # Key Types
//!
//! - [`Proxy`] - The object handle
//! - [`crate::descriptor::TypeInfo`] - What drives its behavior
//! - [`crate::context::Context`] - Where proxies are created

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use veneer_core::{Cid, NativeBacked, NativeBridge, Value, ValueMap};

use crate::context::Context;
use crate::descriptor::{PropertyInfo, TypeInfo};
use crate::error::{Error, Result};
use crate::event::{Event, Listener, ListenerId, ListenerTable};

const LOCAL_EVENTS: &[&str] = &["dispose", "addchild", "removechild"];

pub(crate) struct ProxyInner {
    cid: Cid,
    info: Arc<TypeInfo>,
    bridge: Arc<NativeBridge>,
    disposed: AtomicBool,
    /// Values for names the type does not declare; never sent to native.
    local: Mutex<ValueMap>,
    listeners: Mutex<ListenerTable>,
    weak_self: Weak<ProxyInner>,
}

/// A handle to one native-backed object.
#[derive(Clone)]
pub struct Proxy {
    inner: Arc<ProxyInner>,
}

impl Proxy {
    /// Construct an object of the described type.
    ///
    /// Ordinary types get a fresh cid and enqueue a single `create`
    /// carrying every property that passed encoding, with the type's init
    /// properties winning per key. Singleton types register under their
    /// fixed id instead and enqueue no `create`; constructing a second
    /// instance fails.
    pub fn create(context: &Context, info: Arc<TypeInfo>, properties: ValueMap) -> Result<Proxy> {
        let bridge = Arc::clone(context.bridge());
        let store = Arc::clone(bridge.store());
        let singleton = info.singleton_id().cloned();
        let cid = match &singleton {
            Some(id) => id.clone(),
            None => store.next_cid(),
        };

        let mut create_props = ValueMap::new();
        let mut local = ValueMap::new();
        for (name, value) in properties {
            match info.property(&name) {
                Some(prop) => match prop.codec.encode(&value) {
                    Ok(wire) => {
                        create_props.insert(name, wire);
                    }
                    Err(err) => tracing::warn!(
                        target: "veneer::proxy",
                        type_name = info.type_name(),
                        property = %name,
                        %err,
                        "dropping creation property that failed to encode"
                    ),
                },
                None => {
                    local.insert(name, value);
                }
            }
        }
        for (name, value) in info.init_properties() {
            create_props.insert(name.clone(), value.clone());
        }

        let type_name = info.type_name().to_string();
        let inner = Arc::new_cyclic(|weak| ProxyInner {
            cid: cid.clone(),
            info,
            bridge: Arc::clone(&bridge),
            disposed: AtomicBool::new(false),
            local: Mutex::new(local),
            listeners: Mutex::new(ListenerTable::new()),
            weak_self: weak.clone(),
        });

        let weak: Weak<dyn NativeBacked> = inner.weak_self.clone();
        if let Err(err) = store.register(weak, Some(cid.clone())) {
            if singleton.is_some() {
                return Err(Error::SingletonExists(type_name));
            }
            return Err(err.into());
        }

        if singleton.is_some() {
            // The native object pre-exists; only push properties.
            bridge.set(&cid, create_props);
        } else {
            bridge.create(&cid, &type_name, create_props);
        }
        tracing::debug!(target: "veneer::proxy", %cid, type_name, "created object");
        Ok(Proxy { inner })
    }

    pub fn cid(&self) -> &Cid {
        &self.inner.cid
    }

    pub fn type_name(&self) -> &str {
        self.inner.info.type_name()
    }

    pub fn type_info(&self) -> &Arc<TypeInfo> {
        &self.inner.info
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn bridge(&self) -> &Arc<NativeBridge> {
        &self.inner.bridge
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(Error::Disposed {
                type_name: self.type_name().to_string(),
                cid: self.inner.cid.clone(),
            })
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Read a property.
    ///
    /// Custom getters are trusted verbatim. `nocache` properties always
    /// round-trip. Otherwise the cached value wins, then the declared
    /// default, and only then a native round-trip (whose result is cached).
    /// Unknown names report their locally stored value, or `Null` with a
    /// warning.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.ensure_live()?;
        let Some(prop) = self.inner.info.property(name) else {
            if let Some(value) = self.inner.local.lock().get(name) {
                return Ok(value.clone());
            }
            tracing::warn!(
                target: "veneer::proxy",
                type_name = self.type_name(),
                property = name,
                "read of unknown property"
            );
            return Ok(Value::Null);
        };

        if let Some(hook) = &prop.get {
            return Ok(hook(self));
        }
        if prop.nocache {
            let wire = self.inner.bridge.fetch(&self.inner.cid, name);
            return Ok(prop.codec.decode(&wire));
        }
        if let Some(wire) = self.inner.bridge.cached(&self.inner.cid, name) {
            return Ok(prop.codec.decode(&wire));
        }
        if let Some(default) = prop.default.produce() {
            return Ok(default);
        }
        let wire = self.inner.bridge.get(&self.inner.cid, name);
        Ok(prop.codec.decode(&wire))
    }

    /// Write a property. See [`set_many`](Proxy::set_many) for the rules.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.ensure_live()?;
        self.set_entry(name, value.into())
    }

    /// Write several properties.
    ///
    /// Read-only names and rejecting custom setters fail the call; a value
    /// the codec cannot encode is dropped with a warning and the rest
    /// proceed. Unknown names are stored locally and never reach native.
    /// Each effective change fires `change:<name>` with the decoded value.
    pub fn set_many(&self, properties: ValueMap) -> Result<()> {
        self.ensure_live()?;
        for (name, value) in properties {
            self.set_entry(&name, value)?;
        }
        Ok(())
    }

    fn set_entry(&self, name: &str, value: Value) -> Result<()> {
        let Some(prop) = self.inner.info.property(name) else {
            tracing::info!(
                target: "veneer::proxy",
                type_name = self.type_name(),
                property = name,
                "storing unknown property locally"
            );
            let previous = self.inner.local.lock().insert(name.to_string(), value.clone());
            if previous.as_ref() != Some(&value) {
                self.dispatch(&format!("change:{name}"), value);
            }
            return Ok(());
        };

        if prop.readonly {
            return Err(Error::ReadOnly(name.to_string()));
        }
        if let Some(hook) = &prop.set {
            // The hook owns all side effects; its errors reach the caller.
            return hook(self, &value);
        }

        let wire = match prop.codec.encode(&value) {
            Ok(wire) => wire,
            Err(err) => {
                tracing::warn!(
                    target: "veneer::proxy",
                    type_name = self.type_name(),
                    property = name,
                    %err,
                    "dropping property that failed to encode"
                );
                return Ok(());
            }
        };
        let decoded = prop.codec.decode(&wire);
        let previous = self.effective_value(name, prop);
        self.inner
            .bridge
            .set(&self.inner.cid, [(name.to_string(), wire)].into());
        // A default-less property has no previous effective value, so its
        // first assignment notifies even at the type's natural zero.
        if previous.as_ref() != Some(&decoded) {
            self.dispatch(&format!("change:{name}"), decoded);
        }
        Ok(())
    }

    /// The value a read would currently report, without touching native.
    fn effective_value(&self, name: &str, prop: &PropertyInfo) -> Option<Value> {
        self.inner
            .bridge
            .cached(&self.inner.cid, name)
            .map(|wire| prop.codec.decode(&wire))
            .or_else(|| prop.default.produce())
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Subscribe a listener.
    ///
    /// Declared events resolve aliases to their primary name; the first
    /// subscriber per primary name turns native delivery on (through the
    /// descriptor's listen hook, or a bridge `listen` of the native name).
    /// `dispose`, `addchild`, `removechild`, and `change:<property>` are
    /// local names and never reach native. Anything else is tolerated,
    /// logged at info level, and kept local.
    pub fn on<F>(&self, name: &str, listener: F) -> Result<ListenerId>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.ensure_live()?;
        let callback: Listener = Arc::new(listener);

        let (canonical, is_alias) = match self.inner.info.canonical_event(name) {
            Some((canonical, is_alias)) => (canonical.to_string(), Some(is_alias)),
            None => {
                if !self.is_local_event(name) {
                    tracing::info!(
                        target: "veneer::proxy",
                        type_name = self.type_name(),
                        event = name,
                        "listener for unrecognized event kept local"
                    );
                }
                (name.to_string(), None)
            }
        };

        let (id, first) = self
            .inner
            .listeners
            .lock()
            .add(canonical.clone(), name, callback);
        if first && let Some(is_alias) = is_alias {
            if let Some(event) = self.inner.info.event(&canonical) {
                match &event.listen {
                    Some(hook) => hook(self, true, is_alias),
                    None => self
                        .inner
                        .bridge
                        .listen(&self.inner.cid, &event.native_name, true),
                }
            }
        }
        Ok(id)
    }

    /// Remove a listener. Always safe, including on disposed objects and
    /// for ids already removed.
    ///
    /// Removing the last listener of a declared event turns native
    /// delivery off again.
    pub fn off(&self, id: ListenerId) {
        let removed = self.inner.listeners.lock().remove(id);
        let Some((canonical, subscribed, last)) = removed else {
            return;
        };
        if last && !self.is_disposed() {
            if let Some(event) = self.inner.info.event(&canonical) {
                let is_alias = subscribed != canonical;
                match &event.listen {
                    Some(hook) => hook(self, false, is_alias),
                    None => self
                        .inner
                        .bridge
                        .listen(&self.inner.cid, &event.native_name, false),
                }
            }
        }
    }

    /// Deliver an event to this object, as the native side would.
    ///
    /// A declared trigger hook takes over entirely. Otherwise a declared
    /// `changes` mapping refreshes the property cache and fires its change
    /// event, and every listener of the canonical name runs, each observing
    /// the name it subscribed under.
    pub fn trigger(&self, name: &str, payload: &Value) -> Option<Value> {
        let canonical = match self.inner.info.canonical_event(name) {
            Some((canonical, _)) => canonical.to_string(),
            None => name.to_string(),
        };

        if let Some(event) = self.inner.info.event(&canonical) {
            if let Some(hook) = &event.trigger {
                let event = Event {
                    target: self.inner.cid.clone(),
                    name: canonical,
                    payload: payload.clone(),
                };
                return hook(self, &event);
            }
            if let Some((property, payload_key)) = &event.changes {
                let reported = payload.as_map().and_then(|m| m.get(payload_key));
                if let (Some(wire), Some(prop)) = (reported, self.inner.info.property(property)) {
                    let decoded = prop.codec.decode(wire);
                    self.inner.bridge.cache_put(&self.inner.cid, property, wire.clone());
                    self.dispatch(&format!("change:{property}"), decoded);
                }
            }
        }

        self.dispatch(&canonical, payload.clone());
        None
    }

    fn is_local_event(&self, name: &str) -> bool {
        LOCAL_EVENTS.contains(&name)
            || name
                .strip_prefix("change:")
                .is_some_and(|prop| self.inner.info.has_property(prop))
    }

    /// Run the listeners of a canonical name. Callbacks are snapshotted
    /// first so none runs under the table lock.
    pub(crate) fn dispatch(&self, canonical: &str, payload: Value) {
        let listeners = self.inner.listeners.lock().snapshot(canonical);
        for (subscribed, callback) in listeners {
            callback(&Event {
                target: self.inner.cid.clone(),
                name: subscribed,
                payload: payload.clone(),
            });
        }
    }

    // =========================================================================
    // Methods and lifecycle
    // =========================================================================

    /// Invoke a native method. Queued operations are flushed first, so the
    /// peer observes every prior write.
    pub fn call(&self, method: &str, parameters: ValueMap) -> Result<Value> {
        self.ensure_live()?;
        Ok(self.inner.bridge.call(&self.inner.cid, method, parameters))
    }

    /// Dispose the object. Idempotent.
    ///
    /// The disposed flag is set before the `dispose` event fires, so
    /// listeners already observe terminal state; then the native `destroy`
    /// is enqueued and the object leaves the registry.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(
            target: "veneer::proxy",
            cid = %self.inner.cid,
            type_name = self.type_name(),
            "disposing object"
        );
        self.dispatch("dispose", Value::Null);
        self.inner.bridge.destroy(&self.inner.cid);
        self.inner.bridge.store().remove(&self.inner.cid);
        self.inner.listeners.lock().clear();
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("type_name", &self.type_name())
            .field("cid", &self.inner.cid)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl NativeBacked for ProxyInner {
    fn cid(&self) -> &Cid {
        &self.cid
    }

    fn type_name(&self) -> &str {
        self.info.type_name()
    }

    fn on_notify(&self, event: &str, payload: &Value) -> Option<Value> {
        let inner = self.weak_self.upgrade()?;
        Proxy { inner }.trigger(event, payload)
    }
}

static_assertions::assert_impl_all!(Proxy: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use veneer_core::{PeerCall, PropertyType, RecordingPeer};

    use super::*;
    use crate::descriptor::{EventDescriptor, PropertyDescriptor, TypeDescriptor};

    fn context() -> (Context, RecordingPeer) {
        let peer = RecordingPeer::new();
        (Context::new(Box::new(peer.clone())), peer)
    }

    fn test_type() -> TypeDescriptor {
        TypeDescriptor::new("TestType")
            .property("foo", PropertyDescriptor::new(PropertyType::named("integer")))
            .property(
                "text",
                PropertyDescriptor::new(PropertyType::named("string")).default(""),
            )
            .property(
                "locked",
                PropertyDescriptor::new(PropertyType::named("boolean")).readonly(),
            )
            .property(
                "bounds",
                PropertyDescriptor::new(PropertyType::named("any")).nocache(),
            )
            .event("select", EventDescriptor::new().alias("selectionChanged"))
    }

    fn make(context: &Context, properties: ValueMap) -> Proxy {
        let info = test_type().resolve(context.codecs()).unwrap();
        Proxy::create(context, info, properties).unwrap()
    }

    #[test]
    fn test_create_records_properties_and_serves_reads_locally() {
        // Scenario: a creation property must be readable with no round-trip.
        let (context, peer) = context();
        let proxy = make(&context, [("foo".to_string(), Value::Int(23))].into());

        assert_eq!(proxy.get("foo").unwrap(), Value::Int(23));
        assert!(peer.calls().is_empty(), "no flush or native get expected");

        context.flush();
        match &peer.calls()[..] {
            [PeerCall::Create { type_name, properties, .. }] => {
                assert_eq!(type_name, "TestType");
                assert_eq!(properties.get("foo"), Some(&Value::Int(23)));
            }
            other => panic!("unexpected calls: {other:?}"),
        }
    }

    #[test]
    fn test_init_properties_win() {
        let (context, peer) = context();
        let info = test_type()
            .init_property("style", "compact")
            .resolve(context.codecs())
            .unwrap();
        let proxy = Proxy::create(
            &context,
            info,
            [
                ("style".to_string(), Value::from("fancy")),
                ("foo".to_string(), Value::Int(1)),
            ]
            .into(),
        )
        .unwrap();
        context.flush();
        match &peer.calls()[..] {
            [PeerCall::Create { properties, .. }] => {
                assert_eq!(properties.get("style"), Some(&Value::from("compact")));
                assert_eq!(properties.get("foo"), Some(&Value::Int(1)));
            }
            other => panic!("unexpected calls: {other:?}"),
        }
        // "style" is undeclared, so the application value stayed local.
        assert_eq!(proxy.get("style").unwrap(), Value::from("fancy"));
    }

    #[test]
    fn test_unknown_property_stays_local() {
        // Scenario: unknown names round-trip locally, never natively.
        let (context, peer) = context();
        let proxy = make(&context, ValueMap::new());

        proxy.set("extra", "val").unwrap();
        assert_eq!(proxy.get("extra").unwrap(), Value::from("val"));

        context.flush();
        match &peer.calls()[..] {
            [PeerCall::Create { properties, .. }] => assert!(properties.is_empty()),
            other => panic!("unexpected calls: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_property_read_is_null() {
        let (context, _peer) = context();
        let proxy = make(&context, ValueMap::new());
        assert_eq!(proxy.get("nonsense").unwrap(), Value::Null);
    }

    #[test]
    fn test_readonly_set_fails() {
        let (context, _peer) = context();
        let proxy = make(&context, ValueMap::new());
        assert!(matches!(
            proxy.set("locked", true).unwrap_err(),
            Error::ReadOnly(name) if name == "locked"
        ));
    }

    #[test]
    fn test_encode_failure_drops_key_and_continues() {
        let (context, peer) = context();
        let proxy = make(&context, ValueMap::new());
        proxy
            .set_many(
                [
                    ("foo".to_string(), Value::from("not a number")),
                    ("text".to_string(), Value::from("ok")),
                ]
                .into(),
            )
            .unwrap();
        context.flush();
        match &peer.calls()[..] {
            [PeerCall::Create { properties, .. }] => {
                assert!(!properties.contains_key("foo"));
                assert_eq!(properties.get("text"), Some(&Value::from("ok")));
            }
            other => panic!("unexpected calls: {other:?}"),
        }
    }

    #[test]
    fn test_custom_setter_errors_propagate() {
        let (context, _peer) = context();
        let info = TypeDescriptor::new("Picky")
            .property(
                "mode",
                PropertyDescriptor::new(PropertyType::named("string")).on_set(|_proxy, _value| {
                    Err(Error::setter_failed("mode", "rejected"))
                }),
            )
            .resolve(context.codecs())
            .unwrap();
        let proxy = Proxy::create(&context, info, ValueMap::new()).unwrap();
        assert!(matches!(
            proxy.set("mode", "x").unwrap_err(),
            Error::SetterFailed { .. }
        ));
    }

    #[test]
    fn test_change_event_suppression() {
        let (context, _peer) = context();
        let proxy = make(&context, ValueMap::new());
        let changes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&changes);
        proxy
            .on("change:text", move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        // "text" defaults to ""; assigning the default again changes nothing.
        proxy.set("text", "").unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 0);
        proxy.set("text", "hello").unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 1);
        proxy.set("text", "hello").unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_defaultless_first_assignment_always_fires() {
        let (context, _peer) = context();
        let proxy = make(&context, ValueMap::new());
        let changes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&changes);
        proxy
            .on("change:foo", move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        // No declared default, so even the natural zero notifies once.
        proxy.set("foo", 0).unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 1);
        proxy.set("foo", 0).unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_nocache_property_always_round_trips() {
        let (context, peer) = context();
        let proxy = make(&context, ValueMap::new());
        peer.stub_get(proxy.cid(), "bounds", Value::from(vec![Value::Int(1)]));

        proxy.set("bounds", vec![Value::Int(0)]).unwrap();
        // The optimistic cache is not trusted for nocache reads.
        assert_eq!(
            proxy.get("bounds").unwrap(),
            Value::from(vec![Value::Int(1)])
        );
        let gets = peer
            .calls()
            .iter()
            .filter(|c| matches!(c, PeerCall::Get { .. }))
            .count();
        assert_eq!(gets, 1);
    }

    #[test]
    fn test_alias_listen_refcounting() {
        // Scenario: one listen(true) across primary and alias subscriptions,
        // one listen(false) when the last of either unsubscribes.
        let (context, peer) = context();
        let proxy = make(&context, ValueMap::new());

        let a = proxy.on("select", |_event| {}).unwrap();
        let b = proxy.on("selectionChanged", |_event| {}).unwrap();
        proxy.off(a);
        context.flush();
        let listens: Vec<(String, bool)> = peer
            .calls()
            .iter()
            .filter_map(|c| match c {
                PeerCall::Listen { event, enabled, .. } => Some((event.clone(), *enabled)),
                _ => None,
            })
            .collect();
        assert_eq!(listens, [("select".to_string(), true)]);

        proxy.off(b);
        context.flush();
        let listens = peer
            .calls()
            .iter()
            .filter(|c| matches!(c, PeerCall::Listen { .. }))
            .count();
        assert_eq!(listens, 2);
    }

    #[test]
    fn test_alias_subscribers_observe_their_own_name() {
        let (context, _peer) = context();
        let proxy = make(&context, ValueMap::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_a = Arc::clone(&seen);
        proxy
            .on("select", move |event| seen_a.lock().push(event.name.clone()))
            .unwrap();
        let seen_b = Arc::clone(&seen);
        proxy
            .on("selectionChanged", move |event| {
                seen_b.lock().push(event.name.clone())
            })
            .unwrap();

        proxy.trigger("select", &Value::Null);
        assert_eq!(*seen.lock(), ["select", "selectionChanged"]);
    }

    #[test]
    fn test_unrecognized_event_never_reaches_native() {
        let (context, peer) = context();
        let proxy = make(&context, ValueMap::new());
        proxy.on("mystery", |_event| {}).unwrap();
        context.flush();
        assert!(!peer.calls().iter().any(|c| matches!(c, PeerCall::Listen { .. })));
    }

    #[test]
    fn test_changes_event_refreshes_cache_and_notifies() {
        let (context, peer) = context();
        let info = TypeDescriptor::new("Input")
            .property(
                "value",
                PropertyDescriptor::new(PropertyType::named("string")).default(""),
            )
            .event("input", EventDescriptor::new().changes("value", "text"))
            .resolve(context.codecs())
            .unwrap();
        let proxy = Proxy::create(&context, info, ValueMap::new()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_changes = Arc::clone(&seen);
        proxy
            .on("change:value", move |event| {
                seen_changes.lock().push(event.payload.clone())
            })
            .unwrap();

        let payload = Value::Map([("text".to_string(), Value::from("typed"))].into());
        context.notify(proxy.cid(), "input", &payload);

        assert_eq!(*seen.lock(), [Value::from("typed")]);
        // The reported value is now cached; reading it must not round-trip.
        peer.clear();
        assert_eq!(proxy.get("value").unwrap(), Value::from("typed"));
        assert!(peer.calls().is_empty());
    }

    #[test]
    fn test_custom_trigger_hook_wins() {
        let (context, _peer) = context();
        let info = TypeDescriptor::new("Prompt")
            .event(
                "confirm",
                EventDescriptor::new().on_trigger(|_proxy, _event| Some(Value::Bool(true))),
            )
            .resolve(context.codecs())
            .unwrap();
        let proxy = Proxy::create(&context, info, ValueMap::new()).unwrap();
        assert_eq!(
            context.notify(proxy.cid(), "confirm", &Value::Null),
            Some(Value::Bool(true))
        );
    }

    #[test]
    fn test_singleton_registration() {
        let (context, peer) = context();
        let info = TypeDescriptor::new("App")
            .singleton("veneer.App")
            .resolve(context.codecs())
            .unwrap();

        let app = Proxy::create(&context, Arc::clone(&info), ValueMap::new()).unwrap();
        assert_eq!(app.cid().as_str(), "veneer.App");
        context.flush();
        assert!(!peer.calls().iter().any(|c| matches!(c, PeerCall::Create { .. })));

        let second = Proxy::create(&context, info, ValueMap::new());
        assert!(matches!(second, Err(Error::SingletonExists(name)) if name == "App"));
    }

    #[test]
    fn test_dispose_is_idempotent_and_fails_fast() {
        // Scenario: get/set/call on a disposed object error; off and a
        // second dispose stay safe.
        let (context, peer) = context();
        let proxy = make(&context, ValueMap::new());
        let disposed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&disposed);
        let listener = proxy
            .on("dispose", move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        proxy.dispose();
        proxy.dispose();
        assert_eq!(disposed.load(Ordering::SeqCst), 1);

        assert!(matches!(proxy.get("foo"), Err(Error::Disposed { .. })));
        assert!(matches!(proxy.set("foo", 1), Err(Error::Disposed { .. })));
        assert!(matches!(
            proxy.call("doIt", ValueMap::new()),
            Err(Error::Disposed { .. })
        ));
        proxy.off(listener);

        context.flush();
        let destroys = peer
            .calls()
            .iter()
            .filter(|c| matches!(c, PeerCall::Destroy { .. }))
            .count();
        assert_eq!(destroys, 1);
        assert!(context.find(proxy.cid()).is_none());
    }

    #[test]
    fn test_listener_observes_disposed_flag() {
        let (context, _peer) = context();
        let proxy = make(&context, ValueMap::new());
        let observed = Arc::new(AtomicBool::new(false));
        let handle = proxy.clone();
        let observed_in_listener = Arc::clone(&observed);
        proxy
            .on("dispose", move |_event| {
                observed_in_listener.store(handle.is_disposed(), Ordering::SeqCst);
            })
            .unwrap();
        proxy.dispose();
        assert!(observed.load(Ordering::SeqCst));
    }
}
