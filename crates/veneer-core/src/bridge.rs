//! The operation-batching bridge to the native peer.
//!
//! State-changing operations (`create`, `set`, `listen`, `destroy`) are not
//! sent to the peer immediately: they accumulate in an ordered queue and are
//! drained in FIFO order at the next flush point. Consecutive `set`
//! operations on the same object merge into one record (later value per key
//! wins), and a `set` immediately following its own `create` merges into the
//! creation record.
//!
//! Reads (`get`, `call`) force a synchronous flush first, so the peer's
//! state always reflects everything enqueued before a read is served — the
//! "read implies flush" contract. A property cache keyed by object id is
//! updated optimistically on every `set`, so a read immediately after a
//! write is answered without a native round-trip.
//!
//! # Key Types
//!
//! - [`Operation`] - A queued command record
//! - [`NativePeer`] - The boundary trait the host runtime implements
//! - [`NativeBridge`] - The queue, cache, and notify dispatch
//! - [`RecordingPeer`] - A headless peer for tests and tooling
//!
//! # Related Modules
//!
//! - [`crate::registry`] - Resolves inbound `notify` events
//! - [`crate::codec`] - Encodes values before they are enqueued

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::registry::ProxyStore;
use crate::value::{Cid, Value, ValueMap};

/// A queued bridge operation.
///
/// Operations are flushed to the peer in the exact order they were enqueued,
/// except for the merge rule described at the [module level](self).
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    /// Create a native object with its initial properties.
    Create {
        /// The new object's id.
        cid: Cid,
        /// The declared native type name.
        type_name: String,
        /// Initial properties, already encoded.
        properties: ValueMap,
    },
    /// Update properties on an existing object.
    Set {
        /// The target object.
        cid: Cid,
        /// Properties to update, already encoded.
        properties: ValueMap,
    },
    /// Toggle native event delivery for one event.
    Listen {
        /// The target object.
        cid: Cid,
        /// The native event name.
        event: String,
        /// Whether the peer should deliver this event.
        enabled: bool,
    },
    /// Destroy a native object.
    Destroy {
        /// The target object.
        cid: Cid,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create {
                cid,
                type_name,
                properties,
            } => write!(f, "create {cid} {type_name} ({} props)", properties.len()),
            Operation::Set { cid, properties } => {
                write!(f, "set {cid} ({} props)", properties.len())
            }
            Operation::Listen {
                cid,
                event,
                enabled,
            } => write!(f, "listen {cid} {event} {enabled}"),
            Operation::Destroy { cid } => write!(f, "destroy {cid}"),
        }
    }
}

/// The native peer boundary.
///
/// The host runtime is an opaque collaborator reachable only through these
/// primitives. Writes arrive batched through [`flush`](Self::flush); reads
/// are issued directly after the bridge has flushed.
///
/// Peers that support batch transport can override `flush` and ship the
/// whole operation list in one round-trip; the provided implementation
/// replays the queue through the individual primitives.
pub trait NativePeer: Send {
    /// Create a native object.
    fn create(&mut self, cid: &Cid, type_name: &str, properties: &ValueMap);

    /// Read a property from a native object.
    fn get(&mut self, cid: &Cid, property: &str) -> Value;

    /// Update properties on a native object.
    fn set(&mut self, cid: &Cid, properties: &ValueMap);

    /// Invoke a method on a native object.
    fn call(&mut self, cid: &Cid, method: &str, parameters: &ValueMap) -> Value;

    /// Toggle event delivery for a native object.
    fn listen(&mut self, cid: &Cid, event: &str, enabled: bool);

    /// Destroy a native object.
    fn destroy(&mut self, cid: &Cid);

    /// Process a batch of queued operations in order.
    fn flush(&mut self, operations: &[Operation]) {
        for op in operations {
            match op {
                Operation::Create {
                    cid,
                    type_name,
                    properties,
                } => self.create(cid, type_name, properties),
                Operation::Set { cid, properties } => self.set(cid, properties),
                Operation::Listen {
                    cid,
                    event,
                    enabled,
                } => self.listen(cid, event, *enabled),
                Operation::Destroy { cid } => self.destroy(cid),
            }
        }
    }
}

/// One primitive call observed by a [`RecordingPeer`].
#[derive(Clone, Debug, PartialEq)]
pub enum PeerCall {
    /// A `create` call.
    Create {
        cid: Cid,
        type_name: String,
        properties: ValueMap,
    },
    /// A `get` call.
    Get { cid: Cid, property: String },
    /// A `set` call.
    Set { cid: Cid, properties: ValueMap },
    /// A `call` call.
    Call {
        cid: Cid,
        method: String,
        parameters: ValueMap,
    },
    /// A `listen` call.
    Listen {
        cid: Cid,
        event: String,
        enabled: bool,
    },
    /// A `destroy` call.
    Destroy { cid: Cid },
}

#[derive(Default)]
struct RecordingPeerState {
    calls: Mutex<Vec<PeerCall>>,
    get_results: Mutex<HashMap<(Cid, String), Value>>,
    call_results: Mutex<HashMap<(Cid, String), Value>>,
}

/// A headless peer that records every primitive call.
///
/// Cloning yields another handle onto the same call log, so a test can keep
/// one handle while the bridge owns the other. `get` and `call` serve
/// scripted results (default [`Value::Null`]).
#[derive(Clone, Default)]
pub struct RecordingPeer {
    state: Arc<RecordingPeerState>,
}

impl RecordingPeer {
    /// Create a new recording peer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result of a future `get` call.
    pub fn stub_get(&self, cid: &Cid, property: &str, result: Value) {
        self.state
            .get_results
            .lock()
            .insert((cid.clone(), property.to_string()), result);
    }

    /// Script the result of a future `call` call.
    pub fn stub_call(&self, cid: &Cid, method: &str, result: Value) {
        self.state
            .call_results
            .lock()
            .insert((cid.clone(), method.to_string()), result);
    }

    /// A snapshot of every primitive call seen so far, in order.
    pub fn calls(&self) -> Vec<PeerCall> {
        self.state.calls.lock().clone()
    }

    /// Discard the recorded call log.
    pub fn clear(&self) {
        self.state.calls.lock().clear();
    }

    fn record(&self, call: PeerCall) {
        self.state.calls.lock().push(call);
    }
}

impl NativePeer for RecordingPeer {
    fn create(&mut self, cid: &Cid, type_name: &str, properties: &ValueMap) {
        self.record(PeerCall::Create {
            cid: cid.clone(),
            type_name: type_name.to_string(),
            properties: properties.clone(),
        });
    }

    fn get(&mut self, cid: &Cid, property: &str) -> Value {
        self.record(PeerCall::Get {
            cid: cid.clone(),
            property: property.to_string(),
        });
        self.state
            .get_results
            .lock()
            .get(&(cid.clone(), property.to_string()))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn set(&mut self, cid: &Cid, properties: &ValueMap) {
        self.record(PeerCall::Set {
            cid: cid.clone(),
            properties: properties.clone(),
        });
    }

    fn call(&mut self, cid: &Cid, method: &str, parameters: &ValueMap) -> Value {
        self.record(PeerCall::Call {
            cid: cid.clone(),
            method: method.to_string(),
            parameters: parameters.clone(),
        });
        self.state
            .call_results
            .lock()
            .get(&(cid.clone(), method.to_string()))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn listen(&mut self, cid: &Cid, event: &str, enabled: bool) {
        self.record(PeerCall::Listen {
            cid: cid.clone(),
            event: event.to_string(),
            enabled,
        });
    }

    fn destroy(&mut self, cid: &Cid) {
        self.record(PeerCall::Destroy { cid: cid.clone() });
    }
}

type FlushHook = Arc<dyn Fn() + Send + Sync>;

/// The operation queue, property cache, and notify dispatch.
///
/// The bridge assumes disposed objects have already been filtered out by the
/// caller (the proxy layer); it does not re-validate liveness.
///
/// # Related Types
///
/// - [`NativePeer`] - Where flushed operations go
/// - [`crate::registry::ProxyStore`] - How inbound events find their target
pub struct NativeBridge {
    peer: Mutex<Box<dyn NativePeer>>,
    queue: Mutex<Vec<Operation>>,
    cache: RwLock<HashMap<Cid, ValueMap>>,
    before_flush: Mutex<Option<FlushHook>>,
    in_flush_hook: AtomicBool,
    store: Arc<ProxyStore>,
}

impl NativeBridge {
    /// Create a bridge around a peer, with a fresh object registry.
    pub fn new(peer: Box<dyn NativePeer>) -> Self {
        Self {
            peer: Mutex::new(peer),
            queue: Mutex::new(Vec::new()),
            cache: RwLock::new(HashMap::new()),
            before_flush: Mutex::new(None),
            in_flush_hook: AtomicBool::new(false),
            store: Arc::new(ProxyStore::new()),
        }
    }

    /// The object registry resolving inbound events.
    pub fn store(&self) -> &Arc<ProxyStore> {
        &self.store
    }

    /// Install the hook invoked before each non-empty flush drains.
    ///
    /// The surrounding framework uses this as its layout signal: batched
    /// visual property changes are reconciled before being sent. The hook
    /// may enqueue further operations; those are included in the same flush.
    /// A flush triggered from inside the hook does not re-enter it.
    pub fn set_before_flush<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.before_flush.lock() = Some(Arc::new(hook));
    }

    // =========================================================================
    // Deferred operations
    // =========================================================================

    /// Enqueue the creation of a native object.
    ///
    /// The initial properties seed the cache, so reads of a property passed
    /// at construction never round-trip.
    pub fn create(&self, cid: &Cid, type_name: &str, properties: ValueMap) {
        tracing::trace!(target: "veneer_core::bridge", %cid, type_name, "enqueue create");
        if !properties.is_empty() {
            self.cache
                .write()
                .entry(cid.clone())
                .or_default()
                .extend(properties.clone());
        }
        self.queue.lock().push(Operation::Create {
            cid: cid.clone(),
            type_name: type_name.to_string(),
            properties,
        });
    }

    /// Enqueue a property update.
    ///
    /// Merges into the immediately prior record when that record targets the
    /// same object (whether a pending `Create` or `Set`); the later value
    /// wins per key. The cache is updated optimistically.
    pub fn set(&self, cid: &Cid, properties: ValueMap) {
        if properties.is_empty() {
            return;
        }
        tracing::trace!(target: "veneer_core::bridge", %cid, keys = properties.len(), "enqueue set");
        self.cache
            .write()
            .entry(cid.clone())
            .or_default()
            .extend(properties.clone());

        let mut queue = self.queue.lock();
        match queue.last_mut() {
            Some(Operation::Create {
                cid: open,
                properties: open_props,
                ..
            })
            | Some(Operation::Set {
                cid: open,
                properties: open_props,
            }) if open == cid => {
                open_props.extend(properties);
            }
            _ => queue.push(Operation::Set {
                cid: cid.clone(),
                properties,
            }),
        }
    }

    /// Enqueue an event-delivery toggle.
    pub fn listen(&self, cid: &Cid, event: &str, enabled: bool) {
        tracing::trace!(target: "veneer_core::bridge", %cid, event, enabled, "enqueue listen");
        self.queue.lock().push(Operation::Listen {
            cid: cid.clone(),
            event: event.to_string(),
            enabled,
        });
    }

    /// Enqueue the destruction of a native object and drop its cache entry.
    pub fn destroy(&self, cid: &Cid) {
        tracing::trace!(target: "veneer_core::bridge", %cid, "enqueue destroy");
        self.cache.write().remove(cid);
        self.queue.lock().push(Operation::Destroy { cid: cid.clone() });
    }

    // =========================================================================
    // Synchronous reads
    // =========================================================================

    /// Read a property, serving it from the cache when possible.
    ///
    /// A cache miss flushes the queue and round-trips to the peer; the
    /// result is cached.
    pub fn get(&self, cid: &Cid, property: &str) -> Value {
        if let Some(value) = self.cached(cid, property) {
            tracing::trace!(target: "veneer_core::bridge", %cid, property, "cache hit");
            return value;
        }
        self.fetch(cid, property)
    }

    /// Read a property from the peer, bypassing the cache.
    ///
    /// Used for properties whose declarations opt out of caching. The
    /// result still refreshes the cache.
    pub fn fetch(&self, cid: &Cid, property: &str) -> Value {
        self.flush();
        let value = self.peer.lock().get(cid, property);
        self.cache
            .write()
            .entry(cid.clone())
            .or_default()
            .insert(property.to_string(), value.clone());
        value
    }

    /// Invoke a method on a native object.
    ///
    /// Like `get`, this flushes first so the peer observes every queued
    /// operation before the call.
    pub fn call(&self, cid: &Cid, method: &str, parameters: ValueMap) -> Value {
        self.flush();
        self.peer.lock().call(cid, method, &parameters)
    }

    // =========================================================================
    // Flushing
    // =========================================================================

    /// Drain all queued operations to the peer in FIFO order.
    ///
    /// A no-op when the queue is empty. Otherwise the before-flush hook runs
    /// first (at most once, non-reentrantly), and any operations it enqueues
    /// are included in the same drain.
    pub fn flush(&self) {
        if self.queue.lock().is_empty() {
            return;
        }

        if !self.in_flush_hook.swap(true, Ordering::SeqCst) {
            let hook = self.before_flush.lock().clone();
            if let Some(hook) = hook {
                hook();
            }
            self.in_flush_hook.store(false, Ordering::SeqCst);
        }

        loop {
            let operations = std::mem::take(&mut *self.queue.lock());
            if operations.is_empty() {
                break;
            }
            tracing::debug!(
                target: "veneer_core::bridge",
                count = operations.len(),
                "flushing operations"
            );
            self.peer.lock().flush(&operations);
        }
    }

    // =========================================================================
    // Cache
    // =========================================================================

    /// The last-known value of a property, if any.
    pub fn cached(&self, cid: &Cid, property: &str) -> Option<Value> {
        self.cache
            .read()
            .get(cid)
            .and_then(|props| props.get(property))
            .cloned()
    }

    /// Record a property value reported by the peer (for example through a
    /// property-change event), without enqueuing anything.
    pub fn cache_put(&self, cid: &Cid, property: &str, value: Value) {
        self.cache
            .write()
            .entry(cid.clone())
            .or_default()
            .insert(property.to_string(), value);
    }

    // =========================================================================
    // Inbound events
    // =========================================================================

    /// Dispatch a native-originated event to its target object.
    ///
    /// Resolves the cid through the registry and forwards to the object's
    /// [`on_notify`](crate::registry::NativeBacked::on_notify). Events for
    /// unknown cids are logged and dropped.
    pub fn notify(&self, cid: &Cid, event: &str, payload: &Value) -> Option<Value> {
        match self.store.find(cid) {
            Some(object) => object.on_notify(event, payload),
            None => {
                tracing::warn!(
                    target: "veneer_core::bridge",
                    %cid,
                    event,
                    "notify for unknown object"
                );
                None
            }
        }
    }
}

static_assertions::assert_impl_all!(NativeBridge: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NativeBacked;

    fn bridge() -> (NativeBridge, RecordingPeer) {
        let peer = RecordingPeer::new();
        (NativeBridge::new(Box::new(peer.clone())), peer)
    }

    fn props(entries: &[(&str, Value)]) -> ValueMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_flush_empty_queue_is_noop() {
        let (bridge, peer) = bridge();
        bridge.flush();
        assert!(peer.calls().is_empty());
    }

    #[test]
    fn test_consecutive_sets_merge() {
        let (bridge, peer) = bridge();
        let cid = Cid::new("o1");
        bridge.set(&cid, props(&[("a", 1.into()), ("b", 2.into())]));
        bridge.set(&cid, props(&[("b", 3.into()), ("c", 4.into())]));
        bridge.flush();

        let calls = peer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            PeerCall::Set {
                cid,
                properties: props(&[("a", 1.into()), ("b", 3.into()), ("c", 4.into())]),
            }
        );
    }

    #[test]
    fn test_set_after_create_merges_into_creation() {
        let (bridge, peer) = bridge();
        let cid = Cid::new("o1");
        bridge.create(&cid, "Composite", props(&[("a", 1.into())]));
        bridge.set(&cid, props(&[("b", 2.into())]));
        bridge.flush();

        let calls = peer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            PeerCall::Create {
                cid,
                type_name: "Composite".into(),
                properties: props(&[("a", 1.into()), ("b", 2.into())]),
            }
        );
    }

    #[test]
    fn test_intervening_operation_prevents_merge() {
        let (bridge, peer) = bridge();
        let a = Cid::new("o1");
        let b = Cid::new("o2");
        bridge.set(&a, props(&[("x", 1.into())]));
        bridge.set(&b, props(&[("x", 2.into())]));
        bridge.set(&a, props(&[("y", 3.into())]));
        bridge.flush();
        assert_eq!(peer.calls().len(), 3);
    }

    #[test]
    fn test_fifo_order_preserved() {
        let (bridge, peer) = bridge();
        let a = Cid::new("o1");
        let b = Cid::new("o2");
        bridge.create(&a, "Page", ValueMap::new());
        bridge.listen(&a, "tap", true);
        bridge.create(&b, "Button", ValueMap::new());
        bridge.destroy(&a);
        bridge.flush();

        let kinds: Vec<_> = peer
            .calls()
            .iter()
            .map(|c| match c {
                PeerCall::Create { cid, .. } => format!("create {cid}"),
                PeerCall::Listen { cid, .. } => format!("listen {cid}"),
                PeerCall::Destroy { cid } => format!("destroy {cid}"),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(kinds, ["create o1", "listen o1", "create o2", "destroy o1"]);
    }

    #[test]
    fn test_flush_replays_listen_toggles() {
        let (bridge, peer) = bridge();
        let cid = Cid::new("o1");
        bridge.listen(&cid, "tap", true);
        bridge.listen(&cid, "tap", false);
        bridge.flush();

        let toggles: Vec<bool> = peer
            .calls()
            .iter()
            .filter_map(|c| match c {
                PeerCall::Listen { enabled, .. } => Some(*enabled),
                _ => None,
            })
            .collect();
        assert_eq!(toggles, [true, false]);
    }

    #[test]
    fn test_cache_answers_reads_after_set() {
        let (bridge, peer) = bridge();
        let cid = Cid::new("o1");
        bridge.set(&cid, props(&[("text", "hi".into())]));
        assert_eq!(bridge.get(&cid, "text"), Value::from("hi"));
        // The flush carried the set, but no native get was needed.
        assert!(!peer
            .calls()
            .iter()
            .any(|c| matches!(c, PeerCall::Get { .. })));
    }

    #[test]
    fn test_get_miss_flushes_then_round_trips() {
        let (bridge, peer) = bridge();
        let cid = Cid::new("o1");
        peer.stub_get(&cid, "bounds", Value::from(vec![0.into(), 0.into()]));
        bridge.set(&cid, props(&[("text", "hi".into())]));
        let value = bridge.get(&cid, "bounds");
        assert_eq!(value, Value::from(vec![Value::from(0), Value::from(0)]));

        let calls = peer.calls();
        // The queued set was flushed before the read was issued.
        assert!(matches!(calls[0], PeerCall::Set { .. }));
        assert!(matches!(calls[1], PeerCall::Get { .. }));
        // The result is now cached.
        peer.clear();
        bridge.get(&cid, "bounds");
        assert!(peer.calls().is_empty());
    }

    #[test]
    fn test_fetch_bypasses_cache() {
        let (bridge, peer) = bridge();
        let cid = Cid::new("o1");
        bridge.set(&cid, props(&[("scroll", 10.into())]));
        peer.stub_get(&cid, "scroll", 99.into());
        assert_eq!(bridge.fetch(&cid, "scroll"), Value::from(99));
        // And the fetched value refreshed the cache.
        assert_eq!(bridge.cached(&cid, "scroll"), Some(Value::from(99)));
    }

    #[test]
    fn test_destroy_drops_cache() {
        let (bridge, _peer) = bridge();
        let cid = Cid::new("o1");
        bridge.set(&cid, props(&[("text", "hi".into())]));
        bridge.destroy(&cid);
        assert_eq!(bridge.cached(&cid, "text"), None);
    }

    #[test]
    fn test_call_flushes_first() {
        let (bridge, peer) = bridge();
        let cid = Cid::new("o1");
        peer.stub_call(&cid, "measure", 42.into());
        bridge.set(&cid, props(&[("text", "hi".into())]));
        let result = bridge.call(&cid, "measure", ValueMap::new());
        assert_eq!(result, Value::from(42));
        let calls = peer.calls();
        assert!(matches!(calls[0], PeerCall::Set { .. }));
        assert!(matches!(calls[1], PeerCall::Call { .. }));
    }

    #[test]
    fn test_before_flush_hook_runs_once_and_may_enqueue() {
        let (bridge, peer) = bridge();
        let bridge = Arc::new(bridge);
        let cid = Cid::new("o1");

        let hook_bridge = Arc::downgrade(&bridge);
        let layout_cid = Cid::new("o.layout");
        bridge.set_before_flush(move || {
            if let Some(bridge) = hook_bridge.upgrade() {
                bridge.set(
                    &layout_cid,
                    [("bounds".to_string(), Value::from(1))].into_iter().collect(),
                );
            }
        });

        bridge.set(&cid, props(&[("text", "hi".into())]));
        bridge.flush();

        let calls = peer.calls();
        assert_eq!(calls.len(), 2);
        // The hook's operation rides along in the same flush.
        assert!(calls
            .iter()
            .any(|c| matches!(c, PeerCall::Set { cid, .. } if cid.as_str() == "o.layout")));
    }

    struct Echo {
        cid: Cid,
    }

    impl NativeBacked for Echo {
        fn cid(&self) -> &Cid {
            &self.cid
        }

        fn type_name(&self) -> &str {
            "Echo"
        }

        fn on_notify(&self, event: &str, payload: &Value) -> Option<Value> {
            assert_eq!(event, "ping");
            Some(payload.clone())
        }
    }

    #[test]
    fn test_notify_resolves_through_registry() {
        let (bridge, _peer) = bridge();
        let object: Arc<dyn NativeBacked> = Arc::new(Echo { cid: Cid::new("o9") });
        let cid = bridge
            .store()
            .register(Arc::downgrade(&object), Some(Cid::new("o9")))
            .unwrap();

        let result = bridge.notify(&cid, "ping", &Value::from(5));
        assert_eq!(result, Some(Value::from(5)));

        // Unknown cids are dropped.
        assert_eq!(bridge.notify(&Cid::new("nope"), "ping", &Value::Null), None);
    }
}
