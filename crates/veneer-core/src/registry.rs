//! Object registry for Veneer.
//!
//! The registry maps each [`Cid`] to its live in-process object. It is the
//! only lookup mechanism from native callbacks back into application objects:
//! the bridge's [`notify`](crate::bridge::NativeBridge::notify) path resolves
//! cids here, and property encoders use it when translating object references.
//!
//! The registry holds non-owning [`Weak`] references; objects remove
//! themselves on disposal.
//!
//! # Key Types
//!
//! - [`NativeBacked`] - The capability every bridge-backed object exposes
//! - [`ProxyStore`] - The cid-to-object map with cid generation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::{RegistryError, RegistryResult};
use crate::value::{Cid, Value};

/// The capability shared by every bridge-backed object.
///
/// The core layer only needs three things from an object: its identity, its
/// type name for diagnostics, and an entry point for native-originated
/// events. Concrete object behavior (property tables, listener bookkeeping)
/// lives above this seam.
pub trait NativeBacked: Send + Sync {
    /// The object's bridge identifier.
    fn cid(&self) -> &Cid;

    /// The object's declared type name.
    fn type_name(&self) -> &str;

    /// Handle a native-originated event.
    ///
    /// Returns a value to hand back to the native caller, or `None`.
    fn on_notify(&self, event: &str, payload: &Value) -> Option<Value>;
}

/// Maps cids to live objects and generates fresh cids.
///
/// Generated cids are `"o1"`, `"o2"`, ... — unique for the process lifetime.
/// Singleton service objects register under a fixed explicit id instead;
/// registering an id that is already taken fails.
///
/// # Related Types
///
/// - [`NativeBacked`] - What gets registered
/// - [`crate::bridge::NativeBridge`] - Resolves inbound events through this
pub struct ProxyStore {
    objects: RwLock<HashMap<Cid, Weak<dyn NativeBacked>>>,
    next_id: AtomicU64,
}

impl ProxyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Generate a fresh cid.
    pub fn next_cid(&self) -> Cid {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        Cid::new(format!("o{n}"))
    }

    /// Register an object, either under `explicit_id` or under a freshly
    /// generated cid.
    ///
    /// Fails with [`RegistryError::IdInUse`] if the explicit id is already
    /// registered to a live object. A stale entry whose object has been
    /// dropped does not count as in use.
    pub fn register(
        &self,
        object: Weak<dyn NativeBacked>,
        explicit_id: Option<Cid>,
    ) -> RegistryResult<Cid> {
        let mut objects = self.objects.write();
        let cid = match explicit_id {
            Some(cid) => {
                if objects.get(&cid).is_some_and(|w| w.strong_count() > 0) {
                    return Err(RegistryError::IdInUse(cid));
                }
                cid
            }
            None => self.next_cid(),
        };
        objects.insert(cid.clone(), object);
        tracing::trace!(target: "veneer_core::registry", %cid, "registered object");
        Ok(cid)
    }

    /// Look up a live object by cid.
    pub fn find(&self, cid: &Cid) -> Option<Arc<dyn NativeBacked>> {
        self.objects.read().get(cid).and_then(Weak::upgrade)
    }

    /// Remove an object from the store.
    ///
    /// Removal frees the cid for reuse. Removing an unknown cid is a no-op.
    pub fn remove(&self, cid: &Cid) {
        if self.objects.write().remove(cid).is_some() {
            tracing::trace!(target: "veneer_core::registry", %cid, "removed object");
        }
    }

    /// Whether a live object is registered under this cid.
    pub fn contains(&self, cid: &Cid) -> bool {
        self.objects
            .read()
            .get(cid)
            .is_some_and(|w| w.strong_count() > 0)
    }

    /// The number of registered entries (including stale ones not yet
    /// removed).
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl Default for ProxyStore {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(ProxyStore: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    struct TestObject {
        cid: Cid,
    }

    impl NativeBacked for TestObject {
        fn cid(&self) -> &Cid {
            &self.cid
        }

        fn type_name(&self) -> &str {
            "TestType"
        }

        fn on_notify(&self, _event: &str, _payload: &Value) -> Option<Value> {
            None
        }
    }

    fn make(cid: &str) -> Arc<dyn NativeBacked> {
        Arc::new(TestObject { cid: Cid::new(cid) })
    }

    #[test]
    fn test_generated_cids_are_monotonic() {
        let store = ProxyStore::new();
        let a = store.next_cid();
        let b = store.next_cid();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with('o'));
    }

    #[test]
    fn test_register_and_find() {
        let store = ProxyStore::new();
        let obj = make("unused");
        let cid = store.register(Arc::downgrade(&obj), None).unwrap();
        let found = store.find(&cid).expect("object should resolve");
        assert_eq!(found.type_name(), "TestType");
    }

    #[test]
    fn test_explicit_id_collision() {
        let store = ProxyStore::new();
        let a = make("svc.app");
        let b = make("svc.app");
        store
            .register(Arc::downgrade(&a), Some(Cid::new("svc.app")))
            .unwrap();
        let err = store
            .register(Arc::downgrade(&b), Some(Cid::new("svc.app")))
            .unwrap_err();
        assert_eq!(err, RegistryError::IdInUse(Cid::new("svc.app")));
    }

    #[test]
    fn test_id_reusable_after_remove() {
        let store = ProxyStore::new();
        let a = make("svc.app");
        let cid = store
            .register(Arc::downgrade(&a), Some(Cid::new("svc.app")))
            .unwrap();
        store.remove(&cid);
        let b = make("svc.app");
        assert!(store
            .register(Arc::downgrade(&b), Some(Cid::new("svc.app")))
            .is_ok());
    }

    #[test]
    fn test_dropped_object_does_not_resolve() {
        let store = ProxyStore::new();
        let obj = make("unused");
        let cid = store.register(Arc::downgrade(&obj), None).unwrap();
        drop(obj);
        assert!(store.find(&cid).is_none());
        assert!(!store.contains(&cid));
    }
}
