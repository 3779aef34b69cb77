//! The explicit application context.
//!
//! There is no ambient global state: a [`Context`] is created once at
//! startup from a [`NativePeer`] and threaded into everything that needs
//! the bridge or the codec table. Tests construct isolated contexts
//! around a [`veneer_core::RecordingPeer`].
//!
//! # Example
//!
//! ```
//! use veneer::context::Context;
//! use veneer_core::RecordingPeer;
//!
//! let context = Context::new(Box::new(RecordingPeer::new()));
//! context.flush();
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use veneer_core::{
    Cid, CodecRegistry, NativeBacked, NativeBridge, NativePeer, Value,
};

use crate::descriptor::{TypeDescriptor, TypeInfo};
use crate::error::Result;

type LayoutHook = Arc<dyn Fn() + Send + Sync>;

/// The dependency root: one bridge, one codec table.
#[derive(Clone)]
pub struct Context {
    bridge: Arc<NativeBridge>,
    codecs: Arc<CodecRegistry>,
    layout_hooks: Arc<Mutex<Vec<LayoutHook>>>,
}

impl Context {
    /// Create a context around a native peer, with the stock codecs.
    pub fn new(peer: Box<dyn NativePeer>) -> Self {
        Self::with_codecs(peer, CodecRegistry::with_builtins())
    }

    /// Create a context with a custom codec table.
    pub fn with_codecs(peer: Box<dyn NativePeer>, codecs: CodecRegistry) -> Self {
        let bridge = Arc::new(NativeBridge::new(peer));
        let layout_hooks: Arc<Mutex<Vec<LayoutHook>>> = Arc::new(Mutex::new(Vec::new()));
        let hooks = Arc::clone(&layout_hooks);
        bridge.set_before_flush(move || {
            let snapshot: Vec<LayoutHook> = hooks.lock().clone();
            for hook in snapshot {
                hook();
            }
        });
        Self {
            bridge,
            codecs: Arc::new(codecs),
            layout_hooks,
        }
    }

    pub fn bridge(&self) -> &Arc<NativeBridge> {
        &self.bridge
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    /// Resolve a type declaration against this context's codec table.
    pub fn resolve(&self, descriptor: TypeDescriptor) -> Result<Arc<TypeInfo>> {
        Ok(descriptor.resolve(&self.codecs)?)
    }

    /// Send every queued operation to the peer.
    pub fn flush(&self) {
        self.bridge.flush();
    }

    /// Deliver a native-originated event to its target object.
    pub fn notify(&self, cid: &Cid, event: &str, payload: &Value) -> Option<Value> {
        self.bridge.notify(cid, event, payload)
    }

    /// Look up a live object by cid.
    pub fn find(&self, cid: &Cid) -> Option<Arc<dyn NativeBacked>> {
        self.bridge.store().find(cid)
    }

    /// Register a hook run before each non-empty flush drains.
    ///
    /// This is the layout signal: batched visual property changes get one
    /// chance to reconcile before the queue is sent.
    pub fn on_layout<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.layout_hooks.lock().push(Arc::new(hook));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use veneer_core::{RecordingPeer, Value, ValueMap};

    use super::*;

    #[test]
    fn test_isolated_contexts_share_nothing() {
        let a = Context::new(Box::new(RecordingPeer::new()));
        let b = Context::new(Box::new(RecordingPeer::new()));
        let info = a.resolve(TypeDescriptor::new("TestType")).unwrap();
        let proxy = crate::proxy::Proxy::create(&a, info, ValueMap::new()).unwrap();
        assert!(a.find(proxy.cid()).is_some());
        assert!(b.find(proxy.cid()).is_none());
    }

    #[test]
    fn test_layout_hooks_run_once_per_flush() {
        let peer = RecordingPeer::new();
        let context = Context::new(Box::new(peer.clone()));
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        context.on_layout(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Empty queue: flush is a no-op and the hook must not run.
        context.flush();
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let cid = context.bridge().store().next_cid();
        context.bridge().create(&cid, "TestType", ValueMap::new());
        context.flush();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notify_unknown_cid_is_dropped() {
        let context = Context::new(Box::new(RecordingPeer::new()));
        assert_eq!(
            context.notify(&Cid::new("missing"), "tap", &Value::Null),
            None
        );
    }
}
