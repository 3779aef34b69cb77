//! Events and listener bookkeeping.
//!
//! Every notification an object delivers, whether native-originated or
//! purely local (`dispose`, `addchild`, property changes), arrives at
//! listeners as an [`Event`]. Listeners are tracked in a [`ListenerTable`]
//! grouped by *canonical* event name: an alias subscription counts toward
//! its primary name's total, which is what drives native `listen(true)` /
//! `listen(false)` toggling — exactly one toggle on the 0-to-1 and 1-to-0
//! transitions.
//!
//! # Key Types
//!
//! - [`Event`] - What listeners receive
//! - [`ListenerId`] - Handle for unsubscribing
//! - [`ListenerTable`] - Refcounted per-canonical-name listener storage

use std::sync::Arc;

use slotmap::SlotMap;
use veneer_core::{Cid, Value};

slotmap::new_key_type! {
    /// Identifies a registered listener for later removal.
    pub struct ListenerId;
}

/// A notification delivered to listeners.
///
/// `name` is the name the listener subscribed under, so a listener attached
/// through an alias observes the alias, not the primary name.
#[derive(Clone, Debug)]
pub struct Event {
    /// The object the event occurred on.
    pub target: Cid,
    /// The event name as subscribed.
    pub name: String,
    /// Event data; [`Value::Null`] when the event carries none.
    pub payload: Value,
}

/// A listener callback.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

struct ListenerEntry {
    canonical: String,
    subscribed: String,
    callback: Listener,
    /// Registration sequence; slot order is not stable once freed slots
    /// get reused.
    order: u64,
}

/// Listener storage with per-canonical-name refcounting.
#[derive(Default)]
pub struct ListenerTable {
    entries: SlotMap<ListenerId, ListenerEntry>,
    next_order: u64,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under `canonical`, remembering the name it was
    /// subscribed with. Returns the id and whether this is the first
    /// listener for the canonical name.
    pub fn add(
        &mut self,
        canonical: impl Into<String>,
        subscribed: impl Into<String>,
        callback: Listener,
    ) -> (ListenerId, bool) {
        let canonical = canonical.into();
        let first = self.count(&canonical) == 0;
        let order = self.next_order;
        self.next_order += 1;
        let id = self.entries.insert(ListenerEntry {
            canonical,
            subscribed: subscribed.into(),
            callback,
            order,
        });
        (id, first)
    }

    /// Remove a listener. Unknown ids are a no-op.
    ///
    /// Returns the canonical name, the subscribed name, and whether this was
    /// the last listener for the canonical name.
    pub fn remove(&mut self, id: ListenerId) -> Option<(String, String, bool)> {
        let entry = self.entries.remove(id)?;
        let last = self.count(&entry.canonical) == 0;
        Some((entry.canonical, entry.subscribed, last))
    }

    /// The number of listeners registered for a canonical name.
    pub fn count(&self, canonical: &str) -> usize {
        self.entries
            .values()
            .filter(|e| e.canonical == canonical)
            .count()
    }

    /// A snapshot of the listeners for a canonical name, in registration
    /// order, paired with the name each subscribed under.
    ///
    /// Snapshotting lets callers invoke callbacks without holding the lock
    /// that guards this table.
    pub fn snapshot(&self, canonical: &str) -> Vec<(String, Listener)> {
        let mut entries: Vec<&ListenerEntry> = self
            .entries
            .values()
            .filter(|e| e.canonical == canonical)
            .collect();
        entries.sort_by_key(|e| e.order);
        entries
            .into_iter()
            .map(|e| (e.subscribed.clone(), Arc::clone(&e.callback)))
            .collect()
    }

    /// Drop every listener.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
