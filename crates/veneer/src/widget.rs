//! Widget composition.
//!
//! A [`Widget`] wraps a [`Proxy`] with tree state: a weak parent pointer
//! and an ordered child list, kept consistent by construction. Composition
//! is gated by the parent type's [`ChildPolicy`]; re-parenting detaches
//! first (firing `removechild` on the old parent), enqueues the native
//! parent assignment, then attaches (firing `addchild`). Disposing a
//! widget cascades over its subtree with pre-order event emission: the
//! parent's `dispose` fires before its children's, and a child's subtree
//! completes before the next sibling starts.
//!
//! Widgets deref to their proxy, so the whole property and event surface
//! is available directly.
//!
//! # Key Types
//!
//! - [`Widget`] - The composable handle
//! - [`crate::selector::Selector`] - How subtrees are queried
//! - [`crate::descriptor::ChildPolicy`] - What a parent accepts

use std::fmt::Write as _;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use veneer_core::{Value, ValueMap};

use crate::context::Context;
use crate::descriptor::TypeInfo;
use crate::error::{Error, Result};
use crate::proxy::Proxy;
use crate::selector::Selector;

struct TreeState {
    parent: Weak<WidgetInner>,
    children: Vec<Widget>,
    id: String,
    classes: Vec<String>,
}

impl Default for TreeState {
    fn default() -> Self {
        Self {
            parent: Weak::new(),
            children: Vec::new(),
            id: String::new(),
            classes: Vec::new(),
        }
    }
}

struct WidgetInner {
    proxy: Proxy,
    tree: Mutex<TreeState>,
}

/// A native-backed object that participates in the widget tree.
#[derive(Clone)]
pub struct Widget {
    inner: Arc<WidgetInner>,
}

impl Widget {
    /// Construct a widget of the described type. See [`Proxy::create`].
    pub fn create(context: &Context, info: Arc<TypeInfo>, properties: ValueMap) -> Result<Widget> {
        let proxy = Proxy::create(context, info, properties)?;
        Ok(Widget {
            inner: Arc::new(WidgetInner {
                proxy,
                tree: Mutex::new(TreeState::default()),
            }),
        })
    }

    /// The underlying proxy handle.
    pub fn proxy(&self) -> &Proxy {
        &self.inner.proxy
    }

    // =========================================================================
    // Composition
    // =========================================================================

    /// Append widgets as the last children, in the order given.
    ///
    /// Each child is checked against this type's child policy, detached
    /// from its old parent (firing `removechild` there), assigned its new
    /// native parent, and attached (firing `addchild` here).
    pub fn append<I>(&self, children: I) -> Result<()>
    where
        I: IntoIterator<Item = Widget>,
    {
        self.inner.proxy.ensure_live()?;
        for child in children {
            self.append_one(&child)?;
        }
        Ok(())
    }

    /// Append this widget to a parent. Mirror of [`append`](Widget::append).
    pub fn append_to(&self, parent: &Widget) -> Result<()> {
        parent.append([self.clone()])
    }

    fn append_one(&self, child: &Widget) -> Result<()> {
        child.inner.proxy.ensure_live()?;
        if !self
            .inner
            .proxy
            .type_info()
            .child_policy()
            .accepts(child.type_name())
        {
            return Err(Error::CannotContain {
                parent_type: self.type_name().to_string(),
                child_type: child.type_name().to_string(),
            });
        }

        if let Some(old_parent) = child.parent() {
            old_parent.remove_child(child, true);
        }

        self.inner
            .proxy
            .bridge()
            .set(
                child.cid(),
                [(
                    "parent".to_string(),
                    Value::Reference(self.cid().clone()),
                )]
                .into(),
            );

        let index = {
            let mut tree = self.inner.tree.lock();
            tree.children.push(child.clone());
            tree.children.len() - 1
        };
        child.inner.tree.lock().parent = Arc::downgrade(&self.inner);
        self.inner.proxy.dispatch("addchild", child_payload(child, index));
        Ok(())
    }

    /// The parent widget, if attached.
    pub fn parent(&self) -> Option<Widget> {
        self.inner
            .tree
            .lock()
            .parent
            .upgrade()
            .map(|inner| Widget { inner })
    }

    /// A defensively-copied snapshot of the immediate children, in order.
    pub fn children(&self) -> Vec<Widget> {
        self.inner.tree.lock().children.clone()
    }

    /// The immediate children matching a selector.
    pub fn children_matching(&self, selector: &Selector) -> Vec<Widget> {
        self.children()
            .into_iter()
            .filter(|child| child.matches(selector))
            .collect()
    }

    /// Every descendant matching a selector, unbounded depth, pre-order.
    pub fn find(&self, selector: &Selector) -> Vec<Widget> {
        let mut out = Vec::new();
        self.collect_matching(selector, &mut out);
        out
    }

    fn collect_matching(&self, selector: &Selector, out: &mut Vec<Widget>) {
        for child in self.children() {
            if child.matches(selector) {
                out.push(child.clone());
            }
            child.collect_matching(selector, out);
        }
    }

    /// Whether this widget matches a selector.
    pub fn matches(&self, selector: &Selector) -> bool {
        let tree = self.inner.tree.lock();
        selector.matches(self.inner.proxy.type_name(), &tree.id, &tree.classes)
    }

    /// Apply `(selector, properties)` rules over this widget and its
    /// descendants.
    pub fn apply(&self, rules: &[(&str, ValueMap)]) -> Result<()> {
        for (text, properties) in rules {
            let selector = Selector::parse(text)?;
            if self.matches(&selector) {
                self.set_many(properties.clone())?;
            }
            for widget in self.find(&selector) {
                widget.set_many(properties.clone())?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Selector attributes
    // =========================================================================

    /// The widget's id, used by `#id` selectors. Empty when unset.
    pub fn id(&self) -> String {
        self.inner.tree.lock().id.clone()
    }

    pub fn set_id(&self, id: impl Into<String>) {
        self.inner.tree.lock().id = id.into();
    }

    /// The widget's classes, used by `.class` selectors.
    pub fn classes(&self) -> Vec<String> {
        self.inner.tree.lock().classes.clone()
    }

    pub fn add_class(&self, class: impl Into<String>) {
        let class = class.into();
        let mut tree = self.inner.tree.lock();
        if !tree.classes.contains(&class) {
            tree.classes.push(class);
        }
    }

    pub fn remove_class(&self, class: &str) {
        self.inner.tree.lock().classes.retain(|c| c != class);
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    /// Dispose this widget and its whole subtree.
    ///
    /// The widget silently detaches from its parent (no `removechild`),
    /// then the subtree is disposed depth-first with `dispose` events in
    /// pre-order: this widget, then each child's subtree in order.
    pub fn dispose(&self) {
        if self.inner.proxy.is_disposed() {
            return;
        }
        if let Some(parent) = self.parent() {
            parent.remove_child(self, false);
        }
        self.dispose_subtree();
    }

    fn dispose_subtree(&self) {
        self.inner.proxy.dispose();
        let children = std::mem::take(&mut self.inner.tree.lock().children);
        for child in children {
            child.inner.tree.lock().parent = Weak::new();
            child.dispose_subtree();
        }
    }

    fn remove_child(&self, child: &Widget, fire_event: bool) {
        let removed = {
            let mut tree = self.inner.tree.lock();
            tree.children
                .iter()
                .position(|c| c == child)
                .map(|index| (tree.children.remove(index), index))
        };
        if let Some((child, index)) = removed {
            child.inner.tree.lock().parent = Weak::new();
            if fire_event {
                self.inner
                    .proxy
                    .dispatch("removechild", child_payload(&child, index));
            }
        }
    }

    // =========================================================================
    // Debugging
    // =========================================================================

    /// An indented rendering of the live subtree, for logs and debugging.
    pub fn dump_tree(&self) -> String {
        let mut out = String::new();
        self.dump_node(0, &mut out);
        out
    }

    fn dump_node(&self, depth: usize, out: &mut String) {
        let tree = self.inner.tree.lock();
        let _ = write!(
            out,
            "{:indent$}{} ({})",
            "",
            self.inner.proxy.type_name(),
            self.cid(),
            indent = depth * 2
        );
        if !tree.id.is_empty() {
            let _ = write!(out, " #{}", tree.id);
        }
        for class in &tree.classes {
            let _ = write!(out, " .{class}");
        }
        out.push('\n');
        let children = tree.children.clone();
        drop(tree);
        for child in children {
            child.dump_node(depth + 1, out);
        }
    }
}

fn child_payload(child: &Widget, index: usize) -> Value {
    Value::Map(
        [
            ("child".to_string(), Value::Reference(child.cid().clone())),
            ("index".to_string(), Value::Int(index as i64)),
        ]
        .into(),
    )
}

impl Deref for Widget {
    type Target = Proxy;

    fn deref(&self) -> &Proxy {
        &self.inner.proxy
    }
}

impl PartialEq for Widget {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("type_name", &self.type_name())
            .field("cid", self.cid())
            .field("children", &self.inner.tree.lock().children.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(Widget: Send, Sync);
