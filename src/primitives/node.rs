// ============================================================================
// spark-viewmodel - Observable Node
// The listenable unit every reactive value is built on
// ============================================================================
//
// A node owns a list of listener registrations and a disposed flag. Disposal
// is permissive: it clears listeners and marks the node, but the node keeps
// working afterwards. Notification always iterates a snapshot taken at the
// start of the call, so listeners may add or remove registrations (their own
// or others') while being notified.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::core::context::with_context;
use crate::core::types::{Listener, NodeId, Observable, ResettableNode};

// =============================================================================
// NODE INNER
// =============================================================================

struct Registration {
    key: u64,
    listener: Listener,
}

struct NodeInner {
    id: NodeId,
    label: Option<&'static str>,
    registrations: RefCell<Vec<Registration>>,
    next_key: Cell<u64>,
    disposed: Cell<bool>,
}

impl NodeInner {
    fn remove_key(&self, key: u64) -> bool {
        let mut regs = self.registrations.borrow_mut();
        match regs.iter().position(|r| r.key == key) {
            Some(index) => {
                regs.remove(index);
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// OBSERVABLE NODE
// =============================================================================

/// Base listenable unit with add/remove/notify/dispose.
///
/// Cloning yields another handle to the same node. Equality and hashing use
/// the node's [`NodeId`].
///
/// # Example
///
/// ```
/// use spark_viewmodel::ObservableNode;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let node = ObservableNode::new();
/// let hits = Rc::new(Cell::new(0));
/// let h = hits.clone();
/// let handle = node.add_listener(move || h.set(h.get() + 1));
///
/// node.notify();
/// handle.dispose();
/// node.notify();
/// assert_eq!(hits.get(), 1);
/// ```
#[derive(Clone)]
pub struct ObservableNode {
    inner: Rc<NodeInner>,
}

impl ObservableNode {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a node with a label used in tracing and `Debug` output.
    pub fn labeled(label: &'static str) -> Self {
        Self::build(Some(label))
    }

    fn build(label: Option<&'static str>) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                id: with_context(|ctx| ctx.next_node_id()),
                label,
                registrations: RefCell::new(Vec::new()),
                next_key: Cell::new(0),
                disposed: Cell::new(false),
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    pub fn label(&self) -> Option<&'static str> {
        self.inner.label
    }

    /// Register a callback. Each call is an independent registration, even
    /// for the same callback.
    pub fn add_listener(&self, listener: impl Fn() + 'static) -> ListenerHandle {
        self.add_listener_rc(Rc::new(listener))
    }

    /// Register an already shared listener. The same `Rc` may later be passed
    /// to [`remove_listener`](Self::remove_listener).
    pub fn add_listener_rc(&self, listener: Listener) -> ListenerHandle {
        let key = self.inner.next_key.get();
        self.inner.next_key.set(key + 1);
        self.inner
            .registrations
            .borrow_mut()
            .push(Registration { key, listener });

        ListenerHandle {
            node: Rc::downgrade(&self.inner),
            key,
            active: Cell::new(true),
        }
    }

    /// Remove one registration of `listener` (the earliest). Returns whether
    /// a registration was found.
    pub fn remove_listener(&self, listener: &Listener) -> bool {
        let mut regs = self.inner.registrations.borrow_mut();
        match regs.iter().position(|r| Rc::ptr_eq(&r.listener, listener)) {
            Some(index) => {
                regs.remove(index);
                true
            }
            None => false,
        }
    }

    /// Invoke every registered listener in registration order.
    ///
    /// The set of listeners is fixed when the call starts. Registrations
    /// added or removed by a listener take effect from the next `notify()`.
    pub fn notify(&self) {
        let snapshot: Vec<Listener> = self
            .inner
            .registrations
            .borrow()
            .iter()
            .map(|r| r.listener.clone())
            .collect();

        trace!(node = %self.inner.id, label = ?self.inner.label, listeners = snapshot.len(), "notify");

        for listener in snapshot {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.registrations.borrow().len()
    }

    pub fn has_listeners(&self) -> bool {
        self.listener_count() > 0
    }

    /// Clear all listeners and mark the node disposed. Safe to repeat.
    pub fn dispose(&self) {
        if !self.inner.disposed.replace(true) {
            trace!(node = %self.inner.id, label = ?self.inner.label, "dispose");
        }
        self.inner.registrations.borrow_mut().clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Non-owning handle to this node.
    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Default for ObservableNode {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ObservableNode {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ObservableNode {}

impl Hash for ObservableNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for ObservableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableNode")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("listeners", &self.listener_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Observable for ObservableNode {
    fn node(&self) -> &ObservableNode {
        self
    }
}

impl ResettableNode for ObservableNode {
    fn dispose(&self) {
        ObservableNode::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        ObservableNode::is_disposed(self)
    }
}

// =============================================================================
// WEAK NODE
// =============================================================================

/// Non-owning reference to an [`ObservableNode`].
#[derive(Clone)]
pub struct WeakNode {
    inner: Weak<NodeInner>,
}

impl WeakNode {
    pub fn upgrade(&self) -> Option<ObservableNode> {
        self.inner.upgrade().map(|inner| ObservableNode { inner })
    }
}

// =============================================================================
// LISTENER HANDLE
// =============================================================================

/// Disposer returned by [`ObservableNode::add_listener`].
///
/// `dispose()` removes exactly the registration that produced this handle.
/// Dropping the handle does not unsubscribe.
pub struct ListenerHandle {
    node: Weak<NodeInner>,
    key: u64,
    active: Cell<bool>,
}

impl ListenerHandle {
    /// Remove the registration. Returns false if it was already removed
    /// (by this handle, by `dispose()` on the node, or because the node is gone).
    pub fn dispose(&self) -> bool {
        if !self.active.replace(false) {
            return false;
        }
        match self.node.upgrade() {
            Some(node) => node.remove_key(self.key),
            None => false,
        }
    }

    /// Whether `dispose()` has been called on this handle.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("key", &self.key)
            .field("active", &self.active.get())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
