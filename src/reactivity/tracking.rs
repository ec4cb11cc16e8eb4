// ============================================================================
// spark-viewmodel - Dependency Tracking
// Recording sessions that capture which nodes a computation read
// ============================================================================
//
// A session is a frame on the thread-local tracking stack. While it is the
// innermost frame, every `report_access` lands in its AccessSet. Sessions
// nest; an inner session's reads are attributed to the inner session only.
//
// If the tracked callback panics, the frame guard still pops the session and
// parks its partial AccessSet in the context, where `take_abandoned_accesses`
// can pick it up before the unwind is resumed.
// ============================================================================

use std::collections::HashSet;
use std::fmt;

use crate::core::context::{with_context, Frame};
use crate::core::types::{NodeId, Observable};
use crate::primitives::node::ObservableNode;

// =============================================================================
// ACCESS SET
// =============================================================================

/// The distinct nodes read during a tracking session, in first-read order.
#[derive(Clone, Default)]
pub struct AccessSet {
    nodes: Vec<ObservableNode>,
    ids: HashSet<NodeId>,
}

impl AccessSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Returns false if it was already present.
    pub fn insert(&mut self, node: ObservableNode) -> bool {
        if self.ids.insert(node.id()) {
            self.nodes.push(node);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, node: &ObservableNode) -> bool {
        self.ids.contains(&node.id())
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObservableNode> {
        self.nodes.iter()
    }

    /// Nodes in `self` that are not in `other`.
    pub fn difference(&self, other: &AccessSet) -> Vec<ObservableNode> {
        self.nodes
            .iter()
            .filter(|node| !other.contains(node))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.ids.clear();
    }
}

impl IntoIterator for AccessSet {
    type Item = ObservableNode;
    type IntoIter = std::vec::IntoIter<ObservableNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl FromIterator<ObservableNode> for AccessSet {
    fn from_iter<I: IntoIterator<Item = ObservableNode>>(iter: I) -> Self {
        let mut set = AccessSet::new();
        for node in iter {
            set.insert(node);
        }
        set
    }
}

impl fmt::Debug for AccessSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.nodes.iter().map(|n| n.id()))
            .finish()
    }
}

// =============================================================================
// FRAME GUARD
// =============================================================================

/// Pops its frame on drop. If the scope ended by unwinding, a recording
/// frame's partial set is parked as the abandoned session.
struct FrameGuard {
    finished: bool,
}

impl FrameGuard {
    fn push(frame: Frame) -> Self {
        with_context(|ctx| ctx.push_frame(frame));
        Self { finished: false }
    }

    fn finish(mut self) -> AccessSet {
        self.finished = true;
        match with_context(|ctx| ctx.pop_frame()) {
            Some(Frame::Recording(set)) => set,
            _ => AccessSet::new(),
        }
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        with_context(|ctx| {
            if let Some(Frame::Recording(set)) = ctx.pop_frame() {
                ctx.set_abandoned(set);
            }
        });
    }
}

// =============================================================================
// TRACKING API
// =============================================================================

/// Run `f` inside a new tracking session.
///
/// Returns the callback's result together with every distinct node read
/// while it ran (reads inside nested sessions excluded).
///
/// # Example
///
/// ```
/// use spark_viewmodel::{track, ObservableValue};
///
/// let a = ObservableValue::new(1);
/// let b = ObservableValue::new(2);
/// let (sum, accessed) = track(|| a.get() + b.get() + a.get());
/// assert_eq!(sum, 4);
/// assert_eq!(accessed.len(), 2);
/// ```
pub fn track<R>(f: impl FnOnce() -> R) -> (R, AccessSet) {
    let guard = FrameGuard::push(Frame::Recording(AccessSet::new()));
    let value = f();
    (value, guard.finish())
}

/// Like [`track`] for fallible callbacks: the access set is returned next
/// to the `Result`, so an `Err` still carries the partial reads.
pub fn track_result<R, E>(f: impl FnOnce() -> Result<R, E>) -> (Result<R, E>, AccessSet) {
    track(f)
}

/// Report that `node` was read. No-op when no session is recording.
pub fn report_access(node: &ObservableNode) {
    with_context(|ctx| {
        ctx.record_access(node);
    });
}

/// [`report_access`] for anything backed by a node.
pub fn report<O: Observable + ?Sized>(observable: &O) {
    report_access(observable.node());
}

/// Run `f` without attributing its reads to any session.
///
/// # Example
///
/// ```
/// use spark_viewmodel::{track, untrack, ObservableValue};
///
/// let a = ObservableValue::new(1);
/// let (_, accessed) = track(|| untrack(|| a.get()));
/// assert!(accessed.is_empty());
/// ```
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let guard = FrameGuard::push(Frame::Suppressed);
    let value = f();
    guard.finish();
    value
}

/// Alias for [`untrack`].
pub fn peek<R>(f: impl FnOnce() -> R) -> R {
    untrack(f)
}

/// Take the partial access set of the most recent session that was
/// abandoned because its callback panicked.
pub fn take_abandoned_accesses() -> Option<AccessSet> {
    with_context(|ctx| ctx.take_abandoned())
}

// =============================================================================
// TESTS
// =============================================================================
