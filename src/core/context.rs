// ============================================================================
// spark-viewmodel - Reactive Context
// Thread-local state: the tracking session stack and id allocation
// ============================================================================

use std::cell::{Cell, RefCell};

use crate::core::types::NodeId;
use crate::primitives::node::ObservableNode;
use crate::reactivity::tracking::AccessSet;

// =============================================================================
// TRACKING FRAMES
// =============================================================================

/// One entry on the tracking stack.
pub enum Frame {
    /// A tracking session accumulating every node read in its scope.
    Recording(AccessSet),

    /// An `untrack` scope: reads inside are not attributed to any session.
    Suppressed,
}

// =============================================================================
// REACTIVE CONTEXT
// =============================================================================

/// Thread-local reactive context.
///
/// The core is single-threaded, so all tracking state lives here rather than
/// in a process-wide global. Sessions nest as a LIFO stack and only the
/// innermost frame receives an access.
pub struct ReactiveContext {
    /// Active frames, innermost last
    frames: RefCell<Vec<Frame>>,

    /// Mirror of `frames.len()` so the untracked read path never borrows
    depth: Cell<usize>,

    /// Access set of the most recent session abandoned by a panic
    abandoned: RefCell<Option<AccessSet>>,

    /// Next node id to hand out
    next_node_id: Cell<u64>,
}

impl ReactiveContext {
    pub fn new() -> Self {
        Self {
            frames: RefCell::new(Vec::new()),
            depth: Cell::new(0),
            abandoned: RefCell::new(None),
            next_node_id: Cell::new(1),
        }
    }

    // =========================================================================
    // FRAMES
    // =========================================================================

    /// Push a frame, returning the new depth
    pub fn push_frame(&self, frame: Frame) -> usize {
        let mut frames = self.frames.borrow_mut();
        frames.push(frame);
        self.depth.set(frames.len());
        frames.len()
    }

    /// Pop the innermost frame
    pub fn pop_frame(&self) -> Option<Frame> {
        let mut frames = self.frames.borrow_mut();
        let frame = frames.pop();
        self.depth.set(frames.len());
        frame
    }

    /// Number of active frames (recording or suppressed)
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Whether the innermost frame is recording
    pub fn is_recording(&self) -> bool {
        if self.depth.get() == 0 {
            return false;
        }
        matches!(self.frames.borrow().last(), Some(Frame::Recording(_)))
    }

    /// Attribute a read to the innermost frame. Returns true if it was recorded.
    pub fn record_access(&self, node: &ObservableNode) -> bool {
        if self.depth.get() == 0 {
            return false;
        }
        match self.frames.borrow_mut().last_mut() {
            Some(Frame::Recording(set)) => set.insert(node.clone()),
            _ => false,
        }
    }

    // =========================================================================
    // ABANDONED SESSIONS
    // =========================================================================

    pub fn set_abandoned(&self, set: AccessSet) {
        *self.abandoned.borrow_mut() = Some(set);
    }

    pub fn take_abandoned(&self) -> Option<AccessSet> {
        self.abandoned.borrow_mut().take()
    }

    // =========================================================================
    // IDS
    // =========================================================================

    pub fn next_node_id(&self) -> NodeId {
        let id = self.next_node_id.get();
        self.next_node_id.set(id + 1);
        NodeId(id)
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: ReactiveContext = ReactiveContext::new();
}

/// Access the thread-local reactive context.
pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

/// Check if reads are currently being recorded by a tracking session.
pub fn is_tracking() -> bool {
    with_context(|ctx| ctx.is_recording())
}

/// Current depth of the tracking stack.
pub fn tracking_depth() -> usize {
    with_context(|ctx| ctx.depth())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_creation() {
        let ctx = ReactiveContext::new();
        assert_eq!(ctx.depth(), 0);
        assert!(!ctx.is_recording());
        assert!(ctx.take_abandoned().is_none());
    }

    #[test]
    fn frames_push_and_pop() {
        let ctx = ReactiveContext::new();
        assert_eq!(ctx.push_frame(Frame::Recording(AccessSet::new())), 1);
        assert!(ctx.is_recording());

        assert_eq!(ctx.push_frame(Frame::Suppressed), 2);
        assert!(!ctx.is_recording());

        assert!(matches!(ctx.pop_frame(), Some(Frame::Suppressed)));
        assert!(ctx.is_recording());
        assert!(matches!(ctx.pop_frame(), Some(Frame::Recording(_))));
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.pop_frame().is_none());
    }

    #[test]
    fn record_access_without_frames_is_noop() {
        let ctx = ReactiveContext::new();
        let node = ObservableNode::new();
        assert!(!ctx.record_access(&node));
    }

    #[test]
    fn record_access_goes_to_innermost_frame() {
        let ctx = ReactiveContext::new();
        let node = ObservableNode::new();

        ctx.push_frame(Frame::Recording(AccessSet::new()));
        ctx.push_frame(Frame::Recording(AccessSet::new()));
        assert!(ctx.record_access(&node));
        assert!(!ctx.record_access(&node)); // duplicate

        let Some(Frame::Recording(inner)) = ctx.pop_frame() else {
            panic!("expected recording frame");
        };
        let Some(Frame::Recording(outer)) = ctx.pop_frame() else {
            panic!("expected recording frame");
        };
        assert_eq!(inner.len(), 1);
        assert!(outer.is_empty());
    }

    #[test]
    fn node_ids_are_unique() {
        let ctx = ReactiveContext::new();
        let a = ctx.next_node_id();
        let b = ctx.next_node_id();
        assert_ne!(a, b);
    }

    #[test]
    fn convenience_functions() {
        assert!(!is_tracking());
        assert_eq!(tracking_depth(), 0);
    }
}
