// ============================================================================
// spark-viewmodel - Auto-Tracking Observer
// Runs a render callback, discovers what it read, and keeps exactly those
// nodes subscribed
// ============================================================================
//
// Each run:
//   1. resolves the source view model(s) through a Resolver,
//   2. reports the source containers themselves as read (so a manual
//      `ViewModel::notify_changed` invalidates the observer too),
//   3. runs the callback inside a tracking session,
//   4. reconciles subscriptions against the previous run:
//        removed non-empty -> unsubscribe all, resubscribe the full set
//        only added        -> subscribe just the new nodes
//   5. if the callback panicked, reconciles with the partial set and then
//      resumes the unwind.
//
// Every subscribed node gets the same shared listener, which calls the
// rendering layer's invalidate callback. Coalescing several invalidations in
// one frame is left to the rendering layer.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::core::error::Result;
use crate::core::types::{Listener, Observable, ResettableNode};
use crate::primitives::node::ListenerHandle;
use crate::primitives::registry::Resolver;
use crate::primitives::view_model::ViewModelObject;
use crate::reactivity::tracking::{report, take_abandoned_accesses, track, AccessSet};

// =============================================================================
// OBSERVER INNER
// =============================================================================

struct ObserverInner {
    label: Option<&'static str>,
    on_invalidate: Box<dyn Fn()>,
    listener: Listener,
    tracked: RefCell<AccessSet>,
    handles: RefCell<Vec<ListenerHandle>>,
    rebuilds: Cell<usize>,
    runs: Cell<usize>,
    disposed: Cell<bool>,
}

impl ObserverInner {
    fn unsubscribe_all(&self) {
        for handle in self.handles.borrow_mut().drain(..) {
            handle.dispose();
        }
    }

    fn reconcile(&self, current: AccessSet) {
        if self.disposed.get() {
            return;
        }

        let mut tracked = self.tracked.borrow_mut();
        let removed = tracked.difference(&current);
        let added = current.difference(&tracked);

        if !removed.is_empty() {
            self.unsubscribe_all();
            let mut handles = self.handles.borrow_mut();
            for node in current.iter() {
                handles.push(node.add_listener_rc(self.listener.clone()));
            }
        } else if !added.is_empty() {
            let mut handles = self.handles.borrow_mut();
            for node in &added {
                handles.push(node.add_listener_rc(self.listener.clone()));
            }
        }

        trace!(
            observer = ?self.label,
            added = added.len(),
            removed = removed.len(),
            tracked = current.len(),
            "reconcile"
        );
        *tracked = current;
    }
}

impl Drop for ObserverInner {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}

// =============================================================================
// OBSERVER
// =============================================================================

/// Auto-tracking binder between reactive state and a rendering layer.
///
/// # Example
///
/// ```
/// use spark_viewmodel::{Observer, ObservableValue};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let name = ObservableValue::new(String::from("Ada"));
/// let dirty = Rc::new(Cell::new(false));
/// let d = dirty.clone();
/// let observer = Observer::new(move || d.set(true));
///
/// let text = observer.run(&[], || format!("Hello, {}", name.get()));
/// assert_eq!(text, "Hello, Ada");
///
/// name.set(String::from("Grace"));
/// assert!(dirty.get());
/// ```
pub struct Observer {
    inner: Rc<ObserverInner>,
}

impl Observer {
    /// Create an observer that calls `on_invalidate` whenever a node read in
    /// the latest run notifies.
    pub fn new(on_invalidate: impl Fn() + 'static) -> Self {
        Self::build(None, Box::new(on_invalidate))
    }

    /// Like [`new`](Self::new) with a label for tracing output.
    pub fn labeled(label: &'static str, on_invalidate: impl Fn() + 'static) -> Self {
        Self::build(Some(label), Box::new(on_invalidate))
    }

    fn build(label: Option<&'static str>, on_invalidate: Box<dyn Fn()>) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<ObserverInner>| {
            let weak = weak.clone();
            let listener: Listener = Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    if inner.disposed.get() {
                        return;
                    }
                    inner.rebuilds.set(inner.rebuilds.get() + 1);
                    trace!(observer = ?inner.label, "invalidate");
                    (inner.on_invalidate)();
                }
            });

            ObserverInner {
                label,
                on_invalidate,
                listener,
                tracked: RefCell::new(AccessSet::new()),
                handles: RefCell::new(Vec::new()),
                rebuilds: Cell::new(0),
                runs: Cell::new(0),
                disposed: Cell::new(false),
            }
        });
        Self { inner }
    }

    /// Run `render` in a tracking session with `sources` always counted as
    /// read, then reconcile subscriptions.
    ///
    /// A panic in `render` still reconciles with the reads made before the
    /// panic, then continues unwinding.
    pub fn run<R>(&self, sources: &[&dyn Observable], render: impl FnOnce() -> R) -> R {
        self.inner.runs.set(self.inner.runs.get() + 1);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            track(|| {
                for source in sources {
                    report(*source);
                }
                render()
            })
        }));

        match outcome {
            Ok((value, accesses)) => {
                self.inner.reconcile(accesses);
                value
            }
            Err(payload) => {
                let partial = take_abandoned_accesses().unwrap_or_default();
                self.inner.reconcile(partial);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Resolve one view model and render from it.
    pub fn observe<S, R>(&self, resolver: &impl Resolver, render: impl FnOnce(&S) -> R) -> Result<R>
    where
        S: ViewModelObject,
    {
        let source = resolver.resolve::<S>()?;
        Ok(self.run(&[source.view_model()], || render(&*source)))
    }

    /// Resolve two view models and render from both.
    pub fn observe2<S1, S2, R>(
        &self,
        resolver: &impl Resolver,
        render: impl FnOnce(&S1, &S2) -> R,
    ) -> Result<R>
    where
        S1: ViewModelObject,
        S2: ViewModelObject,
    {
        let s1 = resolver.resolve::<S1>()?;
        let s2 = resolver.resolve::<S2>()?;
        Ok(self.run(&[s1.view_model(), s2.view_model()], || render(&*s1, &*s2)))
    }

    /// Resolve three view models and render from all of them.
    pub fn observe3<S1, S2, S3, R>(
        &self,
        resolver: &impl Resolver,
        render: impl FnOnce(&S1, &S2, &S3) -> R,
    ) -> Result<R>
    where
        S1: ViewModelObject,
        S2: ViewModelObject,
        S3: ViewModelObject,
    {
        let s1 = resolver.resolve::<S1>()?;
        let s2 = resolver.resolve::<S2>()?;
        let s3 = resolver.resolve::<S3>()?;
        Ok(self.run(
            &[s1.view_model(), s2.view_model(), s3.view_model()],
            || render(&*s1, &*s2, &*s3),
        ))
    }

    /// Resolve four view models and render from all of them.
    pub fn observe4<S1, S2, S3, S4, R>(
        &self,
        resolver: &impl Resolver,
        render: impl FnOnce(&S1, &S2, &S3, &S4) -> R,
    ) -> Result<R>
    where
        S1: ViewModelObject,
        S2: ViewModelObject,
        S3: ViewModelObject,
        S4: ViewModelObject,
    {
        let s1 = resolver.resolve::<S1>()?;
        let s2 = resolver.resolve::<S2>()?;
        let s3 = resolver.resolve::<S3>()?;
        let s4 = resolver.resolve::<S4>()?;
        Ok(self.run(
            &[
                s1.view_model(),
                s2.view_model(),
                s3.view_model(),
                s4.view_model(),
            ],
            || render(&*s1, &*s2, &*s3, &*s4),
        ))
    }

    /// Whether `observable` was read in the latest run.
    pub fn is_tracking<O: Observable + ?Sized>(&self, observable: &O) -> bool {
        self.inner.tracked.borrow().contains(observable.node())
    }

    /// Number of distinct nodes read in the latest run.
    pub fn tracked_count(&self) -> usize {
        self.inner.tracked.borrow().len()
    }

    /// Number of live listener registrations held by this observer.
    pub fn subscription_count(&self) -> usize {
        self.inner.handles.borrow().len()
    }

    /// Number of times a tracked node asked for a rebuild.
    pub fn rebuild_count(&self) -> usize {
        self.inner.rebuilds.get()
    }

    /// Number of completed or attempted runs.
    pub fn run_count(&self) -> usize {
        self.inner.runs.get()
    }

    /// Drop all subscriptions and forget the tracked set. The observer stays
    /// usable; the next run subscribes from scratch.
    pub fn reset(&self) {
        self.inner.unsubscribe_all();
        self.inner.tracked.borrow_mut().clear();
    }

    /// Fire the invalidate callback as if a tracked node had changed.
    /// No-op once disposed.
    pub fn invalidate(&self) {
        if self.inner.disposed.get() {
            return;
        }
        (self.inner.listener)();
    }

    /// Unsubscribe from everything and stop reacting. Safe to repeat.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.reset();
        trace!(observer = ?self.inner.label, "dispose");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl ResettableNode for Observer {
    fn dispose(&self) {
        Observer::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        Observer::is_disposed(self)
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("label", &self.inner.label)
            .field("tracked", &*self.inner.tracked.borrow())
            .field("rebuilds", &self.inner.rebuilds.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::value::ObservableValue;
    use crate::primitives::view_model::ViewModel;

    fn observer() -> (Observer, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (Observer::new(move || c.set(c.get() + 1)), count)
    }

    #[test]
    fn subscribes_to_what_was_read() {
        let a = ObservableValue::new(1);
        let b = ObservableValue::new(2);
        let (obs, count) = observer();

        assert_eq!(obs.run(&[], || a.get()), 1);
        assert!(obs.is_tracking(&a));
        assert!(!obs.is_tracking(&b));

        b.set(3);
        assert_eq!(count.get(), 0);
        a.set(4);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn sources_are_always_tracked() {
        let vm = ViewModel::new("Source");
        let (obs, count) = observer();

        obs.run(&[&vm], || ());
        assert!(obs.is_tracking(&vm));

        vm.notify_changed();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn added_nodes_subscribe_incrementally() {
        let a = ObservableValue::new(1);
        let b = ObservableValue::new(2);
        let (obs, _) = observer();

        obs.run(&[], || a.get());
        assert_eq!(obs.subscription_count(), 1);

        obs.run(&[], || a.get() + b.get());
        assert_eq!(obs.subscription_count(), 2);
        assert_eq!(a.listener_count(), 1);
        assert_eq!(b.listener_count(), 1);
    }

    #[test]
    fn removed_nodes_are_unsubscribed() {
        let a = ObservableValue::new(1);
        let b = ObservableValue::new(2);
        let (obs, count) = observer();

        obs.run(&[], || a.get() + b.get());
        obs.run(&[], || b.get());

        assert!(!a.has_listeners());
        assert_eq!(b.listener_count(), 1);
        assert_eq!(obs.tracked_count(), 1);

        a.set(10);
        assert_eq!(count.get(), 0);
        b.set(10);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn unchanged_read_set_keeps_subscriptions() {
        let a = ObservableValue::new(1);
        let (obs, _) = observer();
        for _ in 0..5 {
            obs.run(&[], || a.get());
        }
        assert_eq!(a.listener_count(), 1);
        assert_eq!(obs.run_count(), 5);
    }

    #[test]
    fn panic_still_reconciles_partial_reads() {
        let a = ObservableValue::new(1);
        let b = ObservableValue::new(2);
        let (obs, count) = observer();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            obs.run(&[], || -> i32 {
                a.get();
                panic!("render failed");
            })
        }));
        assert!(outcome.is_err());
        assert!(obs.is_tracking(&a));
        assert!(!obs.is_tracking(&b));

        a.set(5);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn nested_observer_reads_stay_inside() {
        let outer_value = ObservableValue::new(1);
        let inner_value = ObservableValue::new(2);
        let (outer, _) = observer();
        let (inner, _) = observer();

        outer.run(&[], || {
            outer_value.get();
            inner.run(&[], || inner_value.get());
        });

        assert!(outer.is_tracking(&outer_value));
        assert!(!outer.is_tracking(&inner_value));
        assert!(inner.is_tracking(&inner_value));
    }

    #[test]
    fn dispose_unsubscribes_and_silences() {
        let a = ObservableValue::new(1);
        let (obs, count) = observer();
        obs.run(&[], || a.get());

        obs.dispose();
        obs.dispose();
        assert!(obs.is_disposed());
        assert!(!a.has_listeners());

        a.set(2);
        assert_eq!(count.get(), 0);

        // Runs after disposal render but do not subscribe
        assert_eq!(obs.run(&[], || a.get()), 2);
        assert!(!a.has_listeners());
    }

    #[test]
    fn drop_unsubscribes() {
        let a = ObservableValue::new(1);
        {
            let (obs, _) = observer();
            obs.run(&[], || a.get());
            assert!(a.has_listeners());
        }
        assert!(!a.has_listeners());
    }

    #[test]
    fn reset_forgets_subscriptions() {
        let a = ObservableValue::new(1);
        let (obs, count) = observer();
        obs.run(&[], || a.get());
        obs.reset();
        assert_eq!(obs.tracked_count(), 0);
        a.set(2);
        assert_eq!(count.get(), 0);

        obs.run(&[], || a.get());
        a.set(3);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn manual_invalidate_fires_until_disposed() {
        let (obs, count) = observer();
        obs.invalidate();
        assert_eq!(count.get(), 1);
        assert_eq!(obs.rebuild_count(), 1);

        obs.dispose();
        obs.invalidate();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn invalidation_may_rerun_synchronously() {
        let a = ObservableValue::new(1);
        let renders = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Rc<Observer>>>> = Rc::new(RefCell::new(None));

        let (a2, r2, s2) = (a.clone(), renders.clone(), slot.clone());
        let obs = Rc::new(Observer::new(move || {
            let observer = s2.borrow().clone();
            if let Some(observer) = observer {
                let value = observer.run(&[], || a2.get());
                r2.borrow_mut().push(value);
            }
        }));
        *slot.borrow_mut() = Some(obs.clone());

        obs.run(&[], || a.get());
        a.set(2);
        a.set(3);
        assert_eq!(*renders.borrow(), vec![2, 3]);
        assert_eq!(a.listener_count(), 1);

        slot.borrow_mut().take();
    }
}
