use spark_viewmodel::{
    Error, ObservableValue, Observer, Registry, Selection, SelectorBinding, ViewModel,
    ViewModelObject,
};
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

struct PanelVm {
    base: ViewModel,
    p1: ObservableValue<i32>,
    p2: ObservableValue<i32>,
    p3: ObservableValue<i32>,
}

impl PanelVm {
    fn new() -> Self {
        let base = ViewModel::new("PanelVm");
        let p1 = base.value(0).unwrap();
        let p2 = base.value(0).unwrap();
        let p3 = base.value(0).unwrap();
        Self { base, p1, p2, p3 }
    }
}

impl ViewModelObject for PanelVm {
    fn view_model(&self) -> &ViewModel {
        &self.base
    }
}

macro_rules! define_vm {
    ($name:ident) => {
        struct $name {
            base: ViewModel,
            value: ObservableValue<u32>,
        }

        impl $name {
            fn new(initial: u32) -> Self {
                let base = ViewModel::new(stringify!($name));
                let value = base.value(initial).unwrap();
                Self { base, value }
            }
        }

        impl ViewModelObject for $name {
            fn view_model(&self) -> &ViewModel {
                &self.base
            }
        }
    };
}

define_vm!(AVm);
define_vm!(BVm);
define_vm!(CVm);
define_vm!(DVm);

fn registry_with_panel() -> (Registry, Rc<PanelVm>) {
    let registry = Registry::root();
    let vm = registry.register_view_model(PanelVm::new()).unwrap();
    (registry, vm)
}

#[test]
fn unrelated_observers_never_rebuild() {
    let (registry, vm) = registry_with_panel();
    let o1 = Observer::new(|| {});
    let o2 = Observer::new(|| {});
    let o3 = Observer::new(|| {});

    o1.observe(&registry, |vm: &PanelVm| vm.p1.get()).unwrap();
    o2.observe(&registry, |vm: &PanelVm| vm.p2.get()).unwrap();
    o3.observe(&registry, |vm: &PanelVm| vm.p3.get()).unwrap();

    for n in 1..=10 {
        vm.p2.set(n);
    }

    assert_eq!(o1.rebuild_count(), 0);
    assert_eq!(o2.rebuild_count(), 10);
    assert_eq!(o3.rebuild_count(), 0);
}

#[test]
fn conditional_reads_retrack_on_each_run() {
    let (registry, vm) = registry_with_panel();
    let observer = Observer::new(|| {});
    let render = |vm: &PanelVm| {
        if vm.p1.get() > 10 {
            vm.p2.get()
        } else {
            -1
        }
    };

    observer.observe(&registry, render).unwrap();
    vm.p2.set(1);
    vm.p2.set(2);
    assert_eq!(observer.rebuild_count(), 0);

    vm.p1.set(11);
    assert_eq!(observer.rebuild_count(), 1);
    assert_eq!(observer.observe(&registry, render).unwrap(), 2);

    vm.p2.set(3);
    assert_eq!(observer.rebuild_count(), 2);

    // Dropping back below the threshold stops tracking p2 again
    vm.p1.set(0);
    observer.observe(&registry, render).unwrap();
    assert!(!observer.is_tracking(&vm.p2));
    let before = observer.rebuild_count();
    vm.p2.set(4);
    assert_eq!(observer.rebuild_count(), before);
}

#[test]
fn manual_container_notification_reaches_observer() {
    let (registry, vm) = registry_with_panel();
    let observer = Observer::new(|| {});
    observer.observe(&registry, |_: &PanelVm| ()).unwrap();

    assert!(observer.is_tracking(&vm.base));
    vm.base.notify_changed();
    assert_eq!(observer.rebuild_count(), 1);
}

#[test]
fn multi_source_observers_track_every_source() {
    let registry = Registry::root();
    let a = registry.register_view_model(AVm::new(1)).unwrap();
    let b = registry.register_view_model(BVm::new(2)).unwrap();
    let c = registry.register_view_model(CVm::new(3)).unwrap();
    let d = registry.register_view_model(DVm::new(4)).unwrap();

    let two = Observer::new(|| {});
    let sum = two
        .observe2(&registry, |a: &AVm, b: &BVm| a.value.get() + b.value.get())
        .unwrap();
    assert_eq!(sum, 3);
    assert!(two.is_tracking(&a.base) && two.is_tracking(&b.base));

    let three = Observer::new(|| {});
    let sum = three
        .observe3(&registry, |a: &AVm, b: &BVm, c: &CVm| {
            a.value.get() + b.value.get() + c.value.get()
        })
        .unwrap();
    assert_eq!(sum, 6);

    let four = Observer::new(|| {});
    let sum = four
        .observe4(&registry, |a: &AVm, _: &BVm, _: &CVm, d: &DVm| {
            a.value.get() + d.value.get()
        })
        .unwrap();
    assert_eq!(sum, 5);
    assert!(four.is_tracking(&c.base));
    assert!(!four.is_tracking(&c.value));

    c.value.set(30);
    assert_eq!(two.rebuild_count(), 0);
    assert_eq!(three.rebuild_count(), 1);
    assert_eq!(four.rebuild_count(), 0);

    d.view_model().notify_changed();
    assert_eq!(four.rebuild_count(), 1);
}

#[test]
fn missing_source_fails_without_running_render() {
    let registry = Registry::root();
    registry.register_view_model(AVm::new(1)).unwrap();
    let observer = Observer::new(|| {});
    let ran = Cell::new(false);

    let err = observer
        .observe2(&registry, |_: &AVm, _: &BVm| ran.set(true))
        .unwrap_err();
    assert!(matches!(err, Error::NotRegistered { .. }));
    assert!(err.to_string().contains("BVm"));
    assert!(!ran.get());
    assert_eq!(observer.tracked_count(), 0);
}

#[test]
fn panicking_render_keeps_partial_subscriptions() {
    let (registry, vm) = registry_with_panel();
    let observer = Observer::new(|| {});

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        observer.observe(&registry, |vm: &PanelVm| -> i32 {
            vm.p1.get();
            panic!("render blew up");
        })
    }));
    assert!(outcome.is_err());

    assert!(observer.is_tracking(&vm.base));
    assert!(observer.is_tracking(&vm.p1));
    assert!(!observer.is_tracking(&vm.p2));

    vm.p1.set(9);
    assert_eq!(observer.rebuild_count(), 1);

    // The next healthy run replaces the partial set
    observer.observe(&registry, |vm: &PanelVm| vm.p2.get()).unwrap();
    assert!(!observer.is_tracking(&vm.p1));
    assert!(!vm.p1.has_listeners());
}

#[test]
fn selector_binding_is_narrower_than_observer() {
    let (registry, vm) = registry_with_panel();
    let binding = SelectorBinding::new(|vm: &PanelVm| Selection::Property(vm.p3.clone()), || {});
    let observer = Observer::new(|| {});

    binding.value(&registry).unwrap();
    observer.observe(&registry, |vm: &PanelVm| vm.p3.get()).unwrap();

    vm.base.notify_changed();
    assert_eq!(binding.rebuild_count(), 0);
    assert_eq!(observer.rebuild_count(), 1);

    binding.set(42).unwrap();
    assert_eq!(vm.p3.peek(), 42);
    assert_eq!(binding.rebuild_count(), 1);
    assert_eq!(observer.rebuild_count(), 2);
}
