use spark_viewmodel::{
    cloned, ComputedValue, ObservableNode, ObservableValue, ViewModel,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    (count, move || c.set(c.get() + 1))
}

#[test]
fn setting_an_equal_value_is_silent() {
    let v = ObservableValue::new(5);
    let (hits, listener) = counter();
    v.subscribe(listener);

    v.set(5);
    assert_eq!(hits.get(), 0);
    v.set(6);
    assert_eq!(hits.get(), 1);
}

#[test]
fn collections_compare_structurally() {
    let v = ObservableValue::new(vec![1, 2]);
    let (hits, listener) = counter();
    v.subscribe(listener);

    v.set(vec![1, 2]);
    assert_eq!(hits.get(), 0);
    v.set(vec![1, 3]);
    assert_eq!(hits.get(), 1);
}

#[test]
fn computed_follows_its_dependency() {
    let owner = ViewModel::new("Doubler");
    let a = owner.value(2).unwrap();
    let b = ComputedValue::new(&owner, &[&a], cloned!(a => move || a.get() * 2)).unwrap();
    assert_eq!(b.get(), 4);

    let (hits, listener) = counter();
    b.subscribe(listener);

    a.set(5);
    assert_eq!(b.get(), 10);
    assert_eq!(hits.get(), 1);
}

#[test]
fn computed_dispose_releases_dependency() {
    let owner = ViewModel::new("Doubler");
    let a = owner.value(2).unwrap();
    let b = ComputedValue::new(&owner, &[&a], cloned!(a => move || a.get() * 2)).unwrap();
    assert!(a.has_listeners());

    b.dispose();
    assert!(!a.has_listeners());
}

#[test]
fn computed_result_unchanged_does_not_notify() {
    let owner = ViewModel::new("Parity");
    let n = owner.value(2).unwrap();
    let even = owner
        .computed(&[&n], cloned!(n => move || n.get() % 2 == 0))
        .unwrap();
    let (hits, listener) = counter();
    even.subscribe(listener);

    n.set(4);
    n.set(6);
    assert_eq!(hits.get(), 0);
    n.set(7);
    assert_eq!(hits.get(), 1);
    assert!(!even.get());
}

#[test]
fn chains_propagate_synchronously() {
    let owner = ViewModel::new("Chain");
    let base = owner.value(1).unwrap();
    let plus_one = owner
        .computed(&[&base], cloned!(base => move || base.get() + 1))
        .unwrap();
    let times_ten = owner
        .computed(&[&plus_one], cloned!(plus_one => move || plus_one.get() * 10))
        .unwrap();

    base.set(4);
    assert_eq!(plus_one.get(), 5);
    assert_eq!(times_ten.get(), 50);
}

#[test]
fn listeners_run_in_registration_order() {
    let node = ObservableNode::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        let order = order.clone();
        node.add_listener(move || order.borrow_mut().push(tag));
    }

    node.notify();
    assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn removing_a_listener_mid_notify_keeps_the_pass_intact() {
    let node = ObservableNode::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    let second: Rc<RefCell<Option<spark_viewmodel::ListenerHandle>>> = Rc::new(RefCell::new(None));

    let (o1, s1) = (order.clone(), second.clone());
    node.add_listener(move || {
        o1.borrow_mut().push(1);
        if let Some(handle) = s1.borrow().as_ref() {
            handle.dispose();
        }
    });
    let o2 = order.clone();
    *second.borrow_mut() = Some(node.add_listener(move || o2.borrow_mut().push(2)));

    node.notify();
    assert_eq!(*order.borrow(), vec![1, 2]);

    node.notify();
    assert_eq!(*order.borrow(), vec![1, 2, 1]);
}

#[test]
fn same_listener_twice_removed_once_fires_once() {
    let node = ObservableNode::new();
    let (hits, listener) = counter();
    let listener: spark_viewmodel::Listener = Rc::new(listener);

    let first = node.add_listener_rc(listener.clone());
    node.add_listener_rc(listener.clone());
    first.dispose();

    node.notify();
    assert_eq!(hits.get(), 1);
    assert_eq!(node.listener_count(), 1);
}

#[test]
fn node_dispose_is_idempotent() {
    let node = ObservableNode::new();
    node.add_listener(|| {});
    node.dispose();
    node.dispose();
    node.dispose();
    assert!(node.is_disposed());
    assert!(!node.has_listeners());
    node.notify();
}

#[test]
fn listener_may_write_other_values() {
    let celsius = ObservableValue::new(0.0_f64);
    let fahrenheit = ObservableValue::new(32.0_f64);
    celsius.subscribe(cloned!(celsius, fahrenheit => move || {
        fahrenheit.set(celsius.get() * 9.0 / 5.0 + 32.0);
    }));

    celsius.set(100.0);
    assert_eq!(fahrenheit.get(), 212.0);
}
