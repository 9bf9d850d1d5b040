mod custom_error;
mod register_emissions;

use custom_error::CustomError;
use register_emissions::register_emissions_subscriber;
use rxmux::subjects::PublishSubject;
use rxmux::subscribe::Subscriber;
use rxmux::{CompositeDisposable, Observer, Subscribeable};
use std::sync::{Arc, Mutex};

fn recording_subscriber(
    register: &Arc<Mutex<Vec<String>>>,
) -> Subscriber<&'static str> {
    let nexts = Arc::clone(register);
    let completes = Arc::clone(register);
    let errors = Arc::clone(register);
    Subscriber::new(
        move |v: &'static str| nexts.lock().unwrap().push(v.to_string()),
        move |_| errors.lock().unwrap().push("error".to_string()),
        move || completes.lock().unwrap().push("complete".to_string()),
    )
}

#[test]
fn publish_subject_late_subscriber_misses_earlier_values() {
    let (mut make_subscriber, nexts, completes, errors) = register_emissions_subscriber();

    let x = make_subscriber.pop().unwrap()();
    let (mut stx, mut srx) = PublishSubject::emitter_receiver();

    // Emit some values before anyone subscribes.
    stx.next(1);
    stx.next(2);
    stx.next(3);

    // A late subscriber sees none of the earlier values.
    srx.subscribe(x);

    assert_eq!(srx.len(), 1);
    assert_eq!(nexts.lock().unwrap().len(), 0);

    // Only values emitted strictly after the subscription arrive.
    stx.next(4);
    stx.next(5);

    assert_eq!(*nexts.lock().unwrap(), vec![4, 5]);
    assert_eq!(completes.lock().unwrap().len(), 0);
    assert_eq!(errors.lock().unwrap().len(), 0);
}

#[test]
fn publish_subject_end_to_end_scenario() {
    let observer1 = Arc::new(Mutex::new(Vec::new()));
    let observer2 = Arc::new(Mutex::new(Vec::new()));

    let (mut stx, mut srx) = PublishSubject::emitter_receiver();

    // The host owns every handle it receives through one composite.
    let subscriptions = CompositeDisposable::new();

    subscriptions.add(srx.subscribe(recording_subscriber(&observer1)));

    stx.next("Item 1");
    stx.next("Item 2");

    subscriptions.add(srx.subscribe(recording_subscriber(&observer2)));

    stx.next("Item 3");
    stx.complete();

    assert_eq!(
        *observer1.lock().unwrap(),
        vec!["Item 1", "Item 2", "Item 3", "complete"]
    );
    assert_eq!(*observer2.lock().unwrap(), vec!["Item 3", "complete"]);

    // One-step teardown of whatever the host still holds.
    subscriptions.dispose();
    assert!(subscriptions.is_disposed());
}

#[test]
fn publish_subject_hands_disposable_before_any_delivery() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_sub = Arc::clone(&events);
    let events_next = Arc::clone(&events);

    let (mut stx, mut srx) = PublishSubject::emitter_receiver();

    let mut subscriber = Subscriber::on_next(move |v: i32| {
        events_next.lock().unwrap().push(format!("next {}", v));
    });
    subscriber.on_subscribe(move |d| {
        events_sub
            .lock()
            .unwrap()
            .push(format!("subscribed, disposed: {}", d.is_disposed()));
    });

    let disposable = srx.subscribe(subscriber);
    stx.next(1);

    assert_eq!(
        *events.lock().unwrap(),
        vec!["subscribed, disposed: false", "next 1"]
    );
    assert!(!disposable.is_disposed());
}

#[test]
fn publish_subject_disposal_stops_future_delivery_for_one_observer() {
    let (mut make_subscriber, nexts, completes, errors) = register_emissions_subscriber();

    let x = make_subscriber.pop().unwrap()();
    let y = make_subscriber.pop().unwrap()();
    let (mut stx, mut srx) = PublishSubject::emitter_receiver();

    let first = srx.subscribe(x);
    srx.subscribe(y);

    stx.next(1);
    assert_eq!(nexts.lock().unwrap().len(), 2);

    // Detach the first observer only.
    first.dispose();
    assert!(first.is_disposed());
    assert_eq!(srx.len(), 1);

    stx.next(2);
    stx.complete();

    // Second observer kept receiving, first stopped after disposal.
    assert_eq!(nexts.lock().unwrap().len(), 3);
    assert_eq!(completes.lock().unwrap().len(), 1);
    assert_eq!(errors.lock().unwrap().len(), 0);
}

#[test]
fn publish_subject_error_reaches_late_subscribers() {
    let (mut make_subscriber, nexts, completes, errors) = register_emissions_subscriber();

    let x = make_subscriber.pop().unwrap()();
    let z = make_subscriber.pop().unwrap()();
    let (mut stx, mut srx) = PublishSubject::emitter_receiver();

    srx.subscribe(x);
    stx.next(1);
    stx.error(Arc::new(CustomError));

    assert_eq!(srx.len(), 0);
    assert_eq!(errors.lock().unwrap().len(), 1);

    // A subscriber joining after the error receives only the error and is
    // never registered.
    srx.subscribe(z);

    assert_eq!(srx.len(), 0);
    assert_eq!(nexts.lock().unwrap().len(), 1);
    assert_eq!(completes.lock().unwrap().len(), 0);
    assert_eq!(errors.lock().unwrap().len(), 2);
}

#[test]
fn publish_subject_panicking_observer_does_not_abort_the_round() {
    let (mut make_subscriber, nexts, completes, errors) = register_emissions_subscriber();

    let y = make_subscriber.pop().unwrap()();
    let (mut stx, mut srx) = PublishSubject::emitter_receiver();

    // First in subscription order, fails on every value.
    srx.subscribe(Subscriber::on_next(|_: i32| panic!("broken observer")));
    srx.subscribe(y);

    stx.next(1);
    stx.next(2);
    stx.complete();

    // The well-behaved observer saw the full sequence and the completion.
    assert_eq!(*nexts.lock().unwrap(), vec![1, 2]);
    assert_eq!(completes.lock().unwrap().len(), 1);
    assert_eq!(errors.lock().unwrap().len(), 0);
}

#[test]
fn publish_subject_observers_see_one_total_order_across_threads() {
    let observer1 = Arc::new(Mutex::new(Vec::new()));
    let observer2 = Arc::new(Mutex::new(Vec::new()));
    let observer1_c = Arc::clone(&observer1);
    let observer2_c = Arc::clone(&observer2);

    let (mut stx, mut srx) = PublishSubject::emitter_receiver();

    srx.subscribe(Subscriber::on_next(move |v: i32| {
        observer1_c.lock().unwrap().push(v);
    }));
    srx.subscribe(Subscriber::on_next(move |v: i32| {
        observer2_c.lock().unwrap().push(v);
    }));

    // Two producers on separate OS threads.
    let mut tx_a = stx.clone();
    let mut tx_b = stx.clone();
    let a = std::thread::spawn(move || {
        for i in 0..100 {
            tx_a.next(i);
        }
    });
    let b = std::thread::spawn(move || {
        for i in 100..200 {
            tx_b.next(i);
        }
    });
    a.join().unwrap();
    b.join().unwrap();
    stx.complete();

    let seen1 = observer1.lock().unwrap().clone();
    let seen2 = observer2.lock().unwrap().clone();

    // Interleaving is unspecified, but every observer sees the same one.
    assert_eq!(seen1.len(), 200);
    assert_eq!(seen1, seen2);
}

#[test]
fn publish_subject_cancel_inside_subscribed_is_never_registered() {
    let (mut make_subscriber, nexts, completes, errors) = register_emissions_subscriber();

    let (mut stx, mut srx) = PublishSubject::emitter_receiver();

    let mut x = make_subscriber.pop().unwrap()();
    x.on_subscribe(|d| d.dispose());

    let disposable = srx.subscribe(x);

    // Cancelled before the first value; the observer was never registered.
    assert!(disposable.is_disposed());
    assert_eq!(srx.len(), 0);

    stx.next(1);
    stx.complete();

    assert_eq!(nexts.lock().unwrap().len(), 0);
    assert_eq!(completes.lock().unwrap().len(), 0);
    assert_eq!(errors.lock().unwrap().len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn publish_subject_emits_across_tokio_tasks() {
    let (mut make_subscriber, nexts, completes, errors) = register_emissions_subscriber();

    let x = make_subscriber.pop().unwrap()();
    let (mut stx, mut srx) = PublishSubject::emitter_receiver();

    srx.subscribe(x);

    let mut tx_a = stx.clone();
    let mut tx_b = stx.clone();
    let a = tokio::task::spawn(async move {
        for i in 0..50 {
            tx_a.next(i);
        }
    });
    let b = tokio::task::spawn(async move {
        for i in 50..100 {
            tx_b.next(i);
        }
    });
    a.await.unwrap();
    b.await.unwrap();
    stx.complete();

    assert_eq!(nexts.lock().unwrap().len(), 100);
    assert_eq!(completes.lock().unwrap().len(), 1);
    assert_eq!(errors.lock().unwrap().len(), 0);
}
