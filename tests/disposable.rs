mod register_emissions;

use register_emissions::register_emissions_subscriber;
use rxmux::subjects::PublishSubject;
use rxmux::{CompositeDisposable, Disposable, Observer, Subscribeable, Unsubscribeable};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

#[test]
fn disposable_revocation_runs_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_c = Arc::clone(&calls);

    let d = Disposable::new(move || {
        calls_c.fetch_add(1, Ordering::SeqCst);
    });

    d.dispose();
    d.dispose();

    assert!(d.is_disposed());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn composite_add_after_dispose_disposes_immediately() {
    let composite = CompositeDisposable::new();

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_c = Arc::clone(&calls);
    composite.add(Disposable::new(move || {
        calls_c.fetch_add(1, Ordering::SeqCst);
    }));

    composite.dispose();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Never silently retained: a handle added late is revoked on the spot.
    let late = Disposable::empty();
    composite.add(late.clone());

    assert!(late.is_disposed());
    assert!(composite.is_empty());
}

#[test]
fn composite_tears_down_all_subject_registrations() {
    let (mut make_subscriber, nexts, completes, errors) = register_emissions_subscriber();

    let x = make_subscriber.pop().unwrap()();
    let y = make_subscriber.pop().unwrap()();
    let (mut stx, mut srx) = PublishSubject::emitter_receiver();

    let subscriptions = CompositeDisposable::new();
    subscriptions.add(srx.subscribe(x));
    subscriptions.add(srx.subscribe(y));

    stx.next(1);
    assert_eq!(srx.len(), 2);
    assert_eq!(nexts.lock().unwrap().len(), 2);

    // One step releases every registration the host collected.
    subscriptions.dispose();

    assert_eq!(srx.len(), 0);

    stx.next(2);
    stx.complete();

    // Nobody was left registered to receive the value or the completion.
    assert_eq!(nexts.lock().unwrap().len(), 2);
    assert_eq!(completes.lock().unwrap().len(), 0);
    assert_eq!(errors.lock().unwrap().len(), 0);
}

#[test]
fn disposing_unknown_or_removed_handle_is_a_no_op() {
    let (mut make_subscriber, nexts, ..) = register_emissions_subscriber();

    let x = make_subscriber.pop().unwrap()();
    let (mut stx, mut srx) = PublishSubject::emitter_receiver();

    let d = srx.subscribe(x);

    // Close the receiver; the observer is already gone from the list.
    srx.clone().unsubscribe();
    assert_eq!(srx.len(), 0);

    // Disposing the stale handle must not fault.
    d.dispose();
    d.dispose();
    assert!(d.is_disposed());

    // Closed subject neither emits nor registers.
    stx.next(1);
    let y = make_subscriber.pop().unwrap()();
    let late = srx.subscribe(y);

    assert!(late.is_disposed());
    assert_eq!(srx.len(), 0);
    assert_eq!(nexts.lock().unwrap().len(), 0);
}

#[tokio::test]
async fn disposable_future_revocation_spawns_on_runtime() {
    let (tx, rx) = tokio::sync::oneshot::channel();

    let d = Disposable::from_future(async move {
        let _ = tx.send(());
    });

    d.dispose();
    d.dispose();

    // The revocation future ran on the runtime, once.
    rx.await.unwrap();
    assert!(d.is_disposed());
}
