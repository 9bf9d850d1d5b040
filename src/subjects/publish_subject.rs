use std::{
    error::Error,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    observer::Observer,
    subscribe::Unsubscribeable,
    subscription::{
        disposable::Disposable,
        subscribe::{Subscribeable, Subscriber},
    },
};

use super::SharedSubscriber;

/// The basic multicast junction: values pushed into the emitter are fanned out
/// to every observer registered at that moment, in subscription order.
///
/// A `PublishSubject` keeps no history. An observer subscribing after N values
/// were emitted receives none of those N values, only values emitted strictly
/// after it subscribed. An observer subscribing after the subject turned
/// terminal receives the terminal signal immediately and is never registered.
///
/// Emission rounds are serialized and delivered over a snapshot of the
/// subscriber list, so observers registered or disposed by a callback
/// mid-emission take effect on the next round, and every registered observer
/// sees the same total order of values. Observer callbacks run outside the
/// subject's lock; they may freely subscribe or dispose, but must not call
/// `next`/`error`/`complete` on the same subject's emitter.
///
/// # Examples
///
///```
/// use rxmux::{subjects::PublishSubject, subscribe::Subscriber};
/// use rxmux::{CompositeDisposable, Observer, Subscribeable};
///
/// pub fn create_subscriber(subscriber_id: i32) -> Subscriber<i32> {
///     Subscriber::new(
///         move |v| println!("Subscriber #{} emitted: {}", subscriber_id, v),
///         |_| eprintln!("Error"),
///         move || println!("Completed {}", subscriber_id),
///     )
/// }
///
/// // Initialize a `PublishSubject` and obtain its emitter and receiver.
/// let (mut emitter, mut receiver) = PublishSubject::emitter_receiver();
///
/// // The host owns every registration through one composite container.
/// let subscriptions = CompositeDisposable::new();
///
/// // Registers `Subscriber` 1.
/// subscriptions.add(receiver.subscribe(create_subscriber(1)));
///
/// emitter.next(101); // Emits 101 to registered `Subscriber` 1.
///
/// // Registers `Subscriber` 2.
/// subscriptions.add(receiver.subscribe(create_subscriber(2)));
///
/// emitter.next(102); // Emits 102 to registered `Subscriber`'s 1 and 2.
///
/// emitter.complete(); // Calls `complete` on registered `Subscriber`'s 1 and 2.
///
/// // Subscriber 3: post-completion subscribe, completes immediately.
/// subscriptions.add(receiver.subscribe(create_subscriber(3)));
///
/// emitter.next(103); // Called post-completion, does not emit.
///
/// subscriptions.dispose(); // Tears down whatever is still registered.
///```
pub struct PublishSubject<T> {
    observers: Vec<(u64, SharedSubscriber<T>)>,
    completed: bool,
    closed: bool,
    error: Option<Arc<dyn Error + Send + Sync>>,
}

impl<T: 'static> PublishSubject<T> {
    /// Creates a new pair of `PublishSubjectEmitter` for emitting values and
    /// `PublishSubjectReceiver` for subscribing to values.
    pub fn emitter_receiver() -> (PublishSubjectEmitter<T>, PublishSubjectReceiver<T>) {
        let s = Arc::new(Mutex::new(PublishSubject {
            observers: Vec::with_capacity(16),
            completed: false,
            closed: false,
            error: None,
        }));

        (
            PublishSubjectEmitter {
                source: Arc::clone(&s),
                emission_guard: Arc::new(Mutex::new(())),
            },
            PublishSubjectReceiver(Arc::clone(&s)),
        )
    }
}

/// Subscription handler for `PublishSubject`.
///
/// `PublishSubjectReceiver` carries the consumer surface, allowing you to
/// utilize its `subscribe` method for receiving emissions from the
/// `PublishSubject`'s multicasting. You can also employ its `unsubscribe`
/// method to close the `PublishSubject` and remove registered observers.
#[derive(Clone)]
pub struct PublishSubjectReceiver<T>(Arc<Mutex<PublishSubject<T>>>);

/// Multicasting emitter for `PublishSubject`.
///
/// `PublishSubjectEmitter` acts as an `Observer`, allowing you to utilize its
/// `next`, `error`, and `complete` methods for multicasting emissions to all
/// registered observers within the `PublishSubject`.
#[derive(Clone)]
pub struct PublishSubjectEmitter<T> {
    source: Arc<Mutex<PublishSubject<T>>>,
    // Serializes producer rounds, including delivery, so all registered
    // observers see the same total order of values.
    emission_guard: Arc<Mutex<()>>,
}

impl<T> PublishSubjectReceiver<T> {
    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().observers.len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Subscribeable for PublishSubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, mut v: Subscriber<Self::ObsType>) -> Disposable {
        let key: u64 = super::gen_key().next().unwrap_or(super::random_seed());

        let source_cloned = Arc::clone(&self.0);
        let disposable = Disposable::new(move || {
            source_cloned
                .lock()
                .unwrap()
                .observers
                .retain(move |o| o.0 != key);
        });
        // Hand the handle out before anything is delivered so the caller can
        // cancel ahead of the first value.
        v.subscribed(disposable.clone());
        // The callback may have cancelled on the spot; the revocation logic
        // already ran, so registering now would attach the observer for good.
        if disposable.is_disposed() {
            return disposable;
        }

        let terminal_error = if let Ok(mut src) = self.0.lock() {
            // If PublishSubject is unsubscribed `closed` flag is set. When
            // closed PublishSubject does not emit nor subscribes.
            if src.closed {
                disposable.dispose();
                return disposable;
            }
            // If PublishSubject is not completed register new Subscriber.
            if !src.completed {
                src.observers.push((key, Arc::new(Mutex::new(v))));
                return disposable;
            }
            src.error.clone()
        } else {
            return disposable;
        };

        // PublishSubject already turned terminal. Deliver the one terminal
        // signal to this late Subscriber and skip registration.
        if let Some(err) = terminal_error {
            v.error(err);
        } else {
            v.complete();
        }
        disposable
    }
}

impl<T> Unsubscribeable for PublishSubjectReceiver<T> {
    fn unsubscribe(self) {
        if let Ok(mut r) = self.0.lock() {
            r.closed = true;
            r.observers.clear();
        }
    }
}

impl<T: Clone> Observer for PublishSubjectEmitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        let _round = self
            .emission_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let snapshot: Vec<SharedSubscriber<T>> = if let Ok(src) = self.source.lock() {
            if src.completed || src.closed {
                return;
            }
            src.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
        } else {
            return;
        };

        // Deliver outside the subject lock. A Subscriber registered or
        // removed by a callback joins the next round, not this one, and a
        // panicking callback must not starve the rest of the round.
        for o in snapshot {
            let mut o = o.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = catch_unwind(AssertUnwindSafe(|| o.next(v.clone())));
        }
    }

    fn error(&mut self, e: Arc<dyn Error + Send + Sync>) {
        let _round = self
            .emission_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let drained = if let Ok(mut src) = self.source.lock() {
            if src.completed || src.closed {
                return;
            }
            src.completed = true;
            src.error = Some(Arc::clone(&e));
            std::mem::take(&mut src.observers)
        } else {
            return;
        };

        for (_, o) in drained {
            let mut o = o.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = catch_unwind(AssertUnwindSafe(|| o.error(Arc::clone(&e))));
        }
    }

    fn complete(&mut self) {
        let _round = self
            .emission_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let drained = if let Ok(mut src) = self.source.lock() {
            if src.completed || src.closed {
                return;
            }
            src.completed = true;
            std::mem::take(&mut src.observers)
        } else {
            return;
        };

        for (_, o) in drained {
            let mut o = o.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = catch_unwind(AssertUnwindSafe(|| o.complete()));
        }
    }
}

impl<T: Clone + Send + 'static> From<PublishSubjectEmitter<T>> for Subscriber<T> {
    fn from(mut value: PublishSubjectEmitter<T>) -> Self {
        let mut vn = value.clone();
        let mut ve = value.clone();
        Subscriber::new(
            move |v| {
                vn.next(v);
            },
            move |e| ve.error(e),
            move || value.complete(),
        )
    }
}
