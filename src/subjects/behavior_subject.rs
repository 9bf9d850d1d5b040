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

/// A `PublishSubject` variant that remembers the latest emitted value and
/// replays it to every new subscriber.
///
/// While the subject is active, an observer receives the current value (if one
/// exists) synchronously upon subscribing, before `subscribe` returns, and
/// then any subsequent live values. An observer joining after the subject
/// turned terminal receives the last value (if any) followed by the one
/// terminal signal, and is never registered.
///
/// A `BehaviorSubject` can start empty via [`emitter_receiver`] or seeded via
/// [`emitter_receiver_initial`], in which case the very first subscriber
/// already receives the seed.
///
/// [`emitter_receiver`]: struct.BehaviorSubject.html#method.emitter_receiver
/// [`emitter_receiver_initial`]: struct.BehaviorSubject.html#method.emitter_receiver_initial
///
/// # Examples
///
///```
/// use rxmux::{subjects::BehaviorSubject, subscribe::Subscriber};
/// use rxmux::{Observer, Subscribeable};
///
/// pub fn create_subscriber(subscriber_id: i32) -> Subscriber<i32> {
///     Subscriber::new(
///         move |v| println!("Subscriber #{} emitted: {}", subscriber_id, v),
///         |_| eprintln!("Error"),
///         move || println!("Completed {}", subscriber_id),
///     )
/// }
///
/// // Initialize a seeded `BehaviorSubject` and obtain its emitter and receiver.
/// let (mut emitter, mut receiver) = BehaviorSubject::emitter_receiver_initial(100);
///
/// // Registers `Subscriber` 1 and immediately emits the seed (100) to it.
/// receiver.subscribe(create_subscriber(1));
///
/// emitter.next(101); // Emits 101 to registered `Subscriber` 1, now the latest value.
///
/// // Registers `Subscriber` 2 and immediately emits the latest value (101) to it.
/// receiver.subscribe(create_subscriber(2));
///
/// emitter.complete(); // Calls `complete` on registered `Subscriber`'s 1 and 2.
///
/// // Subscriber 3: post-completion subscribe, emits the latest value (101)
/// // and completes.
/// receiver.subscribe(create_subscriber(3));
///```
pub struct BehaviorSubject<T> {
    value: Option<T>,
    observers: Vec<(u64, SharedSubscriber<T>)>,
    completed: bool,
    closed: bool,
    error: Option<Arc<dyn Error + Send + Sync>>,
}

impl<T: Send + 'static> BehaviorSubject<T> {
    /// Creates an empty `BehaviorSubject` and returns a tuple containing a
    /// `BehaviorSubjectEmitter` for emitting values and a
    /// `BehaviorSubjectReceiver` for subscribing to emitted values.
    ///
    /// Subscribers registered before the first emission receive no replayed
    /// value.
    pub fn emitter_receiver() -> (BehaviorSubjectEmitter<T>, BehaviorSubjectReceiver<T>) {
        Self::make(None)
    }

    /// Creates a `BehaviorSubject` seeded with `value`, which is replayed to
    /// subscribers until the first emission overwrites it.
    pub fn emitter_receiver_initial(
        value: T,
    ) -> (BehaviorSubjectEmitter<T>, BehaviorSubjectReceiver<T>) {
        Self::make(Some(value))
    }

    fn make(value: Option<T>) -> (BehaviorSubjectEmitter<T>, BehaviorSubjectReceiver<T>) {
        let s = Arc::new(Mutex::new(BehaviorSubject {
            value,
            observers: Vec::with_capacity(16),
            completed: false,
            closed: false,
            error: None,
        }));

        (
            BehaviorSubjectEmitter {
                source: Arc::clone(&s),
                emission_guard: Arc::new(Mutex::new(())),
            },
            BehaviorSubjectReceiver(Arc::clone(&s)),
        )
    }
}

/// Subscription handler for `BehaviorSubject`.
///
/// `BehaviorSubjectReceiver` carries the consumer surface, allowing you to
/// utilize its `subscribe` method for receiving emissions from the
/// `BehaviorSubject`'s multicasting. You can also employ its `unsubscribe`
/// method to close the `BehaviorSubject` and remove registered observers.
#[derive(Clone)]
pub struct BehaviorSubjectReceiver<T>(Arc<Mutex<BehaviorSubject<T>>>);

/// Multicasting emitter for `BehaviorSubject`.
///
/// `BehaviorSubjectEmitter` acts as an `Observer`, allowing you to utilize its
/// `next`, `error`, and `complete` methods for multicasting emissions to all
/// registered observers within the `BehaviorSubject`.
#[derive(Clone)]
pub struct BehaviorSubjectEmitter<T> {
    source: Arc<Mutex<BehaviorSubject<T>>>,
    emission_guard: Arc<Mutex<()>>,
}

impl<T> BehaviorSubjectReceiver<T> {
    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().observers.len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + 'static> Subscribeable for BehaviorSubjectReceiver<T> {
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
        v.subscribed(disposable.clone());
        // The callback may have cancelled on the spot; the revocation logic
        // already ran, so registering now would attach the observer for good.
        if disposable.is_disposed() {
            return disposable;
        }

        let (replay, terminal_error) = if let Ok(mut src) = self.0.lock() {
            if src.closed {
                disposable.dispose();
                return disposable;
            }
            if !src.completed {
                let current = src.value.clone();
                // Register while holding the new Subscriber's own lock, so a
                // concurrent emission round that snapshots it waits until the
                // replayed current value has landed.
                let shared = Arc::new(Mutex::new(v));
                let mut held = shared.lock().unwrap_or_else(PoisonError::into_inner);
                src.observers.push((key, Arc::clone(&shared)));
                drop(src);

                if let Some(value) = current {
                    let _ = catch_unwind(AssertUnwindSafe(|| held.next(value)));
                }
                return disposable;
            }
            (src.value.clone(), src.error.clone())
        } else {
            return disposable;
        };

        // BehaviorSubject already turned terminal. Replay the latest value if
        // one exists, then deliver the one terminal signal. Not registered.
        // A panicking callback must not swallow the terminal signal.
        if let Some(value) = replay {
            let _ = catch_unwind(AssertUnwindSafe(|| v.next(value)));
        }
        if let Some(err) = terminal_error {
            v.error(err);
        } else {
            v.complete();
        }
        disposable
    }
}

impl<T> Unsubscribeable for BehaviorSubjectReceiver<T> {
    fn unsubscribe(self) {
        if let Ok(mut r) = self.0.lock() {
            r.closed = true;
            r.observers.clear();
        }
    }
}

impl<T: Clone> Observer for BehaviorSubjectEmitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        let _round = self
            .emission_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let snapshot: Vec<SharedSubscriber<T>> = if let Ok(mut src) = self.source.lock() {
            if src.completed || src.closed {
                return;
            }
            // Overwrite the single history slot.
            src.value = Some(v.clone());
            src.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
        } else {
            return;
        };

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

impl<T: Clone + Send + 'static> From<BehaviorSubjectEmitter<T>> for Subscriber<T> {
    fn from(mut value: BehaviorSubjectEmitter<T>) -> Self {
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
