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

/// A subject variant that emits only its latest value, and only upon completion.
///
/// An `AsyncSubject` never forwards values mid-stream: `next` merely overwrites
/// the pending slot. When `complete` is called, the value held at that moment
/// (if any value was ever emitted) is delivered to every registered observer,
/// followed by `complete`. If no value was ever emitted, observers receive
/// only `complete`.
///
/// If the subject terminates with `error` instead, the pending value is never
/// emitted to anyone; existing and late subscribers receive only the error.
/// Late subscribers after a successful completion receive the value-at-completion
/// (if any) followed by `complete`, and are never registered.
///
/// # Examples
///
///```
/// use rxmux::{subjects::AsyncSubject, subscribe::Subscriber};
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
/// // Initialize an `AsyncSubject` and obtain its emitter and receiver.
/// let (mut emitter, mut receiver) = AsyncSubject::emitter_receiver();
///
/// // Registers `Subscriber` 1.
/// receiver.subscribe(create_subscriber(1));
///
/// emitter.next(101); // Stores 101 as the latest value, nothing is emitted.
/// emitter.next(102); // Latest value is now 102.
///
/// // Registers `Subscriber` 2.
/// receiver.subscribe(create_subscriber(2));
///
/// // Emits the latest value (102) to registered `Subscriber`'s 1 and 2 and
/// // calls `complete` on each of them.
/// emitter.complete();
///
/// // Subscriber 3: post-completion subscribe, emits the latest value (102)
/// // and completes.
/// receiver.subscribe(create_subscriber(3));
///
/// emitter.next(103); // Called post-completion, does not emit.
///```
pub struct AsyncSubject<T> {
    value: Option<T>,
    observers: Vec<(u64, SharedSubscriber<T>)>,
    completed: bool,
    closed: bool,
    error: Option<Arc<dyn Error + Send + Sync>>,
}

impl<T: Send + 'static> AsyncSubject<T> {
    /// Initializes an `AsyncSubject` and returns a tuple containing an
    /// `AsyncSubjectEmitter` for emitting values and an `AsyncSubjectReceiver`
    /// for subscribing to emitted values.
    pub fn emitter_receiver() -> (AsyncSubjectEmitter<T>, AsyncSubjectReceiver<T>) {
        let s = Arc::new(Mutex::new(AsyncSubject {
            value: None,
            observers: Vec::with_capacity(16),
            completed: false,
            closed: false,
            error: None,
        }));

        (
            AsyncSubjectEmitter {
                source: Arc::clone(&s),
                emission_guard: Arc::new(Mutex::new(())),
            },
            AsyncSubjectReceiver(Arc::clone(&s)),
        )
    }
}

/// Subscription handler for `AsyncSubject`.
///
/// `AsyncSubjectReceiver` carries the consumer surface, allowing you to
/// utilize its `subscribe` method for receiving emissions from the
/// `AsyncSubject`'s multicasting. You can also employ its `unsubscribe`
/// method to close the `AsyncSubject` and remove registered observers.
#[derive(Clone)]
pub struct AsyncSubjectReceiver<T>(Arc<Mutex<AsyncSubject<T>>>);

/// Multicasting emitter for `AsyncSubject`.
///
/// `AsyncSubjectEmitter` acts as an `Observer`, allowing you to utilize its
/// `next`, `error`, and `complete` methods for multicasting emissions to all
/// registered observers within the `AsyncSubject`.
#[derive(Clone)]
pub struct AsyncSubjectEmitter<T> {
    source: Arc<Mutex<AsyncSubject<T>>>,
    emission_guard: Arc<Mutex<()>>,
}

impl<T> AsyncSubjectReceiver<T> {
    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().observers.len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + 'static> Subscribeable for AsyncSubjectReceiver<T> {
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
                // Nothing to deliver mid-stream; register only.
                src.observers.push((key, Arc::new(Mutex::new(v))));
                return disposable;
            }
            if src.error.is_none() {
                (src.value.clone(), None)
            } else {
                (None, src.error.clone())
            }
        } else {
            return disposable;
        };

        // AsyncSubject already turned terminal. A successful completion
        // replays the value-at-completion (if any) then completes; an errored
        // subject delivers only the error. Not registered.
        if let Some(err) = terminal_error {
            v.error(err);
        } else {
            // A panicking callback must not swallow the terminal signal.
            if let Some(value) = replay {
                let _ = catch_unwind(AssertUnwindSafe(|| v.next(value)));
            }
            v.complete();
        }
        disposable
    }
}

impl<T> Unsubscribeable for AsyncSubjectReceiver<T> {
    fn unsubscribe(self) {
        if let Ok(mut r) = self.0.lock() {
            r.closed = true;
            r.observers.clear();
        }
    }
}

impl<T: Clone> Observer for AsyncSubjectEmitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        let _round = self
            .emission_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Ok(mut src) = self.source.lock() {
            if src.completed || src.closed {
                return;
            }
            // Overwrite the pending slot; delivery happens at completion.
            src.value = Some(v);
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

        // The pending value is dropped on error; only the error goes out.
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

        let (value, drained) = if let Ok(mut src) = self.source.lock() {
            if src.completed || src.closed {
                return;
            }
            src.completed = true;
            // Materialize the value-at-completion for current and late
            // subscribers alike.
            (src.value.clone(), std::mem::take(&mut src.observers))
        } else {
            return;
        };

        if let Some(value) = &value {
            for (_, o) in &drained {
                let mut o = o.lock().unwrap_or_else(PoisonError::into_inner);
                let _ = catch_unwind(AssertUnwindSafe(|| o.next(value.clone())));
            }
        }
        for (_, o) in drained {
            let mut o = o.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = catch_unwind(AssertUnwindSafe(|| o.complete()));
        }
    }
}

impl<T: Clone + Send + 'static> From<AsyncSubjectEmitter<T>> for Subscriber<T> {
    fn from(mut value: AsyncSubjectEmitter<T>) -> Self {
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
