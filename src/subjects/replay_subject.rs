use std::{
    collections::VecDeque,
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

/// Specifies the buffer size for replaying previous emissions in
/// `ReplaySubject` when using [`emitter_receiver`].
///
/// [`emitter_receiver`]: struct.ReplaySubject.html#method.emitter_receiver
pub enum BufSize {
    /// Specifies an infinite buffer size, allowing all emitted values to be replayed.
    Unbounded,

    /// Specifies a limited buffer size with the maximum number of values to be replayed.
    Bounded(usize),
}

/// Replaying old values to new subscribers, this variant of subject emits the
/// recorded sequence upon subscription.
///
/// A `ReplaySubject` maintains a buffer of previously emitted values and
/// transmits them, in original emission order, to every new subscriber before
/// it sees anything else. Unlike a `BehaviorSubject`, which holds a single
/// current value, a `ReplaySubject` records and replays an entire sequence.
///
/// Even in a stopped state due to completion or an error, a `ReplaySubject`
/// replays its buffer to new subscribers before notifying them of the
/// completion or the error; such late subscribers are never registered.
///
/// With `BufSize::Unbounded` the buffer grows for as long as the subject stays
/// active; callers are responsible for ensuring the upstream producer
/// eventually terminates if that is a concern. With `BufSize::Bounded(n)` the
/// oldest entry is dropped once `n` values are buffered.
///
/// # Examples
///
///```
/// use rxmux::subjects::{BufSize, ReplaySubject};
/// use rxmux::subscribe::Subscriber;
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
/// // Initialize a `ReplaySubject` with an unbounded buffer size and obtain
/// // its emitter and receiver.
/// let (mut emitter, mut receiver) = ReplaySubject::emitter_receiver(BufSize::Unbounded);
///
/// emitter.next(101); // Stores 101, no registered subscribers yet.
/// emitter.next(102); // Stores 102.
///
/// // Registers `Subscriber` 1 and replays the buffered values (101, 102) to it.
/// receiver.subscribe(create_subscriber(1));
///
/// emitter.next(103); // Stores 103 and emits it to registered `Subscriber` 1.
///
/// emitter.complete(); // Calls `complete` on registered `Subscriber` 1.
///
/// // Subscriber 2: post-completion subscribe, replays the buffered values
/// // (101, 102, 103) and completes.
/// receiver.subscribe(create_subscriber(2));
///
/// emitter.next(104); // Called post-completion, does not emit.
///```
pub struct ReplaySubject<T> {
    buf_size: BufSize,
    values: VecDeque<T>,
    observers: Vec<(u64, SharedSubscriber<T>)>,
    completed: bool,
    closed: bool,
    error: Option<Arc<dyn Error + Send + Sync>>,
}

impl<T: Send + 'static> ReplaySubject<T> {
    /// Creates a `ReplaySubject` with a specified buffer size, allowing for
    /// replaying previous emissions to new subscribers.
    ///
    /// The `buf_size` parameter determines the size of the buffer used for
    /// replaying values to new subscribers. A buffer size of
    /// `BufSize::Unbounded` means an infinite buffer, retaining all past
    /// values for replay.
    ///
    /// Returns a tuple containing a `ReplaySubjectEmitter` for emitting values
    /// and a `ReplaySubjectReceiver` for subscribing to emitted values.
    pub fn emitter_receiver(
        buf_size: BufSize,
    ) -> (ReplaySubjectEmitter<T>, ReplaySubjectReceiver<T>) {
        let values = match buf_size {
            BufSize::Unbounded => VecDeque::with_capacity(16),
            BufSize::Bounded(size) => VecDeque::with_capacity(size),
        };
        let s = Arc::new(Mutex::new(ReplaySubject {
            buf_size,
            values,
            observers: Vec::with_capacity(16),
            completed: false,
            closed: false,
            error: None,
        }));

        (
            ReplaySubjectEmitter {
                source: Arc::clone(&s),
                emission_guard: Arc::new(Mutex::new(())),
            },
            ReplaySubjectReceiver(Arc::clone(&s)),
        )
    }
}

/// Subscription handler for `ReplaySubject`.
///
/// `ReplaySubjectReceiver` carries the consumer surface, allowing you to
/// utilize its `subscribe` method for receiving emissions from the
/// `ReplaySubject`'s multicasting. You can also employ its `unsubscribe`
/// method to close the `ReplaySubject` and remove registered observers.
#[derive(Clone)]
pub struct ReplaySubjectReceiver<T>(Arc<Mutex<ReplaySubject<T>>>);

/// Multicasting emitter for `ReplaySubject`.
///
/// `ReplaySubjectEmitter` acts as an `Observer`, allowing you to utilize its
/// `next`, `error`, and `complete` methods for multicasting emissions to all
/// registered observers within the `ReplaySubject`.
#[derive(Clone)]
pub struct ReplaySubjectEmitter<T> {
    source: Arc<Mutex<ReplaySubject<T>>>,
    emission_guard: Arc<Mutex<()>>,
}

impl<T> ReplaySubjectReceiver<T> {
    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().observers.len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + 'static> Subscribeable for ReplaySubjectReceiver<T> {
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

        let (buffered, terminal_error) = if let Ok(mut src) = self.0.lock() {
            if src.closed {
                disposable.dispose();
                return disposable;
            }
            if !src.completed {
                let replay: Vec<T> = src.values.iter().cloned().collect();
                // Register while holding the new Subscriber's own lock, so a
                // concurrent emission round that snapshots it waits until the
                // whole replay has landed. A value buffered after this point
                // reaches the Subscriber through its live round instead.
                let shared = Arc::new(Mutex::new(v));
                let mut held = shared.lock().unwrap_or_else(PoisonError::into_inner);
                src.observers.push((key, Arc::clone(&shared)));
                drop(src);

                for value in replay {
                    let _ = catch_unwind(AssertUnwindSafe(|| held.next(value)));
                }
                return disposable;
            }
            (
                src.values.iter().cloned().collect::<Vec<T>>(),
                src.error.clone(),
            )
        } else {
            return disposable;
        };

        // ReplaySubject already turned terminal. Replay the recorded sequence
        // in original emission order, then deliver the one terminal signal.
        // Not registered. A panicking callback must not swallow the terminal
        // signal or the rest of the replay.
        for value in buffered {
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

impl<T> Unsubscribeable for ReplaySubjectReceiver<T> {
    fn unsubscribe(self) {
        if let Ok(mut r) = self.0.lock() {
            r.closed = true;
            r.observers.clear();
        }
    }
}

impl<T: Clone> Observer for ReplaySubjectEmitter<T> {
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
            match src.buf_size {
                BufSize::Unbounded => src.values.push_back(v.clone()),
                BufSize::Bounded(buf_size) => {
                    // A full buffer drops its oldest entry to accommodate the
                    // new one.
                    if src.values.len() == buf_size {
                        src.values.pop_front();
                    }
                    if buf_size > 0 {
                        src.values.push_back(v.clone());
                    }
                }
            }
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

impl<T: Clone + Send + 'static> From<ReplaySubjectEmitter<T>> for Subscriber<T> {
    fn from(mut value: ReplaySubjectEmitter<T>) -> Self {
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
