use std::{error::Error, sync::Arc};

use crate::observer::Observer;
use crate::subscription::disposable::Disposable;

/// A trait for types that can be subscribed to, allowing consumers to receive
/// values multicast by a subject.
pub trait Subscribeable {
    /// The type of items emitted by the subject.
    type ObsType;

    /// Registers the given `Subscriber` with the subject and specifies how to
    /// handle emitted values.
    ///
    /// The subject first hands the returned [`Disposable`] to the subscriber
    /// through `Observer::subscribed`, then, depending on the subject variant,
    /// delivers buffered history and/or the terminal signal before returning.
    /// An observer that joins an already-terminal subject only receives its
    /// history and the terminal signal; it is never registered for future
    /// delivery.
    ///
    /// [`Disposable`]: ../disposable/struct.Disposable.html
    fn subscribe(&mut self, s: Subscriber<Self::ObsType>) -> Disposable;
}

/// A trait for types that can be unsubscribed as a whole, closing the subject
/// and releasing every registered observer at once.
///
/// Unlike disposing a single [`Disposable`], which detaches one observer,
/// `unsubscribe` consumes the receiver: the subject stops emitting and stops
/// accepting registrations afterwards.
///
/// [`Disposable`]: ../disposable/struct.Disposable.html
pub trait Unsubscribeable {
    fn unsubscribe(self);
}

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type CompleteFn = Box<dyn FnMut() + Send + Sync>;
type ErrorFn = Box<dyn FnMut(Arc<dyn Error + Send + Sync>) + Send + Sync>;
type SubscribeFn = Box<dyn FnMut(Disposable) + Send + Sync>;

/// The one reusable observer implementation, parameterized by a callback set.
///
/// Users create a `Subscriber` with the `new` method and provide custom
/// functions to handle the `next`, `error` and `complete` events; an optional
/// `on_subscribe` callback can be attached with [`on_subscribe`]. Each
/// terminal callback runs at most once, so a subscriber attached to several
/// sources still honors the single-terminal-signal contract.
///
/// The subscriber also keeps hold of the [`Disposable`] it was handed when it
/// was registered, so cancellation is available right on the observer without
/// any inheritance-style wiring: see [`dispose`].
///
/// [`on_subscribe`]: struct.Subscriber.html#method.on_subscribe
/// [`dispose`]: struct.Subscriber.html#method.dispose
/// [`Disposable`]: ../disposable/struct.Disposable.html
///
/// # Examples
///
///```
/// use rxmux::subscribe::Subscriber;
/// use rxmux::subjects::PublishSubject;
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
/// let (mut emitter, mut receiver) = PublishSubject::emitter_receiver();
///
/// let disposable = receiver.subscribe(create_subscriber(1));
///
/// emitter.next(101); // Emits 101 to registered `Subscriber` 1.
/// disposable.dispose(); // Subscriber 1 receives nothing further.
/// emitter.next(102);
///```
pub struct Subscriber<NextFnType> {
    next_fn: NextFn<NextFnType>,
    complete_fn: Option<CompleteFn>,
    error_fn: Option<ErrorFn>,
    subscribe_fn: Option<SubscribeFn>,
    disposable: Option<Disposable>,
    completed: bool,
    errored: bool,
}

impl<NextFnType> Subscriber<NextFnType> {
    /// Creates a new `Subscriber` instance with custom handling functions for
    /// emitted values, errors, and completion.
    pub fn new(
        next_fn: impl FnMut(NextFnType) + 'static + Send,
        error_fn: impl FnMut(Arc<dyn Error + Send + Sync>) + 'static + Send + Sync,
        complete_fn: impl FnMut() + 'static + Send + Sync,
    ) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: Some(Box::new(complete_fn)),
            error_fn: Some(Box::new(error_fn)),
            subscribe_fn: None,
            disposable: None,
            completed: false,
            errored: false,
        }
    }

    /// Create a new `Subscriber` with the provided `next` function only.
    ///
    /// The `next` closure is called when the subject emits a new item. It takes
    /// a parameter of type `NextFnType`, which is an item emitted by the subject.
    pub fn on_next(next_fn: impl FnMut(NextFnType) + 'static + Send) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: None,
            error_fn: None,
            subscribe_fn: None,
            disposable: None,
            completed: false,
            errored: false,
        }
    }

    /// Set the completion function for the `Subscriber`.
    ///
    /// The provided closure will be called when the subject completes its
    /// emission sequence.
    pub fn on_complete(&mut self, complete_fn: impl FnMut() + 'static + Send + Sync) {
        self.complete_fn = Some(Box::new(complete_fn));
    }

    /// Set the error-handling function for the `Subscriber`.
    ///
    /// The provided closure will be called when the subject terminates with an
    /// error. It takes an `Arc` wrapping a trait object that implements the
    /// `Error`, `Send`, and `Sync` traits as its parameter.
    pub fn on_error(
        &mut self,
        error_fn: impl FnMut(Arc<dyn Error + Send + Sync>) + 'static + Send + Sync,
    ) {
        self.error_fn = Some(Box::new(error_fn));
    }

    /// Set the subscription function for the `Subscriber`.
    ///
    /// The provided closure will be called once, before any delivery, with the
    /// [`Disposable`] bound to this registration.
    ///
    /// [`Disposable`]: ../disposable/struct.Disposable.html
    pub fn on_subscribe(&mut self, subscribe_fn: impl FnMut(Disposable) + 'static + Send + Sync) {
        self.subscribe_fn = Some(Box::new(subscribe_fn));
    }

    /// The revocation handle this subscriber was registered with, if it has
    /// been registered.
    #[must_use]
    pub fn disposable(&self) -> Option<&Disposable> {
        self.disposable.as_ref()
    }

    /// Disposes the held registration, if any. No-op for a subscriber that
    /// was never registered.
    pub fn dispose(&self) {
        if let Some(d) = &self.disposable {
            d.dispose();
        }
    }

    /// Returns `true` if the held registration has been disposed. A subscriber
    /// that was never registered reports `false`.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposable.as_ref().is_some_and(Disposable::is_disposed)
    }
}

impl<T> Observer for Subscriber<T> {
    type NextFnType = T;

    fn subscribed(&mut self, d: Disposable) {
        self.disposable = Some(d.clone());
        if let Some(sfn) = &mut self.subscribe_fn {
            (sfn)(d);
        }
    }

    fn next(&mut self, v: Self::NextFnType) {
        if self.completed || self.errored {
            return;
        }
        (self.next_fn)(v);
    }

    fn complete(&mut self) {
        if self.completed || self.errored {
            return;
        }
        self.completed = true;
        if let Some(cfn) = &mut self.complete_fn {
            (cfn)();
        }
    }

    fn error(&mut self, observable_error: Arc<dyn Error + Send + Sync>) {
        if self.completed || self.errored {
            return;
        }
        self.errored = true;
        if let Some(efn) = &mut self.error_fn {
            (efn)(observable_error);
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        error::Error,
        fmt,
        sync::{Arc, Mutex},
    };

    use super::Subscriber;
    use crate::observer::Observer;
    use crate::subscription::disposable::Disposable;

    #[derive(Debug)]
    struct FailedStream;

    impl fmt::Display for FailedStream {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "stream failed")
        }
    }

    impl Error for FailedStream {}

    #[test]
    fn subscriber_terminal_callbacks_fire_once() {
        let completes = Arc::new(Mutex::new(0));
        let errors = Arc::new(Mutex::new(0));
        let completes_c = Arc::clone(&completes);
        let errors_c = Arc::clone(&errors);

        let mut s = Subscriber::new(
            |_: i32| (),
            move |_| *errors_c.lock().unwrap() += 1,
            move || *completes_c.lock().unwrap() += 1,
        );

        s.complete();
        s.complete();
        s.error(Arc::new(FailedStream));

        assert_eq!(*completes.lock().unwrap(), 1);
        assert_eq!(*errors.lock().unwrap(), 0);
    }

    #[test]
    fn subscriber_stops_forwarding_after_terminal() {
        let nexts = Arc::new(Mutex::new(Vec::new()));
        let nexts_c = Arc::clone(&nexts);

        let mut s = Subscriber::new(
            move |v: i32| nexts_c.lock().unwrap().push(v),
            |_| (),
            || (),
        );

        s.next(1);
        s.error(Arc::new(FailedStream));
        s.next(2);
        s.complete();

        assert_eq!(*nexts.lock().unwrap(), vec![1]);
    }

    #[test]
    fn subscriber_holds_its_disposable() {
        let mut s = Subscriber::on_next(|_: i32| ());
        assert!(s.disposable().is_none());
        assert!(!s.is_disposed());

        s.on_subscribe(|_| ());
        s.subscribed(Disposable::empty());

        s.dispose();
        assert!(s.is_disposed());
    }
}
