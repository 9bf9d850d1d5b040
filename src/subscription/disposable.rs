use std::{
    future::Future,
    mem,
    panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use tokio::runtime;

/// Enumerates the revocation logic a [`Disposable`] can carry.
///
/// [`Disposable`]: struct.Disposable.html
pub enum DisposeLogic {
    /// No specific revocation logic.
    Nil,

    /// Revocation logic defined by a function.
    Logic(Box<dyn FnOnce() + Send>),

    /// Asynchronous revocation logic represented by a future. Use if you need
    /// to spawn `Tokio` tasks or `.await` as a part of the revocation logic.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

struct DisposableState {
    disposed: AtomicBool,
    logic: Mutex<DisposeLogic>,
    runtime_handle: Option<runtime::Handle>,
}

/// A one-shot, idempotent revocation handle for a single subscription.
///
/// Subscribing to any subject receiver yields a `Disposable` bound to
/// "remove this observer from the subject's subscriber list". Disposing it
/// stops all future delivery to that one observer; it never cancels the
/// producer and never affects other observers. Terminal signals already
/// delivered are not retracted.
///
/// The handle is cheaply cloneable; all clones share the same state, and the
/// underlying revocation logic runs exactly once no matter how many clones
/// call [`dispose`] or how many times.
///
/// [`dispose`]: struct.Disposable.html#method.dispose
///
/// # Examples
///
///```
/// use rxmux::Disposable;
///
/// let d = Disposable::new(|| println!("revoked"));
/// assert!(!d.is_disposed());
///
/// d.dispose();
/// d.dispose(); // Idempotent, the revocation logic already ran.
/// assert!(d.is_disposed());
///```
#[derive(Clone)]
pub struct Disposable(Arc<DisposableState>);

impl Disposable {
    /// Creates a `Disposable` whose revocation logic is the given function.
    pub fn new(logic: impl FnOnce() + Send + 'static) -> Self {
        Self::with_logic(DisposeLogic::Logic(Box::new(logic)))
    }

    /// Creates a `Disposable` whose revocation logic is the given future,
    /// spawned on the `Tokio` runtime upon disposal.
    pub fn from_future(logic: impl Future<Output = ()> + Send + 'static) -> Self {
        Self::with_logic(DisposeLogic::Future(Box::pin(logic)))
    }

    /// Creates a `Disposable` with no revocation logic. Disposing it only
    /// flips its `is_disposed` state.
    #[must_use]
    pub fn empty() -> Self {
        Self::with_logic(DisposeLogic::Nil)
    }

    fn with_logic(logic: DisposeLogic) -> Self {
        // The runtime handle is captured at creation so a future-based
        // disposal can be spawned even when `dispose` itself is later called
        // from outside the runtime.
        Disposable(Arc::new(DisposableState {
            disposed: AtomicBool::new(false),
            logic: Mutex::new(logic),
            runtime_handle: runtime::Handle::try_current().ok(),
        }))
    }

    /// Runs the revocation logic if this handle has not been disposed yet.
    ///
    /// Repeated calls, from this handle or any clone of it, are no-ops.
    ///
    /// # Panics
    ///
    /// If the revocation logic is future-based and neither the creation site
    /// nor the call site is inside a `Tokio` runtime.
    pub fn dispose(&self) {
        if self.0.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let logic = mem::replace(&mut *self.0.logic.lock().unwrap(), DisposeLogic::Nil);
        match logic {
            DisposeLogic::Nil => (),
            DisposeLogic::Logic(fnc) => fnc(),
            DisposeLogic::Future(future) => {
                let handle = self
                    .0
                    .runtime_handle
                    .clone()
                    .or_else(|| runtime::Handle::try_current().ok());
                match handle {
                    Some(handle) => {
                        handle.spawn(async {
                            future.await;
                        });
                    }
                    None => {
                        panic!("Disposable that uses Tokio tasks is disposed outside of Tokio runtime");
                    }
                }
            }
        }
    }

    /// Returns `true` once [`dispose`] has been called on this handle or any
    /// clone of it.
    ///
    /// [`dispose`]: struct.Disposable.html#method.dispose
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.0.disposed.load(Ordering::Acquire)
    }
}

struct CompositeState {
    disposed: bool,
    disposables: Vec<Disposable>,
}

/// A flat container owning many [`Disposable`]s, revoking them all in one step.
///
/// A host component collects every handle it receives into one
/// `CompositeDisposable` and disposes it when torn down, so no subscription
/// outlives the host. Adding a handle after the composite itself was disposed
/// disposes the added handle immediately instead of silently retaining it.
///
/// The teardown sweep is fail-soft: a revocation logic that panics does not
/// stop disposal of the remaining members.
///
/// [`Disposable`]: struct.Disposable.html
///
/// # Examples
///
///```
/// use rxmux::{CompositeDisposable, Disposable};
///
/// let composite = CompositeDisposable::new();
/// composite.add(Disposable::new(|| println!("first revoked")));
/// composite.add(Disposable::new(|| println!("second revoked")));
///
/// composite.dispose(); // Revokes both.
///
/// // Added after disposal: revoked on the spot.
/// let late = Disposable::empty();
/// composite.add(late.clone());
/// assert!(late.is_disposed());
///```
#[derive(Clone)]
pub struct CompositeDisposable(Arc<Mutex<CompositeState>>);

impl CompositeDisposable {
    /// Creates an empty `CompositeDisposable`.
    #[must_use]
    pub fn new() -> Self {
        CompositeDisposable(Arc::new(Mutex::new(CompositeState {
            disposed: false,
            disposables: Vec::with_capacity(16),
        })))
    }

    /// Adds a `Disposable` to the container.
    ///
    /// If the container itself was already disposed, the added handle is
    /// disposed immediately and not retained.
    pub fn add(&self, d: Disposable) {
        let mut state = self.0.lock().unwrap();
        if state.disposed {
            drop(state);
            d.dispose();
            return;
        }
        state.disposables.push(d);
    }

    /// Returns the number of contained disposables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().disposables.len()
    }

    /// Returns `true` if no disposables are contained, `false` otherwise.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Disposes every contained handle exactly once, clears the container and
    /// marks it disposed. Repeated calls are no-ops.
    ///
    /// # Panics
    ///
    /// If any member's revocation logic panicked, the first captured panic is
    /// resumed after the sweep has reached every member.
    pub fn dispose(&self) {
        let drained = {
            let mut state = self.0.lock().unwrap();
            if state.disposed {
                return;
            }
            state.disposed = true;
            mem::take(&mut state.disposables)
        };

        // One panicking member must not leave the rest subscribed.
        let mut first_failure = None;
        for d in drained {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| d.dispose())) {
                first_failure.get_or_insert(payload);
            }
        }
        if let Some(payload) = first_failure {
            resume_unwind(payload);
        }
    }

    /// Returns `true` once the container itself has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.0.lock().unwrap().disposed
    }
}

impl Default for CompositeDisposable {
    fn default() -> Self {
        Self::new()
    }
}
