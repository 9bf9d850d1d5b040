//! `rxmux` provides multicast stream subjects for event-driven applications.
//!
//! A subject is simultaneously a producer-facing observer and a
//! consumer-facing observable: values pushed into its emitter are fanned out,
//! in subscription order, to every observer registered with its receiver.
//! The four variants differ only in what history a late-joining observer
//! sees: [`PublishSubject`] replays nothing, [`BehaviorSubject`] replays the
//! latest value, [`AsyncSubject`] delivers the last value only at completion,
//! and [`ReplaySubject`] replays the whole recorded sequence.
//!
//! Every subscription yields a [`Disposable`], a one-shot idempotent handle
//! that detaches that one observer. A host collects its handles into a
//! [`CompositeDisposable`] and revokes them all in a single step on teardown.
//!
//! Subjects are execution-context agnostic: producer calls and subscriptions
//! may come from different threads or `Tokio` tasks. State transitions apply
//! sequentially, emission rounds are serialized and delivered over a snapshot
//! of the subscriber list, and observer callbacks never run under the
//! subject's lock, so a callback may freely subscribe or dispose without
//! deadlocking against the producer.
//!
//! [`PublishSubject`]: subjects/struct.PublishSubject.html
//! [`BehaviorSubject`]: subjects/struct.BehaviorSubject.html
//! [`AsyncSubject`]: subjects/struct.AsyncSubject.html
//! [`ReplaySubject`]: subjects/struct.ReplaySubject.html
//! [`Disposable`]: struct.Disposable.html
//! [`CompositeDisposable`]: struct.CompositeDisposable.html
//!
//! # Examples
//!
//!```
//! use rxmux::subjects::PublishSubject;
//! use rxmux::subscribe::Subscriber;
//! use rxmux::{CompositeDisposable, Observer, Subscribeable};
//!
//! let (mut emitter, mut receiver) = PublishSubject::emitter_receiver();
//! let subscriptions = CompositeDisposable::new();
//!
//! subscriptions.add(receiver.subscribe(Subscriber::new(
//!     |v: &str| println!("received: {}", v),
//!     |e| eprintln!("failed: {}", e),
//!     || println!("done"),
//! )));
//!
//! emitter.next("Item 1");
//! emitter.complete();
//!
//! subscriptions.dispose();
//!```

mod observer;
pub mod subjects;
pub mod subscription;

pub use observer::Observer;
pub use subscription::disposable::{CompositeDisposable, Disposable};
pub use subscription::subscribe;
pub use subscription::subscribe::{Subscribeable, Unsubscribeable};
