//! Provides structures and traits related to subscription management.
//!
//! This module includes the `Subscriber` type for handling observed values,
//! errors, and completions, the `Disposable` revocation handle returned by
//! every subscription, and the `CompositeDisposable` container that releases
//! a whole set of subscriptions in one step.
//!
//! Additionally, it defines the `Subscribeable` and `Unsubscribeable` traits
//! implemented by subject receivers.
pub mod disposable;
pub mod subscribe;
