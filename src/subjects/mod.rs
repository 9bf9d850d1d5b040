//! The `subjects` module provides the multicast primitives of this crate.
//! Subjects serve both as observers and observables, allowing multiple
//! observers to concurrently subscribe to a single source and receive updates.
//!
//! Each subject is split into an emitter and a receiver by its
//! `emitter_receiver` function. The emitter behaves as an `Observer`, enabling
//! `next()`, `error()` and `complete()` calls; this also allows the emitter to
//! be handed to an upstream producer as its observer. The receiver carries the
//! consumer surface: its `subscribe` method registers a `Subscriber` and
//! returns the `Disposable` revoking that one registration, and its
//! `unsubscribe` method closes the subject as a whole.
//!
//! There are four specialized varieties of subject, differing only in what
//! history a late-joining observer sees: `PublishSubject` (none),
//! `BehaviorSubject` (the latest value), `AsyncSubject` (the last value, only
//! at completion) and `ReplaySubject` (the whole recorded sequence).

mod async_subject;
mod behavior_subject;
mod publish_subject;
mod replay_subject;

pub use async_subject::*;
pub use behavior_subject::*;
pub use publish_subject::*;
pub use replay_subject::*;

use std::hash::Hasher;
use std::sync::{Arc, Mutex};

use crate::subscription::subscribe::Subscriber;

// Registered observers are shared so an emission round can deliver to a
// point-in-time snapshot without holding the subject's state lock.
pub(crate) type SharedSubscriber<T> = Arc<Mutex<Subscriber<T>>>;

fn random_seed() -> u64 {
    std::hash::BuildHasher::build_hasher(&std::collections::hash_map::RandomState::new()).finish()
}

// Pseudorandom number generator from the "Xorshift RNGs" paper by George Marsaglia.
//
// https://github.com/rust-lang/rust/blob/1.55.0/library/core/src/slice/sort.rs#L559-L573
fn gen_key() -> impl Iterator<Item = u64> {
    let mut random: u64 = random_seed();
    std::iter::repeat_with(move || {
        random ^= random << 13;
        random ^= random >> 17;
        random ^= random << 5;
        random
    })
}
