use std::{error::Error, sync::Arc};

use crate::subscription::disposable::Disposable;

/// The consumer contract for a multicast value stream.
///
/// An `Observer` receives zero or more `next` calls followed by at most one
/// terminal call, either `complete` or `error`, never both. Before any of
/// those, `subscribed` hands over the [`Disposable`] bound to the
/// registration so the consumer can cancel before the first value arrives.
///
/// Subject emitters implement `Observer` as well, which lets a subject be
/// plugged directly into any upstream source that drives an observer.
///
/// [`Disposable`]: subscription/disposable/struct.Disposable.html
pub trait Observer {
    type NextFnType;

    /// Called once, before any delivery, with the revocation handle for this
    /// registration. Defaults to a no-op.
    fn subscribed(&mut self, _: Disposable) {}

    fn next(&mut self, _: Self::NextFnType);
    fn complete(&mut self);
    fn error(&mut self, _: Arc<dyn Error + Send + Sync>);
}
