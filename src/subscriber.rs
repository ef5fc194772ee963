//! Subscription handles and the per-interface operations on subscribers.

pub mod event_handle;

use crate::HasEventHandle;
use crate::event::BaseEventMarker;
use event_handle::SubscriptionState;

/// Subscription operations on any object embedding one or more event handles.
///
/// The interface is named with a turbofish, so one subscriber can manage each of
/// its interfaces independently:
///
/// ```rust,ignore
/// audit.set_first_priority::<dyn OrderEvents>();
/// audit.unsubscribe::<dyn RefundEvents>();
/// ```
pub trait Subscriber {
    fn subscribe<I>(&self) -> SubscriptionState
    where
        I: ?Sized + BaseEventMarker,
        Self: HasEventHandle<I>,
    {
        <Self as HasEventHandle<I>>::event_handle(self).subscribe()
    }

    fn unsubscribe<I>(&self) -> SubscriptionState
    where
        I: ?Sized + BaseEventMarker,
        Self: HasEventHandle<I>,
    {
        <Self as HasEventHandle<I>>::event_handle(self).unsubscribe()
    }

    /// Moves this subscriber to the front of the `I` registry. Returns `false`
    /// while unsubscribed.
    fn set_first_priority<I>(&self) -> bool
    where
        I: ?Sized + BaseEventMarker,
        Self: HasEventHandle<I>,
    {
        <Self as HasEventHandle<I>>::event_handle(self).set_first_priority()
    }

    fn is_subscribed<I>(&self) -> bool
    where
        I: ?Sized + BaseEventMarker,
        Self: HasEventHandle<I>,
    {
        <Self as HasEventHandle<I>>::event_handle(self).is_subscribed()
    }
}

impl<T: ?Sized> Subscriber for T {}
