use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::Weak;

use log::debug;
use log::trace;

use crate::event::BaseEventMarker;
use crate::event::event_bus::EventBus;
use crate::event::registry::Registry;

/// Membership of one subscriber in the registry of one interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
    Subscribed,
    Unsubscribed,
}

/// RAII membership record embedded in a subscriber.
///
/// The handle subscribes when it is created and unsubscribes when it is dropped,
/// which happens when its owning subscriber is dropped. Build the subscriber with
/// [`Arc::new_cyclic`] so the handle can refer back to it:
///
/// ```rust,ignore
/// struct Audit {
///     orders: EventHandle<dyn OrderEvents>,
/// }
///
/// let audit = Arc::new_cyclic(|me: &Weak<Audit>| Audit {
///     orders: EventHandle::new(me.clone()),
/// });
/// ```
///
/// Every operation may be called from inside a handler while a pass over the same
/// registry is running.
pub struct EventHandle<I: ?Sized + BaseEventMarker> {
    registry: Arc<Registry<I>>,
    subscriber: Weak<I>,
    state: Mutex<SubscriptionState>,
}

impl<I: ?Sized + BaseEventMarker> EventHandle<I> {
    /// Subscribes `subscriber` on the global bus.
    pub fn new(subscriber: Weak<I>) -> Self {
        Self::with_bus(EventBus::global(), subscriber)
    }

    /// Subscribes `subscriber` on `bus`.
    pub fn with_bus(bus: &EventBus, subscriber: Weak<I>) -> Self {
        Self::with_registry(bus.registry::<I>(), subscriber)
    }

    /// Subscribes `subscriber` to `registry`.
    pub fn with_registry(registry: Arc<Registry<I>>, subscriber: Weak<I>) -> Self {
        let handle = Self {
            registry,
            subscriber,
            state: Mutex::new(SubscriptionState::Unsubscribed),
        };
        handle.subscribe();
        handle
    }

    fn lock_state(&self) -> MutexGuard<'_, SubscriptionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SubscriptionState {
        *self.lock_state()
    }

    pub fn is_subscribed(&self) -> bool {
        self.state() == SubscriptionState::Subscribed
    }

    /// Appends the subscriber to the end of the registry unless it is already there.
    ///
    /// The registry is the source of truth, so a subscriber removed by
    /// [`Registry::clear`] is registered again.
    pub fn subscribe(&self) -> SubscriptionState {
        let mut state = self.lock_state();
        if !self.registry.append(self.subscriber.clone()) {
            debug!(
                "Subscriber of {} is already subscribed",
                std::any::type_name::<I>()
            );
        }
        *state = SubscriptionState::Subscribed;
        *state
    }

    /// Removes the subscriber from the registry. Safe when already unsubscribed.
    pub fn unsubscribe(&self) -> SubscriptionState {
        let mut state = self.lock_state();
        if *state == SubscriptionState::Subscribed {
            self.registry.remove(&self.subscriber);
            *state = SubscriptionState::Unsubscribed;
            trace!("Unsubscribed from {}", std::any::type_name::<I>());
        }
        *state
    }

    /// Moves the subscriber to the front of the registry.
    ///
    /// Returns `false` without doing anything while unsubscribed.
    pub fn set_first_priority(&self) -> bool {
        let state = self.lock_state();
        if *state != SubscriptionState::Subscribed {
            debug!(
                "Ignoring promotion of an unsubscribed {} subscriber",
                std::any::type_name::<I>()
            );
            return false;
        }
        self.registry.promote_to_front(&self.subscriber)
    }

    pub fn registry(&self) -> &Arc<Registry<I>> {
        &self.registry
    }
}

impl<I: ?Sized + BaseEventMarker> Drop for EventHandle<I> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
