//! The dispatch pass, and free functions that dispatch through the global bus.
//!
//! A pass walks the live registry with a [`DispatchCursor`](super::registry::DispatchCursor):
//! every step re-reads the current list, upgrades the record, and calls the handler
//! with no lock held. Handlers may subscribe, unsubscribe, promote or drop
//! subscribers of the same interface while the pass is running:
//!
//! - a subscriber appended during the pass is reached later in the same pass;
//! - a subscriber removed before it was reached is not called;
//! - removing an already visited subscriber (including the running one) never
//!   causes the next one to be skipped;
//! - a subscriber promoted to the front after the pass moved past index 0 is first
//!   reached in the next pass.

use log::debug;
use log::trace;

use super::BaseEventMarker;
use super::event_bus::EventBus;
use super::event_future::EventFuture;
use super::event_method::EventMethod;
use super::registry::Registry;

/// Walks `registry` once, calling `deliver` on every live subscriber.
///
/// Returns the number of subscribers called, or the first handler error.
pub(crate) fn run_pass<I, E, F>(registry: &Registry<I>, mut deliver: F) -> Result<usize, E>
where
    I: ?Sized + BaseEventMarker,
    F: FnMut(&I) -> Result<(), E>,
{
    let mut cursor = registry.cursor();
    let mut delivered = 0;

    while let Some(record) = cursor.advance() {
        let Some(subscriber) = record.upgrade() else {
            trace!(
                "Skipping dropped subscriber of {}",
                std::any::type_name::<I>()
            );
            continue;
        };
        if let Err(e) = deliver(&*subscriber) {
            debug!(
                "Dispatch of {} aborted by subscriber at index {}",
                std::any::type_name::<I>(),
                cursor.position().saturating_sub(1)
            );
            return Err(e);
        }
        delivered += 1;
    }

    trace!(
        "Dispatched {} to {delivered} subscribers",
        std::any::type_name::<I>()
    );
    Ok(delivered)
}

/// [`EventBus::send_event`] on the global bus.
pub fn send_event<I, A, E, M>(method: M, args: &A) -> Result<(), E>
where
    I: ?Sized + BaseEventMarker,
    A: Clone,
    M: EventMethod<I, A, E>,
{
    EventBus::global().send_event(method, args)
}

/// [`EventBus::send_event_with`] on the global bus.
pub fn send_event_with<I, E>(deliver: impl FnMut(&I) -> Result<(), E>) -> Result<(), E>
where
    I: ?Sized + BaseEventMarker,
{
    EventBus::global().send_event_with(deliver)
}

/// [`EventBus::send_event_once`] on the global bus.
pub fn send_event_once<I, A, E, M>(method: M, args: A) -> Result<(), E>
where
    I: ?Sized + BaseEventMarker,
    M: FnOnce(&I, A) -> Result<(), E>,
{
    EventBus::global().send_event_once(method, args)
}

/// [`EventBus::send_event_async`] on the global bus.
pub fn send_event_async<I, A, E, M>(method: M, args: A) -> EventFuture<E>
where
    I: ?Sized + BaseEventMarker,
    A: Clone + Send + 'static,
    E: Send + 'static,
    M: EventMethod<I, A, E> + Send + 'static,
{
    EventBus::global().send_event_async(method, args)
}

/// [`EventBus::send_event_async_with`] on the global bus.
pub fn send_event_async_with<I, E, F>(deliver: F) -> EventFuture<E>
where
    I: ?Sized + BaseEventMarker,
    E: Send + 'static,
    F: FnMut(&I) -> Result<(), E> + Send + 'static,
{
    EventBus::global().send_event_async_with(deliver)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::Weak;

    use super::*;

    trait Step: BaseEventMarker {
        fn id(&self) -> u8;
    }

    struct Numbered(u8);

    impl BaseEventMarker for Numbered {}

    impl Step for Numbered {
        fn id(&self) -> u8 {
            self.0
        }
    }

    fn setup(count: u8) -> (Registry<dyn Step>, Vec<Arc<dyn Step>>) {
        let registry = Registry::new();
        let steps: Vec<Arc<dyn Step>> = (1..=count)
            .map(|id| Arc::new(Numbered(id)) as Arc<dyn Step>)
            .collect();
        for step in &steps {
            registry.append(Arc::downgrade(step));
        }
        (registry, steps)
    }

    #[test]
    fn test_pass_visits_in_order() {
        let (registry, _steps) = setup(4);
        let mut seen = Vec::new();
        let delivered = run_pass(&registry, |s| {
            seen.push(s.id());
            Ok::<_, ()>(())
        })
        .unwrap();
        assert_eq!(delivered, 4);
        assert_eq!(seen, [1, 2, 3, 4]);
    }

    #[test]
    fn test_pass_stops_at_first_error() {
        let (registry, _steps) = setup(3);
        let mut seen = Vec::new();
        let result = run_pass(&registry, |s| {
            seen.push(s.id());
            if s.id() == 2 { Err(s.id()) } else { Ok(()) }
        });
        assert_eq!(result, Err(2));
        assert_eq!(seen, [1, 2]);
    }

    #[test]
    fn test_pass_skips_dropped_subscribers() {
        let (registry, mut steps) = setup(3);
        steps.remove(1);
        let mut seen = Vec::new();
        let delivered = run_pass(&registry, |s| {
            seen.push(s.id());
            Ok::<_, ()>(())
        })
        .unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(seen, [1, 3]);
    }

    #[test]
    fn test_self_removal_does_not_skip_successor() {
        let (registry, steps) = setup(3);
        let handles: Vec<Weak<dyn Step>> = steps.iter().map(Arc::downgrade).collect();
        let seen = Mutex::new(Vec::new());
        run_pass(&registry, |s| {
            seen.lock().unwrap().push(s.id());
            if s.id() == 2 {
                registry.remove(&handles[1]);
            }
            Ok::<_, ()>(())
        })
        .unwrap();
        assert_eq!(*seen.lock().unwrap(), [1, 2, 3]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_pass_releases_cursor() {
        let (registry, _steps) = setup(2);
        let _ = run_pass(&registry, |_| Err::<(), _>("stop"));
        let mut cursor = registry.cursor();
        assert_eq!(cursor.position(), 0);
        assert!(cursor.advance().is_some());
    }
}
