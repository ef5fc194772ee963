//! event-dispatch - Typed publish/subscribe dispatch over trait-object interfaces.
//!
//! This crate provides an in-process event dispatcher with features including:
//! - Notification interfaces declared as plain traits extending [`BaseEventMarker`]
//! - RAII subscription handles with per-interface priority
//! - Synchronous and executor-backed asynchronous dispatch that tolerate
//!   subscribers changing the registry mid-pass

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod macros;
pub mod subscriber;
pub mod task;

pub use config::Config;
pub use error::AppError;
pub use error::DispatchError;
pub use event::BaseEventMarker;
pub use event::dispatch::send_event;
pub use event::dispatch::send_event_async;
pub use event::dispatch::send_event_async_with;
pub use event::dispatch::send_event_once;
pub use event::dispatch::send_event_with;
pub use event::event_bus::EventBus;
pub use event::event_future::EventFuture;
pub use event::event_method::EventMethod;
pub use event::registry::DispatchCursor;
pub use event::registry::Registry;
pub use subscriber::Subscriber;
pub use subscriber::event_handle::EventHandle;
pub use subscriber::event_handle::SubscriptionState;
pub use task::executor::Executor;
pub use task::executor::Job;
pub use task::executor::TokioExecutor;

/// Trait for subscribers that embed an [`EventHandle`] for interface `I`.
///
/// Implemented once per interface, usually through [`event_handles!`].
pub trait HasEventHandle<I: ?Sized + BaseEventMarker> {
    /// Returns the handle tracking this subscriber's membership in the `I` registry.
    fn event_handle(&self) -> &EventHandle<I>;
}

impl<I, T> HasEventHandle<I> for Arc<T>
where
    I: ?Sized + BaseEventMarker,
    T: ?Sized + HasEventHandle<I>,
{
    fn event_handle(&self) -> &EventHandle<I> {
        (**self).event_handle()
    }
}
