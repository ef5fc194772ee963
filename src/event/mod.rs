//! Notification interfaces and the machinery that dispatches them.

pub mod dispatch;
pub mod event_bus;
pub mod event_future;
pub mod event_method;
pub mod registry;

/// Marker trait for notification interfaces that can be dispatched through an
/// [`EventBus`](event_bus::EventBus).
///
/// A notification interface is a dyn-compatible trait extending this marker whose
/// methods are the events. Every method takes `&self` and returns `Result<(), E>`:
///
/// ```rust,ignore
/// trait OrderEvents: BaseEventMarker {
///     fn on_placed(&self, order_id: u64) -> anyhow::Result<()>;
/// }
/// ```
///
/// Registries are keyed by the trait object type (`dyn OrderEvents`), so no runtime
/// registration step is needed.
pub trait BaseEventMarker: Send + Sync + 'static {}
