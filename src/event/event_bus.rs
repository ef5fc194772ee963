use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::PoisonError;
use std::sync::RwLock;

use log::debug;
use log::error;
use log::warn;
use tokio::sync::oneshot;

use super::BaseEventMarker;
use super::dispatch::run_pass;
use super::event_future::EventFuture;
use super::event_method::EventMethod;
use super::registry::Registry;
use crate::config::Config;
use crate::error::AppError;
use crate::error::DispatchError;
use crate::task::executor::Executor;
use crate::task::executor::TokioExecutor;

type Registries = RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>;

static GLOBAL_BUS: OnceLock<EventBus> = OnceLock::new();

/// Owns one [`Registry`] per notification interface and dispatches to them.
///
/// Registries are created lazily, keyed by the `TypeId` of the interface's trait
/// object type, and live as long as the bus. Asynchronous passes are scheduled on
/// the bus [`Executor`].
pub struct EventBus {
    registries: Registries,
    executor: Arc<dyn Executor>,
}

impl EventBus {
    /// Creates a bus with a dedicated tokio runtime built from `config`.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let executor = TokioExecutor::new(config)?;
        Ok(Self::with_executor(Arc::new(executor)))
    }

    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            registries: RwLock::new(HashMap::new()),
            executor,
        }
    }

    /// The process-wide bus used by [`EventHandle::new`](crate::subscriber::event_handle::EventHandle::new)
    /// and the free functions in [`dispatch`](super::dispatch).
    ///
    /// Created on first use from the environment configuration unless a bus was
    /// installed earlier with [`install_global`](EventBus::install_global).
    pub fn global() -> &'static EventBus {
        GLOBAL_BUS.get_or_init(|| {
            let mut config = Config::new();
            if let Err(e) = config.load() {
                warn!("Falling back to default dispatcher config: {e}");
                config = Config::new();
            }
            EventBus::new(&config).expect("Error spawning tokio runtime for the global EventBus")
        })
    }

    /// Installs `bus` as the global bus. Gives it back if the global bus already exists.
    pub fn install_global(bus: EventBus) -> Result<(), EventBus> {
        GLOBAL_BUS.set(bus)
    }

    /// Returns the registry of interface `I`, creating it on first use.
    pub fn registry<I>(&self) -> Arc<Registry<I>>
    where
        I: ?Sized + BaseEventMarker,
    {
        if let Some(registry) = self.find_registry::<I>() {
            return registry;
        }

        let mut registries = self
            .registries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Another thread may have created it between the two locks
        if let Some(registry) = registries
            .get(&TypeId::of::<I>())
            .and_then(|slot| slot.downcast_ref::<Arc<Registry<I>>>())
        {
            return registry.clone();
        }

        debug!("Creating registry for {}", std::any::type_name::<I>());
        let registry = Arc::new(Registry::<I>::new());
        registries.insert(TypeId::of::<I>(), Box::new(registry.clone()));
        registry
    }

    /// Returns the registry of interface `I` if anything ever subscribed to it.
    pub fn find_registry<I>(&self) -> Option<Arc<Registry<I>>>
    where
        I: ?Sized + BaseEventMarker,
    {
        let registries = self
            .registries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        registries
            .get(&TypeId::of::<I>())
            .and_then(|slot| slot.downcast_ref::<Arc<Registry<I>>>())
            .cloned()
    }

    /// Number of records currently registered for interface `I`.
    pub fn subscriber_count<I>(&self) -> usize
    where
        I: ?Sized + BaseEventMarker,
    {
        self.find_registry::<I>().map_or(0, |registry| registry.len())
    }

    /// Empties the registry of interface `I`. Cleared subscribers come back when
    /// their handles subscribe again.
    pub fn reset<I>(&self)
    where
        I: ?Sized + BaseEventMarker,
    {
        if let Some(registry) = self.find_registry::<I>() {
            registry.clear();
        }
    }

    /// Calls `method` on every live subscriber of `I`, in registry order, on the
    /// calling thread.
    ///
    /// Each invocation receives its own clone of `args`; the caller's tuple is left
    /// untouched. The first handler error stops the pass and is returned.
    pub fn send_event<I, A, E, M>(&self, method: M, args: &A) -> Result<(), E>
    where
        I: ?Sized + BaseEventMarker,
        A: Clone,
        M: EventMethod<I, A, E>,
    {
        self.send_event_with(|subscriber: &I| method.invoke(subscriber, args.clone()))
    }

    /// Runs `deliver` for every live subscriber of `I`, in registry order, on the
    /// calling thread.
    ///
    /// This is the form for arguments that cannot be cloned per subscriber, such as
    /// `&mut` references; name the interface with a turbofish:
    ///
    /// ```rust,ignore
    /// bus.send_event_with::<dyn Inventory, _>(|s| s.on_restock(&mut stock))?;
    /// ```
    pub fn send_event_with<I, E>(&self, deliver: impl FnMut(&I) -> Result<(), E>) -> Result<(), E>
    where
        I: ?Sized + BaseEventMarker,
    {
        let Some(registry) = self.find_registry::<I>() else {
            return Ok(());
        };
        run_pass(&registry, deliver).map(|_| ())
    }

    /// Moves `args` into a single call on the first live subscriber of `I`.
    ///
    /// For move-only arguments. Subscribers after the first are not called; having
    /// more than one is a caller error and is logged.
    pub fn send_event_once<I, A, E, M>(&self, method: M, args: A) -> Result<(), E>
    where
        I: ?Sized + BaseEventMarker,
        M: FnOnce(&I, A) -> Result<(), E>,
    {
        let Some(registry) = self.find_registry::<I>() else {
            return Ok(());
        };
        let mut cursor = registry.cursor();
        while let Some(record) = cursor.advance() {
            let Some(subscriber) = record.upgrade() else {
                continue;
            };
            let live = registry.live_len();
            if live > 1 {
                warn!(
                    "Move-only dispatch on {} reaches only the first of {live} subscribers",
                    std::any::type_name::<I>()
                );
            }
            drop(cursor);
            return method(&*subscriber, args);
        }
        Ok(())
    }

    /// Schedules a pass of `method` over the subscribers of `I` on the bus executor
    /// and returns without waiting for it.
    ///
    /// `args` is moved into the job and cloned once per subscriber invocation. A
    /// caller that wants to keep its values passes clones.
    pub fn send_event_async<I, A, E, M>(&self, method: M, args: A) -> EventFuture<E>
    where
        I: ?Sized + BaseEventMarker,
        A: Clone + Send + 'static,
        E: Send + 'static,
        M: EventMethod<I, A, E> + Send + 'static,
    {
        self.send_event_async_with(move |subscriber: &I| method.invoke(subscriber, args.clone()))
    }

    /// Closure form of [`send_event_async`](EventBus::send_event_async).
    pub fn send_event_async_with<I, E, F>(&self, mut deliver: F) -> EventFuture<E>
    where
        I: ?Sized + BaseEventMarker,
        E: Send + 'static,
        F: FnMut(&I) -> Result<(), E> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let Some(registry) = self.find_registry::<I>() else {
            let _ = tx.send(Ok(()));
            return EventFuture::new(rx);
        };

        self.executor.schedule(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                run_pass(&registry, &mut deliver)
            }));
            let outcome = match outcome {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(DispatchError::Handler(e)),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(
                        "Subscriber of {} panicked during dispatch: {message}",
                        std::any::type_name::<I>()
                    );
                    Err(DispatchError::Panicked { message })
                }
            };
            // The caller may have dropped the future; the pass has run either way
            let _ = tx.send(outcome);
        }));

        EventFuture::new(rx)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
