//! Common test utilities and probe subscribers.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;

use event_dispatch::BaseEventMarker;
use event_dispatch::EventBus;
use event_dispatch::EventHandle;
use event_dispatch::Job;
use event_dispatch::event_handles;

/// Argument type that counts how many times it was cloned on its way to a handler.
#[derive(Debug)]
pub struct Counted {
    pub value: i32,
    pub copies: usize,
}

#[allow(dead_code)]
impl Counted {
    pub const fn new(value: i32) -> Self {
        Self { value, copies: 0 }
    }
}

impl Clone for Counted {
    fn clone(&self) -> Self {
        Self {
            value: self.value,
            copies: self.copies + 1,
        }
    }
}

/// Move-only argument.
#[derive(Debug, PartialEq)]
pub struct Token(pub u32);

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PingError {
    #[error("{name} refused the ping")]
    Refused { name: String },
}

#[allow(dead_code)]
pub trait Ping: BaseEventMarker {
    fn on_ping(&self, value: i32) -> Result<(), PingError>;
    fn on_value(&self, value: Counted) -> Result<(), PingError>;
    fn on_shared(&self, value: &Counted) -> Result<(), PingError>;
    fn on_arc(&self, value: Arc<Counted>) -> Result<(), PingError>;
    fn on_token(&self, token: Token) -> Result<(), PingError>;
    fn on_tally(&self, tally: &mut Vec<String>) -> Result<(), PingError>;
}

/// Ordered record of handler calls shared by the probes of one test.
#[derive(Default)]
pub struct Journal(Mutex<Vec<String>>);

#[allow(dead_code)]
impl Journal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Returns the entries recorded so far and starts over.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

pub type Hook = Arc<dyn Fn(&Probe) + Send + Sync>;

/// Subscriber of `Ping` that journals every call as `name` or `name:value`.
pub struct Probe {
    pub name: String,
    ping: EventHandle<dyn Ping>,
    journal: Arc<Journal>,
    fail: bool,
    hook: Mutex<Option<Hook>>,
    copies: Mutex<Vec<usize>>,
}

event_handles!(Probe { ping => dyn Ping });

#[allow(dead_code)]
impl Probe {
    pub fn new(bus: &EventBus, name: &str, journal: &Arc<Journal>) -> Arc<Self> {
        Self::build(name, journal, false, |me| EventHandle::with_bus(bus, me))
    }

    /// A probe whose `on_ping` fails after journaling the call.
    pub fn failing(bus: &EventBus, name: &str, journal: &Arc<Journal>) -> Arc<Self> {
        Self::build(name, journal, true, |me| EventHandle::with_bus(bus, me))
    }

    /// A probe subscribed on the global bus.
    pub fn global(name: &str, journal: &Arc<Journal>) -> Arc<Self> {
        Self::build(name, journal, false, EventHandle::new)
    }

    fn build(
        name: &str,
        journal: &Arc<Journal>,
        fail: bool,
        handle: impl FnOnce(Weak<dyn Ping>) -> EventHandle<dyn Ping>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Probe>| {
            let me: Weak<dyn Ping> = me.clone();
            Probe {
                name: name.to_string(),
                ping: handle(me),
                journal: journal.clone(),
                fail,
                hook: Mutex::new(None),
                copies: Mutex::new(Vec::new()),
            }
        })
    }

    /// Runs `hook` inside every `on_ping` call, after the call is journaled.
    pub fn set_hook(&self, hook: impl Fn(&Probe) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Arc::new(hook));
    }

    /// Clone counts of every `Counted` this probe received, in order.
    pub fn copies(&self) -> Vec<usize> {
        self.copies.lock().unwrap().clone()
    }

    pub fn handle(&self) -> &EventHandle<dyn Ping> {
        &self.ping
    }

    fn received(&self, value: &Counted) {
        self.copies.lock().unwrap().push(value.copies);
        self.journal.record(format!("{}:{}", self.name, value.value));
    }
}

impl BaseEventMarker for Probe {}

impl Ping for Probe {
    fn on_ping(&self, value: i32) -> Result<(), PingError> {
        self.journal.record(format!("{}:{value}", self.name));
        let hook = self.hook.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook(self);
        }
        if self.fail {
            return Err(PingError::Refused {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    fn on_value(&self, value: Counted) -> Result<(), PingError> {
        self.received(&value);
        Ok(())
    }

    fn on_shared(&self, value: &Counted) -> Result<(), PingError> {
        self.received(value);
        Ok(())
    }

    fn on_arc(&self, value: Arc<Counted>) -> Result<(), PingError> {
        self.received(&value);
        Ok(())
    }

    fn on_token(&self, token: Token) -> Result<(), PingError> {
        self.journal.record(format!("{}:token {}", self.name, token.0));
        Ok(())
    }

    fn on_tally(&self, tally: &mut Vec<String>) -> Result<(), PingError> {
        tally.push(self.name.clone());
        self.journal.record(format!("{}:tally {}", self.name, tally.len()));
        Ok(())
    }
}

/// A bus whose executor runs every job on the calling thread.
#[allow(dead_code)]
pub fn inline_bus() -> EventBus {
    EventBus::with_executor(Arc::new(|job: Job| job()))
}

/// Dispatches `on_ping(value)` on `bus` and returns what the probes journaled.
#[allow(dead_code)]
pub fn ping(bus: &EventBus, journal: &Journal, value: i32) -> Vec<String> {
    journal.take();
    bus.send_event(<dyn Ping>::on_ping, &(value,))
        .expect("ping failed");
    journal.take()
}
