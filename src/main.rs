//! Demo entry point for event-dispatch.
//!
//! Registers two order subscribers on a dedicated bus and dispatches to them
//! synchronously and through the executor.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;
use std::time::Instant;

use anyhow::Result;
use dotenv::dotenv;
use event_dispatch::BaseEventMarker;
use event_dispatch::Config;
use event_dispatch::EventBus;
use event_dispatch::EventHandle;
use event_dispatch::Subscriber;
use event_dispatch::event_handles;
use event_dispatch::logging::setup_logging;
use log::debug;
use log::info;

trait OrderEvents: BaseEventMarker {
    fn on_placed(&self, order_id: u64, total_cents: u64) -> Result<()>;
    fn on_cancelled(&self, order_id: u64, reason: String) -> Result<()>;
}

struct AuditLog {
    orders: EventHandle<dyn OrderEvents>,
    entries: Mutex<Vec<String>>,
}

impl AuditLog {
    fn new(bus: &EventBus) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Self>| Self {
            orders: EventHandle::with_bus(bus, me.clone()),
            entries: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, entry: String) {
        info!("[audit] {entry}");
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

impl BaseEventMarker for AuditLog {}

impl OrderEvents for AuditLog {
    fn on_placed(&self, order_id: u64, total_cents: u64) -> Result<()> {
        self.record(format!("order {order_id} placed ({total_cents} cents)"));
        Ok(())
    }

    fn on_cancelled(&self, order_id: u64, reason: String) -> Result<()> {
        self.record(format!("order {order_id} cancelled: {reason}"));
        Ok(())
    }
}

event_handles!(AuditLog { orders => dyn OrderEvents });

struct Billing {
    orders: EventHandle<dyn OrderEvents>,
    balance_cents: Mutex<u64>,
}

impl Billing {
    fn new(bus: &EventBus) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Self>| Self {
            orders: EventHandle::with_bus(bus, me.clone()),
            balance_cents: Mutex::new(0),
        })
    }
}

impl BaseEventMarker for Billing {}

impl OrderEvents for Billing {
    fn on_placed(&self, order_id: u64, total_cents: u64) -> Result<()> {
        let mut balance = self
            .balance_cents
            .lock()
            .map_err(|_| anyhow::anyhow!("billing ledger poisoned"))?;
        *balance += total_cents;
        info!("[billing] charged order {order_id}, balance {balance} cents");
        Ok(())
    }

    fn on_cancelled(&self, order_id: u64, _reason: String) -> Result<()> {
        info!("[billing] voided order {order_id}");
        Ok(())
    }
}

event_handles!(Billing { orders => dyn OrderEvents });

fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let config = load_config()?;
    let bus = EventBus::new(&config)?;

    let audit = AuditLog::new(&bus);
    let billing = Billing::new(&bus);
    // Billing must see an order before it is audited
    billing.set_first_priority::<dyn OrderEvents>();
    info!(
        "Registered {} order subscribers ({:.2}s).",
        bus.subscriber_count::<dyn OrderEvents>(),
        init_start.elapsed().as_secs_f64()
    );

    bus.send_event(<dyn OrderEvents>::on_placed, &(1001, 2_499))?;
    bus.send_event_async(
        <dyn OrderEvents>::on_cancelled,
        (1001, "customer request".to_string()),
    )
    .wait()?;

    audit.unsubscribe::<dyn OrderEvents>();
    bus.send_event(<dyn OrderEvents>::on_placed, &(1002, 1_000))?;

    let audited = audit.entries.lock().map(|e| e.len()).unwrap_or_default();
    info!("Audit log holds {audited} entries.");
    drop(billing);
    debug!(
        "{} order subscribers left.",
        bus.subscriber_count::<dyn OrderEvents>()
    );
    Ok(())
}

fn load_config() -> Result<Config> {
    let mut config = Config::new();
    config.load()?;
    setup_logging(&config)?;
    info!("Starting event-dispatch demo...");
    Ok(config)
}
