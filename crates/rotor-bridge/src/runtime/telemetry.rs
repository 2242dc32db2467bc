use core_bridge::BridgeExchange;
use rotor_io::metrics::{init_metrics, serve_metrics, ESC_ONLINE_COUNT, SNAPSHOT_COUNTER};
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::Duration;
use tracing::info;

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

/// Map the latest published snapshot onto gauges. The link owns the ingest
/// counters; this thread owns the snapshot-derived view.
pub fn start_metrics_updater(
    exchange: Arc<BridgeExchange>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(std::sync::atomic::Ordering::Relaxed) {
            let snapshot = exchange.read_snapshot();
            ESC_ONLINE_COUNT.set(f64::from(snapshot.online_mask.count_ones()));
            SNAPSHOT_COUNTER.set(f64::from(snapshot.counter));
            thread::sleep(Duration::from_millis(200));
        }
    })
}
