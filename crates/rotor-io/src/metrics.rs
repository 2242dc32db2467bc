//! Prometheus metrics for the bridge: command traffic, inbound telemetry
//! health, and the latest bank state.

use core_bridge::tags;
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name.to_string(), help.to_string()).unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
}

fn gauge(name: &str, help: &str) -> Gauge {
    let gauge = Gauge::new(name.to_string(), help.to_string()).unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
}

// ============================================================================
// Command Path
// ============================================================================

/// Command batches broadcast to the gateway
pub static COMMANDS_SENT: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "rotorbridge_commands_sent_total",
        "Command batches broadcast to the gateway",
    )
});

/// Broadcast calls suppressed by the command-rate gate
pub static COMMANDS_RATE_LIMITED: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "rotorbridge_commands_rate_limited_total",
        "Broadcast calls suppressed by the command-rate gate",
    )
});

/// Command batches lost at the transport boundary
pub static SEND_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "rotorbridge_send_failures_total",
        "Command batches lost at the transport boundary",
    )
});

// ============================================================================
// Receive Path
// ============================================================================

/// Status reports applied to the slot table
pub static REPORTS_ACCEPTED: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "rotorbridge_reports_accepted_total",
        "Status reports applied to the slot table",
    )
});

/// Status reports dropped for an out-of-range slot index
pub static REPORTS_DROPPED: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "rotorbridge_reports_dropped_total",
        "Status reports dropped for an out-of-range slot index",
    )
});

/// Inbound lines that were not parseable as a known frame
pub static FRAMES_UNPARSEABLE: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "rotorbridge_frames_unparseable_total",
        "Inbound lines that were not parseable as a known frame",
    )
});

/// Inbound frames rejected for an unsupported protocol version
pub static FRAMES_UNSUPPORTED_VERSION: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "rotorbridge_frames_unsupported_version_total",
        "Inbound frames rejected for an unsupported protocol version",
    )
});

/// RPM reports relayed to the internal bus
pub static RPM_REPORTS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "rotorbridge_rpm_reports_total",
        "RPM reports relayed to the internal bus",
    )
});

/// Aggregated snapshots published to the internal bus
pub static SNAPSHOTS_PUBLISHED: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "rotorbridge_snapshots_published_total",
        "Aggregated snapshots published to the internal bus",
    )
});

// ============================================================================
// Bank State
// ============================================================================

/// Gateway connection status (1 = connected, 0 = disconnected)
pub static GATEWAY_CONNECTED: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(
        "rotorbridge_gateway_connected",
        "Gateway connection status (1=connected, 0=disconnected)",
    )
});

/// Units currently inside the freshness window
pub static ESC_ONLINE_COUNT: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(
        tags::ESC_ONLINE_COUNT.metric,
        "Units currently inside the freshness window",
    )
});

/// Bus voltage from the most recent status report
pub static ESC_VOLTAGE_V: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(
        tags::ESC_VOLTAGE_V.metric,
        "Bus voltage from the most recent status report",
    )
});

/// Phase current from the most recent status report
pub static ESC_CURRENT_A: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(
        tags::ESC_CURRENT_A.metric,
        "Phase current from the most recent status report",
    )
});

/// Temperature from the most recent status report
pub static ESC_TEMPERATURE_C: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(
        tags::ESC_TEMPERATURE_C.metric,
        "Temperature from the most recent status report",
    )
});

/// Mean rotor speed across reported channels
pub static ESC_RPM: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(tags::ESC_RPM.metric, "Mean rotor speed across reported channels")
});

/// Snapshot sequence counter as last published
pub static SNAPSHOT_COUNTER: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(
        tags::SNAPSHOT_COUNTER.metric,
        "Snapshot sequence counter as last published",
    )
});

// ============================================================================
// Metrics HTTP Server
// ============================================================================

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            match request.url() {
                "/metrics" => {
                    let encoder = TextEncoder::new();
                    let metric_families = REGISTRY.gather();
                    let mut buffer = Vec::new();

                    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
                        tracing::warn!("Failed to encode metrics: {}", e);
                        let _ = request.respond(
                            Response::from_string("Internal Server Error").with_status_code(500),
                        );
                        continue;
                    }

                    let response = Response::from_data(buffer).with_header(
                        tiny_http::Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"text/plain; version=0.0.4"[..],
                        )
                        .unwrap(),
                    );
                    let _ = request.respond(response);
                }
                "/health" => {
                    let _ = request.respond(Response::from_string("OK"));
                }
                "/ready" => {
                    // Ready once the bridge has published at least one snapshot
                    if SNAPSHOTS_PUBLISHED.get() > 0 {
                        let _ = request.respond(Response::from_string("Ready"));
                    } else {
                        let _ = request
                            .respond(Response::from_string("Not Ready").with_status_code(503));
                    }
                }
                _ => {
                    let _ =
                        request.respond(Response::from_string("Not Found").with_status_code(404));
                }
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = COMMANDS_SENT.get();
    let _ = COMMANDS_RATE_LIMITED.get();
    let _ = SEND_FAILURES.get();
    let _ = REPORTS_ACCEPTED.get();
    let _ = REPORTS_DROPPED.get();
    let _ = FRAMES_UNPARSEABLE.get();
    let _ = FRAMES_UNSUPPORTED_VERSION.get();
    let _ = RPM_REPORTS.get();
    let _ = SNAPSHOTS_PUBLISHED.get();
    let _ = GATEWAY_CONNECTED.get();
    let _ = ESC_ONLINE_COUNT.get();
    let _ = ESC_VOLTAGE_V.get();
    let _ = ESC_CURRENT_A.get();
    let _ = ESC_TEMPERATURE_C.get();
    let _ = ESC_RPM.get();
    let _ = SNAPSHOT_COUNTER.get();
}
