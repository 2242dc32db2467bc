use crate::infra::audit::{AuditEventType, AuditLogger};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry;
use core_bridge::{
    BridgeExchange, BridgeParams, OutputSetpoint, TimeBase, CONNECTED_MAX, DEFAULT_OUTPUT_STALE_US,
};
use rotor_io::gateway_sim::{run_gateway_sim, GatewaySimConfig};
use rotor_io::link::{run_link, LinkConfig};
use std::path::PathBuf;
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

pub fn run_from_args() {
    let config = RuntimeConfig::from_env();
    if config.show_help {
        RuntimeConfig::print_help();
        return;
    }
    run(config);
}

pub fn run(config: RuntimeConfig) {
    init_tracing(config.json_logs);
    telemetry::init();

    let metrics_enabled = config.metrics_addr.is_some();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let params = Arc::new(BridgeParams::new());
    params.set_command_rate_hz(config.command_rate_hz);
    params.set_status_rate_hz(config.status_rate_hz);
    params.set_rotor_count(config.rotor_count);

    let exchange = Arc::new(BridgeExchange::new(DEFAULT_OUTPUT_STALE_US));
    let timebase = TimeBase::new();

    let audit_logger = init_audit_logger(config.audit_path.as_ref());
    if let Some(ref logger) = audit_logger {
        let _ = logger.log_event(
            timebase.now_us(),
            timebase.unix_us(),
            AuditEventType::SystemStart,
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "sim": config.sim,
                "metrics_enabled": metrics_enabled,
            }),
        );
        let _ = logger.log_event(
            timebase.now_us(),
            timebase.unix_us(),
            AuditEventType::ConfigChange,
            serde_json::json!({
                "bind_addr": config.bind_addr,
                "command_rate_hz": config.command_rate_hz,
                "status_rate_hz": config.status_rate_hz,
                "rotor_count": config.rotor_count,
            }),
        );
    }

    let stop = Arc::new(AtomicBool::new(false));

    info!(
        addr = %config.bind_addr,
        command_rate_hz = config.command_rate_hz,
        status_rate_hz = config.status_rate_hz,
        rotor_count = config.rotor_count,
        "Starting gateway link"
    );

    let link_handle = {
        let exchange = Arc::clone(&exchange);
        let params = Arc::clone(&params);
        let stop = Arc::clone(&stop);
        let link_config = LinkConfig {
            bind_addr: config.bind_addr.clone(),
        };
        thread::spawn(move || run_link(exchange, params, timebase, link_config, stop))
    };

    let _updater_handle = telemetry::start_metrics_updater(Arc::clone(&exchange), Arc::clone(&stop));

    let sim_handles = if config.sim {
        info!("Simulation mode: starting gateway sim and setpoint source");
        let gateway_handle = run_gateway_sim(
            GatewaySimConfig {
                connect_addr: config.bind_addr.clone(),
                unit_count: usize::from(config.rotor_count),
                ..Default::default()
            },
            Arc::clone(&stop),
        );
        let mixer_handle = start_sim_mixer(
            Arc::clone(&exchange),
            timebase,
            usize::from(config.rotor_count),
            Arc::clone(&stop),
        );
        Some((gateway_handle, mixer_handle))
    } else {
        None
    };

    if let Some(seconds) = config.run_seconds {
        info!(seconds, "Running for limited duration");
        thread::sleep(Duration::from_secs(seconds));
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    let stats = link_handle.join().unwrap();
    if let Some((gateway_handle, mixer_handle)) = sim_handles {
        let _ = gateway_handle.join();
        let _ = mixer_handle.join();
    }

    info!(
        commands_sent = stats.commands_sent,
        commands_rate_limited = stats.commands_rate_limited,
        send_failures = stats.send_failures,
        reports_accepted = stats.reports_accepted,
        reports_dropped = stats.reports_dropped,
        snapshots_published = stats.snapshots_published,
        "Run complete"
    );

    if let Some(ref logger) = audit_logger {
        let _ = logger.log_event(
            timebase.now_us(),
            timebase.unix_us(),
            AuditEventType::SystemShutdown,
            serde_json::json!({
                "commands_sent": stats.commands_sent,
                "reports_accepted": stats.reports_accepted,
                "send_failures": stats.send_failures,
            }),
        );
    }
}

/// Stand-in for the flight controller side of the internal bus: ramps the
/// bank up to a cruise setpoint and holds it there.
fn start_sim_mixer(
    exchange: Arc<BridgeExchange>,
    timebase: TimeBase,
    rotor_count: usize,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        const CRUISE: f64 = 1200.0;
        const RAMP_S: f64 = 4.0;
        let started = timebase.now_us();
        while !stop.load(std::sync::atomic::Ordering::Relaxed) {
            let elapsed_s = (timebase.now_us() - started) as f64 / 1_000_000.0;
            let throttle = (CRUISE * (elapsed_s / RAMP_S).min(1.0)) as u16;
            let mut outputs = [0u16; CONNECTED_MAX];
            for slot in outputs.iter_mut().take(rotor_count) {
                *slot = throttle;
            }
            exchange.submit_outputs(OutputSetpoint {
                timestamp_us: timebase.now_us(),
                stop: false,
                outputs,
            });
            thread::sleep(Duration::from_millis(10));
        }
    })
}

fn init_audit_logger(audit_path: Option<&PathBuf>) -> Option<Arc<AuditLogger>> {
    audit_path.map(|path| match AuditLogger::new(path) {
        Ok(logger) => {
            info!(path = %path.display(), "Audit logging enabled");
            Arc::new(logger)
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Failed to initialize audit logger");
            panic!("Audit logging requested but failed to initialize: {}", e);
        }
    })
}
