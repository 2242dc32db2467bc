use core_bridge::params::{DEFAULT_COMMAND_RATE_HZ, DEFAULT_ROTOR_COUNT, DEFAULT_STATUS_RATE_HZ};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub run_seconds: Option<u64>,
    pub bind_addr: String,
    pub json_logs: bool,
    pub metrics_addr: Option<String>,
    pub audit_path: Option<PathBuf>,
    pub sim: bool,
    pub command_rate_hz: u32,
    pub status_rate_hz: f32,
    pub rotor_count: u8,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            run_seconds: None,
            bind_addr: "127.0.0.1:14550".to_string(),
            json_logs: false,
            metrics_addr: None,
            audit_path: None,
            sim: false,
            command_rate_hz: DEFAULT_COMMAND_RATE_HZ,
            status_rate_hz: DEFAULT_STATUS_RATE_HZ,
            rotor_count: DEFAULT_ROTOR_COUNT,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Self {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--run-seconds" => {
                    if i + 1 < args.len() {
                        cfg.run_seconds = args[i + 1].parse::<u64>().ok();
                        i += 1;
                    }
                }
                "--bind" => {
                    if i + 1 < args.len() {
                        cfg.bind_addr = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--metrics-addr" => {
                    if i + 1 < args.len() {
                        cfg.metrics_addr = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--audit-log" => {
                    if i + 1 < args.len() {
                        cfg.audit_path = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--sim" => {
                    cfg.sim = true;
                }
                "--command-rate" => {
                    if i + 1 < args.len() {
                        cfg.command_rate_hz =
                            args[i + 1].parse().unwrap_or(DEFAULT_COMMAND_RATE_HZ);
                        i += 1;
                    }
                }
                "--status-rate" => {
                    if i + 1 < args.len() {
                        cfg.status_rate_hz = args[i + 1].parse().unwrap_or(DEFAULT_STATUS_RATE_HZ);
                        i += 1;
                    }
                }
                "--rotor-count" => {
                    if i + 1 < args.len() {
                        cfg.rotor_count = args[i + 1].parse().unwrap_or(DEFAULT_ROTOR_COUNT);
                        i += 1;
                    }
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        cfg
    }

    pub fn print_help() {
        println!(
            r#"RotorBridge - CAN gateway bridge for an ESC bank

USAGE:
    rotor-bridge [OPTIONS]

OPTIONS:
    --bind <ADDR>           Gateway link bind address [default: 127.0.0.1:14550]
    --run-seconds <SECS>    Run for a fixed duration then exit
    --json-logs             Output logs in JSON format (for log aggregation)
    --metrics-addr <ADDR>   Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --audit-log <PATH>      Enable audit logging to specified JSONL file
    --sim                   Run against a simulated gateway and setpoint source
    --command-rate <HZ>     Outbound command rate limit [default: 200]
    --status-rate <HZ>      Aggregated snapshot publication rate [default: 10]
    --rotor-count <N>       Configured rotor/actuator count [default: 4]
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,rotor_io=trace)

EXAMPLES:
    # Self-contained simulation with metrics
    rotor-bridge --sim --metrics-addr 0.0.0.0:9090

    # Production run with all observability
    rotor-bridge --json-logs --metrics-addr 0.0.0.0:9090 --audit-log /var/log/rotorbridge/audit.jsonl

    # Short test run
    rotor-bridge --run-seconds 10 --sim
"#
        );
    }
}
