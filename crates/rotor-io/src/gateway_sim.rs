//! Simulated CAN gateway for `--sim` runs and end-to-end tests: connects to
//! the link as a client, latches command frames into a simulated ESC bank,
//! and emits the telemetry a real gateway would demultiplex off the bus.

use crate::wire::{CommandFrameMsg, EscStatusMsg, HelloMsg, ProtocolVersion, RpmMsg};
use core_bridge::{ScheduledSource, SimulatedEscBank, SubjectId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// The sim's internal step rate.
const SIM_TICK_RATE_HZ: f32 = 100.0;
const SIM_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct GatewaySimConfig {
    pub connect_addr: String,
    pub unit_count: usize,
    pub base_node_id: u8,
    /// Aggregate esc_status rate across the bank (round-robin per slot).
    pub telemetry_rate_hz: f32,
    pub rpm_rate_hz: f32,
    /// Leaving a subject unassigned disables that message class.
    pub status_subject: Option<SubjectId>,
    pub rpm_subject: Option<SubjectId>,
}

impl Default for GatewaySimConfig {
    fn default() -> Self {
        Self {
            connect_addr: "127.0.0.1:14550".to_string(),
            unit_count: 4,
            base_node_id: 20,
            telemetry_rate_hz: 40.0,
            rpm_rate_hz: 10.0,
            status_subject: Some(1030),
            rpm_subject: Some(1031),
        }
    }
}

/// Run the simulated gateway on its own thread until `stop` is set or the
/// link goes away.
pub fn run_gateway_sim(
    config: GatewaySimConfig,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to create gateway sim runtime: {}", e);
                return;
            }
        };
        runtime.block_on(run(config, stop));
    })
}

async fn run(config: GatewaySimConfig, stop: Arc<AtomicBool>) {
    // The link may come up after us.
    let stream = loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        match TcpStream::connect(&config.connect_addr).await {
            Ok(s) => {
                info!(addr = %config.connect_addr, "Gateway sim connected to link");
                break s;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    };

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut ticker = interval(SIM_TICK);

    let mut bank = SimulatedEscBank::new(config.unit_count, config.base_node_id);
    let mut status_source = ScheduledSource::new(SIM_TICK_RATE_HZ, config.status_subject);
    let mut rpm_source = ScheduledSource::new(SIM_TICK_RATE_HZ, config.rpm_subject);
    let mut next_slot = 0usize;

    let hello = HelloMsg {
        msg_type: crate::wire::HELLO_FRAME_TYPE.to_string(),
        protocol_version: ProtocolVersion::v1(),
        capabilities: vec!["esc_status.v1".to_string(), "rpm.v1".to_string()],
        client_id: Some("gateway-sim".to_string()),
    };
    if write_frame(&mut writer, &hello).await.is_err() {
        return;
    }

    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    match CommandFrameMsg::parse(&line) {
                        Some(frame) => bank.apply_command(&frame.to_batch()),
                        None => debug!(line = %line, "Gateway sim ignoring frame"),
                    }
                }
                Ok(None) => {
                    info!("Link closed, gateway sim exiting");
                    return;
                }
                Err(e) => {
                    warn!("Gateway sim read error: {}", e);
                    return;
                }
            },
            _ = ticker.tick() => {
                bank.step(f64::from(SIM_TICK.as_millis() as u32) / 1000.0);

                if let Ok(n) = status_source.messages_for_tick(config.telemetry_rate_hz) {
                    for _ in 0..n {
                        if let Some(report) = bank.status_report(next_slot) {
                            let msg = EscStatusMsg::from_report(&report);
                            if write_frame(&mut writer, &msg).await.is_err() {
                                return;
                            }
                        }
                        next_slot = (next_slot + 1) % bank.unit_count().max(1);
                    }
                }

                if let Ok(n) = rpm_source.messages_for_tick(config.rpm_rate_hz) {
                    for _ in 0..n {
                        let msg = RpmMsg {
                            msg_type: crate::wire::RPM_FRAME_TYPE.to_string(),
                            protocol_version: ProtocolVersion::v1(),
                            node_id: config.base_node_id,
                            rpm: bank.rpm_values(),
                        };
                        if write_frame(&mut writer, &msg).await.is_err() {
                            return;
                        }
                    }
                }
            },
        }
    }
}

async fn write_frame<W, T>(writer: &mut W, frame: &T) -> std::io::Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: serde::Serialize,
{
    let mut line = serde_json::to_vec(frame)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    line.push(b'\n');
    writer.write_all(&line).await.inspect_err(|e| {
        warn!("Gateway sim write error: {}", e);
    })
}
