//! Gateway link: a non-blocking, single-client TCP server that carries the
//! bridge's field-bus traffic. One loop multiplexes the asynchronous receive
//! path (status/RPM frames into the aggregator) and the periodic tick path
//! (command broadcast, snapshot publication), so the slot table and the send
//! gate are only ever touched from this thread.

use crate::metrics::{
    COMMANDS_RATE_LIMITED, COMMANDS_SENT, ESC_CURRENT_A, ESC_RPM, ESC_TEMPERATURE_C,
    ESC_VOLTAGE_V, FRAMES_UNPARSEABLE, FRAMES_UNSUPPORTED_VERSION, GATEWAY_CONNECTED,
    REPORTS_ACCEPTED, REPORTS_DROPPED, RPM_REPORTS, SEND_FAILURES, SNAPSHOTS_PUBLISHED,
};
use crate::wire::{CommandFrameMsg, IncomingFrame};
use core_bridge::{
    BridgeExchange, BridgeParams, BridgeStats, CommandBatch, CommandSink, EscBridge, RateSchedule,
    SendOutcome, TimeBase, TransportError, CONNECTED_MAX,
};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{atomic::AtomicBool, Arc};
use std::time::Duration;
use tracing::{debug, info, warn};

/// The link's fixed tick rate: one loop iteration per tick.
pub const LINK_TICK_RATE_HZ: f32 = 200.0;

/// Outbound lines queued while the client socket is busy. Beyond this the
/// gateway is too far behind to be worth feeding.
const MAX_QUEUED_FRAMES: usize = 64;

pub struct LinkConfig {
    pub bind_addr: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:14550".to_string(),
        }
    }
}

struct QueueSink<'a> {
    connected: bool,
    queue: &'a mut VecDeque<Vec<u8>>,
    sequence: &'a mut u64,
    timestamp_us: u64,
}

impl CommandSink for QueueSink<'_> {
    fn send(&mut self, batch: &CommandBatch) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        if self.queue.len() >= MAX_QUEUED_FRAMES {
            return Err(TransportError::QueueFull);
        }
        *self.sequence = self.sequence.wrapping_add(1);
        let frame = CommandFrameMsg::from_batch(*self.sequence, self.timestamp_us, batch);
        let mut line = serde_json::to_vec(&frame)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push(b'\n');
        self.queue.push_back(line);
        Ok(())
    }
}

/// Run the link until `stop` is set. Returns the bridge's lifetime stats.
pub fn run_link(
    exchange: Arc<BridgeExchange>,
    params: Arc<BridgeParams>,
    timebase: TimeBase,
    config: LinkConfig,
    stop: Arc<AtomicBool>,
) -> BridgeStats {
    let listener = TcpListener::bind(&config.bind_addr)
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", config.bind_addr, e));
    listener
        .set_nonblocking(true)
        .expect("Failed to set nonblocking");

    info!(addr = %config.bind_addr, "Gateway link listening");

    let mut bridge = EscBridge::new();
    let mut status_schedule = RateSchedule::new(LINK_TICK_RATE_HZ);

    let mut client: Option<TcpStream> = None;
    let mut recv_buf: Vec<u8> = Vec::with_capacity(4096);
    let mut send_queue: VecDeque<Vec<u8>> = VecDeque::new();
    let mut send_offset: usize = 0;
    let mut sequence: u64 = 0;

    loop {
        if stop.load(std::sync::atomic::Ordering::Relaxed) {
            break;
        }

        if client.is_none() {
            match listener.accept() {
                Ok((stream, addr)) => {
                    info!(gateway_addr = %addr, "Gateway connected");
                    stream
                        .set_nonblocking(true)
                        .expect("Failed to set nonblocking on gateway socket");
                    client = Some(stream);
                    GATEWAY_CONNECTED.set(1.0);
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(err) => {
                    warn!("Gateway accept error: {}", err);
                }
            }
        }

        let mut drop_client = false;
        if let Some(stream) = client.as_mut() {
            // Receive path: drain whatever frames have arrived.
            let mut temp = [0u8; 1024];
            match stream.read(&mut temp) {
                Ok(0) => {
                    info!("Gateway disconnected");
                    drop_client = true;
                }
                Ok(n) => {
                    recv_buf.extend_from_slice(&temp[..n]);
                    while let Some(pos) = recv_buf.iter().position(|b| *b == b'\n') {
                        let line = recv_buf.drain(..=pos).collect::<Vec<u8>>();
                        let Ok(text) = std::str::from_utf8(&line) else {
                            FRAMES_UNPARSEABLE.inc();
                            continue;
                        };
                        let trimmed = text.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match IncomingFrame::parse(trimmed) {
                            Some(frame) => {
                                handle_frame(frame, &mut bridge, &exchange, &timebase);
                            }
                            None => {
                                FRAMES_UNPARSEABLE.inc();
                                debug!(line = %trimmed, "Unparseable gateway frame");
                            }
                        }
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(err) => {
                    warn!(error = %err, "Gateway read error");
                    drop_client = true;
                }
            }
        }

        // Tick path: command broadcast, then the scheduled snapshot.
        let now_us = timebase.now_us();
        let setpoint = exchange.read_outputs(now_us);
        let (stop_motors, outputs) = match &setpoint {
            Some(sp) => (sp.stop, sp.outputs),
            // No fresh setpoint: fail safe with an explicit all-stop batch.
            None => (true, [0u16; CONNECTED_MAX]),
        };
        let mut sink = QueueSink {
            connected: client.is_some() && !drop_client,
            queue: &mut send_queue,
            sequence: &mut sequence,
            timestamp_us: now_us,
        };
        match bridge.update_outputs(
            stop_motors,
            &outputs,
            now_us,
            params.command_rate_hz(),
            &mut sink,
        ) {
            Ok(SendOutcome::Sent) => COMMANDS_SENT.inc(),
            Ok(SendOutcome::RateLimited) => COMMANDS_RATE_LIMITED.inc(),
            Err(err) => {
                SEND_FAILURES.inc();
                debug!(error = %err, "Command broadcast failed");
            }
        }

        if let Ok(n) = status_schedule.messages_for_tick(params.status_rate_hz()) {
            for _ in 0..n {
                let snapshot = bridge.tick_status(timebase.now_us(), params.rotor_count());
                SNAPSHOTS_PUBLISHED.inc();
                exchange.publish_snapshot(snapshot);
            }
        }

        // Flush queued frames to the gateway.
        if let Some(stream) = client.as_mut() {
            while let Some(front) = send_queue.front() {
                match stream.write(&front[send_offset..]) {
                    Ok(0) => {
                        info!("Gateway disconnected");
                        drop_client = true;
                        break;
                    }
                    Ok(n) => {
                        send_offset += n;
                        if send_offset >= front.len() {
                            send_queue.pop_front();
                            send_offset = 0;
                        }
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(err) => {
                        warn!(error = %err, "Gateway write error");
                        drop_client = true;
                        break;
                    }
                }
            }
        }

        if drop_client {
            client = None;
            recv_buf.clear();
            send_queue.clear();
            send_offset = 0;
            GATEWAY_CONNECTED.set(0.0);
        }

        std::thread::sleep(Duration::from_millis(5));
    }

    bridge.stats()
}

fn handle_frame(
    frame: IncomingFrame,
    bridge: &mut EscBridge,
    exchange: &BridgeExchange,
    timebase: &TimeBase,
) {
    if !frame.protocol_version().is_supported() {
        FRAMES_UNSUPPORTED_VERSION.inc();
        warn!(
            major = frame.protocol_version().major,
            minor = frame.protocol_version().minor,
            "Unsupported protocol version"
        );
        return;
    }
    match frame {
        IncomingFrame::Hello(hello) => {
            info!(
                client_id = ?hello.client_id,
                capabilities = ?hello.capabilities,
                "Gateway handshake received"
            );
        }
        IncomingFrame::EscStatus(msg) => {
            let report = msg.to_report();
            if bridge.handle_status(&report, timebase.now_us()) {
                REPORTS_ACCEPTED.inc();
                ESC_VOLTAGE_V.set(f64::from(report.voltage_v));
                ESC_CURRENT_A.set(f64::from(report.current_a));
                ESC_TEMPERATURE_C.set(f64::from(report.temperature_c));
            } else {
                REPORTS_DROPPED.inc();
            }
        }
        IncomingFrame::Rpm(msg) => {
            let report = bridge.handle_rpm(msg.node_id, &msg.rpm, timebase.now_us());
            RPM_REPORTS.inc();
            if report.channel_count > 0 {
                let mean: f32 =
                    report.channels().iter().sum::<f32>() / f32::from(report.channel_count);
                ESC_RPM.set(f64::from(mean));
            }
            exchange.publish_rpm(report);
        }
    }
}
