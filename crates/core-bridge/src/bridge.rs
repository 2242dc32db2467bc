use crate::command::{CommandBroadcaster, CommandSink, SendOutcome, TransportError};
use crate::rpm::{RpmBridge, RpmReport};
use crate::status::{StatusAggregator, StatusReport, StatusSnapshot};

/// Lifetime counters for the bridge, logged at shutdown and exported as
/// metrics by the link layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeStats {
    pub commands_sent: u64,
    pub commands_rate_limited: u64,
    pub send_failures: u64,
    pub reports_accepted: u64,
    pub reports_dropped: u64,
    pub rpm_reports_relayed: u64,
    pub snapshots_published: u64,
}

/// The actuator-bank bridge: rate-limited outbound command broadcast plus
/// inbound status/RPM aggregation. Owns no threads and never blocks; the
/// receive and tick paths must be called from one logical execution context
/// (the slot table and send gate are unguarded by design).
pub struct EscBridge {
    broadcaster: CommandBroadcaster,
    aggregator: StatusAggregator,
    rpm: RpmBridge,
    commands_sent: u64,
    commands_rate_limited: u64,
    send_failures: u64,
    snapshots_published: u64,
}

impl EscBridge {
    pub fn new() -> Self {
        Self {
            broadcaster: CommandBroadcaster::new(),
            aggregator: StatusAggregator::new(),
            rpm: RpmBridge::new(),
            commands_sent: 0,
            commands_rate_limited: 0,
            send_failures: 0,
            snapshots_published: 0,
        }
    }

    /// Receive path: one inbound status report. Returns whether it was
    /// applied to the slot table.
    pub fn handle_status(&mut self, report: &StatusReport, now_us: u64) -> bool {
        self.aggregator.on_status_report(report, now_us)
    }

    /// Receive path: one inbound RPM report, relayed for publication.
    pub fn handle_rpm(&mut self, node_id: u8, values: &[f32], now_us: u64) -> RpmReport {
        self.rpm.on_rpm(node_id, values, now_us)
    }

    /// Tick path: broadcast the desired outputs through the sink, subject to
    /// the command-rate gate. Transport failures are counted and surfaced,
    /// never retried.
    pub fn update_outputs(
        &mut self,
        stop: bool,
        outputs: &[u16],
        now_us: u64,
        command_rate_hz: u32,
        sink: &mut dyn CommandSink,
    ) -> Result<SendOutcome, TransportError> {
        let result = self
            .broadcaster
            .update_outputs(stop, outputs, now_us, command_rate_hz, sink);
        match &result {
            Ok(SendOutcome::Sent) => self.commands_sent += 1,
            Ok(SendOutcome::RateLimited) => self.commands_rate_limited += 1,
            Err(_) => self.send_failures += 1,
        }
        result
    }

    /// Tick path: aggregate the slot table into a snapshot for publication.
    pub fn tick_status(&mut self, now_us: u64, rotor_count: u8) -> StatusSnapshot {
        self.snapshots_published += 1;
        self.aggregator.tick(now_us, rotor_count)
    }

    pub fn aggregator(&self) -> &StatusAggregator {
        &self.aggregator
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            commands_sent: self.commands_sent,
            commands_rate_limited: self.commands_rate_limited,
            send_failures: self.send_failures,
            reports_accepted: self.aggregator.reports_accepted(),
            reports_dropped: self.aggregator.reports_dropped(),
            rpm_reports_relayed: self.rpm.reports_relayed(),
            snapshots_published: self.snapshots_published,
        }
    }
}

impl Default for EscBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBatch;

    struct NullSink;

    impl CommandSink for NullSink {
        fn send(&mut self, _batch: &CommandBatch) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct DownSink;

    impl CommandSink for DownSink {
        fn send(&mut self, _batch: &CommandBatch) -> Result<(), TransportError> {
            Err(TransportError::Disconnected)
        }
    }

    #[test]
    fn stats_track_each_path() {
        let mut bridge = EscBridge::new();
        bridge
            .update_outputs(false, &[1, 2], 10_000, 200, &mut NullSink)
            .unwrap();
        bridge
            .update_outputs(false, &[1, 2], 10_001, 200, &mut NullSink)
            .unwrap();
        let _ = bridge.update_outputs(false, &[1, 2], 20_000, 200, &mut DownSink);

        bridge.handle_status(
            &StatusReport {
                slot_index: 0,
                address: 10,
                voltage_v: 12.0,
                current_a: 1.0,
                temperature_c: 30.0,
                rpm: 1000,
                error_count: 0,
            },
            20_500,
        );
        bridge.handle_rpm(10, &[1000.0], 20_600);
        let snapshot = bridge.tick_status(21_000, 4);
        assert_eq!(snapshot.online_mask, 0b1);

        let stats = bridge.stats();
        assert_eq!(stats.commands_sent, 1);
        assert_eq!(stats.commands_rate_limited, 1);
        assert_eq!(stats.send_failures, 1);
        assert_eq!(stats.reports_accepted, 1);
        assert_eq!(stats.rpm_reports_relayed, 1);
        assert_eq!(stats.snapshots_published, 1);
    }
}
