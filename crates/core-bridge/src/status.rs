use log::debug;

/// Size of the status table: the most units the bus segment can carry.
pub const CONNECTED_MAX: usize = 8;

/// A slot's last report older than this is stale; the boundary age itself
/// counts as stale.
pub const FRESHNESS_WINDOW_US: u64 = 1_200_000;

/// How the actuator bank is attached. This bridge always reports `Can`; the
/// other discriminants exist so snapshots share one enumeration with the rest
/// of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EscConnectionType {
    Ppm = 0,
    Serial = 1,
    OneShot = 2,
    I2c = 3,
    Can = 4,
    DShot = 5,
}

/// Last-known state of one physical unit, keyed by protocol-assigned slot
/// index. `last_seen_us == 0` means the slot has never reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActuatorSlot {
    pub address: u8,
    pub last_seen_us: u64,
    pub voltage_v: f32,
    pub current_a: f32,
    pub temperature_c: f32,
    pub rpm: i32,
    pub error_count: u32,
}

/// One inbound status report, already demultiplexed by the field-bus link.
#[derive(Debug, Clone, Copy)]
pub struct StatusReport {
    pub slot_index: usize,
    pub address: u8,
    pub voltage_v: f32,
    pub current_a: f32,
    pub temperature_c: f32,
    pub rpm: i32,
    pub error_count: u32,
}

/// Aggregated view of the bank, recomputed every aggregation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub timestamp_us: u64,
    pub unit_count: u8,
    pub counter: u16,
    pub connection_type: EscConnectionType,
    pub online_mask: u16,
    pub armed_mask: u16,
}

impl Default for EscConnectionType {
    fn default() -> Self {
        EscConnectionType::Can
    }
}

/// Staleness-aware aggregation of per-unit status reports.
///
/// Updates are last-writer-wins with no sequence check: a delayed report can
/// overwrite fresher data. Accepted limitation, not defended against.
#[derive(Debug)]
pub struct StatusAggregator {
    slots: [ActuatorSlot; CONNECTED_MAX],
    counter: u16,
    reports_accepted: u64,
    reports_dropped: u64,
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self {
            slots: [ActuatorSlot::default(); CONNECTED_MAX],
            counter: 0,
            reports_accepted: 0,
            reports_dropped: 0,
        }
    }

    /// Apply one status report. Out-of-range slot indices are dropped without
    /// touching the table; that is malformed input, not a failure. Returns
    /// whether the report was applied.
    pub fn on_status_report(&mut self, report: &StatusReport, now_us: u64) -> bool {
        if report.slot_index >= CONNECTED_MAX {
            self.reports_dropped += 1;
            debug!(
                "dropping status report for out-of-range slot {}",
                report.slot_index
            );
            return false;
        }
        let slot = &mut self.slots[report.slot_index];
        slot.address = report.address;
        slot.last_seen_us = now_us;
        slot.voltage_v = report.voltage_v;
        slot.current_a = report.current_a;
        slot.temperature_c = report.temperature_c;
        slot.rpm = report.rpm;
        slot.error_count = report.error_count;
        self.reports_accepted += 1;
        true
    }

    /// Produce the aggregated snapshot for this tick.
    ///
    /// `armed_mask` reflects the configured unit count only; it says nothing
    /// about which units are reporting. Callers must not conflate it with
    /// `online_mask`.
    pub fn tick(&mut self, now_us: u64, unit_count: u8) -> StatusSnapshot {
        self.counter = self.counter.wrapping_add(1);
        let unit_count = unit_count.min(CONNECTED_MAX as u8);
        StatusSnapshot {
            timestamp_us: now_us,
            unit_count,
            counter: self.counter,
            connection_type: EscConnectionType::Can,
            online_mask: self.online_mask(now_us),
            armed_mask: (1u16 << unit_count) - 1,
        }
    }

    fn online_mask(&self, now_us: u64) -> u16 {
        let mut mask = 0u16;
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.last_seen_us > 0
                && now_us.saturating_sub(slot.last_seen_us) < FRESHNESS_WINDOW_US
            {
                mask |= 1 << index;
            }
        }
        mask
    }

    pub fn slot(&self, index: usize) -> Option<&ActuatorSlot> {
        self.slots.get(index)
    }

    pub fn reports_accepted(&self) -> u64 {
        self.reports_accepted
    }

    pub fn reports_dropped(&self) -> u64 {
        self.reports_dropped
    }
}

impl Default for StatusAggregator {
    fn default() -> Self {
        Self::new()
    }
}
