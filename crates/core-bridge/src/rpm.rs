/// Most RPM channels one report can carry.
pub const RPM_MAX_CHANNELS: usize = 8;

/// Per-node rotor RPM readings relayed from the field bus, stamped on
/// arrival. Fixed-width so the report can travel through the exchange by
/// copy; `channel_count` says how many leading entries are valid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RpmReport {
    pub timestamp_us: u64,
    pub node_id: u8,
    pub channel_count: u8,
    pub rpm: [f32; RPM_MAX_CHANNELS],
}

impl RpmReport {
    pub fn channels(&self) -> &[f32] {
        &self.rpm[..usize::from(self.channel_count)]
    }
}

/// Relays rotor RPM telemetry to the internal exchange. Last-writer-wins per
/// node at the exchange; this side only stamps, clamps, and counts.
#[derive(Debug, Default)]
pub struct RpmBridge {
    reports_relayed: u64,
}

impl RpmBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_rpm(&mut self, node_id: u8, values: &[f32], now_us: u64) -> RpmReport {
        self.reports_relayed += 1;
        let count = values.len().min(RPM_MAX_CHANNELS);
        let mut rpm = [0.0; RPM_MAX_CHANNELS];
        rpm[..count].copy_from_slice(&values[..count]);
        RpmReport {
            timestamp_us: now_us,
            node_id,
            channel_count: count as u8,
            rpm,
        }
    }

    pub fn reports_relayed(&self) -> u64 {
        self.reports_relayed
    }
}
