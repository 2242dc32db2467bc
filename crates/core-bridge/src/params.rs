use std::sync::atomic::{AtomicU32, Ordering};

pub const DEFAULT_COMMAND_RATE_HZ: u32 = 200;
pub const DEFAULT_STATUS_RATE_HZ: f32 = 10.0;
pub const DEFAULT_ROTOR_COUNT: u8 = 4;

/// Externally mutable runtime parameters. The bridge re-reads these every
/// tick; nothing is cached across ticks, so an operator change takes effect
/// on the next cycle. Rates are stored as `f32` bit patterns.
#[derive(Debug)]
pub struct BridgeParams {
    command_rate_hz: AtomicU32,
    status_rate_bits: AtomicU32,
    rotor_count: AtomicU32,
}

impl BridgeParams {
    pub fn new() -> Self {
        Self {
            command_rate_hz: AtomicU32::new(DEFAULT_COMMAND_RATE_HZ),
            status_rate_bits: AtomicU32::new(DEFAULT_STATUS_RATE_HZ.to_bits()),
            rotor_count: AtomicU32::new(u32::from(DEFAULT_ROTOR_COUNT)),
        }
    }

    pub fn command_rate_hz(&self) -> u32 {
        self.command_rate_hz.load(Ordering::Relaxed)
    }

    pub fn set_command_rate_hz(&self, rate: u32) {
        self.command_rate_hz.store(rate, Ordering::Relaxed);
    }

    pub fn status_rate_hz(&self) -> f32 {
        f32::from_bits(self.status_rate_bits.load(Ordering::Relaxed))
    }

    pub fn set_status_rate_hz(&self, rate: f32) {
        self.status_rate_bits.store(rate.to_bits(), Ordering::Relaxed);
    }

    pub fn rotor_count(&self) -> u8 {
        self.rotor_count.load(Ordering::Relaxed).min(255) as u8
    }

    pub fn set_rotor_count(&self, count: u8) {
        self.rotor_count.store(u32::from(count), Ordering::Relaxed);
    }
}

impl Default for BridgeParams {
    fn default() -> Self {
        Self::new()
    }
}
