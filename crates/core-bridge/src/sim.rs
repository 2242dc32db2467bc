use crate::command::CommandBatch;
use crate::status::{StatusReport, CONNECTED_MAX};

const NOMINAL_VOLTAGE_V: f64 = 16.8;
const RPM_PER_COUNT: f64 = 6.0;
const AMBIENT_TEMP_C: f64 = 25.0;

/// One simulated ESC: first-order rotor response with electrical and thermal
/// dynamics.
#[derive(Debug, Clone, Copy)]
struct SimulatedEsc {
    commanded: u16,
    rpm: f64,
    temperature_c: f64,
    current_a: f64,
    error_count: u32,
}

impl Default for SimulatedEsc {
    fn default() -> Self {
        Self {
            commanded: 0,
            rpm: 0.0,
            temperature_c: AMBIENT_TEMP_C,
            current_a: 0.0,
            error_count: 0,
        }
    }
}

/// Simulated ESC bank for `--sim` runs and end-to-end tests: consumes command
/// batches, advances per-slot dynamics, and produces the status reports a
/// real bank would put on the bus.
#[derive(Debug, Clone)]
pub struct SimulatedEscBank {
    escs: [SimulatedEsc; CONNECTED_MAX],
    unit_count: usize,
    base_node_id: u8,
}

impl SimulatedEscBank {
    pub fn new(unit_count: usize, base_node_id: u8) -> Self {
        Self {
            escs: [SimulatedEsc::default(); CONNECTED_MAX],
            unit_count: unit_count.min(CONNECTED_MAX),
            base_node_id,
        }
    }

    pub fn unit_count(&self) -> usize {
        self.unit_count
    }

    /// Latch the commanded values out of a batch. Entries beyond the bank's
    /// unit count spin nothing and are ignored.
    pub fn apply_command(&mut self, batch: &CommandBatch) {
        for command in &batch.commands {
            let index = usize::from(command.actuator_id);
            if index < self.unit_count {
                self.escs[index].commanded = command.value;
            }
        }
    }

    /// Advance the bank's dynamics by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        for esc in self.escs.iter_mut().take(self.unit_count) {
            let target_rpm = f64::from(esc.commanded) * RPM_PER_COUNT;

            // First-order rotor response.
            let time_constant = 0.15;
            let error = target_rpm - esc.rpm;
            esc.rpm += error * (1.0 - (-dt_s / time_constant).exp());

            // Current tracks load plus the transient needed to accelerate.
            esc.current_a = 0.002 * esc.rpm + 0.0005 * error.abs();

            // Thermal mass with ambient cooling.
            let heat_in = 0.4 * esc.current_a * esc.current_a;
            let heat_out = 0.05 * (esc.temperature_c - AMBIENT_TEMP_C);
            esc.temperature_c += (heat_in - heat_out) * dt_s;
        }
    }

    /// The status report slot `index` would put on the bus right now.
    pub fn status_report(&self, index: usize) -> Option<StatusReport> {
        if index >= self.unit_count {
            return None;
        }
        let esc = &self.escs[index];
        // Pack sag under load: all units share the pack.
        let total_current: f64 = self
            .escs
            .iter()
            .take(self.unit_count)
            .map(|e| e.current_a)
            .sum();
        Some(StatusReport {
            slot_index: index,
            address: self.base_node_id + index as u8,
            voltage_v: (NOMINAL_VOLTAGE_V - 0.02 * total_current) as f32,
            current_a: esc.current_a as f32,
            temperature_c: esc.temperature_c as f32,
            rpm: esc.rpm as i32,
            error_count: esc.error_count,
        })
    }

    /// Current rotor speeds, one channel per unit.
    pub fn rpm_values(&self) -> Vec<f32> {
        self.escs
            .iter()
            .take(self.unit_count)
            .map(|e| e.rpm as f32)
            .collect()
    }
}
