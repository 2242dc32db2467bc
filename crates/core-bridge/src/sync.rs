use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::rpm::RpmReport;
use crate::status::{StatusSnapshot, CONNECTED_MAX};

/// Default staleness window for controller setpoints.
pub const DEFAULT_OUTPUT_STALE_US: u64 = 500_000;

/// Desired actuator outputs written by the controller side of the internal
/// bus. `timestamp_us == 0` means "never written".
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputSetpoint {
    pub timestamp_us: u64,
    pub stop: bool,
    pub outputs: [u16; CONNECTED_MAX],
}

/// Single-writer/single-reader latest-value cell. The writer always has a
/// free slot to fill while the reader holds the published one.
struct TripleBuffer<T: Copy + Default> {
    slots: [UnsafeCell<T>; 3],
    published: AtomicUsize,
}

unsafe impl<T: Copy + Default + Send> Send for TripleBuffer<T> {}
unsafe impl<T: Copy + Default + Sync> Sync for TripleBuffer<T> {}

impl<T: Copy + Default> TripleBuffer<T> {
    fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| UnsafeCell::new(T::default())),
            published: AtomicUsize::new(0),
        }
    }

    fn write(&self, value: T) {
        let next = (self.published.load(Ordering::Relaxed) + 1) % 3;
        unsafe {
            *self.slots[next].get() = value;
        }
        self.published.store(next, Ordering::Release);
    }

    fn read(&self) -> T {
        let idx = self.published.load(Ordering::Acquire);
        unsafe { *self.slots[idx].get() }
    }
}

/// The internal pub/sub boundary of the bridge: setpoints flow in from the
/// flight controller, aggregated status and rotor RPM flow out. Each channel
/// keeps only the latest value; consumers that need history keep their own.
pub struct BridgeExchange {
    outputs: TripleBuffer<OutputSetpoint>,
    snapshot: TripleBuffer<StatusSnapshot>,
    rpm: TripleBuffer<RpmReport>,
    max_output_age_us: u64,
}

impl BridgeExchange {
    pub fn new(max_output_age_us: u64) -> Self {
        Self {
            outputs: TripleBuffer::new(),
            snapshot: TripleBuffer::new(),
            rpm: TripleBuffer::new(),
            max_output_age_us,
        }
    }

    /// Called by the controller side whenever it has a new desired-output
    /// vector.
    pub fn submit_outputs(&self, setpoint: OutputSetpoint) {
        self.outputs.write(setpoint);
    }

    /// Called by the bridge each tick. Returns `None` when no setpoint has
    /// ever been written or the latest one is stale; the bridge degrades to
    /// an all-stop broadcast.
    pub fn read_outputs(&self, now_us: u64) -> Option<OutputSetpoint> {
        let setpoint = self.outputs.read();
        let age = now_us.saturating_sub(setpoint.timestamp_us);
        if setpoint.timestamp_us == 0 || age > self.max_output_age_us {
            None
        } else {
            Some(setpoint)
        }
    }

    pub fn publish_snapshot(&self, snapshot: StatusSnapshot) {
        self.snapshot.write(snapshot);
    }

    pub fn read_snapshot(&self) -> StatusSnapshot {
        self.snapshot.read()
    }

    pub fn publish_rpm(&self, report: RpmReport) {
        self.rpm.write(report);
    }

    pub fn read_rpm(&self) -> Option<RpmReport> {
        let report = self.rpm.read();
        (report.timestamp_us > 0).then_some(report)
    }
}
