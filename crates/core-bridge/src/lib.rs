pub mod bridge;
pub mod command;
pub mod params;
pub mod rpm;
pub mod scheduler;
pub mod sim;
pub mod status;
pub mod sync;
pub mod tags;
pub mod timebase;

pub use bridge::{BridgeStats, EscBridge};
pub use command::{
    ActuatorCommand, CommandBatch, CommandBroadcaster, CommandSink, SendOutcome, TransportError,
    COMMAND_MAX_COUNT, DISARMED_OUTPUT_VALUE,
};
pub use params::BridgeParams;
pub use rpm::{RpmBridge, RpmReport, RPM_MAX_CHANNELS};
pub use scheduler::{Disabled, RateSchedule, ScheduledSource, SubjectId, MAX_TARGET_RATE_HZ};
pub use sim::SimulatedEscBank;
pub use status::{
    ActuatorSlot, EscConnectionType, StatusAggregator, StatusReport, StatusSnapshot,
    CONNECTED_MAX, FRESHNESS_WINDOW_US,
};
pub use sync::{BridgeExchange, OutputSetpoint, DEFAULT_OUTPUT_STALE_US};
pub use timebase::TimeBase;
