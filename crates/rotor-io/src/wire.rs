//! Line-delimited JSON frames exchanged with the CAN gateway. One frame per
//! line, a `type` tag per frame. This is the logical frame boundary only;
//! the gateway owns the actual CAN encoding.

use core_bridge::{ActuatorCommand, CommandBatch, StatusReport};
use serde::{Deserialize, Serialize};

pub const COMMAND_FRAME_TYPE: &str = "actuator_command";
pub const ESC_STATUS_FRAME_TYPE: &str = "esc_status";
pub const RPM_FRAME_TYPE: &str = "rpm";
pub const HELLO_FRAME_TYPE: &str = "hello";

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    pub const fn v1() -> Self {
        Self { major: 1, minor: 0 }
    }

    pub fn is_supported(&self) -> bool {
        self.major == 1
    }
}

/// Frames that omit the version are assumed current rather than rejected.
impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::v1()
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommandItemMsg {
    pub actuator_id: u8,
    pub value: u16,
}

/// Outbound command batch, also parsed by the simulated gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandFrameMsg {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub protocol_version: ProtocolVersion,
    pub sequence: u64,
    pub timestamp_us: u64,
    pub commands: Vec<CommandItemMsg>,
}

impl CommandFrameMsg {
    pub fn from_batch(sequence: u64, timestamp_us: u64, batch: &CommandBatch) -> Self {
        Self {
            msg_type: COMMAND_FRAME_TYPE.to_string(),
            protocol_version: ProtocolVersion::v1(),
            sequence,
            timestamp_us,
            commands: batch
                .commands
                .iter()
                .map(|c| CommandItemMsg {
                    actuator_id: c.actuator_id,
                    value: c.value,
                })
                .collect(),
        }
    }

    pub fn to_batch(&self) -> CommandBatch {
        CommandBatch {
            commands: self
                .commands
                .iter()
                .map(|c| ActuatorCommand {
                    actuator_id: c.actuator_id,
                    value: c.value,
                })
                .collect(),
        }
    }

    /// Gateway-side parse of one line. `None` for anything that is not a
    /// well-formed command frame.
    pub fn parse(line: &str) -> Option<Self> {
        let frame: CommandFrameMsg = serde_json::from_str(line).ok()?;
        (frame.msg_type == COMMAND_FRAME_TYPE).then_some(frame)
    }
}

/// Per-unit status telemetry from the gateway, already demultiplexed to a
/// slot index.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EscStatusMsg {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub protocol_version: ProtocolVersion,
    pub esc_index: u32,
    pub node_id: u8,
    pub voltage_v: f32,
    pub current_a: f32,
    pub temperature_c: f32,
    pub rpm: i32,
    pub error_count: u32,
}

impl EscStatusMsg {
    pub fn from_report(report: &StatusReport) -> Self {
        Self {
            msg_type: ESC_STATUS_FRAME_TYPE.to_string(),
            protocol_version: ProtocolVersion::v1(),
            esc_index: report.slot_index as u32,
            node_id: report.address,
            voltage_v: report.voltage_v,
            current_a: report.current_a,
            temperature_c: report.temperature_c,
            rpm: report.rpm,
            error_count: report.error_count,
        }
    }

    pub fn to_report(&self) -> StatusReport {
        StatusReport {
            slot_index: self.esc_index as usize,
            address: self.node_id,
            voltage_v: self.voltage_v,
            current_a: self.current_a,
            temperature_c: self.temperature_c,
            rpm: self.rpm,
            error_count: self.error_count,
        }
    }
}

/// Rotor RPM array from an RPM sensor node.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpmMsg {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub protocol_version: ProtocolVersion,
    pub node_id: u8,
    pub rpm: Vec<f32>,
}

/// Gateway identification sent once after connecting.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HelloMsg {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub protocol_version: ProtocolVersion,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug)]
pub enum IncomingFrame {
    Hello(HelloMsg),
    EscStatus(EscStatusMsg),
    Rpm(RpmMsg),
}

impl IncomingFrame {
    /// Bridge-side parse of one inbound line. `None` for malformed or
    /// unknown frames; the caller drops and counts them.
    pub fn parse(line: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(line).ok()?;
        let msg_type = value.get("type")?.as_str()?;
        match msg_type {
            ESC_STATUS_FRAME_TYPE => serde_json::from_value(value)
                .ok()
                .map(IncomingFrame::EscStatus),
            RPM_FRAME_TYPE => serde_json::from_value(value).ok().map(IncomingFrame::Rpm),
            HELLO_FRAME_TYPE => serde_json::from_value(value).ok().map(IncomingFrame::Hello),
            _ => None,
        }
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        match self {
            IncomingFrame::Hello(msg) => msg.protocol_version,
            IncomingFrame::EscStatus(msg) => msg.protocol_version,
            IncomingFrame::Rpm(msg) => msg.protocol_version,
        }
    }
}
