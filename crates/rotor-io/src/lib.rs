pub mod gateway_sim;
pub mod link;
pub mod metrics;
pub mod wire;

pub use gateway_sim::{run_gateway_sim, GatewaySimConfig};
pub use link::{run_link, LinkConfig, LINK_TICK_RATE_HZ};
pub use metrics::{init_metrics, serve_metrics};
pub use wire::{
    CommandFrameMsg, CommandItemMsg, EscStatusMsg, HelloMsg, IncomingFrame, ProtocolVersion,
    RpmMsg,
};
