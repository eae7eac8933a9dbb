//! Remote endpoint implementations

mod channel;
mod log;
mod udp;

pub use channel::ChannelEndpoint;
pub use log::LogEndpoint;
pub use udp::{UdpEndpoint, UdpEndpointConfig};
