//! # OutPort
//!
//! 多流复用输出端口。
//!
//! 负责：
//! - 按流维护 SRI，数据前先下发 SRI
//! - 按路由表 Fan-out 到多个连接
//! - 进程内 / 远端传输的选择与故障隔离
//! - 连接级统计与端口使用状态

pub mod endpoints;
pub mod error;
pub mod filter;
pub mod metrics;
mod port;
mod ports;
pub mod registry;
pub mod sri_cache;
mod stream;
pub mod transports;

pub use contracts::{ConnectionDescriptor, PortStatistics, PortTraits, PortUsage, StreamSri};
pub use endpoints::{ChannelEndpoint, LogEndpoint, UdpEndpoint, UdpEndpointConfig};
pub use error::OutPortError;
pub use filter::RoutingFilter;
pub use metrics::{LinkSnapshot, LinkStatistics};
pub use port::OutPort;
pub use ports::{
    OutCharPort, OutDoublePort, OutFilePort, OutFloatPort, OutLongLongPort, OutLongPort,
    OutOctetPort, OutShortPort, OutULongLongPort, OutULongPort, OutUShortPort, OutXmlPort,
};
pub use registry::ConnectionInfo;
pub use stream::OutputStream;
pub use transports::codec::{decode_message, WireMessage};
pub use transports::{LocalTransport, Peer, RemoteTransport};
