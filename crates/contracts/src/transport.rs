//! Transport interfaces
//!
//! A port reaches each connected consumer through exactly one
//! `PortTransport`. Two standard capabilities back it: an in-process
//! `LocalInPort` (direct call, shared buffers) and an asynchronous byte
//! `RemoteEndpoint` (serialized frames).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ContractError, Packet, PortTraits, StreamSri};

/// How a connection's transport delivers data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Direct call into a consumer in this process
    Local,
    /// Serialized delivery across a process boundary
    Remote,
    /// Caller-provided transport
    Custom,
}

/// Per-connection delivery capability.
///
/// Implementations must preserve call order and must bound their own
/// blocking; a port never times out a transport call.
pub trait PortTransport<K: PortTraits>: Send + Sync {
    fn connection_id(&self) -> &str;

    fn kind(&self) -> TransportKind;

    fn is_local(&self) -> bool {
        self.kind() == TransportKind::Local
    }

    /// Deliver a stream descriptor
    fn send_sri(&self, sri: &StreamSri) -> Result<(), ContractError>;

    /// Deliver a data packet
    fn send(&self, packet: &Packet<K::Buffer>) -> Result<(), ContractError>;

    /// Backlog fill ratio in `[0, 1]`, used as the queue-depth proxy
    fn queue_depth(&self) -> f32 {
        0.0
    }
}

/// Consumer port living in the same address space as the producer
pub trait LocalInPort<K: PortTraits>: Send + Sync {
    fn name(&self) -> &str;

    fn push_sri(&self, sri: &StreamSri) -> Result<(), ContractError>;

    /// Takes the packet by value; its buffer shares the producer's allocation
    fn push_packet(&self, packet: Packet<K::Buffer>) -> Result<(), ContractError>;

    fn queue_depth(&self) -> f32;
}

/// Byte-level receiver of serialized frames
#[trait_variant::make(RemoteEndpoint: Send)]
pub trait LocalRemoteEndpoint {
    /// Endpoint name (used for logging)
    fn name(&self) -> &str;

    /// Transmit one encoded frame
    async fn transmit(&mut self, frame: Bytes) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close endpoint
    async fn close(&mut self) -> Result<(), ContractError>;
}
