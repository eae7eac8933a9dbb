//! LocalTransport - direct calls into an in-process consumer

use std::sync::Arc;

use contracts::{
    ContractError, LocalInPort, Packet, PortTraits, PortTransport, StreamSri, TransportKind,
};

/// Delivers to a consumer in the same address space.
///
/// Packets are handed over by value with their buffer shared, never copied.
pub struct LocalTransport<K: PortTraits> {
    connection_id: String,
    port: Arc<dyn LocalInPort<K>>,
}

impl<K: PortTraits> LocalTransport<K> {
    pub fn new(connection_id: impl Into<String>, port: Arc<dyn LocalInPort<K>>) -> Self {
        Self {
            connection_id: connection_id.into(),
            port,
        }
    }

    pub fn port_name(&self) -> &str {
        self.port.name()
    }
}

impl<K: PortTraits> PortTransport<K> for LocalTransport<K> {
    fn connection_id(&self) -> &str {
        &self.connection_id
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Local
    }

    fn send_sri(&self, sri: &StreamSri) -> Result<(), ContractError> {
        self.port.push_sri(sri)
    }

    fn send(&self, packet: &Packet<K::Buffer>) -> Result<(), ContractError> {
        self.port.push_packet(packet.clone())
    }

    fn queue_depth(&self) -> f32 {
        self.port.queue_depth()
    }
}
