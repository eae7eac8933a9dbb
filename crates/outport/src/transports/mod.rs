//! Transport selection
//!
//! `attach` receives a `Peer` describing the consumer; the concrete
//! transport is chosen from it here.

pub mod codec;
mod local;
mod remote;

use std::sync::Arc;

use contracts::{
    ContractError, LocalInPort, PortTraits, PortTransport, RemoteConfig, RemoteEndpoint,
};

pub use local::LocalTransport;
pub use remote::RemoteTransport;

/// Builds a `RemoteTransport` once the connection id and settings are known
pub type RemoteSpawner<K> =
    Box<dyn FnOnce(&str, &RemoteConfig) -> Result<RemoteTransport<K>, ContractError> + Send>;

/// Consumer side of a connection
pub enum Peer<K: PortTraits> {
    /// Consumer in this process: direct calls, shared buffers
    InProcess(Arc<dyn LocalInPort<K>>),
    /// Consumer behind a byte endpoint: serialized frames
    Remote(RemoteSpawner<K>),
    /// Caller-provided transport, used as is
    Transport(Box<dyn PortTransport<K>>),
}

impl<K: PortTraits> Peer<K> {
    pub fn local(port: Arc<dyn LocalInPort<K>>) -> Self {
        Self::InProcess(port)
    }

    pub fn remote<E: RemoteEndpoint + 'static>(endpoint: E) -> Self {
        Self::Remote(Box::new(move |connection_id, config| {
            RemoteTransport::spawn(connection_id, endpoint, config)
        }))
    }

    pub fn transport(transport: impl PortTransport<K> + 'static) -> Self {
        Self::Transport(Box::new(transport))
    }

    pub fn is_local(&self) -> bool {
        match self {
            Self::InProcess(_) => true,
            Self::Remote(_) => false,
            Self::Transport(transport) => transport.is_local(),
        }
    }
}

impl<K: PortTraits, P: LocalInPort<K> + 'static> From<Arc<P>> for Peer<K> {
    fn from(port: Arc<P>) -> Self {
        Self::InProcess(port)
    }
}

impl<K: PortTraits> std::fmt::Debug for Peer<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            Self::InProcess(_) => "InProcess",
            Self::Remote(_) => "Remote",
            Self::Transport(_) => "Transport",
        };
        f.debug_tuple("Peer").field(&variant).finish()
    }
}

/// Create the transport for a new connection
pub(crate) fn create_transport<K: PortTraits>(
    connection_id: &str,
    peer: Peer<K>,
    remote: &RemoteConfig,
) -> Result<Box<dyn PortTransport<K>>, ContractError> {
    match peer {
        Peer::InProcess(port) => Ok(Box::new(LocalTransport::new(connection_id, port))),
        Peer::Remote(spawn) => Ok(Box::new(spawn(connection_id, remote)?)),
        Peer::Transport(transport) => {
            if transport.connection_id() != connection_id {
                tracing::debug!(
                    connection = connection_id,
                    transport_id = transport.connection_id(),
                    "Custom transport reports a different connection id"
                );
            }
            Ok(transport)
        }
    }
}
