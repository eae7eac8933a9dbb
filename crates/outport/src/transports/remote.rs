//! RemoteTransport - serialized delivery through an isolated worker task

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use contracts::{
    ContractError, Packet, PortTraits, PortTransport, RemoteConfig, RemoteEndpoint, StreamSri,
    TransportKind, WireFormat,
};

use super::codec;

/// Transport that encodes every message and queues it for a worker task
/// writing to a `RemoteEndpoint`.
///
/// Sends never block: a full queue reports `QueueFull`, a dead worker or a
/// failed endpoint reports a transport error.
pub struct RemoteTransport<K: PortTraits> {
    connection_id: String,
    format: WireFormat,
    /// Channel to send frames to worker
    tx: mpsc::Sender<Bytes>,
    capacity: usize,
    /// Cleared by the worker when the endpoint fails
    healthy: Arc<AtomicBool>,
    worker_handle: JoinHandle<()>,
    _traits: PhantomData<fn() -> K>,
}

impl<K: PortTraits> RemoteTransport<K> {
    /// Create the transport and spawn its worker on the current tokio runtime
    pub fn spawn<E: RemoteEndpoint + 'static>(
        connection_id: impl Into<String>,
        endpoint: E,
        config: &RemoteConfig,
    ) -> Result<Self, ContractError> {
        let connection_id = connection_id.into();
        let runtime = Handle::try_current().map_err(|e| {
            ContractError::transport(&connection_id, format!("no tokio runtime: {e}"))
        })?;

        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let healthy = Arc::new(AtomicBool::new(true));

        let worker_healthy = Arc::clone(&healthy);
        let worker_connection = connection_id.clone();
        let worker_handle = runtime.spawn(async move {
            remote_worker(endpoint, rx, worker_healthy, worker_connection).await;
        });

        Ok(Self {
            connection_id,
            format: config.format,
            tx,
            capacity,
            healthy,
            worker_handle,
            _traits: PhantomData,
        })
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Frames queued and not yet taken by the worker
    pub fn queued(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    fn enqueue(&self, frame: Bytes) -> Result<(), ContractError> {
        if !self.healthy.load(Ordering::Acquire) {
            return Err(ContractError::transport(
                &self.connection_id,
                "remote endpoint failed",
            ));
        }
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(ContractError::queue_full(&self.connection_id))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ContractError::transport(
                &self.connection_id,
                "remote worker closed",
            )),
        }
    }

    /// Stop accepting frames and wait for the worker to drain the queue
    #[instrument(name = "remote_transport_shutdown", skip(self), fields(connection = %self.connection_id))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(connection = %self.connection_id, error = ?e, "Remote worker panicked");
        }
        debug!(connection = %self.connection_id, "RemoteTransport shutdown complete");
    }
}

impl<K: PortTraits> PortTransport<K> for RemoteTransport<K> {
    fn connection_id(&self) -> &str {
        &self.connection_id
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Remote
    }

    fn send_sri(&self, sri: &StreamSri) -> Result<(), ContractError> {
        let frame = codec::encode_sri(sri, self.format)?;
        self.enqueue(frame)
    }

    fn send(&self, packet: &Packet<K::Buffer>) -> Result<(), ContractError> {
        let frame = codec::encode_packet(packet, self.format)?;
        self.enqueue(frame)
    }

    fn queue_depth(&self) -> f32 {
        self.queued() as f32 / self.capacity as f32
    }
}

/// Worker task that drains queued frames into the endpoint
#[instrument(
    name = "remote_worker_loop",
    skip(endpoint, rx, healthy),
    fields(connection = %connection_id)
)]
async fn remote_worker<E: RemoteEndpoint>(
    mut endpoint: E,
    mut rx: mpsc::Receiver<Bytes>,
    healthy: Arc<AtomicBool>,
    connection_id: String,
) {
    debug!(endpoint = endpoint.name(), "Remote worker started");

    while let Some(frame) = rx.recv().await {
        if let Err(e) = endpoint.transmit(frame).await {
            error!(
                endpoint = endpoint.name(),
                error = %e,
                "Transmit failed, connection is stale"
            );
            healthy.store(false, Ordering::Release);
            break;
        }
    }
    // Refuse anything still in flight
    rx.close();

    if let Err(e) = endpoint.flush().await {
        error!(endpoint = endpoint.name(), error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = endpoint.close().await {
        error!(endpoint = endpoint.name(), error = %e, "Close failed on shutdown");
    }

    debug!(endpoint = endpoint.name(), "Remote worker stopped");
}
