//! ChannelEndpoint - hands frames to a receiver in the same runtime

use bytes::Bytes;
use contracts::{ContractError, RemoteEndpoint};
use tokio::sync::mpsc;
use tracing::debug;

/// Endpoint backed by an unbounded tokio channel.
///
/// The receiving half yields `None` once the endpoint is closed.
pub struct ChannelEndpoint {
    name: String,
    tx: Option<mpsc::UnboundedSender<Bytes>>,
}

impl ChannelEndpoint {
    pub fn new(name: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let endpoint = Self {
            name: name.into(),
            tx: Some(tx),
        };
        (endpoint, rx)
    }
}

impl RemoteEndpoint for ChannelEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transmit(&mut self, frame: Bytes) -> Result<(), ContractError> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| ContractError::transport(&self.name, "channel closed"))?;
        tx.send(frame)
            .map_err(|_| ContractError::transport(&self.name, "receiver dropped"))
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.tx = None;
        debug!(endpoint = %self.name, "ChannelEndpoint closed");
        Ok(())
    }
}
