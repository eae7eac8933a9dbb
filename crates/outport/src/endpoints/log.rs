//! LogEndpoint - logs frame summaries via tracing

use bytes::Bytes;
use contracts::{ContractError, RemoteEndpoint};
use tracing::{info, instrument};

/// Endpoint that logs each frame instead of delivering it
pub struct LogEndpoint {
    name: String,
    frames: u64,
    bytes: u64,
}

impl LogEndpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            bytes: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RemoteEndpoint for LogEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_endpoint_transmit",
        skip(self, frame),
        fields(endpoint = %self.name, bytes = frame.len())
    )]
    async fn transmit(&mut self, frame: Bytes) -> Result<(), ContractError> {
        self.frames += 1;
        self.bytes += frame.len() as u64;
        info!(
            endpoint = %self.name,
            frame = self.frames,
            size = frame.len(),
            "Frame received"
        );
        Ok(())
    }

    #[instrument(name = "log_endpoint_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_endpoint_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(
            endpoint = %self.name,
            frames = self.frames,
            bytes = self.bytes,
            "LogEndpoint closed"
        );
        Ok(())
    }
}
