//! UdpEndpoint - fire-and-forget datagrams, one frame per datagram

use bytes::Bytes;
use contracts::{ContractError, RemoteEndpoint};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, instrument, warn};

/// Configuration for UdpEndpoint
#[derive(Debug, Clone)]
pub struct UdpEndpointConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Frames above this size fail the endpoint (UDP typically 65507 for IPv4)
    pub max_datagram_size: usize,
}

impl UdpEndpointConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| ContractError::config_validation("addr", "missing 'addr' parameter"))?;

        let addr: SocketAddr = addr_str.parse().map_err(|e| {
            ContractError::config_validation("addr", format!("invalid address '{addr_str}': {e}"))
        })?;

        let max_datagram_size = match params.get("max_datagram_size") {
            Some(raw) => raw.parse().map_err(|e| {
                ContractError::config_validation(
                    "max_datagram_size",
                    format!("invalid size '{raw}': {e}"),
                )
            })?,
            None => 65000,
        };

        Ok(Self {
            addr,
            max_datagram_size,
        })
    }
}

/// Endpoint that sends each frame as one UDP datagram
pub struct UdpEndpoint {
    name: String,
    config: UdpEndpointConfig,
    socket: Option<UdpSocket>,
}

impl UdpEndpoint {
    /// Bind an ephemeral local port and connect it to the target
    #[instrument(name = "udp_endpoint_new", skip(name, config), fields(addr = %config.addr))]
    pub async fn new(name: impl Into<String>, config: UdpEndpointConfig) -> std::io::Result<Self> {
        let name = name.into();
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&config.addr).await?;

        debug!(endpoint = %name, target = %config.addr, "UdpEndpoint connected");

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::transport(&self.name, "socket not connected"))
    }
}

impl RemoteEndpoint for UdpEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "udp_endpoint_transmit",
        skip(self, frame),
        fields(endpoint = %self.name, bytes = frame.len())
    )]
    async fn transmit(&mut self, frame: Bytes) -> Result<(), ContractError> {
        // Never skip: the frame may be an SRI already marked delivered
        if frame.len() > self.config.max_datagram_size {
            warn!(
                endpoint = %self.name,
                size = frame.len(),
                max = self.config.max_datagram_size,
                "Frame too large for one datagram"
            );
            return Err(ContractError::transport(
                &self.name,
                format!(
                    "frame of {} bytes exceeds max_datagram_size {}",
                    frame.len(),
                    self.config.max_datagram_size
                ),
            ));
        }
        let socket = self.socket()?;
        let sent = socket
            .send(&frame)
            .await
            .map_err(|e| ContractError::transport(&self.name, format!("udp send failed: {e}")))?;
        debug!(endpoint = %self.name, bytes = sent, "Sent");
        Ok(())
    }

    #[instrument(name = "udp_endpoint_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // UDP doesn't buffer
        Ok(())
    }

    #[instrument(name = "udp_endpoint_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(endpoint = %self.name, "UdpEndpoint closed");
        Ok(())
    }
}
