//! Layered error definitions
//!
//! Categorized by source: argument / config / transport / codec

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Producer-facing Errors =====
    /// Invalid argument supplied by the producer
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Connection Errors =====
    /// No connection with this id is attached
    #[error("unknown connection: {connection_id}")]
    UnknownConnection { connection_id: String },

    /// A connection with this id is already attached
    #[error("connection '{connection_id}' is already attached")]
    OccupiedConnection { connection_id: String },

    // ===== Transport Errors =====
    /// Delivery to a connection failed
    #[error("transport error on connection '{connection_id}': {message}")]
    Transport {
        connection_id: String,
        message: String,
    },

    /// Transport queue is full; the message was not accepted
    #[error("transport queue full on connection '{connection_id}'")]
    QueueFull { connection_id: String },

    // ===== Codec Errors =====
    /// Message encoding error
    #[error("encode error: {message}")]
    Encode { message: String },

    /// Message or property decoding error
    #[error("decode error: {message}")]
    Decode { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(connection_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            connection_id: connection_id.into(),
            message: message.into(),
        }
    }

    /// Create queue full error
    pub fn queue_full(connection_id: impl Into<String>) -> Self {
        Self::QueueFull {
            connection_id: connection_id.into(),
        }
    }

    /// Create decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// True for backpressure, which does not make a connection stale
    pub fn is_backpressure(&self) -> bool {
        matches!(self, Self::QueueFull { .. })
    }
}
