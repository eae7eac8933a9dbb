//! OutPort error types

use contracts::ContractError;
use thiserror::Error;

/// Errors reported to the producer or administrator of a port
#[derive(Debug, Error)]
pub enum OutPortError {
    /// Producer passed something the port cannot accept
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Rejected administrative input (attach id, routing table)
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// No connection with this id is attached
    #[error("unknown connection: {connection_id}")]
    UnknownConnection { connection_id: String },

    /// A connection with this id is already attached
    #[error("connection '{connection_id}' is already attached")]
    OccupiedConnection { connection_id: String },

    /// Error raised by a contract type or a transport
    #[error("contract error: {0}")]
    Contract(#[source] ContractError),
}

impl OutPortError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn unknown_connection(connection_id: impl Into<String>) -> Self {
        Self::UnknownConnection {
            connection_id: connection_id.into(),
        }
    }

    pub fn occupied_connection(connection_id: impl Into<String>) -> Self {
        Self::OccupiedConnection {
            connection_id: connection_id.into(),
        }
    }
}

impl From<ContractError> for OutPortError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::InvalidArgument { message } => Self::InvalidArgument { message },
            ContractError::ConfigValidation { field, message } => Self::Configuration {
                message: format!("{field}: {message}"),
            },
            ContractError::UnknownConnection { connection_id } => {
                Self::UnknownConnection { connection_id }
            }
            ContractError::OccupiedConnection { connection_id } => {
                Self::OccupiedConnection { connection_id }
            }
            other => Self::Contract(other),
        }
    }
}
