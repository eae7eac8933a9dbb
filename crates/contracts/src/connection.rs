//! ConnectionDescriptor - one row of a port's connection table
//!
//! Rows are routing input only: `(connection_id, stream_id, port_name)`.
//! `encode` / `decode` map a row to and from the property list form used by
//! component configuration.

use serde::{Deserialize, Serialize};

use crate::{AnyValue, ContractError, Keyword};

pub const CONNECTION_ID_PROPERTY: &str = "connectionTable::connection_id";
pub const STREAM_ID_PROPERTY: &str = "connectionTable::stream_id";
pub const PORT_NAME_PROPERTY: &str = "connectionTable::port_name";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    #[serde(default)]
    pub connection_id: String,
    #[serde(default)]
    pub stream_id: String,
    #[serde(default)]
    pub port_name: String,
}

impl ConnectionDescriptor {
    pub fn new(
        connection_id: impl Into<String>,
        stream_id: impl Into<String>,
        port_name: impl Into<String>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            stream_id: stream_id.into(),
            port_name: port_name.into(),
        }
    }

    /// Rejects fields with surrounding whitespace or control characters.
    pub fn check(&self) -> Result<(), ContractError> {
        for (field, value) in [
            ("connection_id", &self.connection_id),
            ("stream_id", &self.stream_id),
            ("port_name", &self.port_name),
        ] {
            if value.trim() != value {
                return Err(ContractError::config_validation(
                    field,
                    format!("'{value}' has leading or trailing whitespace"),
                ));
            }
            if value.chars().any(char::is_control) {
                return Err(ContractError::config_validation(
                    field,
                    format!("{value:?} contains control characters"),
                ));
            }
        }
        Ok(())
    }
}

/// `""` and `"*"` match anything
pub fn is_wildcard(field: &str) -> bool {
    field.is_empty() || field == "*"
}

/// Encode a row as a property list
pub fn encode(descriptor: &ConnectionDescriptor) -> Vec<Keyword> {
    vec![
        Keyword::new(CONNECTION_ID_PROPERTY, descriptor.connection_id.as_str()),
        Keyword::new(STREAM_ID_PROPERTY, descriptor.stream_id.as_str()),
        Keyword::new(PORT_NAME_PROPERTY, descriptor.port_name.as_str()),
    ]
}

/// Decode a row from a property list.
///
/// Unknown property ids are ignored and absent ones leave the field empty;
/// a known id holding a non-string value is an error.
pub fn decode(properties: &[Keyword]) -> Result<ConnectionDescriptor, ContractError> {
    let mut descriptor = ConnectionDescriptor::default();
    for property in properties {
        let slot = match property.id.as_str() {
            CONNECTION_ID_PROPERTY => &mut descriptor.connection_id,
            STREAM_ID_PROPERTY => &mut descriptor.stream_id,
            PORT_NAME_PROPERTY => &mut descriptor.port_name,
            _ => continue,
        };
        match &property.value {
            AnyValue::String(s) => slot.clone_from(s),
            other => {
                return Err(ContractError::decode(format!(
                    "property '{}' expects a string, got {other:?}",
                    property.id
                )))
            }
        }
    }
    Ok(descriptor)
}
