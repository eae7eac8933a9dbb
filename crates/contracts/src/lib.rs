//! # Contracts
//!
//! Frozen interface contracts shared by the output port, the in-process
//! input port and configuration loading. Business crates depend on this
//! crate only; reverse dependencies are prohibited.
//!
//! ## Data Model
//! - A port carries one payload family (`PortTraits`)
//! - Every packet names its stream; each stream has one current `StreamSri`
//! - Connection-table rows (`ConnectionDescriptor`) are routing input only

pub mod connection;
mod error;
mod packet;
mod payload;
mod port_config;
mod sri;
mod stats;
mod stream_id;
mod time;
mod transport;

pub use connection::{is_wildcard, ConnectionDescriptor};
pub use error::*;
pub use packet::*;
pub use payload::*;
pub use port_config::*;
pub use sri::*;
pub use stats::*;
pub use stream_id::StreamId;
pub use time::*;
pub use transport::*;
