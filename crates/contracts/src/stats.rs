//! Statistics snapshots reported by a port

use serde::{Deserialize, Serialize};

use crate::TransportKind;

/// Usage classification of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortUsage {
    /// No connections, or no recent traffic
    Idle,
    /// Recent traffic below saturation
    Active,
    /// A backlog threshold is exceeded
    Busy,
}

/// Data flow metrics of one connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortStatistics {
    pub port_name: String,
    pub connection_id: String,
    pub transport: TransportKind,
    pub elements_per_second: f32,
    pub bits_per_second: f32,
    pub calls_per_second: f32,
    /// Streams seen on this connection and not yet ended
    pub stream_ids: Vec<String>,
    /// Mean backlog fill ratio over the history window
    pub average_queue_depth: f32,
    /// Seconds since the last delivery
    pub time_since_last_call: f32,
    pub dropped_packets: u64,
    pub failed_calls: u64,
}
