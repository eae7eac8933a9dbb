//! PortConfig - Config Loader output
//!
//! Describes one output port: name, statistics policy, remote transport
//! settings and the initial connection table.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ConnectionDescriptor;

/// Complete configuration of an output port
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PortConfig {
    /// Port name, matched against `port_name` in the connection table
    #[validate(length(min = 1))]
    pub name: String,

    /// Statistics collection
    #[serde(default)]
    #[validate(nested)]
    pub stats: StatsConfig,

    /// Remote transport settings
    #[serde(default)]
    #[validate(nested)]
    pub remote: RemoteConfig,

    /// Routing rules installed at construction
    #[serde(default)]
    pub connection_table: Vec<ConnectionDescriptor>,
}

impl PortConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stats: StatsConfig::default(),
            remote: RemoteConfig::default(),
            connection_table: Vec::new(),
        }
    }
}

/// Statistics and usage-state policy
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StatsConfig {
    /// Collect per-connection statistics
    #[serde(default = "default_stats_enabled")]
    pub enabled: bool,

    /// Number of pushes kept for rate computation
    #[serde(default = "default_history_window")]
    #[validate(range(min = 2, max = 10_000))]
    pub history_window: usize,

    /// A port with no push for this long reports idle
    #[serde(default = "default_idle_after_ms")]
    #[validate(range(min = 1))]
    pub idle_after_ms: u64,

    /// Queue fill ratio at which the port reports busy
    #[serde(default = "default_busy_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub busy_threshold: f32,
}

fn default_stats_enabled() -> bool {
    true
}

fn default_history_window() -> usize {
    10
}

fn default_idle_after_ms() -> u64 {
    1000
}

fn default_busy_threshold() -> f32 {
    0.9
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: default_stats_enabled(),
            history_window: default_history_window(),
            idle_after_ms: default_idle_after_ms(),
            busy_threshold: default_busy_threshold(),
        }
    }
}

/// Serialization format of remote frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// Remote transport settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RemoteConfig {
    /// Frames buffered per remote connection before backpressure
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    #[serde(default)]
    pub format: WireFormat,
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            format: WireFormat::default(),
        }
    }
}
