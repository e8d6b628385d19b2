//! Core types for Hostgraph

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Node identifier - cheaply cloneable, opaque key into the graph store
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One entry in a node's command history. Appended on invocation completion,
/// never mutated in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    pub output: String,
    /// RFC 3339 timestamp of completion
    pub timestamp: String,
}

/// Durable per-node command history, keyed by the same node id space as the
/// graph. The execution engine only ever appends; reads and index-based
/// deletes are passthrough operations for the HTTP surface.
pub trait TranscriptStore: Send + Sync {
    /// Append a command record. Returns false if the node is unknown.
    fn persist_command(&self, node_id: &str, command: &str, output: &str) -> bool;

    /// Ordered history for a node; empty if the node is unknown.
    fn get_node_commands(&self, node_id: &str) -> Vec<CommandRecord>;

    /// Remove the record at `index`. Returns false without mutating if the
    /// node is unknown or the index is out of bounds. Bounds are checked at
    /// mutation time, under the store's own lock.
    fn delete_command(&self, node_id: &str, index: usize) -> bool;
}

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub bind: BindMode,
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: BindMode::default(),
        }
    }
}

/// Bind mode for the server
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    Loopback,
    #[default]
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_round_trip() {
        let id = NodeId::new("node-abc123");
        assert_eq!(id.as_str(), "node-abc123");
        assert_eq!(id.to_string(), "node-abc123");
        assert_eq!(id, NodeId::from("node-abc123"));
    }

    #[test]
    fn bind_mode_addrs() {
        assert_eq!(BindMode::Loopback.to_addr(), "127.0.0.1");
        assert_eq!(BindMode::Lan.to_addr(), "0.0.0.0");
    }
}
