//! Hostgraph Store - JSON-file-backed graph of hosts with per-node transcripts

pub mod graph;

pub use graph::{Edge, GraphDocument, GraphStore, Node, NodeUpdate};
