//! Graph store — nodes, edges, and per-node command transcripts in one JSON file
//!
//! Every mutation rewrites the whole file. The document is small (an
//! operator's working graph, not a database), so whole-file rewrites keep the
//! on-disk state trivially consistent: what you read back is exactly the last
//! mutation that took the lock.

use chrono::Utc;
use hostgraph_core::{CommandRecord, Error, Result, TranscriptStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// A host/asset under test.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    /// Whether the operator has compromised this host.
    #[serde(default)]
    pub owned: bool,
    #[serde(default)]
    pub commands: Vec<CommandRecord>,
}

/// A directed relationship between two nodes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default = "default_edge_label")]
    pub label: String,
}

fn default_edge_label() -> String {
    "→".to_string()
}

/// The whole persisted graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Partial node update. `None` fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NodeUpdate {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub owned: Option<bool>,
}

pub struct GraphStore {
    path: PathBuf,
    data: Mutex<GraphDocument>,
}

impl GraphStore {
    /// Load the graph file at `path`, creating an empty document if it does
    /// not exist yet. The loaded document is written back once so older files
    /// pick up any defaulted fields.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            GraphDocument::default()
        };
        let store = Self {
            path,
            data: Mutex::new(data),
        };
        {
            let data = store.lock();
            store.save(&data)?;
        }
        Ok(store)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GraphDocument> {
        // A poisoned lock means a panic mid-mutation; the in-memory document
        // is still the last fully applied state, so keep serving it.
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save(&self, data: &GraphDocument) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let raw = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }

    /// Snapshot of the full graph document.
    pub fn get_graph(&self) -> GraphDocument {
        self.lock().clone()
    }

    pub fn add_node(&self, name: &str, notes: &str, owned: bool) -> Result<String> {
        let node_id = format!("node-{}", short_id());
        let mut data = self.lock();
        data.nodes.push(Node {
            id: node_id.clone(),
            name: if name.is_empty() { "Unnamed Node".into() } else { name.into() },
            notes: notes.to_string(),
            owned,
            commands: Vec::new(),
        });
        self.save(&data)?;
        debug!("Added node {}", node_id);
        Ok(node_id)
    }

    /// Apply a partial update. Returns `NodeNotFound` for an unknown id.
    pub fn update_node(&self, node_id: &str, update: &NodeUpdate) -> Result<()> {
        let mut data = self.lock();
        let node = data
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| Error::node_not_found(node_id))?;
        if let Some(ref name) = update.name {
            node.name = name.clone();
        }
        if let Some(ref notes) = update.notes {
            node.notes = notes.clone();
        }
        if let Some(owned) = update.owned {
            node.owned = owned;
        }
        self.save(&data)
    }

    /// Remove a node and every edge touching it. Removing an absent node is a
    /// no-op.
    pub fn remove_node(&self, node_id: &str) -> Result<()> {
        let mut data = self.lock();
        data.nodes.retain(|n| n.id != node_id);
        data.edges
            .retain(|e| e.source != node_id && e.target != node_id);
        self.save(&data)
    }

    pub fn add_edge(&self, source: &str, target: &str, label: Option<&str>) -> Result<String> {
        let edge_id = format!("edge-{}", short_id());
        let mut data = self.lock();
        data.edges.push(Edge {
            id: edge_id.clone(),
            source: source.to_string(),
            target: target.to_string(),
            label: label.map(String::from).unwrap_or_else(default_edge_label),
        });
        self.save(&data)?;
        Ok(edge_id)
    }

    pub fn remove_edge(&self, edge_id: &str) -> Result<()> {
        let mut data = self.lock();
        data.edges.retain(|e| e.id != edge_id);
        self.save(&data)
    }

    pub fn clear(&self) -> Result<()> {
        let mut data = self.lock();
        *data = GraphDocument::default();
        self.save(&data)
    }
}

impl TranscriptStore for GraphStore {
    fn persist_command(&self, node_id: &str, command: &str, output: &str) -> bool {
        let mut data = self.lock();
        let Some(node) = data.nodes.iter_mut().find(|n| n.id == node_id) else {
            return false;
        };
        node.commands.push(CommandRecord {
            command: command.to_string(),
            output: output.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        });
        if let Err(e) = self.save(&data) {
            warn!("Failed to save transcript for {}: {}", node_id, e);
        }
        true
    }

    fn get_node_commands(&self, node_id: &str) -> Vec<CommandRecord> {
        self.lock()
            .nodes
            .iter()
            .find(|n| n.id == node_id)
            .map(|n| n.commands.clone())
            .unwrap_or_default()
    }

    fn delete_command(&self, node_id: &str, index: usize) -> bool {
        // Bounds are checked here, under the lock, not when the caller
        // computed the index — the list may have changed since.
        let mut data = self.lock();
        let Some(node) = data.nodes.iter_mut().find(|n| n.id == node_id) else {
            return false;
        };
        if index >= node.commands.len() {
            return false;
        }
        node.commands.remove(index);
        if let Err(e) = self.save(&data) {
            warn!("Failed to save after delete for {}: {}", node_id, e);
        }
        true
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (GraphStore, PathBuf) {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "hostgraph-store-test-{}-{}",
            std::process::id(),
            id
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("graph.json");
        (GraphStore::open(&path).unwrap(), dir)
    }

    fn cleanup(dir: &Path) {
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn add_and_get_node() {
        let (store, dir) = test_store();
        let id = store.add_node("web01", "dmz host", false).unwrap();
        assert!(id.starts_with("node-"));
        let graph = store.get_graph();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].name, "web01");
        assert!(!graph.nodes[0].owned);
        cleanup(&dir);
    }

    #[test]
    fn update_node_partial() {
        let (store, dir) = test_store();
        let id = store.add_node("web01", "", false).unwrap();
        store
            .update_node(
                &id,
                &NodeUpdate {
                    owned: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        let graph = store.get_graph();
        assert_eq!(graph.nodes[0].name, "web01");
        assert!(graph.nodes[0].owned);
        cleanup(&dir);
    }

    #[test]
    fn update_unknown_node_fails() {
        let (store, dir) = test_store();
        let err = store.update_node("node-missing", &NodeUpdate::default());
        assert!(matches!(err, Err(Error::NodeNotFound(_))));
        cleanup(&dir);
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let (store, dir) = test_store();
        let a = store.add_node("a", "", false).unwrap();
        let b = store.add_node("b", "", false).unwrap();
        let c = store.add_node("c", "", false).unwrap();
        store.add_edge(&a, &b, None).unwrap();
        store.add_edge(&b, &c, None).unwrap();
        store.remove_node(&b).unwrap();
        let graph = store.get_graph();
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.edges.is_empty());
        cleanup(&dir);
    }

    #[test]
    fn reload_preserves_transcripts() {
        let (store, dir) = test_store();
        let id = store.add_node("web01", "", false).unwrap();
        assert!(store.persist_command(&id, "whoami", "root\n"));
        let path = dir.join("graph.json");
        drop(store);

        let reopened = GraphStore::open(&path).unwrap();
        let commands = reopened.get_node_commands(&id);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command, "whoami");
        assert_eq!(commands[0].output, "root\n");
        assert!(!commands[0].timestamp.is_empty());
        cleanup(&dir);
    }

    #[test]
    fn persist_command_unknown_node() {
        let (store, dir) = test_store();
        assert!(!store.persist_command("node-missing", "id", "uid=0"));
        cleanup(&dir);
    }

    #[test]
    fn delete_command_bounds() {
        let (store, dir) = test_store();
        let id = store.add_node("web01", "", false).unwrap();
        store.persist_command(&id, "id", "uid=0\n");

        assert!(!store.delete_command(&id, 1));
        assert!(!store.delete_command("node-missing", 0));
        assert_eq!(store.get_node_commands(&id).len(), 1);

        assert!(store.delete_command(&id, 0));
        assert!(store.get_node_commands(&id).is_empty());
        assert!(!store.delete_command(&id, 0));
        cleanup(&dir);
    }

    #[test]
    fn clear_empties_everything() {
        let (store, dir) = test_store();
        let a = store.add_node("a", "", false).unwrap();
        store.add_edge(&a, &a, Some("self")).unwrap();
        store.clear().unwrap();
        let graph = store.get_graph();
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
        cleanup(&dir);
    }
}
