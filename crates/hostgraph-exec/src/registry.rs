//! Execution registry — at most one live invocation per node
//!
//! Process-wide shared state. `register` is an atomic replace: the previous
//! entry (if any) comes back to the caller, who signals termination on it.
//! `release` is keyed by invocation id so a finished old invocation can never
//! evict the successor that preempted it.

use dashmap::DashMap;
use hostgraph_core::NodeId;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Registry entry for a live invocation. Cloneable so the pump task and the
/// registry can both hold it; the token is the only shared state.
#[derive(Clone, Debug)]
pub struct RunningExec {
    pub invocation: Uuid,
    cancel: CancellationToken,
}

impl RunningExec {
    pub fn new() -> Self {
        Self {
            invocation: Uuid::new_v4(),
            cancel: CancellationToken::new(),
        }
    }

    /// Request best-effort termination. Non-blocking: the caller does not
    /// wait for the process to actually exit.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Default for RunningExec {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct ExecRegistry {
    entries: DashMap<NodeId, RunningExec>,
}

impl ExecRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register `exec` as the node's live invocation, returning the entry it
    /// replaced, if any. The swap happens under the map's shard lock, so two
    /// near-simultaneous executes for the same node cannot both believe they
    /// are the sole active handle.
    pub fn register(&self, node_id: &NodeId, exec: RunningExec) -> Option<RunningExec> {
        self.entries.insert(node_id.clone(), exec)
    }

    /// Drop the node's entry if it still belongs to `invocation`. Idempotent:
    /// releasing an absent or already-replaced entry is a no-op, so the
    /// completion path and the preemption path need no coordination.
    pub fn release(&self, node_id: &NodeId, invocation: Uuid) {
        self.entries
            .remove_if(node_id, |_, exec| exec.invocation == invocation);
    }

    pub fn is_active(&self, node_id: &NodeId) -> bool {
        self.entries.contains_key(node_id)
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_returns_previous() {
        let registry = ExecRegistry::new();
        let node = NodeId::from("node-a");

        let first = RunningExec::new();
        assert!(registry.register(&node, first.clone()).is_none());
        assert!(registry.is_active(&node));

        let second = RunningExec::new();
        let prev = registry.register(&node, second).unwrap();
        assert_eq!(prev.invocation, first.invocation);
    }

    #[test]
    fn release_is_invocation_keyed() {
        let registry = ExecRegistry::new();
        let node = NodeId::from("node-a");

        let first = RunningExec::new();
        registry.register(&node, first.clone());
        let second = RunningExec::new();
        registry.register(&node, second.clone());

        // A stale release from the preempted invocation must not evict the
        // successor.
        registry.release(&node, first.invocation);
        assert!(registry.is_active(&node));

        registry.release(&node, second.invocation);
        assert!(!registry.is_active(&node));

        // Releasing an absent key is a no-op.
        registry.release(&node, second.invocation);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn nodes_are_independent() {
        let registry = ExecRegistry::new();
        registry.register(&NodeId::from("node-a"), RunningExec::new());
        registry.register(&NodeId::from("node-b"), RunningExec::new());
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn terminate_trips_the_token() {
        let exec = RunningExec::new();
        let token = exec.cancel_token();
        assert!(!token.is_cancelled());
        exec.terminate();
        assert!(token.is_cancelled());
    }
}
