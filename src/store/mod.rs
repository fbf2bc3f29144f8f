//! Canonical in-memory graph state
//!
//! The store is mechanism, not policy: it performs no validation and trusts
//! the command layer to have validated inputs. The one structural guarantee
//! it does keep is referential integrity on node removal — removing a node
//! cascades removal of every connection that references it.

use indexmap::IndexMap;
use tracing::debug;

use crate::identifiers::{ConnectionId, NodeId};
use crate::model::{Connection, ConnectionDraft, ConnectionPatch, Node, NodeDraft, NodePatch};

/// Owns the mutable node and connection collections for one graph.
///
/// Collections are insertion-ordered; iteration order is stable across
/// updates and is part of the contract consumed by the rendering
/// collaborator.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, Connection>,
}

impl GraphStore {
    /// Create an empty graph store
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate all connections in insertion order
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Look up a node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a connection by id
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// True when a node with this id exists
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// True when a connection with this id exists
    pub fn contains_connection(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Position of a node in the insertion order
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.get_index_of(&id)
    }

    /// Position of a connection in the insertion order
    pub fn connection_index(&self, id: ConnectionId) -> Option<usize> {
        self.connections.get_index_of(&id)
    }

    /// Every connection whose sources or targets include the node, paired
    /// with its position so undo can put it back where it was
    pub fn connections_touching(&self, node_id: NodeId) -> Vec<(usize, Connection)> {
        self.connections
            .values()
            .enumerate()
            .filter(|(_, c)| c.touches(node_id))
            .map(|(index, c)| (index, c.clone()))
            .collect()
    }

    /// Assign a fresh id to the draft, insert the node, and return it
    pub fn add_node(&mut self, draft: NodeDraft) -> Node {
        let node = Node {
            id: NodeId::new(),
            statement: draft.statement,
            details: draft.details,
            kind: draft.kind,
            question_state: draft.question_state,
            statement_state: draft.statement_state,
            answered_by: None,
            manual_state_override: false,
            layout: Default::default(),
        };
        debug!(node_id = %node.id, kind = node.kind.as_str(), "node added");
        self.nodes.insert(node.id, node.clone());
        node
    }

    /// Re-insert a fully formed node at a given position, preserving its id
    /// and layout fields. Used by undo paths to restore a deleted node
    /// exactly, insertion order included. The index is clamped so a restore
    /// into a graph that has since shrunk still lands in bounds.
    pub fn restore_node(&mut self, node: Node, index: usize) {
        let id = node.id;
        debug!(node_id = %id, index, "node restored");
        self.nodes.shift_insert(index.min(self.nodes.len()), id, node);
    }

    /// Merge the patch's named fields into the node. Silent no-op when the
    /// id is missing; callers are expected to have validated existence.
    pub fn update_node(&mut self, id: NodeId, patch: &NodePatch) {
        if let Some(node) = self.nodes.get_mut(&id) {
            patch.apply_to(node);
            debug!(node_id = %id, "node updated");
        }
    }

    /// Remove a node and cascade removal of every connection referencing it
    pub fn remove_node(&mut self, id: NodeId) {
        let dependent: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.touches(id))
            .map(|c| c.id)
            .collect();
        for connection_id in &dependent {
            self.connections.shift_remove(connection_id);
        }
        if self.nodes.shift_remove(&id).is_some() {
            debug!(node_id = %id, cascaded = dependent.len(), "node removed");
        }
    }

    /// Insert a connection, assigning an id when the draft carries none
    pub fn add_connection(&mut self, draft: ConnectionDraft) -> Connection {
        let connection = Connection {
            id: draft.id.unwrap_or_default(),
            kind: draft.kind,
            sources: draft.sources,
            targets: draft.targets,
        };
        debug!(connection_id = %connection.id, kind = connection.kind.as_str(), "connection added");
        self.connections.insert(connection.id, connection.clone());
        connection
    }

    /// Re-insert a fully formed connection at a given position, preserving
    /// its id, mirroring `restore_node`.
    pub fn restore_connection(&mut self, connection: Connection, index: usize) {
        let id = connection.id;
        debug!(connection_id = %id, index, "connection restored");
        self.connections
            .shift_insert(index.min(self.connections.len()), id, connection);
    }

    /// Merge the patch's named fields into the connection. Silent no-op when
    /// the id is missing, mirroring `update_node`.
    pub fn update_connection(&mut self, id: ConnectionId, patch: &ConnectionPatch) {
        if let Some(connection) = self.connections.get_mut(&id) {
            patch.apply_to(connection);
            debug!(connection_id = %id, "connection updated");
        }
    }

    /// Remove a connection by id
    pub fn remove_connection(&mut self, id: ConnectionId) {
        if self.connections.shift_remove(&id).is_some() {
            debug!(connection_id = %id, "connection removed");
        }
    }
}
