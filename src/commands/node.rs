//! Node commands: create, update, delete
//!
//! Delete is the cascading one: the store removes every connection touching
//! the node, so the command snapshots the node and the full dependent edge
//! set first and its undo restores both with their original ids. Update uses
//! a partial previous-state snapshot — only the fields being changed are
//! captured, and undo is a partial merge rather than a whole-node replace.

use async_trait::async_trait;

use crate::commands::{
    undoable_data, Command, CommandContext, CommandError, CommandMetadata, CommandOutput,
    CommandResult, MAX_DETAILS_LEN, MAX_STATEMENT_LEN,
};
use crate::effects::{AnimationKind, Effect};
use crate::identifiers::NodeId;
use crate::model::{Connection, Node, NodeDraft, NodeKind, NodePatch, QuestionState, StatementState};
use crate::store::GraphStore;
use serde::{Deserialize, Serialize};

/// Check statement text against the shared limits. The length limit is
/// measured on the raw input, before trimming — surrounding whitespace
/// counts, even though only the trimmed text is stored.
fn check_statement(raw: &str) -> Result<(), CommandError> {
    if raw.trim().is_empty() {
        return Err(CommandError::validation_field(
            "Statement cannot be empty",
            "statement",
            "Statement is required",
        ));
    }
    if raw.chars().count() > MAX_STATEMENT_LEN {
        return Err(CommandError::validation_field(
            "Statement is too long",
            "statement",
            format!("Must be {MAX_STATEMENT_LEN} characters or fewer"),
        ));
    }
    Ok(())
}

/// Check details text against the raw length limit
fn check_details(raw: &str) -> Result<(), CommandError> {
    if raw.chars().count() > MAX_DETAILS_LEN {
        return Err(CommandError::validation_field(
            "Details are too long",
            "details",
            format!("Must be {MAX_DETAILS_LEN} characters or fewer"),
        ));
    }
    Ok(())
}

/// Trim details for storage, dropping text that trims to nothing
fn trim_details(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// graph.node.create
// ---------------------------------------------------------------------------

/// Payload for [`CreateNode`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreateNodePayload {
    /// Statement text; trimmed before storage
    pub statement: String,
    /// Optional details text; trimmed before storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Defaults to statement when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    /// Question nodes default to Active when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_state: Option<QuestionState>,
    /// Carried only for statement nodes, and never defaulted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_state: Option<StatementState>,
}

/// Result data of [`CreateNode`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNodeOutput {
    /// Id assigned by the store
    pub node_id: NodeId,
    /// The node as stored
    pub node: Node,
}

/// `graph.node.create` — add a statement or question node
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateNode;

static CREATE_NODE_METADATA: CommandMetadata = CommandMetadata {
    id: "graph.node.create",
    name: "Create Node",
    description: "Add a new statement or question to the graph",
    category: "node",
    undoable: true,
    mutates_graph: true,
};

#[async_trait]
impl Command for CreateNode {
    type Payload = CreateNodePayload;
    type Output = CreateNodeOutput;

    fn metadata(&self) -> &'static CommandMetadata {
        &CREATE_NODE_METADATA
    }

    fn validate(
        &self,
        payload: &Self::Payload,
        _store: &GraphStore,
        _ctx: &CommandContext,
    ) -> Result<(), CommandError> {
        check_statement(&payload.statement)?;
        if let Some(details) = &payload.details {
            check_details(details)?;
        }
        Ok(())
    }

    async fn execute(
        &self,
        payload: Self::Payload,
        store: &mut GraphStore,
        ctx: &CommandContext,
    ) -> CommandResult<Self::Output> {
        self.validate(&payload, store, ctx)?;

        let kind = payload.kind.unwrap_or_default();
        let draft = NodeDraft {
            statement: payload.statement.trim().to_string(),
            details: payload.details.as_deref().and_then(trim_details),
            kind,
            question_state: match kind {
                NodeKind::Question => Some(payload.question_state.unwrap_or_default()),
                NodeKind::Statement => None,
            },
            statement_state: match kind {
                NodeKind::Statement => payload.statement_state,
                NodeKind::Question => None,
            },
        };

        let node = store.add_node(draft);
        let effects = vec![
            Effect::success("Node created"),
            Effect::animation(node.id.to_string(), AnimationKind::GrowIn),
        ];

        Ok(CommandOutput::new(
            CreateNodeOutput {
                node_id: node.id,
                node,
            },
            effects,
        ))
    }

    async fn undo(
        &self,
        result: &CommandResult<Self::Output>,
        store: &mut GraphStore,
        _ctx: &CommandContext,
    ) -> CommandResult<()> {
        let data = undoable_data(result)?;
        store.remove_node(data.node_id);

        let effects = vec![
            Effect::success("Node creation undone"),
            Effect::animation(data.node_id.to_string(), AnimationKind::ShrinkOut),
        ];
        Ok(CommandOutput::new((), effects))
    }
}

// ---------------------------------------------------------------------------
// graph.node.update
// ---------------------------------------------------------------------------

/// Payload for [`UpdateNode`]. Absent fields are left alone; `Some(None)` on
/// the doubly optional fields clears them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateNodePayload {
    pub node_id: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::double_option::deserialize"
    )]
    pub details: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::double_option::deserialize"
    )]
    pub statement_state: Option<Option<StatementState>>,
}

/// Result data of [`UpdateNode`]: the partial snapshot of exactly the fields
/// that were changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateNodeOutput {
    pub node_id: NodeId,
    /// Prior values of the changed fields only
    pub previous_state: NodePatch,
}

/// `graph.node.update` — edit fields of an existing node
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateNode;

static UPDATE_NODE_METADATA: CommandMetadata = CommandMetadata {
    id: "graph.node.update",
    name: "Update Node",
    description: "Edit the text or state of an existing node",
    category: "node",
    undoable: true,
    mutates_graph: true,
};

impl UpdateNode {
    /// Translate the payload into the patch actually applied to the store,
    /// with text fields trimmed
    fn patch_from(payload: &UpdateNodePayload) -> NodePatch {
        NodePatch {
            statement: payload.statement.as_ref().map(|s| s.trim().to_string()),
            details: payload
                .details
                .as_ref()
                .map(|d| d.as_deref().and_then(trim_details)),
            kind: payload.kind,
            statement_state: payload.statement_state,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Command for UpdateNode {
    type Payload = UpdateNodePayload;
    type Output = UpdateNodeOutput;

    fn metadata(&self) -> &'static CommandMetadata {
        &UPDATE_NODE_METADATA
    }

    fn validate(
        &self,
        payload: &Self::Payload,
        store: &GraphStore,
        _ctx: &CommandContext,
    ) -> Result<(), CommandError> {
        if !store.contains_node(payload.node_id) {
            return Err(CommandError::NodeNotFound(payload.node_id));
        }
        if let Some(statement) = &payload.statement {
            check_statement(statement)?;
        }
        if let Some(Some(details)) = &payload.details {
            check_details(details)?;
        }
        Ok(())
    }

    async fn execute(
        &self,
        payload: Self::Payload,
        store: &mut GraphStore,
        ctx: &CommandContext,
    ) -> CommandResult<Self::Output> {
        self.validate(&payload, store, ctx)?;

        let node = store
            .node(payload.node_id)
            .ok_or(CommandError::NodeNotFound(payload.node_id))?;

        let patch = Self::patch_from(&payload);
        let previous_state = patch.snapshot_of(node);
        store.update_node(payload.node_id, &patch);

        let effects = vec![
            Effect::success("Node updated"),
            Effect::animation(payload.node_id.to_string(), AnimationKind::Pulse),
        ];

        Ok(CommandOutput::new(
            UpdateNodeOutput {
                node_id: payload.node_id,
                previous_state,
            },
            effects,
        ))
    }

    async fn undo(
        &self,
        result: &CommandResult<Self::Output>,
        store: &mut GraphStore,
        _ctx: &CommandContext,
    ) -> CommandResult<()> {
        let data = undoable_data(result)?;
        if !store.contains_node(data.node_id) {
            return Err(CommandError::NodeNotFound(data.node_id));
        }
        store.update_node(data.node_id, &data.previous_state);

        let effects = vec![
            Effect::success("Node update undone"),
            Effect::animation(data.node_id.to_string(), AnimationKind::Pulse),
        ];
        Ok(CommandOutput::new((), effects))
    }
}

// ---------------------------------------------------------------------------
// graph.node.delete
// ---------------------------------------------------------------------------

/// Payload for [`DeleteNode`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeleteNodePayload {
    pub node_id: NodeId,
}

/// Result data of [`DeleteNode`]: everything the cascade removed, snapshotted
/// before removal so undo can restore the exact prior edge set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteNodeOutput {
    /// The node as it was at deletion, layout fields included
    pub deleted_node: Node,
    /// The node's position in the store's insertion order
    pub node_index: usize,
    /// Every connection that referenced the node, each with the position it
    /// held, in store order
    pub deleted_connections: Vec<(usize, Connection)>,
}

/// `graph.node.delete` — remove a node and every connection touching it
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteNode;

static DELETE_NODE_METADATA: CommandMetadata = CommandMetadata {
    id: "graph.node.delete",
    name: "Delete Node",
    description: "Remove a node and its connections from the graph",
    category: "node",
    undoable: true,
    mutates_graph: true,
};

#[async_trait]
impl Command for DeleteNode {
    type Payload = DeleteNodePayload;
    type Output = DeleteNodeOutput;

    fn metadata(&self) -> &'static CommandMetadata {
        &DELETE_NODE_METADATA
    }

    fn validate(
        &self,
        payload: &Self::Payload,
        store: &GraphStore,
        _ctx: &CommandContext,
    ) -> Result<(), CommandError> {
        if !store.contains_node(payload.node_id) {
            return Err(CommandError::NodeNotFound(payload.node_id));
        }
        Ok(())
    }

    async fn execute(
        &self,
        payload: Self::Payload,
        store: &mut GraphStore,
        _ctx: &CommandContext,
    ) -> CommandResult<Self::Output> {
        // Snapshot before the cascade destroys the evidence, positions
        // included so undo can rebuild the exact insertion order.
        let deleted_node = store
            .node(payload.node_id)
            .cloned()
            .ok_or(CommandError::NodeNotFound(payload.node_id))?;
        let node_index = store
            .node_index(payload.node_id)
            .ok_or(CommandError::NodeNotFound(payload.node_id))?;
        let deleted_connections = store.connections_touching(payload.node_id);

        store.remove_node(payload.node_id);

        let effects = vec![
            Effect::success("Node deleted"),
            Effect::animation(payload.node_id.to_string(), AnimationKind::ShrinkOut),
        ];

        Ok(CommandOutput::new(
            DeleteNodeOutput {
                deleted_node,
                node_index,
                deleted_connections,
            },
            effects,
        ))
    }

    async fn undo(
        &self,
        result: &CommandResult<Self::Output>,
        store: &mut GraphStore,
        _ctx: &CommandContext,
    ) -> CommandResult<()> {
        let data = undoable_data(result)?;

        // Restore the exact node and the exact edge set, ids and positions
        // preserved, so external references keyed by id (open panels,
        // selections) and the rendering order both survive the undo.
        // Connections come back in ascending recorded position, which
        // reproduces the original sequence.
        store.restore_node(data.deleted_node.clone(), data.node_index);
        let mut effects = vec![
            Effect::success("Node restored"),
            Effect::animation(data.deleted_node.id.to_string(), AnimationKind::GrowIn),
        ];
        for (index, connection) in &data.deleted_connections {
            store.restore_connection(connection.clone(), *index);
            effects.push(Effect::animation(
                connection.id.to_string(),
                AnimationKind::DrawLine,
            ));
        }

        Ok(CommandOutput::new((), effects))
    }
}
