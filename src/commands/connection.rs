//! Connection commands: create, update, delete
//!
//! Every node id listed in sources or targets must reference an existing
//! node — that referential check is done here, not in the store. Delete's
//! undo re-appends the exact connection object, id preserved, following the
//! inverse-animation pairing: delete fades out, undo draws the line back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::commands::{
    undoable_data, Command, CommandContext, CommandError, CommandMetadata, CommandOutput,
    CommandResult,
};
use crate::effects::{AnimationKind, Effect};
use crate::identifiers::{ConnectionId, NodeId};
use crate::model::{Connection, ConnectionDraft, ConnectionPatch, ConnectionType};
use crate::store::GraphStore;

/// Check that an endpoint list is non-empty and every id resolves
fn check_endpoints(
    field: &str,
    ids: &[NodeId],
    store: &GraphStore,
) -> Result<(), CommandError> {
    if ids.is_empty() {
        return Err(CommandError::validation_field(
            format!("Connection {field} cannot be empty"),
            field,
            "At least one node is required",
        ));
    }
    for id in ids {
        if !store.contains_node(*id) {
            return Err(CommandError::NodeNotFound(*id));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// graph.connection.create
// ---------------------------------------------------------------------------

/// Payload for [`CreateConnection`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateConnectionPayload {
    /// Caller-supplied id; the store generates one when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ConnectionId>,
    pub kind: ConnectionType,
    pub sources: Vec<NodeId>,
    pub targets: Vec<NodeId>,
}

/// Result data of [`CreateConnection`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateConnectionOutput {
    pub connection_id: ConnectionId,
    pub connection: Connection,
}

/// `graph.connection.create` — connect nodes with a typed edge
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateConnection;

static CREATE_CONNECTION_METADATA: CommandMetadata = CommandMetadata {
    id: "graph.connection.create",
    name: "Create Connection",
    description: "Connect nodes with an implication, contradiction, or answer edge",
    category: "connection",
    undoable: true,
    mutates_graph: true,
};

#[async_trait]
impl Command for CreateConnection {
    type Payload = CreateConnectionPayload;
    type Output = CreateConnectionOutput;

    fn metadata(&self) -> &'static CommandMetadata {
        &CREATE_CONNECTION_METADATA
    }

    fn validate(
        &self,
        payload: &Self::Payload,
        store: &GraphStore,
        _ctx: &CommandContext,
    ) -> Result<(), CommandError> {
        check_endpoints("sources", &payload.sources, store)?;
        check_endpoints("targets", &payload.targets, store)?;
        if let Some(id) = payload.id {
            if store.contains_connection(id) {
                return Err(CommandError::validation(format!(
                    "Connection {id} already exists"
                )));
            }
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

        let connection = store.add_connection(ConnectionDraft {
            id: payload.id,
            kind: payload.kind,
            sources: payload.sources,
            targets: payload.targets,
        });

        let effects = vec![
            Effect::success("Connection created"),
            Effect::animation(connection.id.to_string(), AnimationKind::DrawLine),
        ];

        Ok(CommandOutput::new(
            CreateConnectionOutput {
                connection_id: connection.id,
                connection,
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
        store.remove_connection(data.connection_id);

        let effects = vec![
            Effect::success("Connection creation undone"),
            Effect::animation(data.connection_id.to_string(), AnimationKind::FadeOut),
        ];
        Ok(CommandOutput::new((), effects))
    }
}

// ---------------------------------------------------------------------------
// graph.connection.update
// ---------------------------------------------------------------------------

/// Payload for [`UpdateConnection`]. Absent fields are left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateConnectionPayload {
    pub connection_id: ConnectionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ConnectionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<NodeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<NodeId>>,
}

/// Result data of [`UpdateConnection`]: the partial snapshot of exactly the
/// fields that were changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateConnectionOutput {
    pub connection_id: ConnectionId,
    /// Prior values of the changed fields only
    pub previous_state: ConnectionPatch,
}

/// `graph.connection.update` — retype or re-route an existing connection
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateConnection;

static UPDATE_CONNECTION_METADATA: CommandMetadata = CommandMetadata {
    id: "graph.connection.update",
    name: "Update Connection",
    description: "Change the type or endpoints of an existing connection",
    category: "connection",
    undoable: true,
    mutates_graph: true,
};

#[async_trait]
impl Command for UpdateConnection {
    type Payload = UpdateConnectionPayload;
    type Output = UpdateConnectionOutput;

    fn metadata(&self) -> &'static CommandMetadata {
        &UPDATE_CONNECTION_METADATA
    }

    fn validate(
        &self,
        payload: &Self::Payload,
        store: &GraphStore,
        _ctx: &CommandContext,
    ) -> Result<(), CommandError> {
        if !store.contains_connection(payload.connection_id) {
            return Err(CommandError::ConnectionNotFound(payload.connection_id));
        }
        if let Some(sources) = &payload.sources {
            check_endpoints("sources", sources, store)?;
        }
        if let Some(targets) = &payload.targets {
            check_endpoints("targets", targets, store)?;
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

        let connection = store
            .connection(payload.connection_id)
            .ok_or(CommandError::ConnectionNotFound(payload.connection_id))?;

        let patch = ConnectionPatch {
            kind: payload.kind,
            sources: payload.sources,
            targets: payload.targets,
        };
        let previous_state = patch.snapshot_of(connection);
        store.update_connection(payload.connection_id, &patch);

        let effects = vec![
            Effect::success("Connection updated"),
            Effect::animation(payload.connection_id.to_string(), AnimationKind::Pulse),
        ];

        Ok(CommandOutput::new(
            UpdateConnectionOutput {
                connection_id: payload.connection_id,
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
        if !store.contains_connection(data.connection_id) {
            return Err(CommandError::ConnectionNotFound(data.connection_id));
        }
        store.update_connection(data.connection_id, &data.previous_state);

        let effects = vec![
            Effect::success("Connection update undone"),
            Effect::animation(data.connection_id.to_string(), AnimationKind::Pulse),
        ];
        Ok(CommandOutput::new((), effects))
    }
}

// ---------------------------------------------------------------------------
// graph.connection.delete
// ---------------------------------------------------------------------------

/// Payload for [`DeleteConnection`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeleteConnectionPayload {
    pub connection_id: ConnectionId,
}

/// Result data of [`DeleteConnection`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteConnectionOutput {
    /// The connection as it was at deletion, id included
    pub deleted_connection: Connection,
    /// The connection's position in the store's insertion order
    pub connection_index: usize,
}

/// `graph.connection.delete` — remove a single connection
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteConnection;

static DELETE_CONNECTION_METADATA: CommandMetadata = CommandMetadata {
    id: "graph.connection.delete",
    name: "Delete Connection",
    description: "Remove a connection from the graph",
    category: "connection",
    undoable: true,
    mutates_graph: true,
};

#[async_trait]
impl Command for DeleteConnection {
    type Payload = DeleteConnectionPayload;
    type Output = DeleteConnectionOutput;

    fn metadata(&self) -> &'static CommandMetadata {
        &DELETE_CONNECTION_METADATA
    }

    fn validate(
        &self,
        payload: &Self::Payload,
        store: &GraphStore,
        _ctx: &CommandContext,
    ) -> Result<(), CommandError> {
        if !store.contains_connection(payload.connection_id) {
            return Err(CommandError::ConnectionNotFound(payload.connection_id));
        }
        Ok(())
    }

    async fn execute(
        &self,
        payload: Self::Payload,
        store: &mut GraphStore,
        _ctx: &CommandContext,
    ) -> CommandResult<Self::Output> {
        let deleted_connection = store
            .connection(payload.connection_id)
            .cloned()
            .ok_or(CommandError::ConnectionNotFound(payload.connection_id))?;
        let connection_index = store
            .connection_index(payload.connection_id)
            .ok_or(CommandError::ConnectionNotFound(payload.connection_id))?;

        store.remove_connection(payload.connection_id);

        let effects = vec![
            Effect::success("Connection deleted"),
            Effect::animation(payload.connection_id.to_string(), AnimationKind::FadeOut),
        ];

        Ok(CommandOutput::new(
            DeleteConnectionOutput {
                deleted_connection,
                connection_index,
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
        store.restore_connection(data.deleted_connection.clone(), data.connection_index);

        let effects = vec![
            Effect::success("Connection restored"),
            Effect::animation(
                data.deleted_connection.id.to_string(),
                AnimationKind::DrawLine,
            ),
        ];
        Ok(CommandOutput::new((), effects))
    }
}
