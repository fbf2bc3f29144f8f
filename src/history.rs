//! History coordinator
//!
//! Sequences command execution against one store and keeps the undo/redo
//! log. Each entry records the command id, the payload as issued, and the
//! execution output — enough to replay the inverse later. Only successful
//! executions are recorded; a failed execution is returned to the caller
//! and leaves the log untouched.
//!
//! Commands are expected to be awaited one at a time per graph; the
//! coordinator itself takes `&mut self` and `&mut GraphStore`, so the
//! borrow checker enforces the single-writer contract within one process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::commands::{
    Command, CommandContext, CommandError, CommandMetadata, CommandOutput, CommandResult,
    CreateConnection, CreateConnectionOutput, CreateConnectionPayload, CreateNode,
    CreateNodeOutput, CreateNodePayload, DeleteConnection, DeleteConnectionOutput,
    DeleteConnectionPayload, DeleteNode, DeleteNodeOutput, DeleteNodePayload, LinkAnswer,
    LinkAnswerOutput, LinkAnswerPayload, ToggleQuestionState, ToggleQuestionStateOutput,
    ToggleQuestionStatePayload, UnlinkAnswer, UnlinkAnswerOutput, UnlinkAnswerPayload,
    UpdateConnection, UpdateConnectionOutput, UpdateConnectionPayload, UpdateNode,
    UpdateNodeOutput, UpdateNodePayload,
};
use crate::store::GraphStore;

/// Default cap on retained history entries
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// A graph mutation request, one variant per command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum GraphCommand {
    CreateNode(CreateNodePayload),
    UpdateNode(UpdateNodePayload),
    DeleteNode(DeleteNodePayload),
    CreateConnection(CreateConnectionPayload),
    UpdateConnection(UpdateConnectionPayload),
    DeleteConnection(DeleteConnectionPayload),
    ToggleQuestionState(ToggleQuestionStatePayload),
    LinkAnswer(LinkAnswerPayload),
    UnlinkAnswer(UnlinkAnswerPayload),
}

impl GraphCommand {
    /// Metadata of the command this request maps to
    pub fn metadata(&self) -> &'static CommandMetadata {
        match self {
            GraphCommand::CreateNode(_) => CreateNode.metadata(),
            GraphCommand::UpdateNode(_) => UpdateNode.metadata(),
            GraphCommand::DeleteNode(_) => DeleteNode.metadata(),
            GraphCommand::CreateConnection(_) => CreateConnection.metadata(),
            GraphCommand::UpdateConnection(_) => UpdateConnection.metadata(),
            GraphCommand::DeleteConnection(_) => DeleteConnection.metadata(),
            GraphCommand::ToggleQuestionState(_) => ToggleQuestionState.metadata(),
            GraphCommand::LinkAnswer(_) => LinkAnswer.metadata(),
            GraphCommand::UnlinkAnswer(_) => UnlinkAnswer.metadata(),
        }
    }

    /// Validate the request against the current graph without mutating it
    pub fn validate(&self, store: &GraphStore, ctx: &CommandContext) -> Result<(), CommandError> {
        match self {
            GraphCommand::CreateNode(p) => CreateNode.validate(p, store, ctx),
            GraphCommand::UpdateNode(p) => UpdateNode.validate(p, store, ctx),
            GraphCommand::DeleteNode(p) => DeleteNode.validate(p, store, ctx),
            GraphCommand::CreateConnection(p) => CreateConnection.validate(p, store, ctx),
            GraphCommand::UpdateConnection(p) => UpdateConnection.validate(p, store, ctx),
            GraphCommand::DeleteConnection(p) => DeleteConnection.validate(p, store, ctx),
            GraphCommand::ToggleQuestionState(p) => ToggleQuestionState.validate(p, store, ctx),
            GraphCommand::LinkAnswer(p) => LinkAnswer.validate(p, store, ctx),
            GraphCommand::UnlinkAnswer(p) => UnlinkAnswer.validate(p, store, ctx),
        }
    }
}

/// Typed result data of a dispatched command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum GraphCommandData {
    CreateNode(CreateNodeOutput),
    UpdateNode(UpdateNodeOutput),
    DeleteNode(DeleteNodeOutput),
    CreateConnection(CreateConnectionOutput),
    UpdateConnection(UpdateConnectionOutput),
    DeleteConnection(DeleteConnectionOutput),
    ToggleQuestionState(ToggleQuestionStateOutput),
    LinkAnswer(LinkAnswerOutput),
    UnlinkAnswer(UnlinkAnswerOutput),
}

/// Recorded (payload, output) pair for one executed command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum CommandRecord {
    CreateNode {
        payload: CreateNodePayload,
        output: CommandOutput<CreateNodeOutput>,
    },
    UpdateNode {
        payload: UpdateNodePayload,
        output: CommandOutput<UpdateNodeOutput>,
    },
    DeleteNode {
        payload: DeleteNodePayload,
        output: CommandOutput<DeleteNodeOutput>,
    },
    CreateConnection {
        payload: CreateConnectionPayload,
        output: CommandOutput<CreateConnectionOutput>,
    },
    UpdateConnection {
        payload: UpdateConnectionPayload,
        output: CommandOutput<UpdateConnectionOutput>,
    },
    DeleteConnection {
        payload: DeleteConnectionPayload,
        output: CommandOutput<DeleteConnectionOutput>,
    },
    ToggleQuestionState {
        payload: ToggleQuestionStatePayload,
        output: CommandOutput<ToggleQuestionStateOutput>,
    },
    LinkAnswer {
        payload: LinkAnswerPayload,
        output: CommandOutput<LinkAnswerOutput>,
    },
    UnlinkAnswer {
        payload: UnlinkAnswerPayload,
        output: CommandOutput<UnlinkAnswerOutput>,
    },
}

impl CommandRecord {
    fn metadata(&self) -> &'static CommandMetadata {
        match self {
            CommandRecord::CreateNode { .. } => CreateNode.metadata(),
            CommandRecord::UpdateNode { .. } => UpdateNode.metadata(),
            CommandRecord::DeleteNode { .. } => DeleteNode.metadata(),
            CommandRecord::CreateConnection { .. } => CreateConnection.metadata(),
            CommandRecord::UpdateConnection { .. } => UpdateConnection.metadata(),
            CommandRecord::DeleteConnection { .. } => DeleteConnection.metadata(),
            CommandRecord::ToggleQuestionState { .. } => ToggleQuestionState.metadata(),
            CommandRecord::LinkAnswer { .. } => LinkAnswer.metadata(),
            CommandRecord::UnlinkAnswer { .. } => UnlinkAnswer.metadata(),
        }
    }
}

/// One executed command in the history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Timestamp from the execution context
    pub executed_at: DateTime<Utc>,
    record: CommandRecord,
}

impl HistoryEntry {
    /// The id of the command this entry records
    pub fn command_id(&self) -> &'static str {
        self.record.metadata().id
    }
}

/// Sequences command execution and replays undo/redo over the recorded log
#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: Vec<HistoryEntry>,
    /// Number of entries currently applied; entries beyond it are the redo
    /// tail
    cursor: usize,
    limit: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    /// History with the default entry cap
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// History retaining at most `limit` entries (oldest dropped first)
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// True when there is an applied entry to undo
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// True when there is an undone entry to redo
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Number of recorded entries, applied and undone
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The recorded entries, oldest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    fn push(&mut self, entry: HistoryEntry) {
        // A new command invalidates the redo tail.
        self.entries.truncate(self.cursor);
        self.entries.push(entry);
        if self.entries.len() > self.limit {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len();
    }

    /// Validate and execute a command, recording it on success
    pub async fn execute(
        &mut self,
        command: GraphCommand,
        store: &mut GraphStore,
        ctx: &CommandContext,
    ) -> CommandResult<GraphCommandData> {
        let command_id = command.metadata().id;
        if let Err(error) = command.validate(store, ctx) {
            warn!(command = command_id, %error, "command rejected");
            return Err(error);
        }

        let result = self.run(command, store, ctx).await;
        match &result {
            Ok(_) => info!(command = command_id, "command executed"),
            Err(error) => warn!(command = command_id, %error, "command failed"),
        }
        result
    }

    async fn run(
        &mut self,
        command: GraphCommand,
        store: &mut GraphStore,
        ctx: &CommandContext,
    ) -> CommandResult<GraphCommandData> {
        match command {
            GraphCommand::CreateNode(payload) => {
                let output = CreateNode.execute(payload.clone(), store, ctx).await?;
                let summary =
                    CommandOutput::new(GraphCommandData::CreateNode(output.data.clone()), output.effects.clone());
                self.push(HistoryEntry {
                    executed_at: ctx.timestamp,
                    record: CommandRecord::CreateNode { payload, output },
                });
                Ok(summary)
            }
            GraphCommand::UpdateNode(payload) => {
                let output = UpdateNode.execute(payload.clone(), store, ctx).await?;
                let summary =
                    CommandOutput::new(GraphCommandData::UpdateNode(output.data.clone()), output.effects.clone());
                self.push(HistoryEntry {
                    executed_at: ctx.timestamp,
                    record: CommandRecord::UpdateNode { payload, output },
                });
                Ok(summary)
            }
            GraphCommand::DeleteNode(payload) => {
                let output = DeleteNode.execute(payload, store, ctx).await?;
                let summary =
                    CommandOutput::new(GraphCommandData::DeleteNode(output.data.clone()), output.effects.clone());
                self.push(HistoryEntry {
                    executed_at: ctx.timestamp,
                    record: CommandRecord::DeleteNode { payload, output },
                });
                Ok(summary)
            }
            GraphCommand::CreateConnection(payload) => {
                let output = CreateConnection.execute(payload.clone(), store, ctx).await?;
                let summary = CommandOutput::new(
                    GraphCommandData::CreateConnection(output.data.clone()),
                    output.effects.clone(),
                );
                self.push(HistoryEntry {
                    executed_at: ctx.timestamp,
                    record: CommandRecord::CreateConnection { payload, output },
                });
                Ok(summary)
            }
            GraphCommand::UpdateConnection(payload) => {
                let output = UpdateConnection.execute(payload.clone(), store, ctx).await?;
                let summary = CommandOutput::new(
                    GraphCommandData::UpdateConnection(output.data.clone()),
                    output.effects.clone(),
                );
                self.push(HistoryEntry {
                    executed_at: ctx.timestamp,
                    record: CommandRecord::UpdateConnection { payload, output },
                });
                Ok(summary)
            }
            GraphCommand::DeleteConnection(payload) => {
                let output = DeleteConnection.execute(payload, store, ctx).await?;
                let summary = CommandOutput::new(
                    GraphCommandData::DeleteConnection(output.data.clone()),
                    output.effects.clone(),
                );
                self.push(HistoryEntry {
                    executed_at: ctx.timestamp,
                    record: CommandRecord::DeleteConnection { payload, output },
                });
                Ok(summary)
            }
            GraphCommand::ToggleQuestionState(payload) => {
                let output = ToggleQuestionState.execute(payload, store, ctx).await?;
                let summary = CommandOutput::new(
                    GraphCommandData::ToggleQuestionState(output.data),
                    output.effects.clone(),
                );
                self.push(HistoryEntry {
                    executed_at: ctx.timestamp,
                    record: CommandRecord::ToggleQuestionState { payload, output },
                });
                Ok(summary)
            }
            GraphCommand::LinkAnswer(payload) => {
                let output = LinkAnswer.execute(payload, store, ctx).await?;
                let summary =
                    CommandOutput::new(GraphCommandData::LinkAnswer(output.data), output.effects.clone());
                self.push(HistoryEntry {
                    executed_at: ctx.timestamp,
                    record: CommandRecord::LinkAnswer { payload, output },
                });
                Ok(summary)
            }
            GraphCommand::UnlinkAnswer(payload) => {
                let output = UnlinkAnswer.execute(payload, store, ctx).await?;
                let summary =
                    CommandOutput::new(GraphCommandData::UnlinkAnswer(output.data), output.effects.clone());
                self.push(HistoryEntry {
                    executed_at: ctx.timestamp,
                    record: CommandRecord::UnlinkAnswer { payload, output },
                });
                Ok(summary)
            }
        }
    }

    /// Undo the most recent applied entry by replaying the matching
    /// command's inverse
    pub async fn undo(
        &mut self,
        store: &mut GraphStore,
        ctx: &CommandContext,
    ) -> CommandResult<()> {
        if !self.can_undo() {
            return Err(CommandError::Execution("Nothing to undo".to_string()));
        }
        let entry = &self.entries[self.cursor - 1];
        let command_id = entry.command_id();

        let result = match &entry.record {
            CommandRecord::CreateNode { output, .. } => {
                CreateNode.undo(&Ok(output.clone()), store, ctx).await
            }
            CommandRecord::UpdateNode { output, .. } => {
                UpdateNode.undo(&Ok(output.clone()), store, ctx).await
            }
            CommandRecord::DeleteNode { output, .. } => {
                DeleteNode.undo(&Ok(output.clone()), store, ctx).await
            }
            CommandRecord::CreateConnection { output, .. } => {
                CreateConnection.undo(&Ok(output.clone()), store, ctx).await
            }
            CommandRecord::UpdateConnection { output, .. } => {
                UpdateConnection.undo(&Ok(output.clone()), store, ctx).await
            }
            CommandRecord::DeleteConnection { output, .. } => {
                DeleteConnection.undo(&Ok(output.clone()), store, ctx).await
            }
            CommandRecord::ToggleQuestionState { output, .. } => {
                ToggleQuestionState.undo(&Ok(output.clone()), store, ctx).await
            }
            CommandRecord::LinkAnswer { output, .. } => {
                LinkAnswer.undo(&Ok(output.clone()), store, ctx).await
            }
            CommandRecord::UnlinkAnswer { output, .. } => {
                UnlinkAnswer.undo(&Ok(output.clone()), store, ctx).await
            }
        };

        match &result {
            Ok(_) => {
                self.cursor -= 1;
                info!(command = command_id, "command undone");
            }
            Err(error) => warn!(command = command_id, %error, "undo failed"),
        }
        result
    }

    /// Re-execute the most recently undone entry's payload.
    ///
    /// Store-generated ids come out fresh on redo, so the entry's recorded
    /// output is replaced; a later undo then targets the new entities.
    pub async fn redo(
        &mut self,
        store: &mut GraphStore,
        ctx: &CommandContext,
    ) -> CommandResult<GraphCommandData> {
        if !self.can_redo() {
            return Err(CommandError::Execution("Nothing to redo".to_string()));
        }
        // Detach the redo tail; the first entry is replayed and re-recorded,
        // the rest are put back for subsequent redos.
        let mut tail = self.entries.split_off(self.cursor);
        let stale = tail.remove(0);
        let command = match &stale.record {
            CommandRecord::CreateNode { payload, .. } => GraphCommand::CreateNode(payload.clone()),
            CommandRecord::UpdateNode { payload, .. } => GraphCommand::UpdateNode(payload.clone()),
            CommandRecord::DeleteNode { payload, .. } => GraphCommand::DeleteNode(*payload),
            CommandRecord::CreateConnection { payload, .. } => {
                GraphCommand::CreateConnection(payload.clone())
            }
            CommandRecord::UpdateConnection { payload, .. } => {
                GraphCommand::UpdateConnection(payload.clone())
            }
            CommandRecord::DeleteConnection { payload, .. } => {
                GraphCommand::DeleteConnection(*payload)
            }
            CommandRecord::ToggleQuestionState { payload, .. } => {
                GraphCommand::ToggleQuestionState(*payload)
            }
            CommandRecord::LinkAnswer { payload, .. } => GraphCommand::LinkAnswer(*payload),
            CommandRecord::UnlinkAnswer { payload, .. } => GraphCommand::UnlinkAnswer(*payload),
        };

        let command_id = command.metadata().id;
        let result = match command.validate(store, ctx) {
            Ok(()) => self.run(command, store, ctx).await,
            Err(error) => Err(error),
        };
        match &result {
            Ok(_) => {
                info!(command = command_id, "command redone");
                // run() recorded a fresh entry in place of the stale one.
                self.entries.append(&mut tail);
            }
            Err(error) => {
                warn!(command = command_id, %error, "redo failed");
                self.entries.push(stale);
                self.entries.append(&mut tail);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeKind, QuestionState};

    fn ctx() -> CommandContext {
        CommandContext::now()
    }

    fn create_payload(statement: &str) -> GraphCommand {
        GraphCommand::CreateNode(CreateNodePayload {
            statement: statement.to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_execute_records_entry() {
        let mut history = CommandHistory::new();
        let mut store = GraphStore::new();

        let result = history
            .execute(create_payload("A"), &mut store, &ctx())
            .await
            .unwrap();

        assert_eq!(history.len(), 1);
        assert!(history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.entries()[0].command_id(), "graph.node.create");
        match result.data {
            GraphCommandData::CreateNode(data) => {
                assert!(store.contains_node(data.node_id));
            }
            _ => panic!("Expected create node data"),
        }
    }

    #[tokio::test]
    async fn test_failed_execution_is_not_recorded() {
        let mut history = CommandHistory::new();
        let mut store = GraphStore::new();

        let result = history
            .execute(create_payload(""), &mut store, &ctx())
            .await;

        assert!(result.is_err());
        assert!(history.is_empty());
        assert_eq!(store.node_count(), 0);
    }

    #[tokio::test]
    async fn test_undo_redo_round_trip() {
        let mut history = CommandHistory::new();
        let mut store = GraphStore::new();

        history
            .execute(create_payload("A"), &mut store, &ctx())
            .await
            .unwrap();
        assert_eq!(store.node_count(), 1);

        history.undo(&mut store, &ctx()).await.unwrap();
        assert_eq!(store.node_count(), 0);
        assert!(history.can_redo());

        history.redo(&mut store, &ctx()).await.unwrap();
        assert_eq!(store.node_count(), 1);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[tokio::test]
    async fn test_redo_after_undo_targets_fresh_ids() {
        let mut history = CommandHistory::new();
        let mut store = GraphStore::new();

        let first = history
            .execute(create_payload("A"), &mut store, &ctx())
            .await
            .unwrap();
        let first_id = match first.data {
            GraphCommandData::CreateNode(data) => data.node_id,
            _ => panic!("Expected create node data"),
        };

        history.undo(&mut store, &ctx()).await.unwrap();
        let redone = history.redo(&mut store, &ctx()).await.unwrap();
        let second_id = match redone.data {
            GraphCommandData::CreateNode(data) => data.node_id,
            _ => panic!("Expected create node data"),
        };

        assert_ne!(first_id, second_id);

        // Undo after redo removes the fresh node, not the stale id.
        history.undo(&mut store, &ctx()).await.unwrap();
        assert_eq!(store.node_count(), 0);
    }

    #[tokio::test]
    async fn test_new_command_truncates_redo_tail() {
        let mut history = CommandHistory::new();
        let mut store = GraphStore::new();

        history
            .execute(create_payload("A"), &mut store, &ctx())
            .await
            .unwrap();
        history
            .execute(create_payload("B"), &mut store, &ctx())
            .await
            .unwrap();
        history.undo(&mut store, &ctx()).await.unwrap();
        assert!(history.can_redo());

        history
            .execute(create_payload("C"), &mut store, &ctx())
            .await
            .unwrap();

        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_entry_limit_drops_oldest() {
        let mut history = CommandHistory::with_limit(2);
        let mut store = GraphStore::new();

        for statement in ["A", "B", "C"] {
            history
                .execute(create_payload(statement), &mut store, &ctx())
                .await
                .unwrap();
        }

        assert_eq!(history.len(), 2);
        assert_eq!(store.node_count(), 3);
    }

    #[tokio::test]
    async fn test_undo_empty_history_fails() {
        let mut history = CommandHistory::new();
        let mut store = GraphStore::new();

        let error = history.undo(&mut store, &ctx()).await.unwrap_err();
        assert_eq!(error.to_string(), "Nothing to undo");
    }

    #[tokio::test]
    async fn test_toggle_through_history() {
        let mut history = CommandHistory::new();
        let mut store = GraphStore::new();

        let created = history
            .execute(
                GraphCommand::CreateNode(CreateNodePayload {
                    statement: "Is it raining?".to_string(),
                    kind: Some(NodeKind::Question),
                    ..Default::default()
                }),
                &mut store,
                &ctx(),
            )
            .await
            .unwrap();
        let question_id = match created.data {
            GraphCommandData::CreateNode(data) => data.node_id,
            _ => panic!("Expected create node data"),
        };

        history
            .execute(
                GraphCommand::ToggleQuestionState(ToggleQuestionStatePayload {
                    question_id,
                    target_state: None,
                }),
                &mut store,
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(
            store.node(question_id).unwrap().question_state,
            Some(QuestionState::Resolved)
        );

        history.undo(&mut store, &ctx()).await.unwrap();
        let node = store.node(question_id).unwrap();
        assert_eq!(node.question_state, Some(QuestionState::Active));
        assert!(node.manual_state_override);
    }
}
