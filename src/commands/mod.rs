//! The command contract
//!
//! Every graph mutation is a command: a unit that validates its payload,
//! executes against the store, returns effect descriptors, and knows how to
//! reverse itself from its own recorded result. Commands are policy; the
//! [`GraphStore`](crate::store::GraphStore) is mechanism.
//!
//! Failures never escape as panics. `validate` and `execute` return
//! structured [`CommandError`] values, and `execute` defensively re-checks
//! existence even though well-behaved callers validate first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::effects::Effect;
use crate::identifiers::{ConnectionId, NodeId};
use crate::model::{Node, NodeKind};
use crate::store::GraphStore;

pub mod answer;
pub mod connection;
pub mod node;
pub mod question;

pub use answer::{
    LinkAnswer, LinkAnswerOutput, LinkAnswerPayload, UnlinkAnswer, UnlinkAnswerOutput,
    UnlinkAnswerPayload,
};
pub use connection::{
    CreateConnection, CreateConnectionOutput, CreateConnectionPayload, DeleteConnection,
    DeleteConnectionOutput, DeleteConnectionPayload, UpdateConnection, UpdateConnectionOutput,
    UpdateConnectionPayload,
};
pub use node::{
    CreateNode, CreateNodeOutput, CreateNodePayload, DeleteNode, DeleteNodeOutput,
    DeleteNodePayload, UpdateNode, UpdateNodeOutput, UpdateNodePayload,
};
pub use question::{ToggleQuestionState, ToggleQuestionStateOutput, ToggleQuestionStatePayload};

/// Maximum raw length of a node's statement text. Checked against the input
/// before trimming, so surrounding whitespace counts toward the limit.
pub const MAX_STATEMENT_LEN: usize = 500;

/// Maximum raw length of a node's details text
pub const MAX_DETAILS_LEN: usize = 2000;

/// Result type for command execution and undo
pub type CommandResult<T> = Result<CommandOutput<T>, CommandError>;

/// Successful command outcome: result data plus side effects for the caller
/// to dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutput<T> {
    /// Command-specific result data, recorded by the history coordinator
    /// and handed back to `undo`
    pub data: T,
    /// Side effects (toasts, animations) requested by the command
    pub effects: Vec<Effect>,
}

impl<T> CommandOutput<T> {
    /// Build an output from data and effects
    pub fn new(data: T, effects: Vec<Effect>) -> Self {
        Self { data, effects }
    }
}

/// Errors that can occur during command validation, execution, or undo
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum CommandError {
    /// The payload failed validation; no mutation was attempted
    #[error("{message}")]
    Validation {
        /// User-facing summary of what is wrong
        message: String,
        /// Per-field messages, keyed by payload field name
        field_errors: BTreeMap<String, String>,
    },
    /// A referenced node does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    /// A referenced connection does not exist
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),
    /// The operation requires a question node but got a statement
    #[error("Node {0} is not a question")]
    NotAQuestion(NodeId),
    /// A detectable inconsistency in the graph, surfaced rather than
    /// silently repaired
    #[error("Integrity violation: {0}")]
    Integrity(String),
    /// `undo` was handed a result whose execution failed or carries no data
    #[error("Cannot undo: invalid result data")]
    InvalidResultData,
    /// Unexpected failure during execution
    #[error("{0}")]
    Execution(String),
}

impl CommandError {
    /// A validation error with a single field message
    pub fn validation_field(
        message: impl Into<String>,
        field: impl Into<String>,
        field_message: impl Into<String>,
    ) -> Self {
        let mut field_errors = BTreeMap::new();
        field_errors.insert(field.into(), field_message.into());
        CommandError::Validation {
            message: message.into(),
            field_errors,
        }
    }

    /// A validation error with no per-field breakdown
    pub fn validation(message: impl Into<String>) -> Self {
        CommandError::Validation {
            message: message.into(),
            field_errors: BTreeMap::new(),
        }
    }
}

/// Cooperative cancellation flag carried in the command context.
///
/// Accepted by the contract as an extension point: commands that want
/// cancellation support poll it between steps. No shipped command currently
/// does — each runs its store mutations to completion in one turn.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    /// Create a signal in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ambient information passed to every command invocation
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// When the invocation was issued
    pub timestamp: DateTime<Utc>,
    /// Optional cooperative cancellation signal
    pub signal: Option<CancelSignal>,
    /// Caller-supplied metadata, carried through to history entries
    pub metadata: HashMap<String, serde_json::Value>,
}

impl CommandContext {
    /// A context stamped with the current time
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            signal: None,
            metadata: HashMap::new(),
        }
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::now()
    }
}

/// Static description of a command, used for history logging and
/// notification-preset lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandMetadata {
    /// Globally unique command id, e.g. `graph.node.create`
    pub id: &'static str,
    /// Short human-readable name
    pub name: &'static str,
    /// What the command does
    pub description: &'static str,
    /// Grouping for UI surfaces (e.g. "node", "connection", "answer")
    pub category: &'static str,
    /// Whether the command supports undo
    pub undoable: bool,
    /// Whether executing the command mutates the graph
    pub mutates_graph: bool,
}

/// A validated, executable, undoable unit of graph mutation.
///
/// `validate` is pure and must agree with `execute`: no command may accept a
/// payload in `validate` and then fail in `execute` for a validation-covered
/// reason. Execution is serialized per graph by the caller; the `async`
/// signatures exist for interface uniformity (a future network-backed
/// store), not because current work suspends.
#[async_trait]
pub trait Command: Send + Sync {
    /// Input accepted by the command
    type Payload: Send + Sync;
    /// Result data recorded for undo
    type Output: Send + Sync;

    /// Static metadata for this command
    fn metadata(&self) -> &'static CommandMetadata;

    /// Check the payload against the current graph without mutating anything
    fn validate(
        &self,
        payload: &Self::Payload,
        store: &GraphStore,
        ctx: &CommandContext,
    ) -> Result<(), CommandError>;

    /// Apply the mutation and return result data plus effects
    async fn execute(
        &self,
        payload: Self::Payload,
        store: &mut GraphStore,
        ctx: &CommandContext,
    ) -> CommandResult<Self::Output>;

    /// Reverse a previously successful execution.
    ///
    /// Must reject a failed result with [`CommandError::InvalidResultData`]
    /// before touching the store.
    async fn undo(
        &self,
        result: &CommandResult<Self::Output>,
        store: &mut GraphStore,
        ctx: &CommandContext,
    ) -> CommandResult<()>;
}

/// Extract the recorded data from a result handed to `undo`, rejecting
/// failed executions
pub(crate) fn undoable_data<T>(result: &CommandResult<T>) -> Result<&T, CommandError> {
    match result {
        Ok(output) => Ok(&output.data),
        Err(_) => Err(CommandError::InvalidResultData),
    }
}

/// Look up a node and require it to be a question. Shared by the question
/// and answer commands.
pub(crate) fn require_question(store: &GraphStore, id: NodeId) -> Result<&Node, CommandError> {
    let node = store.node(id).ok_or(CommandError::NodeNotFound(id))?;
    if node.kind != NodeKind::Question {
        return Err(CommandError::NotAQuestion(id));
    }
    Ok(node)
}
