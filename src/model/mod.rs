//! Graph model types
//!
//! Nodes (statements and questions), connections (typed edges), and the
//! partial shapes used to create and update them. These are data carriers:
//! all policy (validation, invariants) lives in the command layer, and all
//! mutation goes through the [`GraphStore`](crate::store::GraphStore).

use serde::{Deserialize, Serialize};

use crate::identifiers::{ConnectionId, NodeId};

/// Serde support for doubly optional patch fields.
///
/// A plain `Option<Option<T>>` loses the distinction on the way back in: an
/// explicit `null` deserializes to outer `None` ("leave alone") instead of
/// `Some(None)` ("clear"), so a recorded clear would be dropped when a
/// serialized patch or history entry is rehydrated. Paired with
/// `#[serde(default, skip_serializing_if = "Option::is_none")]`, this maps
/// absent → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Whether a node is a statement or a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An assertion that can be argued for or against
    #[default]
    Statement,
    /// An open question that can be answered
    Question,
}

impl NodeKind {
    /// Get the string representation of the node kind
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Statement => "statement",
            NodeKind::Question => "question",
        }
    }
}

/// Lifecycle state of a question node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionState {
    /// The question is still open
    #[default]
    Active,
    /// The question has been resolved
    Resolved,
}

impl QuestionState {
    /// The logical flip used by the toggle command: Active ⇄ Resolved
    pub fn flipped(&self) -> Self {
        match self {
            QuestionState::Active => QuestionState::Resolved,
            QuestionState::Resolved => QuestionState::Active,
        }
    }

    /// Get the string representation of the question state
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionState::Active => "active",
            QuestionState::Resolved => "resolved",
        }
    }
}

/// Lifecycle state of a statement node, set only when explicitly supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementState {
    /// The statement is under active debate
    Debated,
    /// The statement is considered settled
    Settled,
}

impl StatementState {
    /// Get the string representation of the statement state
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementState::Debated => "debated",
            StatementState::Settled => "settled",
        }
    }
}

/// The type of a connection between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Sources imply the targets
    Implication,
    /// Sources contradict the targets
    Contradiction,
    /// Source is the accepted answer to the target question
    Answer,
}

impl ConnectionType {
    /// Get the string representation of the connection type
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Implication => "implication",
            ConnectionType::Contradiction => "contradiction",
            ConnectionType::Answer => "answer",
        }
    }
}

/// Force-simulation fields owned by the rendering collaborator.
///
/// The command core never reads or writes these; it only preserves them
/// verbatim when a node is snapshotted for undo, so that restoring a deleted
/// node does not teleport it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// A statement or question vertex in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, assigned by the store, immutable once created
    pub id: NodeId,
    /// The statement text, trimmed, 1–500 characters
    pub statement: String,
    /// Optional supporting details, trimmed, up to 2000 characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Statement or question
    #[serde(default)]
    pub kind: NodeKind,
    /// Present only on question nodes; defaults to Active at creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_state: Option<QuestionState>,
    /// Present only on statement nodes, and only when explicitly set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_state: Option<StatementState>,
    /// The accepted answer for a question node; at most one at any time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_by: Option<NodeId>,
    /// Once true, automatic state management must not overwrite
    /// `question_state`. Latched by the toggle command, never cleared by it.
    #[serde(default)]
    pub manual_state_override: bool,
    /// Renderer-owned simulation fields, preserved verbatim across undo
    #[serde(flatten)]
    pub layout: LayoutState,
}

/// Node shape accepted by [`GraphStore::add_node`](crate::store::GraphStore::add_node)
/// before an id has been assigned
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeDraft {
    /// The statement text (the create command trims it before building a draft)
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_state: Option<QuestionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_state: Option<StatementState>,
}

/// A partial node update.
///
/// Outer `None` means "leave the field alone"; inner `None` on the doubly
/// optional fields means "clear it". The update command captures its undo
/// snapshot in this same shape, keyed to exactly the fields being changed,
/// so undo is a partial merge rather than a whole-node replace.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option::deserialize"
    )]
    pub details: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option::deserialize"
    )]
    pub question_state: Option<Option<QuestionState>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option::deserialize"
    )]
    pub statement_state: Option<Option<StatementState>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option::deserialize"
    )]
    pub answered_by: Option<Option<NodeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_state_override: Option<bool>,
}

impl NodePatch {
    /// True when the patch names no fields at all
    pub fn is_empty(&self) -> bool {
        self.statement.is_none()
            && self.details.is_none()
            && self.kind.is_none()
            && self.question_state.is_none()
            && self.statement_state.is_none()
            && self.answered_by.is_none()
            && self.manual_state_override.is_none()
    }

    /// Apply the named fields to a node, leaving the rest untouched
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(statement) = &self.statement {
            node.statement = statement.clone();
        }
        if let Some(details) = &self.details {
            node.details = details.clone();
        }
        if let Some(kind) = self.kind {
            node.kind = kind;
        }
        if let Some(question_state) = self.question_state {
            node.question_state = question_state;
        }
        if let Some(statement_state) = self.statement_state {
            node.statement_state = statement_state;
        }
        if let Some(answered_by) = self.answered_by {
            node.answered_by = answered_by;
        }
        if let Some(manual_state_override) = self.manual_state_override {
            node.manual_state_override = manual_state_override;
        }
    }

    /// Capture the prior values of exactly the fields this patch names,
    /// as a patch that reverses `apply_to`
    pub fn snapshot_of(&self, node: &Node) -> NodePatch {
        NodePatch {
            statement: self.statement.as_ref().map(|_| node.statement.clone()),
            details: self.details.as_ref().map(|_| node.details.clone()),
            kind: self.kind.map(|_| node.kind),
            question_state: self.question_state.map(|_| node.question_state),
            statement_state: self.statement_state.map(|_| node.statement_state),
            answered_by: self.answered_by.map(|_| node.answered_by),
            manual_state_override: self.manual_state_override.map(|_| node.manual_state_override),
        }
    }
}

/// A typed, possibly multi-source/multi-target edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier, assigned by the store when absent on input
    pub id: ConnectionId,
    /// Implication, contradiction, or answer
    pub kind: ConnectionType,
    /// Ordered, non-empty source node ids
    pub sources: Vec<NodeId>,
    /// Ordered, non-empty target node ids
    pub targets: Vec<NodeId>,
}

impl Connection {
    /// True when the node appears anywhere in sources or targets
    pub fn touches(&self, node_id: NodeId) -> bool {
        self.sources.contains(&node_id) || self.targets.contains(&node_id)
    }
}

/// Connection shape accepted by
/// [`GraphStore::add_connection`](crate::store::GraphStore::add_connection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDraft {
    /// Caller-supplied id; generated when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ConnectionId>,
    pub kind: ConnectionType,
    pub sources: Vec<NodeId>,
    pub targets: Vec<NodeId>,
}

/// A partial connection update, mirroring [`NodePatch`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ConnectionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<NodeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<NodeId>>,
}

impl ConnectionPatch {
    /// True when the patch names no fields at all
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.sources.is_none() && self.targets.is_none()
    }

    /// Apply the named fields to a connection
    pub fn apply_to(&self, connection: &mut Connection) {
        if let Some(kind) = self.kind {
            connection.kind = kind;
        }
        if let Some(sources) = &self.sources {
            connection.sources = sources.clone();
        }
        if let Some(targets) = &self.targets {
            connection.targets = targets.clone();
        }
    }

    /// Capture the prior values of exactly the fields this patch names
    pub fn snapshot_of(&self, connection: &Connection) -> ConnectionPatch {
        ConnectionPatch {
            kind: self.kind.map(|_| connection.kind),
            sources: self.sources.as_ref().map(|_| connection.sources.clone()),
            targets: self.targets.as_ref().map(|_| connection.targets.clone()),
        }
    }
}
