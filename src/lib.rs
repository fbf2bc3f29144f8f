//! Command execution and undo/redo core for the logic graph editor
//!
//! Every mutation to the graph — creating, updating, and deleting nodes and
//! connections, accepting answers, toggling question state — flows through a
//! command that validates its payload, applies the change to the
//! [`GraphStore`], records enough state to reverse it, and returns toast and
//! animation descriptors for the presentation layer to dispatch. The
//! [`CommandHistory`] coordinator sequences execution and replays undo/redo
//! from its recorded log.
//!
//! Rendering, animation playback, notification display, input handling, and
//! export are external collaborators: this crate owns the data-consistency
//! contract (cascade-safe deletes, exact-id restoration on undo, at most one
//! accepted answer per question) and nothing presentational.

pub mod commands;
pub mod effects;
pub mod history;
pub mod identifiers;
pub mod model;
pub mod notifications;
pub mod store;

// Re-export the model and identifiers
pub use identifiers::{ConnectionId, NodeId};
pub use model::{
    Connection, ConnectionDraft, ConnectionPatch, ConnectionType, LayoutState, Node, NodeDraft,
    NodeKind, NodePatch, QuestionState, StatementState,
};

// Re-export the store
pub use store::GraphStore;

// Re-export the command contract and commands
pub use commands::{
    CancelSignal, Command, CommandContext, CommandError, CommandMetadata, CommandOutput,
    CommandResult, CreateConnection, CreateNode, DeleteConnection, DeleteNode, LinkAnswer,
    ToggleQuestionState, UnlinkAnswer, UpdateConnection, UpdateNode,
};

// Re-export effects
pub use effects::{AnimationConfig, AnimationEffect, AnimationKind, Easing, Effect, ToastEffect, ToastKind};

// Re-export the history coordinator
pub use history::{CommandHistory, GraphCommand, GraphCommandData, HistoryEntry};
