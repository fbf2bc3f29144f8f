//! Question state toggle
//!
//! Toggling writes the new state and latches `manual_state_override` so the
//! automatic state-management layer keeps its hands off afterwards. The
//! latch is one-way: undo restores the previous state value but re-asserts
//! the override rather than reverting it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::commands::{
    require_question, undoable_data, Command, CommandContext, CommandError, CommandMetadata,
    CommandOutput, CommandResult,
};
use crate::effects::{AnimationKind, Effect};
use crate::identifiers::NodeId;
use crate::model::{NodePatch, QuestionState};
use crate::store::GraphStore;

/// Payload for [`ToggleQuestionState`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToggleQuestionStatePayload {
    pub question_id: NodeId,
    /// Explicit state to set; when absent the current state is flipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_state: Option<QuestionState>,
}

/// Result data of [`ToggleQuestionState`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToggleQuestionStateOutput {
    pub question_id: NodeId,
    /// State before the toggle (read as Active when it was unset)
    pub previous_state: QuestionState,
    /// State after the toggle
    pub new_state: QuestionState,
}

/// `graph.question.toggle_state` — flip or set a question's state
#[derive(Debug, Clone, Copy, Default)]
pub struct ToggleQuestionState;

static TOGGLE_QUESTION_STATE_METADATA: CommandMetadata = CommandMetadata {
    id: "graph.question.toggle_state",
    name: "Toggle Question State",
    description: "Mark a question active or resolved",
    category: "question",
    undoable: true,
    mutates_graph: true,
};

#[async_trait]
impl Command for ToggleQuestionState {
    type Payload = ToggleQuestionStatePayload;
    type Output = ToggleQuestionStateOutput;

    fn metadata(&self) -> &'static CommandMetadata {
        &TOGGLE_QUESTION_STATE_METADATA
    }

    fn validate(
        &self,
        payload: &Self::Payload,
        store: &GraphStore,
        _ctx: &CommandContext,
    ) -> Result<(), CommandError> {
        require_question(store, payload.question_id)?;
        Ok(())
    }

    async fn execute(
        &self,
        payload: Self::Payload,
        store: &mut GraphStore,
        _ctx: &CommandContext,
    ) -> CommandResult<Self::Output> {
        let node = require_question(store, payload.question_id)?;

        let previous_state = node.question_state.unwrap_or_default();
        let new_state = payload.target_state.unwrap_or_else(|| previous_state.flipped());

        store.update_node(
            payload.question_id,
            &NodePatch {
                question_state: Some(Some(new_state)),
                manual_state_override: Some(true),
                ..Default::default()
            },
        );

        let effects = vec![
            Effect::success(match new_state {
                QuestionState::Resolved => "Question marked resolved",
                QuestionState::Active => "Question reopened",
            }),
            Effect::animation(payload.question_id.to_string(), AnimationKind::Pulse),
        ];

        Ok(CommandOutput::new(
            ToggleQuestionStateOutput {
                question_id: payload.question_id,
                previous_state,
                new_state,
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
        require_question(store, data.question_id)?;

        // The override latch stays set even on undo; only the state value
        // is restored.
        store.update_node(
            data.question_id,
            &NodePatch {
                question_state: Some(Some(data.previous_state)),
                manual_state_override: Some(true),
                ..Default::default()
            },
        );

        let effects = vec![
            Effect::success("Question state restored"),
            Effect::animation(data.question_id.to_string(), AnimationKind::Pulse),
        ];
        Ok(CommandOutput::new((), effects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeDraft, NodeKind};

    fn ctx() -> CommandContext {
        CommandContext::now()
    }

    fn store_with_question() -> (GraphStore, NodeId) {
        let mut store = GraphStore::new();
        let node = store.add_node(NodeDraft {
            statement: "Is it raining?".to_string(),
            kind: NodeKind::Question,
            question_state: Some(QuestionState::Active),
            ..Default::default()
        });
        (store, node.id)
    }

    #[tokio::test]
    async fn test_toggle_flips_and_latches_override() {
        let (mut store, question) = store_with_question();

        let result = ToggleQuestionState
            .execute(
                ToggleQuestionStatePayload {
                    question_id: question,
                    target_state: None,
                },
                &mut store,
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(result.data.new_state, QuestionState::Resolved);
        let node = store.node(question).unwrap();
        assert_eq!(node.question_state, Some(QuestionState::Resolved));
        assert!(node.manual_state_override);
    }

    #[tokio::test]
    async fn test_double_toggle_returns_to_original() {
        let (mut store, question) = store_with_question();
        let payload = ToggleQuestionStatePayload {
            question_id: question,
            target_state: None,
        };

        ToggleQuestionState
            .execute(payload, &mut store, &ctx())
            .await
            .unwrap();
        ToggleQuestionState
            .execute(payload, &mut store, &ctx())
            .await
            .unwrap();

        let node = store.node(question).unwrap();
        assert_eq!(node.question_state, Some(QuestionState::Active));
        assert!(node.manual_state_override);
    }

    #[tokio::test]
    async fn test_explicit_target_state() {
        let (mut store, question) = store_with_question();

        let result = ToggleQuestionState
            .execute(
                ToggleQuestionStatePayload {
                    question_id: question,
                    target_state: Some(QuestionState::Active),
                },
                &mut store,
                &ctx(),
            )
            .await
            .unwrap();

        // Explicit target wins even when it matches the current state.
        assert_eq!(result.data.new_state, QuestionState::Active);
        assert!(store.node(question).unwrap().manual_state_override);
    }

    #[tokio::test]
    async fn test_unset_state_reads_as_active() {
        let mut store = GraphStore::new();
        let node = store.add_node(NodeDraft {
            statement: "Question without state".to_string(),
            kind: NodeKind::Question,
            question_state: None,
            ..Default::default()
        });

        let result = ToggleQuestionState
            .execute(
                ToggleQuestionStatePayload {
                    question_id: node.id,
                    target_state: None,
                },
                &mut store,
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(result.data.previous_state, QuestionState::Active);
        assert_eq!(result.data.new_state, QuestionState::Resolved);
    }

    #[tokio::test]
    async fn test_undo_restores_state_but_keeps_override() {
        let (mut store, question) = store_with_question();

        let result = ToggleQuestionState
            .execute(
                ToggleQuestionStatePayload {
                    question_id: question,
                    target_state: None,
                },
                &mut store,
                &ctx(),
            )
            .await;

        ToggleQuestionState
            .undo(&result, &mut store, &ctx())
            .await
            .unwrap();

        let node = store.node(question).unwrap();
        assert_eq!(node.question_state, Some(QuestionState::Active));
        // Latch is one-way: undo does not clear it.
        assert!(node.manual_state_override);
    }

    #[tokio::test]
    async fn test_rejects_statement_nodes() {
        let mut store = GraphStore::new();
        let node = store.add_node(NodeDraft {
            statement: "Not a question".to_string(),
            ..Default::default()
        });

        let payload = ToggleQuestionStatePayload {
            question_id: node.id,
            target_state: None,
        };
        let error = ToggleQuestionState
            .validate(&payload, &store, &ctx())
            .unwrap_err();
        assert!(matches!(error, CommandError::NotAQuestion(_)));

        let result = ToggleQuestionState
            .execute(payload, &mut store, &ctx())
            .await;
        assert!(result.is_err());
    }
}
