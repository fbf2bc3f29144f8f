//! Accepted-answer commands: link and unlink
//!
//! A question carries at most one accepted answer at a time, tracked by the
//! `answered_by` pointer plus a matching Answer connection (sources =
//! [answer], targets = [question]). Linking overwrites the pointer but does
//! not remove an Answer connection to a different previous answer; callers
//! that want a clean graph must unlink first. Unlink treats a set pointer
//! with no matching connection as an integrity violation and fails rather
//! than silently repairing it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::commands::{
    require_question, undoable_data, Command, CommandContext, CommandError, CommandMetadata,
    CommandOutput, CommandResult,
};
use crate::effects::{AnimationKind, Effect};
use crate::identifiers::{ConnectionId, NodeId};
use crate::model::{Connection, ConnectionDraft, ConnectionType, NodePatch};
use crate::store::GraphStore;

/// The Answer connection for this exact (answer, question) pair, if any
fn find_answer_connection(
    store: &GraphStore,
    answer_id: NodeId,
    question_id: NodeId,
) -> Option<&Connection> {
    store.connections().find(|c| {
        c.kind == ConnectionType::Answer
            && c.sources == [answer_id]
            && c.targets == [question_id]
    })
}

// ---------------------------------------------------------------------------
// graph.answer.link
// ---------------------------------------------------------------------------

/// Payload for [`LinkAnswer`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkAnswerPayload {
    pub question_id: NodeId,
    pub answer_id: NodeId,
}

/// Result data of [`LinkAnswer`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkAnswerOutput {
    pub question_id: NodeId,
    pub answer_id: NodeId,
    /// Id of the Answer connection this command created
    pub connection_id: ConnectionId,
    /// The previously accepted answer, restored on undo (may be absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_answered_by: Option<NodeId>,
}

/// `graph.answer.link` — accept a node as the answer to a question
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkAnswer;

static LINK_ANSWER_METADATA: CommandMetadata = CommandMetadata {
    id: "graph.answer.link",
    name: "Link Answer",
    description: "Accept a node as the answer to a question",
    category: "answer",
    undoable: true,
    mutates_graph: true,
};

#[async_trait]
impl Command for LinkAnswer {
    type Payload = LinkAnswerPayload;
    type Output = LinkAnswerOutput;

    fn metadata(&self) -> &'static CommandMetadata {
        &LINK_ANSWER_METADATA
    }

    fn validate(
        &self,
        payload: &Self::Payload,
        store: &GraphStore,
        _ctx: &CommandContext,
    ) -> Result<(), CommandError> {
        require_question(store, payload.question_id)?;
        if !store.contains_node(payload.answer_id) {
            return Err(CommandError::NodeNotFound(payload.answer_id));
        }
        if find_answer_connection(store, payload.answer_id, payload.question_id).is_some() {
            return Err(CommandError::validation(
                "This answer is already linked to the question",
            ));
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

        let question = require_question(store, payload.question_id)?;
        let previous_answered_by = question.answered_by;

        // Note: an Answer connection to a different previously accepted
        // answer is left in place; only the pointer is overwritten.
        let connection = store.add_connection(ConnectionDraft {
            id: None,
            kind: ConnectionType::Answer,
            sources: vec![payload.answer_id],
            targets: vec![payload.question_id],
        });
        store.update_node(
            payload.question_id,
            &NodePatch {
                answered_by: Some(Some(payload.answer_id)),
                ..Default::default()
            },
        );

        let effects = vec![
            Effect::success("Answer accepted"),
            Effect::animation(connection.id.to_string(), AnimationKind::DrawLine),
        ];

        Ok(CommandOutput::new(
            LinkAnswerOutput {
                question_id: payload.question_id,
                answer_id: payload.answer_id,
                connection_id: connection.id,
                previous_answered_by,
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
        store.update_node(
            data.question_id,
            &NodePatch {
                answered_by: Some(data.previous_answered_by),
                ..Default::default()
            },
        );

        let effects = vec![
            Effect::success("Answer link undone"),
            Effect::animation(data.connection_id.to_string(), AnimationKind::FadeOut),
        ];
        Ok(CommandOutput::new((), effects))
    }
}

// ---------------------------------------------------------------------------
// graph.answer.unlink
// ---------------------------------------------------------------------------

/// Payload for [`UnlinkAnswer`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnlinkAnswerPayload {
    pub question_id: NodeId,
}

/// Result data of [`UnlinkAnswer`].
///
/// The removed connection's id is deliberately not recorded: undo recreates
/// the link with a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnlinkAnswerOutput {
    pub question_id: NodeId,
    /// The answer that was unlinked
    pub answer_id: NodeId,
}

/// `graph.answer.unlink` — withdraw a question's accepted answer
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlinkAnswer;

static UNLINK_ANSWER_METADATA: CommandMetadata = CommandMetadata {
    id: "graph.answer.unlink",
    name: "Unlink Answer",
    description: "Withdraw the accepted answer from a question",
    category: "answer",
    undoable: true,
    mutates_graph: true,
};

#[async_trait]
impl Command for UnlinkAnswer {
    type Payload = UnlinkAnswerPayload;
    type Output = UnlinkAnswerOutput;

    fn metadata(&self) -> &'static CommandMetadata {
        &UNLINK_ANSWER_METADATA
    }

    fn validate(
        &self,
        payload: &Self::Payload,
        store: &GraphStore,
        _ctx: &CommandContext,
    ) -> Result<(), CommandError> {
        let question = require_question(store, payload.question_id)?;
        if question.answered_by.is_none() {
            return Err(CommandError::validation(
                "Question has no accepted answer",
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        payload: Self::Payload,
        store: &mut GraphStore,
        _ctx: &CommandContext,
    ) -> CommandResult<Self::Output> {
        let question = require_question(store, payload.question_id)?;
        let Some(answer_id) = question.answered_by else {
            return Err(CommandError::validation(
                "Question has no accepted answer",
            ));
        };

        // answered_by set without a matching connection is an inconsistency
        // worth surfacing, not repairing.
        let Some(connection) = find_answer_connection(store, answer_id, payload.question_id)
        else {
            return Err(CommandError::Integrity(format!(
                "Question {} has answered_by set but no matching answer connection",
                payload.question_id
            )));
        };
        let connection_id = connection.id;

        store.remove_connection(connection_id);
        store.update_node(
            payload.question_id,
            &NodePatch {
                answered_by: Some(None),
                ..Default::default()
            },
        );

        let effects = vec![
            Effect::success("Answer withdrawn"),
            Effect::animation(connection_id.to_string(), AnimationKind::FadeOut),
        ];

        Ok(CommandOutput::new(
            UnlinkAnswerOutput {
                question_id: payload.question_id,
                answer_id,
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

        // The original connection id was not captured, so the restored link
        // gets a fresh one.
        let connection = store.add_connection(ConnectionDraft {
            id: None,
            kind: ConnectionType::Answer,
            sources: vec![data.answer_id],
            targets: vec![data.question_id],
        });
        store.update_node(
            data.question_id,
            &NodePatch {
                answered_by: Some(Some(data.answer_id)),
                ..Default::default()
            },
        );

        // Pairs with the fade-out played when the link was withdrawn.
        let effects = vec![
            Effect::success("Answer restored"),
            Effect::animation(connection.id.to_string(), AnimationKind::FadeIn),
        ];
        Ok(CommandOutput::new((), effects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeDraft, NodeKind, QuestionState};

    fn ctx() -> CommandContext {
        CommandContext::now()
    }

    fn store_with_question_and_answer() -> (GraphStore, NodeId, NodeId) {
        let mut store = GraphStore::new();
        let question = store.add_node(NodeDraft {
            statement: "Is it raining?".to_string(),
            kind: NodeKind::Question,
            question_state: Some(QuestionState::Active),
            ..Default::default()
        });
        let answer = store.add_node(NodeDraft {
            statement: "Yes, heavily".to_string(),
            ..Default::default()
        });
        (store, question.id, answer.id)
    }

    async fn link(store: &mut GraphStore, question: NodeId, answer: NodeId) -> LinkAnswerOutput {
        LinkAnswer
            .execute(
                LinkAnswerPayload {
                    question_id: question,
                    answer_id: answer,
                },
                store,
                &ctx(),
            )
            .await
            .unwrap()
            .data
    }

    #[tokio::test]
    async fn test_link_sets_pointer_and_creates_connection() {
        let (mut store, question, answer) = store_with_question_and_answer();

        let output = link(&mut store, question, answer).await;

        assert_eq!(store.node(question).unwrap().answered_by, Some(answer));
        let connection = store.connection(output.connection_id).unwrap();
        assert_eq!(connection.kind, ConnectionType::Answer);
        assert_eq!(connection.sources, vec![answer]);
        assert_eq!(connection.targets, vec![question]);
        assert_eq!(output.previous_answered_by, None);

        // Exactly one Answer connection for the pair.
        let count = store
            .connections()
            .filter(|c| c.kind == ConnectionType::Answer)
            .count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_link_rejects_duplicate_pair() {
        let (mut store, question, answer) = store_with_question_and_answer();
        link(&mut store, question, answer).await;

        let payload = LinkAnswerPayload {
            question_id: question,
            answer_id: answer,
        };
        let error = LinkAnswer.validate(&payload, &store, &ctx()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "This answer is already linked to the question"
        );
    }

    #[tokio::test]
    async fn test_link_to_statement_fails() {
        let (store, _, answer) = store_with_question_and_answer();
        let payload = LinkAnswerPayload {
            question_id: answer,
            answer_id: answer,
        };
        let error = LinkAnswer.validate(&payload, &store, &ctx()).unwrap_err();
        assert!(matches!(error, CommandError::NotAQuestion(_)));
    }

    #[tokio::test]
    async fn test_relink_overwrites_pointer_but_leaves_old_connection() {
        let (mut store, question, first_answer) = store_with_question_and_answer();
        let second_answer = store.add_node(NodeDraft {
            statement: "No, it stopped".to_string(),
            ..Default::default()
        });

        let first = link(&mut store, question, first_answer).await;
        let second = link(&mut store, question, second_answer.id).await;

        assert_eq!(
            store.node(question).unwrap().answered_by,
            Some(second_answer.id)
        );
        assert_eq!(second.previous_answered_by, Some(first_answer));
        // The stale connection to the first answer is still there.
        assert!(store.contains_connection(first.connection_id));
    }

    #[tokio::test]
    async fn test_link_undo_restores_previous_pointer() {
        let (mut store, question, first_answer) = store_with_question_and_answer();
        let second_answer = store.add_node(NodeDraft {
            statement: "No".to_string(),
            ..Default::default()
        });
        link(&mut store, question, first_answer).await;

        let result = LinkAnswer
            .execute(
                LinkAnswerPayload {
                    question_id: question,
                    answer_id: second_answer.id,
                },
                &mut store,
                &ctx(),
            )
            .await;

        LinkAnswer.undo(&result, &mut store, &ctx()).await.unwrap();

        let node = store.node(question).unwrap();
        assert_eq!(node.answered_by, Some(first_answer));
        let second_connection = result.as_ref().unwrap().data.connection_id;
        assert!(!store.contains_connection(second_connection));
    }

    #[tokio::test]
    async fn test_unlink_removes_connection_and_clears_pointer() {
        let (mut store, question, answer) = store_with_question_and_answer();
        let linked = link(&mut store, question, answer).await;

        let result = UnlinkAnswer
            .execute(
                UnlinkAnswerPayload {
                    question_id: question,
                },
                &mut store,
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(result.data.answer_id, answer);
        assert_eq!(store.node(question).unwrap().answered_by, None);
        assert!(!store.contains_connection(linked.connection_id));
    }

    #[tokio::test]
    async fn test_unlink_without_answer_fails_validation() {
        let (store, question, _) = store_with_question_and_answer();
        let payload = UnlinkAnswerPayload {
            question_id: question,
        };
        let error = UnlinkAnswer.validate(&payload, &store, &ctx()).unwrap_err();
        assert_eq!(error.to_string(), "Question has no accepted answer");
    }

    #[tokio::test]
    async fn test_unlink_detects_missing_connection_as_integrity_error() {
        let (mut store, question, answer) = store_with_question_and_answer();
        // Set the pointer directly without a connection: inconsistent state.
        store.update_node(
            question,
            &NodePatch {
                answered_by: Some(Some(answer)),
                ..Default::default()
            },
        );

        let result = UnlinkAnswer
            .execute(
                UnlinkAnswerPayload {
                    question_id: question,
                },
                &mut store,
                &ctx(),
            )
            .await;

        assert!(matches!(result, Err(CommandError::Integrity(_))));
        // The inconsistent pointer is surfaced, not repaired.
        assert_eq!(store.node(question).unwrap().answered_by, Some(answer));
    }

    #[tokio::test]
    async fn test_unlink_undo_recreates_with_fresh_id() {
        let (mut store, question, answer) = store_with_question_and_answer();
        let linked = link(&mut store, question, answer).await;

        let result = UnlinkAnswer
            .execute(
                UnlinkAnswerPayload {
                    question_id: question,
                },
                &mut store,
                &ctx(),
            )
            .await;

        let undo = UnlinkAnswer.undo(&result, &mut store, &ctx()).await.unwrap();
        // The restore fades the connection back in, pairing the fade-out.
        assert!(undo.effects.iter().any(|e| matches!(
            e,
            Effect::Animation(a) if a.kind == AnimationKind::FadeIn
        )));

        let node = store.node(question).unwrap();
        assert_eq!(node.answered_by, Some(answer));
        let restored: Vec<&Connection> = store
            .connections()
            .filter(|c| c.kind == ConnectionType::Answer)
            .collect();
        assert_eq!(restored.len(), 1);
        // Fresh id: the original was not captured in the unlink result.
        assert_ne!(restored[0].id, linked.connection_id);
    }
}
