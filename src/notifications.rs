//! Failure-toast translation
//!
//! Commands embed their own success toasts in their effects; failures are
//! translated here so every command id has a stable, user-facing preset
//! message. When no preset exists the raw error string is shown instead.

use crate::commands::CommandError;
use crate::effects::{Effect, ToastEffect, ToastKind};

/// Preset failure message for a command id, if one exists
pub fn failure_preset(command_id: &str) -> Option<&'static str> {
    match command_id {
        "graph.node.create" => Some("Could not create the node"),
        "graph.node.update" => Some("Could not update the node"),
        "graph.node.delete" => Some("Could not delete the node"),
        "graph.connection.create" => Some("Could not create the connection"),
        "graph.connection.update" => Some("Could not update the connection"),
        "graph.connection.delete" => Some("Could not delete the connection"),
        "graph.question.toggle_state" => Some("Could not change the question state"),
        "graph.answer.link" => Some("Could not link the answer"),
        "graph.answer.unlink" => Some("Could not unlink the answer"),
        _ => None,
    }
}

/// Error toast for a failed command, using the preset message when one
/// exists and the raw error otherwise
pub fn failure_toast(command_id: &str, error: &CommandError) -> ToastEffect {
    let message = failure_preset(command_id)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    ToastEffect {
        message,
        kind: ToastKind::Error,
    }
}

/// The same translation wrapped as a dispatchable effect
pub fn failure_effect(command_id: &str, error: &CommandError) -> Effect {
    Effect::error(failure_toast(command_id, error).message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::NodeId;

    #[test]
    fn test_known_command_uses_preset() {
        let error = CommandError::NodeNotFound(NodeId::new());
        let toast = failure_toast("graph.node.delete", &error);
        assert_eq!(toast.message, "Could not delete the node");
        assert_eq!(toast.kind, ToastKind::Error);
    }

    #[test]
    fn test_unknown_command_falls_back_to_raw_error() {
        let error = CommandError::validation("Statement cannot be empty");
        let toast = failure_toast("graph.node.rename", &error);
        assert_eq!(toast.message, "Statement cannot be empty");
    }

    #[test]
    fn test_failure_effect_is_an_error_toast() {
        let error = CommandError::validation("bad");
        match failure_effect("graph.answer.link", &error) {
            Effect::Toast(toast) => {
                assert_eq!(toast.message, "Could not link the answer");
                assert_eq!(toast.kind, ToastKind::Error);
            }
            _ => panic!("Expected toast effect"),
        }
    }

    #[test]
    fn test_every_shipped_command_has_a_preset() {
        for id in [
            "graph.node.create",
            "graph.node.update",
            "graph.node.delete",
            "graph.connection.create",
            "graph.connection.update",
            "graph.connection.delete",
            "graph.question.toggle_state",
            "graph.answer.link",
            "graph.answer.unlink",
        ] {
            assert!(failure_preset(id).is_some(), "missing preset for {id}");
        }
    }
}
