//! Side-effect descriptors returned by commands
//!
//! Commands never call into the notification or rendering collaborators
//! directly — they return intent as a sequence of typed effects, and the
//! caller dispatches them. The descriptor shapes here are part of the
//! command contract.

use serde::{Deserialize, Serialize};

/// A side effect requested by a command, for the caller to dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Show a toast notification
    Toast(ToastEffect),
    /// Play an animation on a node or connection
    Animation(AnimationEffect),
}

impl Effect {
    /// A success toast
    pub fn success(message: impl Into<String>) -> Self {
        Effect::Toast(ToastEffect {
            message: message.into(),
            kind: ToastKind::Success,
        })
    }

    /// An error toast
    pub fn error(message: impl Into<String>) -> Self {
        Effect::Toast(ToastEffect {
            message: message.into(),
            kind: ToastKind::Error,
        })
    }

    /// An animation with the preset configuration for its kind, keyed to a
    /// node or connection id
    pub fn animation(target: impl Into<String>, kind: AnimationKind) -> Self {
        Effect::Animation(AnimationEffect {
            target: target.into(),
            kind,
            config: kind.preset(),
        })
    }
}

/// Severity of a toast notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

/// Request to show a toast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToastEffect {
    /// User-facing message
    pub message: String,
    /// Severity, mapped to presentation styling by the collaborator
    pub kind: ToastKind,
}

/// The animation vocabulary used by commands.
///
/// Deletions pair with their undo by inverse animation: shrink-out/grow-in
/// for nodes, fade-out/draw-line or fade-out/fade-in for connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    /// A newly created node growing into place
    GrowIn,
    /// A deleted node shrinking away
    ShrinkOut,
    /// Attention pulse on an updated entity
    Pulse,
    /// A restored entity fading back in
    FadeIn,
    /// A deleted connection fading away
    FadeOut,
    /// A connection being drawn from source to target
    DrawLine,
}

impl AnimationKind {
    /// The preset timing configuration for this animation
    pub fn preset(&self) -> AnimationConfig {
        match self {
            AnimationKind::GrowIn => AnimationConfig {
                duration_ms: 300,
                easing: Easing::EaseOut,
            },
            AnimationKind::ShrinkOut => AnimationConfig {
                duration_ms: 300,
                easing: Easing::EaseIn,
            },
            AnimationKind::Pulse => AnimationConfig {
                duration_ms: 250,
                easing: Easing::EaseInOut,
            },
            AnimationKind::FadeIn => AnimationConfig {
                duration_ms: 200,
                easing: Easing::EaseOut,
            },
            AnimationKind::FadeOut => AnimationConfig {
                duration_ms: 200,
                easing: Easing::EaseIn,
            },
            // A line draws at constant speed from source to target.
            AnimationKind::DrawLine => AnimationConfig {
                duration_ms: 400,
                easing: Easing::Linear,
            },
        }
    }

    /// Get the string representation of the animation kind
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationKind::GrowIn => "grow_in",
            AnimationKind::ShrinkOut => "shrink_out",
            AnimationKind::Pulse => "pulse",
            AnimationKind::FadeIn => "fade_in",
            AnimationKind::FadeOut => "fade_out",
            AnimationKind::DrawLine => "draw_line",
        }
    }
}

/// Request to play an animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationEffect {
    /// Node or connection id (or selector) the animation targets
    pub target: String,
    /// Which animation to play
    pub kind: AnimationKind,
    /// Timing configuration
    pub config: AnimationConfig,
}

/// Animation timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationConfig {
    pub duration_ms: u64,
    pub easing: Easing,
}

/// Easing curve applied by the animation collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_serialization_is_tagged() {
        let effect = Effect::success("Node created");
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(json["type"], "toast");
        assert_eq!(json["message"], "Node created");
        assert_eq!(json["kind"], "success");
    }

    #[test]
    fn test_animation_carries_preset_config() {
        let effect = Effect::animation("node-1", AnimationKind::GrowIn);
        match effect {
            Effect::Animation(anim) => {
                assert_eq!(anim.target, "node-1");
                assert_eq!(anim.config.duration_ms, 300);
                assert_eq!(anim.config.easing, Easing::EaseOut);
            }
            _ => panic!("Expected animation effect"),
        }
    }

    #[test]
    fn test_delete_and_restore_presets_are_paired() {
        // Delete animations ease in (accelerate away), restores ease out.
        assert_eq!(AnimationKind::ShrinkOut.preset().easing, Easing::EaseIn);
        assert_eq!(AnimationKind::GrowIn.preset().easing, Easing::EaseOut);
        assert_eq!(AnimationKind::FadeOut.preset().easing, Easing::EaseIn);
        assert_eq!(AnimationKind::FadeIn.preset().easing, Easing::EaseOut);
        // Line drawing alone runs at constant speed.
        assert_eq!(AnimationKind::DrawLine.preset().easing, Easing::Linear);
    }
}
