use crate::InputError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use zonesim_common::{PlayerInput, SessionId};

/// A client intent. Targets are always passed explicitly.
///
/// The tags are the message names clients send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// One frame of strafe/forward intent.
    #[serde(rename = "playerInput")]
    PlayerInput(PlayerInput),
    /// Ability hotkey pressed.
    #[serde(rename = "entity_ability_key")]
    AbilityKey {
        #[serde(rename = "targetId", default)]
        target_id: Option<SessionId>,
        digit: u8,
    },
    #[serde(rename = "learn_skill")]
    LearnSkill {
        #[serde(rename = "abilityKey")]
        ability_key: String,
    },
    /// Select an entity as the current target.
    #[serde(rename = "pickup_item")]
    PickupItem {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
    #[serde(rename = "reset_position")]
    ResetPosition,
    #[serde(rename = "revive_pressed")]
    RevivePressed,
    #[serde(rename = "playerTeleport")]
    Teleport {
        #[serde(rename = "locationKey")]
        location_key: String,
    },
    /// Click-to-move.
    #[serde(rename = "move_to")]
    MoveTo { x: f32, y: f32, z: f32 },
}

impl Command {
    /// Decode a command from its JSON message form.
    pub fn from_json(text: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn move_to(target: Vec3) -> Self {
        Self::MoveTo {
            x: target.x,
            y: target.y,
            z: target.z,
        }
    }

    /// Wire name of the command, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayerInput(_) => "playerInput",
            Self::AbilityKey { .. } => "entity_ability_key",
            Self::LearnSkill { .. } => "learn_skill",
            Self::PickupItem { .. } => "pickup_item",
            Self::ResetPosition => "reset_position",
            Self::RevivePressed => "revive_pressed",
            Self::Teleport { .. } => "playerTeleport",
            Self::MoveTo { .. } => "move_to",
        }
    }
}

/// A command tagged with the session that sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub session: SessionId,
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_player_input() {
        let cmd = Command::from_json(r#"{"type":"playerInput","h":1.0,"v":0.0,"seq":5}"#).unwrap();
        assert_eq!(
            cmd,
            Command::PlayerInput(PlayerInput {
                h: 1.0,
                v: 0.0,
                seq: 5
            })
        );
    }

    #[test]
    fn decode_ability_key_with_and_without_target() {
        let cmd =
            Command::from_json(r#"{"type":"entity_ability_key","targetId":"abc","digit":1}"#)
                .unwrap();
        assert_eq!(
            cmd,
            Command::AbilityKey {
                target_id: Some(SessionId::from("abc")),
                digit: 1
            }
        );
        let cmd = Command::from_json(r#"{"type":"entity_ability_key","digit":2}"#).unwrap();
        assert!(matches!(
            cmd,
            Command::AbilityKey {
                target_id: None,
                digit: 2
            }
        ));
    }

    #[test]
    fn decode_unit_and_renamed_fields() {
        assert_eq!(
            Command::from_json(r#"{"type":"revive_pressed"}"#).unwrap(),
            Command::RevivePressed
        );
        let cmd =
            Command::from_json(r#"{"type":"playerTeleport","locationKey":"lh_dungeon_01"}"#)
                .unwrap();
        assert_eq!(cmd.name(), "playerTeleport");
    }

    #[test]
    fn unknown_command_is_malformed() {
        assert!(matches!(
            Command::from_json(r#"{"type":"fly"}"#),
            Err(InputError::Malformed(_))
        ));
    }
}
