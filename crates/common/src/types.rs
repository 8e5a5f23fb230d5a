use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable session identifier of an entity in a room.
///
/// Players carry the id issued by the transport on join; AI entities get a
/// generated one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id.simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What drives an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Player,
    AiMonster,
}

/// Capability table consulted by the engines instead of a type hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub movable: bool,
    pub has_cooldowns: bool,
    pub ai_driven: bool,
    pub persisted: bool,
}

impl EntityKind {
    pub fn capabilities(self) -> Capabilities {
        match self {
            Self::Player => Capabilities {
                movable: true,
                has_cooldowns: true,
                ai_driven: false,
                persisted: true,
            },
            Self::AiMonster => Capabilities {
                movable: true,
                has_cooldowns: true,
                ai_driven: true,
                persisted: false,
            },
        }
    }
}

/// Discrete visible state broadcast to clients for animation selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    #[default]
    Idle,
    Walking,
    Attacking,
    Casting,
    Dead,
}

/// Numeric attributes that abilities read or modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Health,
    Mana,
    Level,
    Experience,
    Strength,
    Intelligence,
    Wisdom,
}

impl Stat {
    /// Bounded pools that ability deltas are allowed to touch.
    pub fn is_pool(self) -> bool {
        matches!(self, Self::Health | Self::Mana)
    }
}

/// Position plus yaw, the part of an entity clients interpolate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Vec3,
    pub rot: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rot: 0.0,
        }
    }
}

/// One frame of direct movement intent from a client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Strafe intent, roughly in [-1, 1].
    pub h: f32,
    /// Forward intent, roughly in [-1, 1].
    pub v: f32,
    /// Client sequence number, echoed back for reconciliation.
    pub seq: u32,
}

impl PlayerInput {
    pub fn is_moving(&self) -> bool {
        self.h != 0.0 || self.v != 0.0
    }
}
