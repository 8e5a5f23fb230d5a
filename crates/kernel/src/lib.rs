//! Zone kernel: the authoritative simulation of one location.
//!
//! A [`World`] owns every entity of a room and advances them with
//! [`World::tick`]. Movement, AI and abilities are engines the tick fans out
//! to; commands from clients are plain method calls applied between ticks.
//!
//! # Invariants
//! - `0 <= health <= max_health` and `0 <= mana <= max_mana` after every operation.
//! - A committed position was accepted by the nav mesh from the previous one.
//! - `destination_path` is non-empty only while `to_region` is set.
//! - All randomness comes from the world's seeded RNG.
//! - A failing entity never stops the tick for the others.

pub mod ability;
pub mod ai;
pub mod config;
pub mod entity;
pub mod events;
pub mod movement;
pub mod world;

#[cfg(test)]
pub(crate) mod testing;

pub use ability::{CastOutcome, LearnOutcome};
pub use config::WorldConfig;
pub use entity::{ActiveCast, AiBrain, AiPhase, Entity, PlayerSeed};
pub use events::{AppliedDelta, Audience, Notification, NotificationKind};
pub use movement::{InputOutcome, PathStep};
pub use world::World;

use zonesim_common::{SessionId, Stat};

/// Why a cast could not start.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CastRejection {
    #[error("no ability bound to digit {0}")]
    NoAbilityOnDigit(u8),
    #[error("unknown ability {0}")]
    UnknownAbility(String),
    #[error("{ability} on cooldown for {remaining_ms} ms")]
    OnCooldown { ability: String, remaining_ms: f32 },
    #[error("already casting")]
    AlreadyCasting,
    #[error("caster is dead")]
    CasterDead,
    #[error("not enough mana: need {needed}, have {available}")]
    InsufficientMana { needed: f32, available: f32 },
    #[error("ability needs a target")]
    MissingTarget,
    #[error("target {0} not found")]
    TargetNotFound(SessionId),
    #[error("target {0} is dead")]
    TargetDead(SessionId),
}

/// Errors from world operations. None of them leave partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("entity {0} not found")]
    EntityNotFound(SessionId),
    #[error("entity {0} already exists")]
    DuplicateEntity(SessionId),
    #[error("entity {0} is dead")]
    EntityDead(SessionId),
    #[error("unknown race {0}")]
    UnknownRace(String),
    #[error("unknown ability {0}")]
    UnknownAbility(String),
    #[error("unknown location {0}")]
    UnknownLocation(String),
    #[error("requirement not met: {stat:?} >= {amount}")]
    RequirementUnmet { stat: Stat, amount: f32 },
    #[error("no free ability slot")]
    NoFreeSlot,
    #[error("entity {id} reached an invalid state: {reason}")]
    InvalidState { id: SessionId, reason: String },
    #[error("cast rejected: {0}")]
    Cast(#[from] CastRejection),
}
