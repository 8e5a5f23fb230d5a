use serde::{Deserialize, Serialize};
use zonesim_common::{SessionId, Stat};
use zonesim_data::AbilityEffect;

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Session(SessionId),
    All,
}

/// One resolved stat change, reported for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedDelta {
    pub stat: Stat,
    pub amount: f32,
}

/// One-shot messages produced during a tick, beside the synchronized state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotificationKind {
    #[serde(rename = "playerTeleportConfirm")]
    PlayerTeleportConfirm { location: String },
    #[serde(rename = "ability_start_casting")]
    AbilityStartCasting {
        caster: SessionId,
        digit: u8,
        ability: String,
        cast_time_ms: f32,
        target: Option<SessionId>,
    },
    #[serde(rename = "ability_cancel_casting")]
    AbilityCancelCasting {
        caster: SessionId,
        digit: u8,
        ability: String,
    },
    #[serde(rename = "entity_ability_cast")]
    EntityAbilityCast {
        caster: SessionId,
        target: Option<SessionId>,
        ability: String,
        digit: u8,
        effect: AbilityEffect,
        /// Presentation should animate a travelling projectile.
        projectile: bool,
        /// False when the target was out of range or no longer valid.
        hit: bool,
        caster_changes: Vec<AppliedDelta>,
        target_changes: Vec<AppliedDelta>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub audience: Audience,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn to_session(session: &SessionId, kind: NotificationKind) -> Self {
        Self {
            audience: Audience::Session(session.clone()),
            kind,
        }
    }

    pub fn broadcast(kind: NotificationKind) -> Self {
        Self {
            audience: Audience::All,
            kind,
        }
    }

    /// Whether `session` should receive this notification.
    pub fn is_for(&self, session: &SessionId) -> bool {
        match &self.audience {
            Audience::All => true,
            Audience::Session(s) => s == session,
        }
    }
}
