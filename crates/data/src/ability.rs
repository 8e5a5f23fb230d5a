use serde::{Deserialize, Serialize};
use zonesim_common::Stat;

/// How an ability picks the entity its target-side deltas land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Applies to the caster, any supplied target is ignored.
    #[serde(rename = "self")]
    SelfCast,
    /// Applies to a living target within range.
    Target,
    /// Same as `Target`, presented as a projectile.
    Travel,
}

/// Presentation hints carried through to clients with the resolved cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityEffect {
    pub kind: EffectKind,
    #[serde(default)]
    pub particle: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaOp {
    Add,
    Remove,
}

/// A uniformly random change to one stat, rolled once per application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatDelta {
    pub stat: Stat,
    pub op: DeltaOp,
    pub min: f32,
    pub max: f32,
}

impl StatDelta {
    /// Apply the operation's sign to a rolled magnitude.
    pub fn signed(&self, magnitude: f32) -> f32 {
        match self.op {
            DeltaOp::Add => magnitude,
            DeltaOp::Remove => -magnitude,
        }
    }
}

/// A threshold that must hold before an ability can be learned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub stat: Stat,
    pub amount: f32,
}

/// Static definition of an ability. Read-only for the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDef {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cast_time_ms: f32,
    #[serde(default)]
    pub cooldown_ms: f32,
    /// Additional periodic applications of the target-side deltas.
    #[serde(default)]
    pub repeat: u32,
    #[serde(default)]
    pub repeat_interval_ms: f32,
    /// Maximum distance to the target, 0 for unconstrained.
    #[serde(default)]
    pub range: f32,
    /// Minimum distance to the target, 0 for unconstrained.
    #[serde(default)]
    pub min_range: f32,
    pub effect: AbilityEffect,
    #[serde(default)]
    pub affinity: Option<Stat>,
    #[serde(default)]
    pub caster_deltas: Vec<StatDelta>,
    #[serde(default)]
    pub target_deltas: Vec<StatDelta>,
    #[serde(default)]
    pub required_to_learn: Vec<Requirement>,
}

impl AbilityDef {
    /// Whether the ability needs a target entity other than the caster.
    pub fn needs_target(&self) -> bool {
        self.effect.kind != EffectKind::SelfCast
    }

    pub fn is_projectile(&self) -> bool {
        self.effect.kind == EffectKind::Travel
    }

    /// Whether `distance` satisfies `min_range..=range`, 0 disabling a bound.
    pub fn in_range(&self, distance: f32) -> bool {
        if self.min_range > 0.0 && distance < self.min_range {
            return false;
        }
        if self.range > 0.0 && distance > self.range {
            return false;
        }
        true
    }

    /// Worst-case amount of `stat` the caster pays on resolution.
    pub fn max_cost(&self, stat: Stat) -> f32 {
        self.caster_deltas
            .iter()
            .filter(|d| d.stat == stat && d.op == DeltaOp::Remove)
            .map(|d| d.max)
            .sum()
    }
}
