//! Static game data: abilities, races and locations.
//!
//! Definitions are loaded once per process and shared read-only with every
//! room. The builtin set mirrors the shipped content; a JSON file with the
//! same shape can replace it.
//!
//! # Invariants
//! - Ability deltas only touch bounded pools (health, mana).
//! - Every ability a race binds to a digit exists in the registry.

mod ability;
mod builtin;

pub use ability::{AbilityDef, AbilityEffect, DeltaOp, EffectKind, Requirement, StatDelta};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use zonesim_common::Placement;

/// Archetype of an entity: base pools, speed and default ability bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceDef {
    pub key: String,
    pub name: String,
    /// Distance covered per movement step while following a path.
    pub speed: f32,
    pub max_health: f32,
    /// Health regained per second while alive.
    #[serde(default)]
    pub health_regen: f32,
    pub max_mana: f32,
    /// Mana regained per second while alive.
    #[serde(default)]
    pub mana_regen: f32,
    /// Abilities bound to digits for every entity of this race.
    #[serde(default)]
    pub abilities: BTreeMap<u8, String>,
    /// Experience granted to a player that kills an entity of this race.
    #[serde(default)]
    pub experience_reward: u32,
}

/// A zone with its own room and navigation mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDef {
    pub key: String,
    pub title: String,
    /// File stem of the navigation mesh for this location.
    pub nav_mesh: String,
    pub spawn_point: Placement,
}

/// Errors from loading or validating game data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid definition {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Read-only registry of every static definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameData {
    #[serde(default)]
    abilities: BTreeMap<String, AbilityDef>,
    #[serde(default)]
    races: BTreeMap<String, RaceDef>,
    #[serde(default)]
    locations: BTreeMap<String, LocationDef>,
}

impl GameData {
    pub fn new() -> Self {
        Self::default()
    }

    /// The content shipped with the server.
    pub fn builtin() -> Self {
        let mut data = Self::new();
        for ability in builtin::abilities() {
            data.insert_ability(ability);
        }
        for race in builtin::races() {
            data.insert_race(race);
        }
        for location in builtin::locations() {
            data.insert_location(location);
        }
        data
    }

    pub fn insert_ability(&mut self, ability: AbilityDef) {
        self.abilities.insert(ability.key.clone(), ability);
    }

    pub fn insert_race(&mut self, race: RaceDef) {
        self.races.insert(race.key.clone(), race);
    }

    pub fn insert_location(&mut self, location: LocationDef) {
        self.locations.insert(location.key.clone(), location);
    }

    pub fn ability(&self, key: &str) -> Option<&AbilityDef> {
        self.abilities.get(key)
    }

    pub fn race(&self, key: &str) -> Option<&RaceDef> {
        self.races.get(key)
    }

    pub fn location(&self, key: &str) -> Option<&LocationDef> {
        self.locations.get(key)
    }

    pub fn abilities(&self) -> &BTreeMap<String, AbilityDef> {
        &self.abilities
    }

    pub fn races(&self) -> &BTreeMap<String, RaceDef> {
        &self.races
    }

    pub fn locations(&self) -> &BTreeMap<String, LocationDef> {
        &self.locations
    }

    /// Check cross references and value ranges.
    pub fn validate(&self) -> Result<(), DataError> {
        for (key, ability) in &self.abilities {
            if key != &ability.key {
                return Err(invalid(key, "registry key does not match ability key"));
            }
            if ability.cast_time_ms < 0.0 || ability.cooldown_ms < 0.0 {
                return Err(invalid(key, "negative cast time or cooldown"));
            }
            if ability.repeat > 0 && ability.repeat_interval_ms <= 0.0 {
                return Err(invalid(key, "repeating ability needs a positive interval"));
            }
            for delta in ability.caster_deltas.iter().chain(&ability.target_deltas) {
                if !delta.stat.is_pool() {
                    return Err(invalid(key, "deltas may only change health or mana"));
                }
                if delta.min < 0.0 || delta.min > delta.max {
                    return Err(invalid(key, "delta range must satisfy 0 <= min <= max"));
                }
            }
        }
        for (key, race) in &self.races {
            if race.max_health <= 0.0 || race.max_mana < 0.0 || race.speed < 0.0 {
                return Err(invalid(key, "race pools and speed out of range"));
            }
            for ability in race.abilities.values() {
                if !self.abilities.contains_key(ability) {
                    return Err(invalid(key, &format!("binds unknown ability {ability}")));
                }
            }
        }
        Ok(())
    }

    /// Load a registry from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let file = std::fs::File::open(path.as_ref())?;
        let data: Self = serde_json::from_reader(file)?;
        data.validate()?;
        tracing::info!(
            abilities = data.abilities.len(),
            races = data.races.len(),
            locations = data.locations.len(),
            path = %path.as_ref().display(),
            "game data loaded"
        );
        Ok(data)
    }

    /// Save the registry to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> DataError {
    DataError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
