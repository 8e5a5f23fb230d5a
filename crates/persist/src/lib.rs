//! Persistence boundary: character records in and out of a store.
//!
//! The simulation never waits on a store. Rooms hand out consistent
//! [`CharacterRecord`] snapshots; the [`SaveWorker`] writes them on its own
//! thread.
//!
//! # Invariants
//! - A record captures one entity at one instant; records are independent.
//! - Stored files are verified against the integrity manifest before decoding.
//! - Schema mismatches fail closed.

pub mod store;
pub mod worker;

pub use store::FileCharacterStore;
pub use worker::{SaveStats, SaveWorker};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zonesim_common::Placement;
use zonesim_kernel::{Entity, PlayerSeed};

/// Errors from character persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed for {file}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("character {0} not found")]
    NotFound(String),
    #[error("invalid character id {0:?}")]
    InvalidId(String),
    #[error("save worker stopped")]
    WorkerStopped,
}

/// Everything needed to recreate a player entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub id: String,
    pub name: String,
    pub race: String,
    pub location: String,
    pub position: Vec3,
    pub rot: f32,
    pub health: f32,
    pub mana: f32,
    pub level: u32,
    pub experience: u32,
    pub strength: f32,
    pub intelligence: f32,
    pub wisdom: f32,
    pub abilities: BTreeMap<u8, String>,
}

impl CharacterRecord {
    /// Snapshot a live entity.
    pub fn capture(id: impl Into<String>, entity: &Entity) -> Self {
        Self {
            id: id.into(),
            name: entity.name.clone(),
            race: entity.race.clone(),
            location: entity.location.clone(),
            position: entity.position,
            rot: entity.rot,
            health: entity.health,
            mana: entity.mana,
            level: entity.level,
            experience: entity.experience,
            strength: entity.strength,
            intelligence: entity.intelligence,
            wisdom: entity.wisdom,
            abilities: entity.abilities.clone(),
        }
    }

    /// The data a world needs to add this character.
    pub fn to_seed(&self) -> PlayerSeed {
        PlayerSeed {
            health: Some(self.health),
            mana: Some(self.mana),
            level: self.level,
            experience: self.experience,
            strength: self.strength,
            intelligence: self.intelligence,
            wisdom: self.wisdom,
            abilities: self.abilities.clone(),
            ..PlayerSeed::new(
                self.name.clone(),
                self.race.clone(),
                self.location.clone(),
                Placement {
                    position: self.position,
                    rot: self.rot,
                },
            )
        }
    }
}

/// Where characters live between sessions.
pub trait CharacterStore: Send {
    fn load_character(&self, id: &str) -> Result<CharacterRecord, StoreError>;
    fn save_character(&mut self, record: &CharacterRecord) -> Result<(), StoreError>;
}

/// Store kept in memory, for tests and ephemeral servers.
#[derive(Debug, Clone, Default)]
pub struct MemoryCharacterStore {
    records: BTreeMap<String, CharacterRecord>,
}

impl MemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CharacterStore for MemoryCharacterStore {
    fn load_character(&self, id: &str) -> Result<CharacterRecord, StoreError> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn save_character(&mut self, record: &CharacterRecord) -> Result<(), StoreError> {
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use zonesim_common::SessionId;
    use zonesim_data::GameData;

    pub(crate) fn sample_record(id: &str) -> CharacterRecord {
        let data = GameData::builtin();
        let race = data.race("player_hobbit").unwrap();
        let mut seed = PlayerSeed::new(
            "Rosie",
            "player_hobbit",
            "lh_town",
            Placement {
                position: Vec3::new(1.0, 0.0, -2.0),
                rot: 0.5,
            },
        );
        seed.level = 4;
        seed.experience = 42;
        seed.health = Some(61.5);
        let entity = Entity::player(SessionId::from(id), &seed, race);
        CharacterRecord::capture(id, &entity)
    }

    #[test]
    fn capture_and_seed_agree() {
        let record = sample_record("rosie");
        let data = GameData::builtin();
        let race = data.race("player_hobbit").unwrap();
        let rebuilt = Entity::player(SessionId::from("rosie"), &record.to_seed(), race);
        assert_eq!(CharacterRecord::capture("rosie", &rebuilt), record);
        assert_eq!(rebuilt.health, 61.5);
        assert_eq!(rebuilt.level, 4);
    }

    #[test]
    fn memory_store_load_save() {
        let mut store = MemoryCharacterStore::new();
        assert!(matches!(
            store.load_character("rosie"),
            Err(StoreError::NotFound(_))
        ));
        let record = sample_record("rosie");
        store.save_character(&record).unwrap();
        assert_eq!(store.load_character("rosie").unwrap(), record);
        assert_eq!(store.len(), 1);
    }
}
