//! State synchronization: what clients see of a zone and how it changes.
//!
//! The world holds plain records. After a tick the room asks [`SyncState`]
//! for the difference against what was last broadcast and hands the
//! resulting [`PatchFrame`] to the transport.
//!
//! # Invariants
//! - Applying every patch produced so far to an empty map yields the last
//!   broadcast state.
//! - A `Changed` patch lists only fields that differ.
//! - Patches are ordered by session id.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zonesim_common::{EntityKind, EntityState, SessionId};
use zonesim_kernel::Entity;

/// Errors from encoding or decoding patch frames.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
}

/// The client-visible part of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub session_id: SessionId,
    pub kind: EntityKind,
    pub name: String,
    pub race: String,
    pub location: String,
    pub position: Vec3,
    pub rot: f32,
    pub health: f32,
    pub max_health: f32,
    pub mana: f32,
    pub max_mana: f32,
    pub level: u32,
    pub experience: u32,
    pub state: EntityState,
    pub sequence: u32,
    pub blocked: bool,
    pub target: Option<SessionId>,
}

impl EntityView {
    pub fn of(entity: &Entity) -> Self {
        Self {
            session_id: entity.session_id.clone(),
            kind: entity.kind,
            name: entity.name.clone(),
            race: entity.race.clone(),
            location: entity.location.clone(),
            position: entity.position,
            rot: entity.rot,
            health: entity.health,
            max_health: entity.max_health,
            mana: entity.mana,
            max_mana: entity.max_mana,
            level: entity.level,
            experience: entity.experience,
            state: entity.state,
            sequence: entity.sequence,
            blocked: entity.blocked,
            target: entity.target.clone(),
        }
    }

    /// Fields of `self` that differ from `old`.
    fn changes_since(&self, old: &EntityView) -> Vec<FieldChange> {
        let mut out = Vec::new();
        if self.position != old.position {
            out.push(FieldChange::Position(self.position));
        }
        if self.rot != old.rot {
            out.push(FieldChange::Rot(self.rot));
        }
        if self.health != old.health {
            out.push(FieldChange::Health(self.health));
        }
        if self.max_health != old.max_health {
            out.push(FieldChange::MaxHealth(self.max_health));
        }
        if self.mana != old.mana {
            out.push(FieldChange::Mana(self.mana));
        }
        if self.max_mana != old.max_mana {
            out.push(FieldChange::MaxMana(self.max_mana));
        }
        if self.level != old.level {
            out.push(FieldChange::Level(self.level));
        }
        if self.experience != old.experience {
            out.push(FieldChange::Experience(self.experience));
        }
        if self.state != old.state {
            out.push(FieldChange::State(self.state));
        }
        if self.sequence != old.sequence {
            out.push(FieldChange::Sequence(self.sequence));
        }
        if self.blocked != old.blocked {
            out.push(FieldChange::Blocked(self.blocked));
        }
        if self.location != old.location {
            out.push(FieldChange::Location(self.location.clone()));
        }
        if self.target != old.target {
            out.push(FieldChange::Target(self.target.clone()));
        }
        out
    }

    /// Apply a field change, as a client would.
    pub fn apply(&mut self, change: &FieldChange) {
        match change {
            FieldChange::Position(v) => self.position = *v,
            FieldChange::Rot(v) => self.rot = *v,
            FieldChange::Health(v) => self.health = *v,
            FieldChange::MaxHealth(v) => self.max_health = *v,
            FieldChange::Mana(v) => self.mana = *v,
            FieldChange::MaxMana(v) => self.max_mana = *v,
            FieldChange::Level(v) => self.level = *v,
            FieldChange::Experience(v) => self.experience = *v,
            FieldChange::State(v) => self.state = *v,
            FieldChange::Sequence(v) => self.sequence = *v,
            FieldChange::Blocked(v) => self.blocked = *v,
            FieldChange::Location(v) => self.location = v.clone(),
            FieldChange::Target(v) => self.target = v.clone(),
        }
    }
}

/// A single changed field with its new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldChange {
    Position(Vec3),
    Rot(f32),
    Health(f32),
    MaxHealth(f32),
    Mana(f32),
    MaxMana(f32),
    Level(u32),
    Experience(u32),
    State(EntityState),
    Sequence(u32),
    Blocked(bool),
    Location(String),
    Target(Option<SessionId>),
}

/// One entry of a state diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StatePatch {
    Added { view: EntityView },
    Removed { id: SessionId },
    Changed { id: SessionId, changes: Vec<FieldChange> },
}

/// What the transport sends to clients after a patch interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchFrame {
    pub tick: u64,
    pub server_time_ms: f64,
    pub patches: Vec<StatePatch>,
}

impl PatchFrame {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>, SyncError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| SyncError::CborEncode(e.to_string()))?;
        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        ciborium::from_reader(bytes).map_err(|e| SyncError::CborDecode(e.to_string()))
    }
}

/// The last broadcast state, diffed against the live entities on demand.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    last: BTreeMap<SessionId, EntityView>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities clients currently know about.
    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    /// Compute patches from the last broadcast to `entities` and remember
    /// `entities` as broadcast.
    pub fn diff(&mut self, entities: &BTreeMap<SessionId, Entity>) -> Vec<StatePatch> {
        let mut patches = Vec::new();
        let mut next = BTreeMap::new();

        for id in self.last.keys() {
            if !entities.contains_key(id) {
                patches.push(StatePatch::Removed { id: id.clone() });
            }
        }

        for (id, entity) in entities {
            let view = EntityView::of(entity);
            match self.last.get(id) {
                None => patches.push(StatePatch::Added { view: view.clone() }),
                Some(old) => {
                    let changes = view.changes_since(old);
                    if !changes.is_empty() {
                        patches.push(StatePatch::Changed {
                            id: id.clone(),
                            changes,
                        });
                    }
                }
            }
            next.insert(id.clone(), view);
        }

        tracing::trace!(patches = patches.len(), entities = next.len(), "state diffed");
        self.last = next;
        patches
    }

    /// Everything clients know, as `Added` patches for a joining client.
    pub fn full_snapshot(&self) -> Vec<StatePatch> {
        self.last
            .values()
            .map(|view| StatePatch::Added { view: view.clone() })
            .collect()
    }
}

/// Apply patches to a client-side mirror.
pub fn apply_patches(mirror: &mut BTreeMap<SessionId, EntityView>, patches: &[StatePatch]) {
    for patch in patches {
        match patch {
            StatePatch::Added { view } => {
                mirror.insert(view.session_id.clone(), view.clone());
            }
            StatePatch::Removed { id } => {
                mirror.remove(id);
            }
            StatePatch::Changed { id, changes } => {
                if let Some(view) = mirror.get_mut(id) {
                    for change in changes {
                        view.apply(change);
                    }
                }
            }
        }
    }
}
