use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use zonesim_common::{Capabilities, EntityKind, EntityState, Placement, SessionId, Stat};
use zonesim_data::RaceDef;

/// Behaviour phase of an AI entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiPhase {
    #[default]
    Idle,
    Walking,
}

/// Countdown state machine driving an AI entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AiBrain {
    pub phase: AiPhase,
    /// Time left in the current phase. A new phase is drawn once this is <= 0.
    pub remaining_ms: f32,
}

/// An ability being cast. Cancelling is just dropping this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveCast {
    pub digit: u8,
    pub ability: String,
    pub elapsed_ms: f32,
    pub target_duration_ms: f32,
    pub target: Option<SessionId>,
}

/// Character data a player entity is created from on join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeed {
    pub name: String,
    pub race: String,
    pub location: String,
    pub placement: Placement,
    /// `None` starts with a full pool.
    #[serde(default)]
    pub health: Option<f32>,
    #[serde(default)]
    pub mana: Option<f32>,
    pub level: u32,
    pub experience: u32,
    pub strength: f32,
    pub intelligence: f32,
    pub wisdom: f32,
    /// Learned abilities in addition to the race bindings.
    #[serde(default)]
    pub abilities: BTreeMap<u8, String>,
}

impl PlayerSeed {
    /// A fresh level 1 character.
    pub fn new(
        name: impl Into<String>,
        race: impl Into<String>,
        location: impl Into<String>,
        placement: Placement,
    ) -> Self {
        Self {
            name: name.into(),
            race: race.into(),
            location: location.into(),
            placement,
            health: None,
            mana: None,
            level: 1,
            experience: 0,
            strength: 10.0,
            intelligence: 10.0,
            wisdom: 10.0,
            abilities: BTreeMap::new(),
        }
    }
}

/// A simulated actor. Players and AI monsters share this record and differ
/// by `kind` and the optional `ai` brain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub session_id: SessionId,
    pub kind: EntityKind,
    pub name: String,
    pub race: String,
    pub location: String,
    pub position: Vec3,
    pub rot: f32,
    pub health: f32,
    pub max_health: f32,
    pub health_regen: f32,
    pub mana: f32,
    pub max_mana: f32,
    pub mana_regen: f32,
    pub level: u32,
    pub experience: u32,
    pub strength: f32,
    pub intelligence: f32,
    pub wisdom: f32,
    /// Path-following step length.
    pub speed: f32,
    pub blocked: bool,
    pub state: EntityState,
    /// Last applied client input sequence.
    pub sequence: u32,
    pub to_region: Option<Vec3>,
    pub destination_path: VecDeque<Vec3>,
    pub ai: Option<AiBrain>,
    pub abilities: BTreeMap<u8, String>,
    /// Remaining cooldown per ability key. Expired entries are removed.
    pub cooldowns: BTreeMap<String, f32>,
    pub cast: Option<ActiveCast>,
    pub target: Option<SessionId>,
    pub dead_for_ms: f32,
}

impl Entity {
    fn base(session_id: SessionId, kind: EntityKind, race: &RaceDef, location: &str) -> Self {
        Self {
            session_id,
            kind,
            name: race.name.clone(),
            race: race.key.clone(),
            location: location.to_string(),
            position: Vec3::ZERO,
            rot: 0.0,
            health: race.max_health,
            max_health: race.max_health,
            health_regen: race.health_regen,
            mana: race.max_mana,
            max_mana: race.max_mana,
            mana_regen: race.mana_regen,
            level: 1,
            experience: 0,
            strength: 10.0,
            intelligence: 10.0,
            wisdom: 10.0,
            speed: race.speed,
            blocked: false,
            state: EntityState::Idle,
            sequence: 0,
            to_region: None,
            destination_path: VecDeque::new(),
            ai: None,
            abilities: race.abilities.clone(),
            cooldowns: BTreeMap::new(),
            cast: None,
            target: None,
            dead_for_ms: 0.0,
        }
    }

    /// Build a player from persisted character data.
    pub fn player(session_id: SessionId, seed: &PlayerSeed, race: &RaceDef) -> Self {
        let mut e = Self::base(session_id, EntityKind::Player, race, &seed.location);
        e.name = seed.name.clone();
        e.position = seed.placement.position;
        e.rot = seed.placement.rot;
        e.level = seed.level.max(1);
        e.experience = seed.experience;
        e.strength = seed.strength;
        e.intelligence = seed.intelligence;
        e.wisdom = seed.wisdom;
        e.abilities
            .extend(seed.abilities.iter().map(|(d, k)| (*d, k.clone())));
        if let Some(health) = seed.health {
            e.health = health.clamp(0.0, e.max_health);
        }
        if let Some(mana) = seed.mana {
            e.mana = mana.clamp(0.0, e.max_mana);
        }
        if e.health <= 0.0 {
            e.state = EntityState::Dead;
        }
        e
    }

    /// Build a freshly spawned AI monster at full health.
    pub fn monster(session_id: SessionId, race: &RaceDef, location: &str, position: Vec3) -> Self {
        let mut e = Self::base(session_id, EntityKind::AiMonster, race, location);
        e.position = position;
        e.ai = Some(AiBrain::default());
        e
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn is_casting(&self) -> bool {
        self.cast.is_some()
    }

    pub fn placement(&self) -> Placement {
        Placement {
            position: self.position,
            rot: self.rot,
        }
    }

    /// Current value of a stat as used by requirement checks.
    pub fn stat(&self, stat: Stat) -> f32 {
        match stat {
            Stat::Health => self.health,
            Stat::Mana => self.mana,
            Stat::Level => self.level as f32,
            Stat::Experience => self.experience as f32,
            Stat::Strength => self.strength,
            Stat::Intelligence => self.intelligence,
            Stat::Wisdom => self.wisdom,
        }
    }

    /// Add `delta` to a pool, clamped to `[0, max]`. Returns the applied change.
    /// Non-pool stats are left untouched.
    pub fn adjust_pool(&mut self, stat: Stat, delta: f32) -> f32 {
        let (value, max) = match stat {
            Stat::Health => (&mut self.health, self.max_health),
            Stat::Mana => (&mut self.mana, self.max_mana),
            _ => return 0.0,
        };
        let before = *value;
        *value = (before + delta).clamp(0.0, max);
        *value - before
    }

    pub fn cooldown_remaining(&self, ability: &str) -> f32 {
        self.cooldowns.get(ability).copied().unwrap_or(0.0)
    }

    pub fn has_ability(&self, ability: &str) -> bool {
        self.abilities.values().any(|k| k == ability)
    }

    /// Assign a destination and its waypoints. An empty path clears both.
    pub fn set_destination(&mut self, to: Vec3, path: Vec<Vec3>) -> bool {
        if path.is_empty() {
            self.clear_destination();
            return false;
        }
        self.to_region = Some(to);
        self.destination_path = path.into();
        true
    }

    pub fn clear_destination(&mut self) {
        self.to_region = None;
        self.destination_path.clear();
    }

    /// Experience needed to leave the current level.
    pub fn experience_to_level(&self) -> u32 {
        100 * self.level.max(1)
    }

    /// Add experience, levelling up as thresholds are crossed. Returns levels gained.
    pub fn gain_experience(&mut self, amount: u32) -> u32 {
        self.experience += amount;
        let mut gained = 0;
        while self.experience >= self.experience_to_level() {
            self.experience -= self.experience_to_level();
            self.level += 1;
            gained += 1;
        }
        gained
    }
}
