//! One room: a location's world plus the loop around it.
//!
//! The room owns its [`World`] exclusively. Transport threads push commands
//! through a [`CommandSender`]; [`Room::update`] drains them at the start of
//! each fixed step, ticks the world, then produces patch frames,
//! notifications and save snapshots on their own cadences. Nothing here
//! performs I/O.
//!
//! # Invariants
//! - Commands are applied only between ticks, in arrival order.
//! - A failing command is logged and dropped; it never stops the loop.
//! - At most `max_clients` sessions are joined.

pub mod config;

pub use config::RoomConfig;

use std::collections::BTreeMap;
use std::sync::Arc;
use zonesim_common::SessionId;
use zonesim_data::GameData;
use zonesim_input::{Command, CommandQueue, CommandSender, Envelope};
use zonesim_kernel::{Notification, PlayerSeed, World, WorldError};
use zonesim_nav::NavMesh;
use zonesim_persist::CharacterRecord;
use zonesim_sync::{PatchFrame, StatePatch, SyncState};

/// Errors from room lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room is full ({0} clients)")]
    Full(usize),
    #[error("session {0} already joined")]
    AlreadyJoined(SessionId),
    #[error("session {0} is not in this room")]
    NotJoined(SessionId),
    #[error("unknown location {0}")]
    UnknownLocation(String),
    #[error("invalid room config: {0}")]
    InvalidConfig(String),
    #[error("world error: {0}")]
    World(#[from] WorldError),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything one [`Room::update`] produced for the outside world.
#[derive(Debug, Default)]
pub struct RoomFrame {
    /// Fixed steps run during this update.
    pub ticks: u32,
    /// State changes, when a patch was due and something changed.
    pub patch: Option<PatchFrame>,
    pub notifications: Vec<Notification>,
    /// Character snapshots to hand to the save worker.
    pub saves: Vec<CharacterRecord>,
}

pub struct Room {
    config: RoomConfig,
    world: World,
    queue: CommandQueue,
    sync: SyncState,
    /// Joined sessions and the character each one plays.
    sessions: BTreeMap<SessionId, String>,
    tick_accumulator_ms: f32,
    patch_timer_ms: f32,
    save_timer_ms: f32,
    pending_saves: Vec<CharacterRecord>,
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("location", &self.config.location)
            .field("sessions", &self.sessions.len())
            .field("world", &self.world)
            .finish_non_exhaustive()
    }
}

impl Room {
    pub fn new(
        config: RoomConfig,
        data: Arc<GameData>,
        nav: Box<dyn NavMesh>,
    ) -> Result<Self, RoomError> {
        if data.location(&config.location).is_none() {
            return Err(RoomError::UnknownLocation(config.location.clone()));
        }
        let world = World::new(
            config.world.clone(),
            data,
            &config.location,
            nav,
            config.seed,
        )?;
        tracing::info!(location = %config.location, max_clients = config.max_clients, "room created");
        Ok(Self {
            config,
            world,
            queue: CommandQueue::new(),
            sync: SyncState::new(),
            sessions: BTreeMap::new(),
            tick_accumulator_ms: 0.0,
            patch_timer_ms: 0.0,
            save_timer_ms: 0.0,
            pending_saves: Vec::new(),
        })
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Handle for transport threads to push commands.
    pub fn sender(&self) -> CommandSender {
        self.queue.sender()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_joined(&self, session: &SessionId) -> bool {
        self.sessions.contains_key(session)
    }

    /// Add a stored character. Returns what clients currently see, for the
    /// joining client; its own entity arrives with the next patch.
    pub fn join(
        &mut self,
        session: SessionId,
        character: &CharacterRecord,
    ) -> Result<Vec<StatePatch>, RoomError> {
        self.join_with_seed(session, character.id.clone(), &character.to_seed())
    }

    /// Add a brand new character at this location's spawn point.
    pub fn join_new(
        &mut self,
        session: SessionId,
        character_id: impl Into<String>,
        name: impl Into<String>,
        race: impl Into<String>,
    ) -> Result<Vec<StatePatch>, RoomError> {
        let spawn = self
            .world
            .data()
            .location(&self.config.location)
            .map(|l| l.spawn_point)
            .ok_or_else(|| RoomError::UnknownLocation(self.config.location.clone()))?;
        let seed = PlayerSeed::new(name, race, self.config.location.clone(), spawn);
        self.join_with_seed(session, character_id.into(), &seed)
    }

    fn join_with_seed(
        &mut self,
        session: SessionId,
        character_id: String,
        seed: &PlayerSeed,
    ) -> Result<Vec<StatePatch>, RoomError> {
        if self.sessions.contains_key(&session) {
            return Err(RoomError::AlreadyJoined(session));
        }
        if self.sessions.len() >= self.config.max_clients {
            return Err(RoomError::Full(self.config.max_clients));
        }
        self.world.add_entity(session.clone(), seed)?;
        tracing::info!(session = %session, character = %character_id, "joined");
        self.sessions.insert(session, character_id);
        Ok(self.sync.full_snapshot())
    }

    /// Remove a session and return its character for a final save.
    pub fn leave(&mut self, session: &SessionId) -> Result<CharacterRecord, RoomError> {
        let Some(character_id) = self.sessions.remove(session) else {
            return Err(RoomError::NotJoined(session.clone()));
        };
        let entity = self
            .world
            .remove_entity(session)
            .ok_or_else(|| WorldError::EntityNotFound(session.clone()))?;
        tracing::info!(session = %session, character = %character_id, "left");
        Ok(CharacterRecord::capture(character_id, &entity))
    }

    /// Current state of every joined character.
    pub fn snapshot_characters(&self) -> Vec<CharacterRecord> {
        self.sessions
            .iter()
            .filter_map(|(session, character_id)| {
                self.world
                    .get(session)
                    .map(|e| CharacterRecord::capture(character_id.clone(), e))
            })
            .collect()
    }

    /// Advance wall-clock time by `dt_ms`, running as many fixed steps as fit.
    pub fn update(&mut self, dt_ms: f32) -> RoomFrame {
        let span = tracing::info_span!("room_update", location = %self.config.location);
        let _enter = span.enter();

        let mut frame = RoomFrame::default();
        let step = self.config.update_rate_ms;
        self.tick_accumulator_ms += dt_ms;
        while self.tick_accumulator_ms >= step {
            self.tick_accumulator_ms -= step;
            self.dispatch_commands();
            self.world.tick(step);
            frame.ticks += 1;
        }

        self.patch_timer_ms += dt_ms;
        if self.patch_timer_ms >= self.config.patch_rate_ms {
            self.patch_timer_ms %= self.config.patch_rate_ms;
            let patches = self.sync.diff(self.world.entities());
            if !patches.is_empty() {
                frame.patch = Some(PatchFrame {
                    tick: self.world.tick_count(),
                    server_time_ms: self.world.server_time_ms(),
                    patches,
                });
            }
        }

        frame.saves = std::mem::take(&mut self.pending_saves);
        self.save_timer_ms += dt_ms;
        if self.save_timer_ms >= self.config.save_interval_ms {
            self.save_timer_ms %= self.config.save_interval_ms;
            frame.saves.extend(self.snapshot_characters());
        }

        frame.notifications = self.world.drain_notifications();
        tracing::trace!(
            ticks = frame.ticks,
            saves = frame.saves.len(),
            notifications = frame.notifications.len(),
            "room updated"
        );
        frame
    }

    fn dispatch_commands(&mut self) {
        for envelope in self.queue.drain() {
            let name = envelope.command.name();
            let session = envelope.session.clone();
            if !self.sessions.contains_key(&session) {
                tracing::warn!(session = %session, command = name, "command from unknown session dropped");
                continue;
            }
            if let Err(e) = self.apply(envelope) {
                tracing::warn!(session = %session, command = name, error = %e, "command dropped");
            }
        }
    }

    fn apply(&mut self, Envelope { session, command }: Envelope) -> Result<(), WorldError> {
        match command {
            Command::PlayerInput(input) => {
                self.world.process_player_input(&session, input)?;
            }
            Command::AbilityKey { target_id, digit } => {
                self.world.start_cast(&session, digit, target_id)?;
            }
            Command::LearnSkill { ability_key } => {
                self.world.learn_ability(&session, &ability_key)?;
            }
            Command::PickupItem { session_id } => {
                self.world.set_target(&session, &session_id)?;
            }
            Command::ResetPosition => self.world.reset_position(&session)?,
            Command::RevivePressed => {
                self.world.ressurect(&session)?;
            }
            Command::Teleport { location_key } => {
                self.world.teleport(&session, &location_key)?;
                if let (Some(character_id), Some(entity)) =
                    (self.sessions.get(&session), self.world.get(&session))
                {
                    self.pending_saves
                        .push(CharacterRecord::capture(character_id.clone(), entity));
                }
            }
            Command::MoveTo { x, y, z } => {
                self.world
                    .set_destination(&session, glam::Vec3::new(x, y, z))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonesim_common::{EntityState, PlayerInput};
    use zonesim_kernel::NotificationKind;
    use zonesim_nav::GridNavMesh;
    use zonesim_sync::apply_patches;

    fn quiet_room(max_clients: usize) -> Room {
        let mut config = RoomConfig {
            seed: Some(11),
            max_clients,
            ..RoomConfig::default()
        };
        config.world.max_ai_entities = 0;
        config.world.regeneration = false;
        Room::new(
            config,
            Arc::new(GameData::builtin()),
            Box::new(GridNavMesh::open_field(40, 1.0)),
        )
        .unwrap()
    }

    fn sid(s: &str) -> SessionId {
        SessionId::from(s)
    }

    #[test]
    fn unknown_location_is_rejected() {
        let config = RoomConfig {
            location: "atlantis".into(),
            ..RoomConfig::default()
        };
        let err = Room::new(
            config,
            Arc::new(GameData::builtin()),
            Box::new(GridNavMesh::open_field(4, 1.0)),
        )
        .unwrap_err();
        assert!(matches!(err, RoomError::UnknownLocation(_)));
    }

    #[test]
    fn join_respects_capacity_and_duplicates() {
        let mut room = quiet_room(1);
        room.join_new(sid("a"), "char-a", "Sam", "player_hobbit")
            .unwrap();
        assert!(matches!(
            room.join_new(sid("a"), "char-a", "Sam", "player_hobbit"),
            Err(RoomError::AlreadyJoined(_))
        ));
        assert!(matches!(
            room.join_new(sid("b"), "char-b", "Pip", "player_hobbit"),
            Err(RoomError::Full(1))
        ));
        assert_eq!(room.session_count(), 1);
    }

    #[test]
    fn bad_race_leaves_no_session() {
        let mut room = quiet_room(4);
        assert!(matches!(
            room.join_new(sid("a"), "char-a", "Sam", "dragon"),
            Err(RoomError::World(WorldError::UnknownRace(_)))
        ));
        assert!(!room.is_joined(&sid("a")));
    }

    #[test]
    fn commands_apply_on_next_step_only() {
        let mut room = quiet_room(4);
        room.join_new(sid("a"), "char-a", "Sam", "player_hobbit")
            .unwrap();
        let start = room.world().get(&sid("a")).unwrap().position;

        room.sender()
            .send(
                sid("a"),
                Command::PlayerInput(PlayerInput {
                    h: 1.0,
                    v: 0.0,
                    seq: 3,
                }),
            )
            .unwrap();
        assert_eq!(room.world().get(&sid("a")).unwrap().position, start);

        let frame = room.update(50.0);
        assert_eq!(frame.ticks, 0);
        assert_eq!(room.world().get(&sid("a")).unwrap().position, start);

        let frame = room.update(50.0);
        assert_eq!(frame.ticks, 1);
        let entity = room.world().get(&sid("a")).unwrap();
        assert_eq!(entity.sequence, 3);
        assert!((entity.position.x - (start.x - 0.55)).abs() < 1e-4);
    }

    #[test]
    fn commands_from_strangers_are_dropped() {
        let mut room = quiet_room(4);
        room.join_new(sid("a"), "char-a", "Sam", "player_hobbit")
            .unwrap();
        room.sender()
            .send(sid("ghost"), Command::RevivePressed)
            .unwrap();
        room.sender()
            .send(sid("a"), Command::LearnSkill { ability_key: "nope".into() })
            .unwrap();
        let frame = room.update(100.0);
        assert_eq!(frame.ticks, 1);
        assert_eq!(room.session_count(), 1);
    }

    #[test]
    fn patches_follow_patch_rate_and_rebuild_state() {
        let mut room = quiet_room(4);
        room.join_new(sid("a"), "char-a", "Sam", "player_hobbit")
            .unwrap();
        let mut mirror = BTreeMap::new();

        let frame = room.update(100.0);
        let patch = frame.patch.expect("first patch adds the player");
        apply_patches(&mut mirror, &patch.patches);
        assert_eq!(mirror.len(), 1);

        room.sender()
            .send(sid("a"), Command::move_to(glam::Vec3::new(0.0, 0.0, 0.0)))
            .unwrap();
        for _ in 0..5 {
            if let Some(patch) = room.update(100.0).patch {
                apply_patches(&mut mirror, &patch.patches);
            }
        }
        let live = room.world().get(&sid("a")).unwrap();
        assert_eq!(mirror[&sid("a")].position, live.position);

        // A joining client gets what was last broadcast.
        room.join_new(sid("b"), "char-b", "Pip", "player_hobbit")
            .unwrap();
        let snapshot = room.join_new(sid("c"), "char-c", "Merry", "player_hobbit");
        assert_eq!(snapshot.unwrap().len(), 1);
    }

    #[test]
    fn periodic_save_snapshots_every_player() {
        let mut room = quiet_room(4);
        room.join_new(sid("a"), "char-a", "Sam", "player_hobbit")
            .unwrap();
        room.join_new(sid("b"), "char-b", "Pip", "player_hobbit")
            .unwrap();
        let mut saves = Vec::new();
        for _ in 0..9 {
            saves.extend(room.update(100.0).saves);
        }
        assert!(saves.is_empty());
        let frame = room.update(100.0);
        let ids: Vec<_> = frame.saves.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["char-a", "char-b"]);
    }

    #[test]
    fn teleport_confirms_and_saves_immediately() {
        let mut room = quiet_room(4);
        room.join_new(sid("a"), "char-a", "Sam", "player_hobbit")
            .unwrap();
        room.sender()
            .send(
                sid("a"),
                Command::Teleport {
                    location_key: "lh_dungeon_01".into(),
                },
            )
            .unwrap();
        let frame = room.update(100.0);
        assert_eq!(frame.saves.len(), 1);
        assert_eq!(frame.saves[0].location, "lh_dungeon_01");
        assert!(frame.notifications.iter().any(|n| n.is_for(&sid("a"))
            && matches!(n.kind, NotificationKind::PlayerTeleportConfirm { .. })));
    }

    #[test]
    fn leave_returns_final_record_and_rejoin_restores_it() {
        let mut room = quiet_room(4);
        room.join_new(sid("a"), "char-a", "Sam", "player_hobbit")
            .unwrap();
        room.world_mut().get_mut(&sid("a")).unwrap().experience = 37;

        let record = room.leave(&sid("a")).unwrap();
        assert_eq!(record.id, "char-a");
        assert_eq!(record.experience, 37);
        assert!(room.world().get(&sid("a")).is_none());
        assert!(matches!(
            room.leave(&sid("a")),
            Err(RoomError::NotJoined(_))
        ));

        room.join(sid("a2"), &record).unwrap();
        let entity = room.world().get(&sid("a2")).unwrap();
        assert_eq!(entity.experience, 37);
        assert_eq!(entity.name, "Sam");
    }

    #[test]
    fn revive_command_brings_player_back() {
        let mut room = quiet_room(4);
        room.join_new(sid("a"), "char-a", "Sam", "player_hobbit")
            .unwrap();
        {
            let entity = room.world_mut().get_mut(&sid("a")).unwrap();
            entity.health = 0.0;
            entity.state = EntityState::Dead;
        }
        room.sender().send(sid("a"), Command::RevivePressed).unwrap();
        room.update(100.0);
        let entity = room.world().get(&sid("a")).unwrap();
        assert!(entity.is_alive());
        assert_eq!(entity.health, entity.max_health);
    }
}
