use crate::ability::PeriodicEffect;
use crate::config::WorldConfig;
use crate::entity::{Entity, PlayerSeed};
use crate::events::{AppliedDelta, Notification, NotificationKind};
use crate::movement::{self, InputOutcome};
use crate::{WorldError, ai};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use zonesim_common::{EntityState, Placement, PlayerInput, SessionId, Stat};
use zonesim_data::GameData;
use zonesim_nav::NavMesh;

/// The authoritative state of one location.
///
/// All mutations go through explicit operations and [`World::tick`]. Entities
/// live in a BTreeMap so iteration order, and with it every random draw, is
/// reproducible for a given seed and command sequence.
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) data: Arc<GameData>,
    pub(crate) nav: Box<dyn NavMesh>,
    location: String,
    pub(crate) entities: BTreeMap<SessionId, Entity>,
    pub(crate) rng: StdRng,
    tick: u64,
    server_time_ms: f64,
    spawn_timer_ms: f32,
    pub(crate) periodic: Vec<PeriodicEffect>,
    /// One-shot messages produced since the last drain.
    pub(crate) notifications: Vec<Notification>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("location", &self.location)
            .field("tick", &self.tick)
            .field("entities", &self.entities.len())
            .finish_non_exhaustive()
    }
}

impl World {
    /// Create an empty world for `location`. Without a seed the RNG is
    /// seeded from the OS.
    pub fn new(
        config: WorldConfig,
        data: Arc<GameData>,
        location: &str,
        nav: Box<dyn NavMesh>,
        seed: Option<u64>,
    ) -> Result<Self, WorldError> {
        if data.location(location).is_none() {
            return Err(WorldError::UnknownLocation(location.to_string()));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            config,
            data,
            nav,
            location: location.to_string(),
            entities: BTreeMap::new(),
            rng,
            tick: 0,
            server_time_ms: 0.0,
            spawn_timer_ms: 0.0,
            periodic: Vec::new(),
            notifications: Vec::new(),
        })
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Accumulated simulated time.
    pub fn server_time_ms(&self) -> f64 {
        self.server_time_ms
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn data(&self) -> &GameData {
        &self.data
    }

    pub fn nav(&self) -> &dyn NavMesh {
        self.nav.as_ref()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn ai_count(&self) -> usize {
        self.entities
            .values()
            .filter(|e| e.capabilities().ai_driven)
            .count()
    }

    /// Read-only access to all entities in deterministic order.
    pub fn entities(&self) -> &BTreeMap<SessionId, Entity> {
        &self.entities
    }

    pub fn get(&self, id: &SessionId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Take the notifications produced since the last drain.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub(crate) fn entity(&self, id: &SessionId) -> Result<&Entity, WorldError> {
        self.entities
            .get(id)
            .ok_or_else(|| WorldError::EntityNotFound(id.clone()))
    }

    pub(crate) fn entity_mut(&mut self, id: &SessionId) -> Result<&mut Entity, WorldError> {
        self.entities
            .get_mut(id)
            .ok_or_else(|| WorldError::EntityNotFound(id.clone()))
    }

    fn spawn_point(&self) -> Result<Placement, WorldError> {
        self.data
            .location(&self.location)
            .map(|l| l.spawn_point)
            .ok_or_else(|| WorldError::UnknownLocation(self.location.clone()))
    }

    /// Add a player from its character data.
    ///
    /// A character saved in another location starts at this location's spawn point.
    pub fn add_entity(&mut self, id: SessionId, seed: &PlayerSeed) -> Result<&Entity, WorldError> {
        if self.entities.contains_key(&id) {
            return Err(WorldError::DuplicateEntity(id));
        }
        let race = self
            .data
            .race(&seed.race)
            .ok_or_else(|| WorldError::UnknownRace(seed.race.clone()))?;
        let mut entity = Entity::player(id.clone(), seed, race);
        if seed.location != self.location {
            let spawn = self.spawn_point()?;
            entity.location = self.location.clone();
            entity.position = spawn.position;
            entity.rot = spawn.rot;
        }
        tracing::info!(id = %id, name = %entity.name, race = %entity.race, "player added");
        Ok(self.entities.entry(id).or_insert(entity))
    }

    /// Remove an entity. A missing id is logged and ignored.
    pub fn remove_entity(&mut self, id: &SessionId) -> Option<Entity> {
        let removed = self.entities.remove(id);
        match &removed {
            Some(_) => tracing::info!(id = %id, "entity removed"),
            None => tracing::warn!(id = %id, "remove of unknown entity ignored"),
        }
        removed
    }

    /// Create an AI monster at `position` with an initial random destination.
    pub fn spawn_monster(&mut self, race: &str, position: Vec3) -> Result<SessionId, WorldError> {
        let race = self
            .data
            .race(race)
            .ok_or_else(|| WorldError::UnknownRace(race.to_string()))?;
        let id = SessionId::from_uuid(Uuid::from_bytes(self.rng.random()));
        let mut entity = Entity::monster(id.clone(), race, &self.location, position);
        ai::plan_destination(&mut entity, self.nav.as_ref(), &mut self.rng);
        tracing::debug!(id = %id, race = %entity.race, "monster spawned");
        self.entities.insert(id.clone(), entity);
        Ok(id)
    }

    /// Apply one frame of direct movement input.
    ///
    /// Moving while casting cancels the cast.
    pub fn process_player_input(
        &mut self,
        id: &SessionId,
        input: PlayerInput,
    ) -> Result<InputOutcome, WorldError> {
        let entity = self.entity(id)?;
        if !entity.is_alive() {
            return Err(WorldError::EntityDead(id.clone()));
        }
        if input.is_moving() && entity.is_casting() && !entity.blocked {
            self.cancel_cast(id)?;
        }
        let Some(entity) = self.entities.get_mut(id) else {
            return Err(WorldError::EntityNotFound(id.clone()));
        };
        Ok(movement::apply_player_input(
            entity,
            input,
            self.config.player_speed,
            self.nav.as_ref(),
        ))
    }

    /// Path towards `to`. Returns false, with the destination cleared, when
    /// the mesh has no route.
    pub fn set_destination(&mut self, id: &SessionId, to: Vec3) -> Result<bool, WorldError> {
        let Some(entity) = self.entities.get_mut(id) else {
            return Err(WorldError::EntityNotFound(id.clone()));
        };
        if !entity.is_alive() {
            return Err(WorldError::EntityDead(id.clone()));
        }
        let path = self.nav.find_path(entity.position, to);
        Ok(entity.set_destination(to, path))
    }

    pub fn set_target(&mut self, id: &SessionId, target: &SessionId) -> Result<(), WorldError> {
        self.entity(target)?;
        self.entity_mut(id)?.target = Some(target.clone());
        Ok(())
    }

    pub fn set_blocked(&mut self, id: &SessionId, blocked: bool) -> Result<(), WorldError> {
        self.entity_mut(id)?.blocked = blocked;
        Ok(())
    }

    /// Snap back to the location's spawn point.
    pub fn reset_position(&mut self, id: &SessionId) -> Result<(), WorldError> {
        let spawn = self.spawn_point()?;
        let entity = self.entity_mut(id)?;
        entity.position = spawn.position;
        entity.rot = spawn.rot;
        entity.clear_destination();
        Ok(())
    }

    /// Bring a dead entity back. Returns false if it was alive already.
    pub fn ressurect(&mut self, id: &SessionId) -> Result<bool, WorldError> {
        let fraction = self.config.revive_health_fraction;
        let entity = self.entity_mut(id)?;
        if entity.is_alive() {
            return Ok(false);
        }
        entity.health = (entity.max_health * fraction).clamp(f32::MIN_POSITIVE, entity.max_health);
        entity.state = EntityState::Idle;
        entity.dead_for_ms = 0.0;
        tracing::info!(id = %id, health = entity.health, "entity revived");
        Ok(true)
    }

    /// Move an entity to another location's spawn point and confirm to its client.
    pub fn teleport(&mut self, id: &SessionId, location_key: &str) -> Result<(), WorldError> {
        let spawn = self
            .data
            .location(location_key)
            .map(|l| l.spawn_point)
            .ok_or_else(|| WorldError::UnknownLocation(location_key.to_string()))?;
        self.entity(id)?;
        self.cancel_cast(id)?;
        let entity = self.entity_mut(id)?;
        entity.location = location_key.to_string();
        entity.position = spawn.position;
        entity.rot = spawn.rot;
        entity.clear_destination();
        tracing::info!(id = %id, location = location_key, "teleported");
        self.notifications.push(Notification::to_session(
            id,
            NotificationKind::PlayerTeleportConfirm {
                location: location_key.to_string(),
            },
        ));
        Ok(())
    }

    /// Advance the simulation by `dt_ms`.
    ///
    /// Order: spawner, then every entity (regeneration, movement or AI,
    /// cooldowns and casts), then periodic effects.
    pub fn tick(&mut self, dt_ms: f32) {
        self.tick += 1;
        self.server_time_ms += f64::from(dt_ms);
        let span = tracing::info_span!("tick", tick = self.tick, location = %self.location);
        let _enter = span.enter();

        self.tick_spawner(dt_ms);

        let ids: Vec<SessionId> = self.entities.keys().cloned().collect();
        for id in &ids {
            if !self.entities.contains_key(id) {
                continue;
            }
            if let Err(e) = self.tick_entity(id, dt_ms) {
                tracing::warn!(id = %id, error = %e, "entity update failed");
            }
        }

        self.tick_periodic(dt_ms);
    }

    fn tick_spawner(&mut self, dt_ms: f32) {
        self.spawn_timer_ms += dt_ms;
        if self.spawn_timer_ms < self.config.spawn_interval_ms {
            return;
        }
        self.spawn_timer_ms = 0.0;
        if self.ai_count() >= self.config.max_ai_entities || self.config.monster_races.is_empty() {
            return;
        }
        let pick = self.rng.random_range(0..self.config.monster_races.len());
        let race = self.config.monster_races[pick].clone();
        let Some(region) = self.nav.random_region(&mut self.rng) else {
            tracing::debug!("no region to spawn in");
            return;
        };
        if let Err(e) = self.spawn_monster(&race, region.centroid) {
            tracing::warn!(race = %race, error = %e, "spawn failed");
        }
    }

    fn tick_entity(&mut self, id: &SessionId, dt_ms: f32) -> Result<(), WorldError> {
        let Some(entity) = self.entities.get_mut(id) else {
            return Err(WorldError::EntityNotFound(id.clone()));
        };

        if !entity.is_alive() {
            entity.cooldowns.retain(|_, left| {
                *left -= dt_ms;
                *left > 0.0
            });
            if entity.capabilities().ai_driven {
                entity.dead_for_ms += dt_ms;
                if entity.dead_for_ms >= self.config.corpse_despawn_ms {
                    self.entities.remove(id);
                    tracing::debug!(id = %id, "corpse despawned");
                }
            }
            return Ok(());
        }

        if self.config.regeneration {
            let secs = dt_ms / 1000.0;
            let (health, mana) = (entity.health_regen * secs, entity.mana_regen * secs);
            entity.adjust_pool(Stat::Health, health);
            entity.adjust_pool(Stat::Mana, mana);
        }

        let before = entity.position;
        self.tick_movement(id)?;
        let entity = self.entity_mut(id)?;
        if !entity.position.is_finite() {
            entity.position = before;
            entity.clear_destination();
            return Err(WorldError::InvalidState {
                id: id.clone(),
                reason: "non-finite position".into(),
            });
        }

        self.tick_abilities(id, dt_ms)
    }

    fn tick_movement(&mut self, id: &SessionId) -> Result<(), WorldError> {
        let Some(entity) = self.entities.get_mut(id) else {
            return Err(WorldError::EntityNotFound(id.clone()));
        };
        if entity.blocked || !entity.capabilities().movable {
            return Ok(());
        }

        if let Some(brain) = entity.ai.as_mut() {
            ai::advance_phase(brain, &mut self.rng, &self.config);
        }

        if entity.capabilities().ai_driven {
            ai::plan_destination(entity, self.nav.as_ref(), &mut self.rng);
            if ai::wants_to_walk(entity) {
                let speed = entity.speed;
                movement::follow_path(entity, speed, self.nav.as_ref());
            } else if entity.state == EntityState::Walking {
                entity.state = EntityState::Idle;
            }
        } else if entity.to_region.is_some() || !entity.destination_path.is_empty() {
            movement::follow_path(entity, self.config.path_speed, self.nav.as_ref());
        }
        Ok(())
    }

    /// Apply already rolled pool changes, handling a resulting death.
    pub(crate) fn apply_rolled(
        &mut self,
        target: &SessionId,
        rolls: &[(Stat, f32)],
        source: Option<&SessionId>,
    ) -> Vec<AppliedDelta> {
        let Some(entity) = self.entities.get_mut(target) else {
            return Vec::new();
        };
        let was_alive = entity.is_alive();
        let applied: Vec<AppliedDelta> = rolls
            .iter()
            .map(|&(stat, amount)| AppliedDelta {
                stat,
                amount: entity.adjust_pool(stat, amount),
            })
            .collect();
        if was_alive && !entity.is_alive() {
            self.handle_death(target, source);
        }
        applied
    }

    fn handle_death(&mut self, victim: &SessionId, killer: Option<&SessionId>) {
        let Some(entity) = self.entities.get_mut(victim) else {
            return;
        };
        entity.state = EntityState::Dead;
        entity.clear_destination();
        entity.target = None;
        entity.dead_for_ms = 0.0;
        let cast = entity.cast.take();
        let reward = if entity.capabilities().ai_driven {
            self.data
                .race(&entity.race)
                .map(|r| r.experience_reward)
                .unwrap_or(0)
        } else {
            0
        };
        tracing::info!(victim = %victim, killer = ?killer.map(SessionId::as_str), "entity died");
        self.periodic.retain(|fx| fx.target != *victim);

        if let Some(cast) = cast {
            self.notifications.push(Notification::to_session(
                victim,
                NotificationKind::AbilityCancelCasting {
                    caster: victim.clone(),
                    digit: cast.digit,
                    ability: cast.ability,
                },
            ));
        }

        let Some(killer) = killer.filter(|k| *k != victim) else {
            return;
        };
        if let Some(player) = self
            .entities
            .get_mut(killer)
            .filter(|e| e.capabilities().persisted)
        {
            let levels = player.gain_experience(reward);
            if levels > 0 {
                tracing::info!(id = %killer, level = player.level, "level up");
            }
        }
    }

    /// Deterministic hash of the simulation state, for replay checks.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for (id, e) in &self.entities {
            mix(&mut h, id.as_str().as_bytes());
            for v in [e.position.x, e.position.y, e.position.z, e.rot, e.health, e.mana] {
                mix(&mut h, &v.to_le_bytes());
            }
            mix(&mut h, &[e.state as u8]);
            mix(&mut h, &e.sequence.to_le_bytes());
            mix(&mut h, &e.level.to_le_bytes());
            mix(&mut h, &e.experience.to_le_bytes());
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AiPhase;
    use crate::testing::{OpenNav, WallNav, add_dummy, quiet_config, quiet_world, world_with};
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn world_starts_empty() {
        let w = quiet_world();
        assert_eq!(w.tick_count(), 0);
        assert_eq!(w.entity_count(), 0);
        assert_eq!(w.location(), "lh_town");
    }

    #[test]
    fn unknown_location_is_rejected() {
        let r = World::new(
            WorldConfig::default(),
            Arc::new(GameData::builtin()),
            "atlantis",
            Box::new(OpenNav),
            None,
        );
        assert!(matches!(r, Err(WorldError::UnknownLocation(_))));
    }

    #[test]
    fn add_get_remove() {
        let mut w = quiet_world();
        let id = add_dummy(&mut w, "p1", Vec3::ZERO);
        assert!(w.get(&id).is_some());
        assert!(matches!(
            w.add_entity(id.clone(), &PlayerSeed::new("x", "dummy", "lh_town", Placement::default())),
            Err(WorldError::DuplicateEntity(_))
        ));
        assert!(w.remove_entity(&id).is_some());
        assert!(w.remove_entity(&id).is_none());
        assert_eq!(w.entity_count(), 0);
    }

    #[test]
    fn seed_from_other_location_starts_at_spawn() {
        let mut w = quiet_world();
        let seed = PlayerSeed::new(
            "Frodo",
            "player_hobbit",
            "lh_dungeon_01",
            Placement {
                position: Vec3::new(1.0, 0.0, 1.0),
                rot: 0.0,
            },
        );
        let e = w.add_entity(SessionId::from("f"), &seed).unwrap();
        assert_eq!(e.location, "lh_town");
        assert_eq!(e.position, Vec3::new(7.5, 0.0, -14.27));
    }

    #[test]
    fn commands_on_missing_entity_are_errors_without_effect() {
        let mut w = quiet_world();
        let other = add_dummy(&mut w, "p1", Vec3::ZERO);
        let ghost = SessionId::from("ghost");
        let input = PlayerInput { h: 1.0, v: 0.0, seq: 1 };
        assert!(matches!(
            w.process_player_input(&ghost, input),
            Err(WorldError::EntityNotFound(_))
        ));
        assert!(w.reset_position(&ghost).is_err());
        assert!(w.ressurect(&ghost).is_err());
        assert!(w.teleport(&ghost, "lh_dungeon_01").is_err());
        assert!(w.set_target(&other, &ghost).is_err());
        assert!(w.get(&other).unwrap().target.is_none());
        w.tick(100.0);
        assert_eq!(w.entity_count(), 1);
    }

    #[test]
    fn player_input_scenario() {
        let mut w = quiet_world();
        let id = add_dummy(&mut w, "p1", Vec3::ZERO);
        let out = w
            .process_player_input(&id, PlayerInput { h: 1.0, v: 0.0, seq: 5 })
            .unwrap();
        assert_eq!(out, InputOutcome::Moved);
        w.tick(100.0);
        let e = w.get(&id).unwrap();
        assert_eq!(e.position, Vec3::new(-0.55, 0.0, 0.0));
        assert!((e.rot - FRAC_PI_2).abs() < 1e-6);
        assert_eq!(e.sequence, 5);
    }

    #[test]
    fn input_against_walls_reverts() {
        let mut w = world_with(quiet_config(), WallNav);
        let id = add_dummy(&mut w, "p1", Vec3::new(3.0, 0.5, 2.0));
        let out = w
            .process_player_input(&id, PlayerInput { h: -1.0, v: 1.0, seq: 2 })
            .unwrap();
        assert_eq!(out, InputOutcome::Rejected);
        w.tick(100.0);
        let e = w.get(&id).unwrap();
        assert_eq!(e.position, Vec3::new(3.0, 0.5, 2.0));
        assert_eq!(e.sequence, 2);
    }

    #[test]
    fn waypoint_at_current_position_empties_path_without_replanning() {
        let mut w = quiet_world();
        let id = add_dummy(&mut w, "p1", Vec3::new(1.0, 0.0, 1.0));
        {
            let e = w.get_mut(&id).unwrap();
            e.to_region = Some(e.position);
            e.destination_path.push_back(e.position);
        }
        w.tick(100.0);
        let e = w.get(&id).unwrap();
        assert!(e.destination_path.is_empty());
        assert!(e.to_region.is_none());
        assert_eq!(e.position, Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn click_to_move_walks_to_target() {
        let mut w = quiet_world();
        let id = add_dummy(&mut w, "p1", Vec3::ZERO);
        assert!(w.set_destination(&id, Vec3::new(0.0, 0.0, 1.2)).unwrap());
        for _ in 0..3 {
            w.tick(100.0);
        }
        let e = w.get(&id).unwrap();
        assert_eq!(e.position, Vec3::new(0.0, 0.0, 1.2));
        assert!(e.to_region.is_none());
    }

    #[test]
    fn unreachable_destination_is_cleared() {
        let mut w = world_with(quiet_config(), WallNav);
        let id = add_dummy(&mut w, "p1", Vec3::ZERO);
        assert!(!w.set_destination(&id, Vec3::X).unwrap());
        let e = w.get(&id).unwrap();
        assert!(e.to_region.is_none());
        assert!(e.destination_path.is_empty());
    }

    #[test]
    fn blocked_player_ignores_input() {
        let mut w = quiet_world();
        let id = add_dummy(&mut w, "p1", Vec3::ZERO);
        w.set_blocked(&id, true).unwrap();
        let out = w
            .process_player_input(&id, PlayerInput { h: 1.0, v: 1.0, seq: 3 })
            .unwrap();
        assert_eq!(out, InputOutcome::Blocked);
        assert_eq!(w.get(&id).unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn spawner_respects_cap() {
        let cfg = WorldConfig {
            max_ai_entities: 5,
            ..WorldConfig::default()
        };
        let mut w = world_with(cfg, OpenNav);
        for _ in 0..200 {
            w.tick(100.0);
            assert!(w.ai_count() <= 5);
        }
        assert_eq!(w.ai_count(), 5);
    }

    #[test]
    fn spawned_monster_starts_full_and_idle_with_destination() {
        let mut w = quiet_world();
        let id = w.spawn_monster("monster_bear", Vec3::ZERO).unwrap();
        let e = w.get(&id).unwrap();
        assert_eq!(e.health, e.max_health);
        assert_eq!(e.ai.unwrap().phase, AiPhase::Idle);
        assert!(e.to_region.is_some());
        assert!(!e.destination_path.is_empty());
        assert!(w.spawn_monster("dragon", Vec3::ZERO).is_err());
    }

    #[test]
    fn monsters_wander() {
        let mut w = quiet_world();
        let id = w.spawn_monster("monster_unicorn", Vec3::ZERO).unwrap();
        for _ in 0..500 {
            w.tick(100.0);
        }
        assert_ne!(w.get(&id).unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn pools_stay_bounded() {
        let cfg = WorldConfig {
            max_ai_entities: 10,
            ..WorldConfig::default()
        };
        let mut w = world_with(cfg, OpenNav);
        let p = add_dummy(&mut w, "p1", Vec3::ZERO);
        w.get_mut(&p).unwrap().health = 40.0;
        for i in 0..300 {
            w.tick(100.0);
            if i % 10 == 0 {
                let target = w.entities().keys().find(|k| **k != p).cloned();
                let _ = w.start_cast(&p, 3, target);
            }
            for e in w.entities().values() {
                assert!((0.0..=e.max_health).contains(&e.health));
                assert!((0.0..=e.max_mana).contains(&e.mana));
            }
        }
    }

    #[test]
    fn same_seed_same_hash() {
        let cfg = WorldConfig {
            max_ai_entities: 8,
            ..WorldConfig::default()
        };
        let mut a = world_with(cfg.clone(), OpenNav);
        let mut b = world_with(cfg, OpenNav);
        for _ in 0..100 {
            a.tick(100.0);
            b.tick(100.0);
        }
        assert_eq!(a.state_hash(), b.state_hash());
        a.tick(100.0);
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn reset_position_snaps_to_spawn() {
        let mut w = quiet_world();
        let id = add_dummy(&mut w, "p1", Vec3::new(50.0, 0.0, 50.0));
        w.reset_position(&id).unwrap();
        w.reset_position(&id).unwrap();
        let e = w.get(&id).unwrap();
        assert_eq!(e.position, Vec3::new(7.5, 0.0, -14.27));
    }

    #[test]
    fn ressurect_only_when_dead() {
        let mut w = quiet_world();
        let id = add_dummy(&mut w, "p1", Vec3::ZERO);
        assert!(!w.ressurect(&id).unwrap());
        w.apply_rolled(&id, &[(Stat::Health, -500.0)], None);
        assert_eq!(w.get(&id).unwrap().state, EntityState::Dead);
        assert!(w.process_player_input(&id, PlayerInput { h: 1.0, v: 0.0, seq: 1 }).is_err());
        assert!(w.ressurect(&id).unwrap());
        let e = w.get(&id).unwrap();
        assert_eq!(e.health, e.max_health);
        assert_eq!(e.state, EntityState::Idle);
    }

    #[test]
    fn teleport_confirms_to_player() {
        let mut w = quiet_world();
        let id = add_dummy(&mut w, "p1", Vec3::ZERO);
        assert!(w.teleport(&id, "nowhere").is_err());
        w.teleport(&id, "lh_dungeon_01").unwrap();
        let e = w.get(&id).unwrap();
        assert_eq!(e.location, "lh_dungeon_01");
        assert_eq!(e.position, Vec3::new(11.33, 0.0, -2.51));
        let notes = w.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].is_for(&id));
        assert!(matches!(
            notes[0].kind,
            NotificationKind::PlayerTeleportConfirm { .. }
        ));
        assert!(w.notifications().is_empty());
    }

    #[test]
    fn killing_a_monster_grants_experience_and_corpse_despawns() {
        let mut w = quiet_world();
        let p = add_dummy(&mut w, "p1", Vec3::ZERO);
        let m = w.spawn_monster("monster_unicorn", Vec3::X).unwrap();
        w.apply_rolled(&m, &[(Stat::Health, -1000.0)], Some(&p));
        assert_eq!(w.get(&m).unwrap().state, EntityState::Dead);
        assert_eq!(w.get(&p).unwrap().experience, 10);

        let ticks = (w.config().corpse_despawn_ms / 100.0) as usize;
        for _ in 0..ticks {
            w.tick(100.0);
        }
        assert!(w.get(&m).is_none());
        assert!(w.get(&p).is_some());
    }

    #[test]
    fn regeneration_is_clamped() {
        let cfg = WorldConfig {
            max_ai_entities: 0,
            ..WorldConfig::default()
        };
        let mut w = world_with(cfg, OpenNav);
        let seed = PlayerSeed {
            health: Some(99.9),
            mana: Some(10.0),
            ..PlayerSeed::new("Sam", "player_hobbit", "lh_town", Placement::default())
        };
        let id = SessionId::from("sam");
        w.add_entity(id.clone(), &seed).unwrap();
        for _ in 0..10 {
            w.tick(100.0);
        }
        let e = w.get(&id).unwrap();
        assert_eq!(e.health, e.max_health);
        assert!((e.mana - 10.4).abs() < 1e-3);
    }
}
