//! Casting, cooldowns, effect resolution and learning.
//!
//! A cast is plain state on the caster: it advances by the tick delta and
//! resolves once the elapsed time reaches the cast time. Cancelling is
//! dropping that state.

use crate::entity::{ActiveCast, Entity};
use crate::events::{Notification, NotificationKind};
use crate::world::World;
use crate::{CastRejection, WorldError};
use rand::Rng;
use rand::rngs::StdRng;
use std::sync::Arc;
use zonesim_common::{EntityState, SessionId, Stat};
use zonesim_data::StatDelta;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    /// The cast is running and resolves on a later tick.
    Started,
    /// Zero cast time, resolved immediately.
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    Learned { digit: u8 },
    AlreadyKnown,
}

/// Remaining repeats of an ability's target deltas.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PeriodicEffect {
    pub caster: SessionId,
    pub target: SessionId,
    pub ability: String,
    pub remaining: u32,
    pub interval_ms: f32,
    pub until_next_ms: f32,
    /// Tick the effect was created on; its countdown starts on the next one.
    pub created_tick: u64,
}

fn roll(rng: &mut StdRng, delta: &StatDelta) -> (Stat, f32) {
    let magnitude = if delta.max > delta.min {
        rng.random_range(delta.min..=delta.max)
    } else {
        delta.min
    };
    (delta.stat, delta.signed(magnitude))
}

fn roll_all(rng: &mut StdRng, deltas: &[StatDelta]) -> Vec<(Stat, f32)> {
    deltas.iter().map(|d| roll(rng, d)).collect()
}

impl World {
    /// Start casting the ability bound to `digit`.
    ///
    /// Self abilities ignore `target`. Rejections leave the caster untouched.
    pub fn start_cast(
        &mut self,
        caster_id: &SessionId,
        digit: u8,
        target: Option<SessionId>,
    ) -> Result<CastOutcome, WorldError> {
        let data = Arc::clone(&self.data);
        let caster = self.entity(caster_id)?;
        if !caster.is_alive() {
            return Err(CastRejection::CasterDead.into());
        }
        let key = caster
            .abilities
            .get(&digit)
            .ok_or(CastRejection::NoAbilityOnDigit(digit))?;
        let def = data
            .ability(key)
            .ok_or_else(|| CastRejection::UnknownAbility(key.clone()))?;
        if caster.is_casting() {
            return Err(CastRejection::AlreadyCasting.into());
        }
        let remaining_ms = caster.cooldown_remaining(&def.key);
        if remaining_ms > 0.0 {
            return Err(CastRejection::OnCooldown {
                ability: def.key.clone(),
                remaining_ms,
            }
            .into());
        }
        let needed = def.max_cost(Stat::Mana);
        if caster.mana < needed {
            return Err(CastRejection::InsufficientMana {
                needed,
                available: caster.mana,
            }
            .into());
        }

        let target = if def.needs_target() {
            let target = target.ok_or(CastRejection::MissingTarget)?;
            match self.entities.get(&target) {
                None => return Err(CastRejection::TargetNotFound(target).into()),
                Some(t) if !t.is_alive() => return Err(CastRejection::TargetDead(target).into()),
                Some(_) => target,
            }
        } else {
            caster_id.clone()
        };

        let cast = ActiveCast {
            digit,
            ability: def.key.clone(),
            elapsed_ms: 0.0,
            target_duration_ms: def.cast_time_ms,
            target: Some(target.clone()),
        };
        if def.cast_time_ms <= 0.0 {
            self.resolve_cast(caster_id, cast);
            return Ok(CastOutcome::Resolved);
        }

        let caster = self.entity_mut(caster_id)?;
        caster.cast = Some(cast);
        caster.state = EntityState::Casting;
        tracing::debug!(caster = %caster_id, ability = %def.key, "cast started");
        self.notifications.push(Notification::to_session(
            caster_id,
            NotificationKind::AbilityStartCasting {
                caster: caster_id.clone(),
                digit,
                ability: def.key.clone(),
                cast_time_ms: def.cast_time_ms,
                target: Some(target),
            },
        ));
        Ok(CastOutcome::Started)
    }

    /// Drop a running cast. Returns false if nothing was being cast.
    pub fn cancel_cast(&mut self, id: &SessionId) -> Result<bool, WorldError> {
        let entity = self.entity_mut(id)?;
        let Some(cast) = entity.cast.take() else {
            return Ok(false);
        };
        if entity.state == EntityState::Casting {
            entity.state = EntityState::Idle;
        }
        tracing::debug!(id = %id, ability = %cast.ability, "cast cancelled");
        self.notifications.push(Notification::to_session(
            id,
            NotificationKind::AbilityCancelCasting {
                caster: id.clone(),
                digit: cast.digit,
                ability: cast.ability,
            },
        ));
        Ok(true)
    }

    /// Learn an ability if every requirement holds, binding it to the first
    /// free digit. Learning a known ability is a no-op.
    pub fn learn_ability(&mut self, id: &SessionId, key: &str) -> Result<LearnOutcome, WorldError> {
        let data = Arc::clone(&self.data);
        let def = data
            .ability(key)
            .ok_or_else(|| WorldError::UnknownAbility(key.to_string()))?;
        let entity = self.entity_mut(id)?;
        if entity.has_ability(key) {
            return Ok(LearnOutcome::AlreadyKnown);
        }
        if let Some(req) = def
            .required_to_learn
            .iter()
            .find(|r| entity.stat(r.stat) < r.amount)
        {
            return Err(WorldError::RequirementUnmet {
                stat: req.stat,
                amount: req.amount,
            });
        }
        let digit = (1..=9u8)
            .find(|d| !entity.abilities.contains_key(d))
            .ok_or(WorldError::NoFreeSlot)?;
        entity.abilities.insert(digit, def.key.clone());
        tracing::info!(id = %id, ability = key, digit, "ability learned");
        Ok(LearnOutcome::Learned { digit })
    }

    /// Count down cooldowns, then advance the running cast.
    pub(crate) fn tick_abilities(&mut self, id: &SessionId, dt_ms: f32) -> Result<(), WorldError> {
        let entity = self.entity_mut(id)?;
        entity.cooldowns.retain(|_, left| {
            *left -= dt_ms;
            *left > 0.0
        });
        let finished = match entity.cast.as_mut() {
            Some(cast) => {
                cast.elapsed_ms += dt_ms;
                cast.elapsed_ms >= cast.target_duration_ms
            }
            None => false,
        };
        if finished {
            if let Some(cast) = entity.cast.take() {
                self.resolve_cast(id, cast);
            }
        }
        Ok(())
    }

    fn resolve_cast(&mut self, caster_id: &SessionId, cast: ActiveCast) {
        let data = Arc::clone(&self.data);
        let Some(def) = data.ability(&cast.ability) else {
            tracing::warn!(caster = %caster_id, ability = %cast.ability, "cast of unknown ability dropped");
            return;
        };
        let caster_pos = match self.entities.get(caster_id) {
            Some(c) if c.is_alive() => c.position,
            _ => return,
        };

        let rolls = roll_all(&mut self.rng, &def.caster_deltas);
        let caster_changes = self.apply_rolled(caster_id, &rolls, Some(caster_id));

        let target_id = if def.needs_target() {
            cast.target.clone()
        } else {
            Some(caster_id.clone())
        };
        let reachable = target_id.as_ref().is_some_and(|t| {
            self.entities
                .get(t)
                .is_some_and(|e| e.is_alive() && def.in_range(e.position.distance(caster_pos)))
        });
        let mut target_changes = Vec::new();
        if let (true, Some(t)) = (reachable, target_id.as_ref()) {
            let rolls = roll_all(&mut self.rng, &def.target_deltas);
            target_changes = self.apply_rolled(t, &rolls, Some(caster_id));
            let alive = self.entities.get(t).is_some_and(Entity::is_alive);
            if def.repeat > 0 && alive {
                self.periodic.push(PeriodicEffect {
                    caster: caster_id.clone(),
                    target: t.clone(),
                    ability: def.key.clone(),
                    remaining: def.repeat,
                    interval_ms: def.repeat_interval_ms,
                    until_next_ms: def.repeat_interval_ms,
                    created_tick: self.tick_count(),
                });
            }
        } else {
            tracing::debug!(caster = %caster_id, ability = %def.key, "target missing or out of range");
        }

        if let Some(caster) = self.entities.get_mut(caster_id) {
            if def.cooldown_ms > 0.0 && caster.capabilities().has_cooldowns {
                caster.cooldowns.insert(def.key.clone(), def.cooldown_ms);
            }
            if caster.state == EntityState::Casting {
                caster.state = EntityState::Idle;
            }
        }

        self.notifications.push(Notification::broadcast(
            NotificationKind::EntityAbilityCast {
                caster: caster_id.clone(),
                target: target_id,
                ability: def.key.clone(),
                digit: cast.digit,
                effect: def.effect.clone(),
                projectile: def.is_projectile(),
                hit: reachable,
                caster_changes,
                target_changes,
            },
        ));
    }

    /// Apply due repeats. A dead or missing target ends the effect.
    pub(crate) fn tick_periodic(&mut self, dt_ms: f32) {
        if self.periodic.is_empty() {
            return;
        }
        let data = Arc::clone(&self.data);
        let now = self.tick_count();
        let mut effects = std::mem::take(&mut self.periodic);
        effects.retain_mut(|fx| {
            let Some(def) = data.ability(&fx.ability) else {
                return false;
            };
            if fx.created_tick == now {
                return true;
            }
            fx.until_next_ms -= dt_ms;
            while fx.remaining > 0 && fx.until_next_ms <= 0.0 {
                if !self.entities.get(&fx.target).is_some_and(Entity::is_alive) {
                    return false;
                }
                let rolls = roll_all(&mut self.rng, &def.target_deltas);
                self.apply_rolled(&fx.target, &rolls, Some(&fx.caster));
                fx.remaining -= 1;
                fx.until_next_ms += fx.interval_ms;
            }
            fx.remaining > 0 && self.entities.get(&fx.target).is_some_and(Entity::is_alive)
        });
        effects.append(&mut self.periodic);
        self.periodic = effects;
    }
}
