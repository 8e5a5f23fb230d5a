//! AI behaviour: a two-phase countdown machine plus random wandering.

use crate::config::WorldConfig;
use crate::entity::{AiBrain, AiPhase, Entity};
use rand::{Rng, RngCore};
use zonesim_nav::NavMesh;

/// Pick a new phase when the countdown has run out, then count down by a
/// jittered amount so entities drift out of sync with each other.
pub fn advance_phase(brain: &mut AiBrain, rng: &mut dyn RngCore, cfg: &WorldConfig) {
    if brain.remaining_ms <= 0.0 {
        brain.phase = if rng.random_bool(0.5) {
            AiPhase::Walking
        } else {
            AiPhase::Idle
        };
        brain.remaining_ms = if cfg.ai_max_phase_ms > 0.0 {
            rng.random_range(0.0..cfg.ai_max_phase_ms)
        } else {
            0.0
        };
    }
    brain.remaining_ms -= jitter(rng, cfg);
}

fn jitter(rng: &mut dyn RngCore, cfg: &WorldConfig) -> f32 {
    if cfg.ai_decrement_max_ms > cfg.ai_decrement_min_ms {
        rng.random_range(cfg.ai_decrement_min_ms..cfg.ai_decrement_max_ms)
    } else {
        cfg.ai_decrement_min_ms
    }
}

/// Give the entity a random destination if it has none.
///
/// Returns true if a non-empty path was assigned. An empty path leaves the
/// destination cleared so the next tick tries again.
pub fn plan_destination(entity: &mut Entity, nav: &dyn NavMesh, rng: &mut dyn RngCore) -> bool {
    if entity.to_region.is_some() {
        return false;
    }
    let Some(region) = nav.random_region(rng) else {
        return false;
    };
    let path = nav.find_path(entity.position, region.centroid);
    if path.is_empty() {
        tracing::trace!(id = %entity.session_id, "no path to random region");
    }
    entity.set_destination(region.centroid, path)
}

/// Whether the entity should take a movement step this tick.
pub fn wants_to_walk(entity: &Entity) -> bool {
    matches!(entity.ai, Some(AiBrain { phase: AiPhase::Walking, .. }))
        && entity.is_alive()
        && !entity.destination_path.is_empty()
}
