//! Direct input and path following. Every committed position has been
//! accepted by the navigation mesh.

use crate::entity::Entity;
use glam::Vec3;
use zonesim_common::{EntityState, PlayerInput};
use zonesim_nav::NavMesh;

/// Result of applying one direct input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Moved,
    /// The mesh refused the move. Position kept, sequence still recorded.
    Rejected,
    /// The entity is blocked; nothing was processed.
    Blocked,
}

/// Result of one path-following step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep {
    /// No waypoints to follow.
    Idle,
    Moved,
    /// Reached the head waypoint and removed it.
    Arrived,
    /// The mesh refused the step; the destination was dropped for replanning.
    Invalidated,
}

/// Yaw after moving from `from` to `to`, in the same convention as direct
/// input: a step of `-(h, v)` faces `atan2(h, v)`.
pub fn rotation_between(from: Vec3, to: Vec3) -> f32 {
    (from.x - to.x).atan2(from.z - to.z)
}

/// Move at most `speed` along x and along z towards `target`, never overshooting.
pub fn step_toward(current: Vec3, target: Vec3, speed: f32) -> Vec3 {
    let axis = |from: f32, to: f32| {
        if to < from {
            (from - speed).max(to)
        } else if to > from {
            (from + speed).min(to)
        } else {
            from
        }
    };
    Vec3::new(axis(current.x, target.x), current.y, axis(current.z, target.z))
}

fn same_xz(a: Vec3, b: Vec3) -> bool {
    a.x == b.x && a.z == b.z
}

/// Apply a frame of strafe/forward intent.
///
/// Any pending destination is dropped. The sequence number is recorded for
/// accepted and rejected moves alike so the client can reconcile.
pub fn apply_player_input(
    entity: &mut Entity,
    input: PlayerInput,
    speed: f32,
    nav: &dyn NavMesh,
) -> InputOutcome {
    if entity.blocked {
        entity.state = EntityState::Idle;
        return InputOutcome::Blocked;
    }
    entity.clear_destination();

    let current = entity.position;
    let candidate = Vec3::new(
        current.x - input.h * speed,
        current.y,
        current.z - input.v * speed,
    );
    entity.sequence = input.seq;

    if !nav.check_path(current, candidate) {
        tracing::debug!(id = %entity.session_id, seq = input.seq, "input rejected by nav mesh");
        return InputOutcome::Rejected;
    }

    entity.position = candidate;
    entity.rot = input.h.atan2(input.v);
    if input.is_moving() {
        entity.state = EntityState::Walking;
    } else if entity.state == EntityState::Walking {
        entity.state = EntityState::Idle;
    }
    InputOutcome::Moved
}

/// Take one bounded step along the destination path.
pub fn follow_path(entity: &mut Entity, speed: f32, nav: &dyn NavMesh) -> PathStep {
    let Some(&head) = entity.destination_path.front() else {
        entity.to_region = None;
        if entity.state == EntityState::Walking {
            entity.state = EntityState::Idle;
        }
        return PathStep::Idle;
    };

    let current = entity.position;
    let next = step_toward(current, head, speed);
    if same_xz(next, current) {
        pop_waypoint(entity);
        return PathStep::Arrived;
    }

    if !nav.check_path(current, next) {
        tracing::debug!(id = %entity.session_id, "path invalidated, replanning");
        entity.clear_destination();
        return PathStep::Invalidated;
    }

    entity.position = next;
    entity.rot = rotation_between(current, next);
    entity.state = EntityState::Walking;
    if same_xz(next, head) {
        pop_waypoint(entity);
    }
    PathStep::Moved
}

fn pop_waypoint(entity: &mut Entity) {
    entity.destination_path.pop_front();
    if entity.destination_path.is_empty() {
        entity.to_region = None;
    }
}
