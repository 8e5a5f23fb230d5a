//! Nav mesh doubles and world builders shared by the kernel tests.

use crate::{PlayerSeed, World, WorldConfig};
use glam::Vec3;
use rand::{Rng, RngCore};
use std::collections::BTreeMap;
use std::sync::Arc;
use zonesim_common::{Placement, SessionId};
use zonesim_data::{GameData, RaceDef};
use zonesim_nav::{NavMesh, Region};

/// Everything is walkable and every point is directly reachable.
pub struct OpenNav;

impl NavMesh for OpenNav {
    fn find_path(&self, _from: Vec3, to: Vec3) -> Vec<Vec3> {
        vec![to]
    }

    fn check_path(&self, _from: Vec3, _to: Vec3) -> bool {
        true
    }

    fn random_region(&self, rng: &mut dyn RngCore) -> Option<Region> {
        Some(Region {
            centroid: Vec3::new(rng.random_range(-10.0..10.0), 0.0, rng.random_range(-10.0..10.0)),
        })
    }
}

/// Nothing is reachable.
pub struct WallNav;

impl NavMesh for WallNav {
    fn find_path(&self, _from: Vec3, _to: Vec3) -> Vec<Vec3> {
        Vec::new()
    }

    fn check_path(&self, _from: Vec3, _to: Vec3) -> bool {
        false
    }

    fn random_region(&self, _rng: &mut dyn RngCore) -> Option<Region> {
        Some(Region { centroid: Vec3::ONE })
    }
}

/// Builtin data plus a regen-free race for exact arithmetic.
pub fn test_data() -> GameData {
    let mut data = GameData::builtin();
    data.insert_race(RaceDef {
        key: "dummy".into(),
        name: "Dummy".into(),
        speed: 0.5,
        max_health: 100.0,
        health_regen: 0.0,
        max_mana: 100.0,
        mana_regen: 0.0,
        abilities: BTreeMap::from([
            (1, "fireball".into()),
            (2, "heal".into()),
            (3, "base_attack".into()),
            (4, "poisonball".into()),
        ]),
        experience_reward: 30,
    });
    data
}

/// Config with spawning and regeneration off.
pub fn quiet_config() -> WorldConfig {
    WorldConfig {
        max_ai_entities: 0,
        regeneration: false,
        ..WorldConfig::default()
    }
}

pub fn world_with(config: WorldConfig, nav: impl NavMesh + 'static) -> World {
    World::new(config, Arc::new(test_data()), "lh_town", Box::new(nav), Some(7)).unwrap()
}

pub fn quiet_world() -> World {
    world_with(quiet_config(), OpenNav)
}

/// Add a regen-free player at `at`.
pub fn add_dummy(world: &mut World, id: &str, at: Vec3) -> SessionId {
    let sid = SessionId::from(id);
    let seed = PlayerSeed::new(
        id,
        "dummy",
        "lh_town",
        Placement {
            position: at,
            rot: 0.0,
        },
    );
    world.add_entity(sid.clone(), &seed).unwrap();
    sid
}
