use crate::{
    AbilityDef, AbilityEffect, DeltaOp, EffectKind, LocationDef, RaceDef, Requirement, StatDelta,
};
use glam::Vec3;
use std::collections::BTreeMap;
use zonesim_common::{Placement, Stat};

fn delta(stat: Stat, op: DeltaOp, min: f32, max: f32) -> StatDelta {
    StatDelta { stat, op, min, max }
}

fn requires(stat: Stat, amount: f32) -> Requirement {
    Requirement { stat, amount }
}

fn effect(kind: EffectKind, particle: &str, color: &str) -> AbilityEffect {
    AbilityEffect {
        kind,
        particle: particle.into(),
        color: color.into(),
    }
}

pub(crate) fn abilities() -> Vec<AbilityDef> {
    vec![
        AbilityDef {
            key: "base_attack".into(),
            title: "Attack".into(),
            description: "A unimpressive attack that deals very little damage.".into(),
            cast_time_ms: 0.0,
            cooldown_ms: 1000.0,
            repeat: 0,
            repeat_interval_ms: 0.0,
            range: 3.0,
            min_range: 0.0,
            effect: effect(EffectKind::Target, "damage", "white"),
            affinity: Some(Stat::Strength),
            caster_deltas: vec![],
            target_deltas: vec![delta(Stat::Health, DeltaOp::Remove, 3.0, 6.0)],
            required_to_learn: vec![],
        },
        AbilityDef {
            key: "fireball".into(),
            title: "Fireball".into(),
            description: "Hurls a massive fiery ball that explodes on contact with target.".into(),
            cast_time_ms: 1000.0,
            cooldown_ms: 1000.0,
            repeat: 0,
            repeat_interval_ms: 0.0,
            range: 0.0,
            min_range: 0.0,
            effect: effect(EffectKind::Travel, "fireball", "orange"),
            affinity: Some(Stat::Intelligence),
            caster_deltas: vec![delta(Stat::Mana, DeltaOp::Remove, 10.0, 10.0)],
            target_deltas: vec![delta(Stat::Health, DeltaOp::Remove, 5.0, 10.0)],
            required_to_learn: vec![requires(Stat::Level, 2.0)],
        },
        AbilityDef {
            key: "poisonball".into(),
            title: "Poison Cloud".into(),
            description: "Throws a bottle of poison onto the target, damaging it over time.".into(),
            cast_time_ms: 0.0,
            cooldown_ms: 10000.0,
            repeat: 5,
            repeat_interval_ms: 1000.0,
            range: 0.0,
            min_range: 0.0,
            effect: effect(EffectKind::Travel, "fireball", "green"),
            affinity: Some(Stat::Intelligence),
            caster_deltas: vec![delta(Stat::Mana, DeltaOp::Remove, 15.0, 15.0)],
            target_deltas: vec![delta(Stat::Health, DeltaOp::Remove, 2.0, 4.0)],
            required_to_learn: vec![
                requires(Stat::Level, 3.0),
                requires(Stat::Intelligence, 25.0),
            ],
        },
        AbilityDef {
            key: "heal".into(),
            title: "Heal".into(),
            description: "A spell from ancient times that leaves the target refreshed.".into(),
            cast_time_ms: 1000.0,
            cooldown_ms: 1000.0,
            repeat: 0,
            repeat_interval_ms: 0.0,
            range: 0.0,
            min_range: 0.0,
            effect: effect(EffectKind::SelfCast, "heal", "white"),
            affinity: Some(Stat::Wisdom),
            caster_deltas: vec![delta(Stat::Mana, DeltaOp::Remove, 10.0, 10.0)],
            target_deltas: vec![delta(Stat::Health, DeltaOp::Add, 20.0, 30.0)],
            required_to_learn: vec![
                requires(Stat::Level, 5.0),
                requires(Stat::Intelligence, 25.0),
                requires(Stat::Wisdom, 35.0),
            ],
        },
    ]
}

pub(crate) fn races() -> Vec<RaceDef> {
    vec![
        RaceDef {
            key: "player_hobbit".into(),
            name: "Hobbit".into(),
            speed: 0.3,
            max_health: 100.0,
            health_regen: 0.2,
            max_mana: 100.0,
            mana_regen: 0.4,
            abilities: BTreeMap::from([(1, "fireball".into()), (2, "heal".into())]),
            experience_reward: 0,
        },
        RaceDef {
            key: "monster_bear".into(),
            name: "Bear".into(),
            speed: 0.2,
            max_health: 200.0,
            health_regen: 0.2,
            max_mana: 100.0,
            mana_regen: 0.4,
            abilities: BTreeMap::new(),
            experience_reward: 20,
        },
        RaceDef {
            key: "monster_unicorn".into(),
            name: "Unicorn".into(),
            speed: 0.3,
            max_health: 100.0,
            health_regen: 0.2,
            max_mana: 100.0,
            mana_regen: 0.4,
            abilities: BTreeMap::new(),
            experience_reward: 10,
        },
    ]
}

pub(crate) fn locations() -> Vec<LocationDef> {
    vec![
        LocationDef {
            key: "lh_town".into(),
            title: "Town".into(),
            nav_mesh: "lh_town".into(),
            spawn_point: Placement {
                position: Vec3::new(7.5, 0.0, -14.27),
                rot: -std::f32::consts::PI,
            },
        },
        LocationDef {
            key: "lh_dungeon_01".into(),
            title: "Dungeon Level 1".into(),
            nav_mesh: "lh_dungeon_01".into(),
            spawn_point: Placement {
                position: Vec3::new(11.33, 0.0, -2.51),
                rot: -std::f32::consts::PI,
            },
        },
    ]
}
