use serde::{Deserialize, Serialize};

/// Tunables of the simulation. Every field has a default so partial YAML works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Distance per accepted direct input.
    pub player_speed: f32,
    /// Step length for players following a click-to-move path.
    pub path_speed: f32,
    pub spawn_interval_ms: f32,
    pub max_ai_entities: usize,
    /// Race keys the spawner picks from.
    pub monster_races: Vec<String>,
    pub ai_max_phase_ms: f32,
    /// Lower bound of the per-tick AI phase decrement.
    pub ai_decrement_min_ms: f32,
    /// Upper bound (exclusive) of the per-tick AI phase decrement.
    pub ai_decrement_max_ms: f32,
    /// Share of max health restored on revive.
    pub revive_health_fraction: f32,
    /// How long a dead AI entity stays before it is removed.
    pub corpse_despawn_ms: f32,
    pub regeneration: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            player_speed: 0.55,
            path_speed: 0.5,
            spawn_interval_ms: 300.0,
            max_ai_entities: 100,
            monster_races: vec!["monster_unicorn".into(), "monster_bear".into()],
            ai_max_phase_ms: 5000.0,
            ai_decrement_min_ms: 10.0,
            ai_decrement_max_ms: 110.0,
            revive_health_fraction: 1.0,
            corpse_despawn_ms: 10_000.0,
            regeneration: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: WorldConfig =
            serde_json::from_str(r#"{ "max_ai_entities": 3, "regeneration": false }"#).unwrap();
        assert_eq!(cfg.max_ai_entities, 3);
        assert!(!cfg.regeneration);
        assert_eq!(cfg.player_speed, 0.55);
        assert_eq!(cfg.monster_races.len(), 2);
    }
}
