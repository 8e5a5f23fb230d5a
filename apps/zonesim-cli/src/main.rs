use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use zonesim_common::{PlayerInput, SessionId};
use zonesim_data::GameData;
use zonesim_input::Command;
use zonesim_kernel::NotificationKind;
use zonesim_nav::{GridNavMesh, NavMesh};
use zonesim_persist::{
    CharacterStore, FileCharacterStore, MemoryCharacterStore, SaveWorker, StoreError,
};
use zonesim_room::{Room, RoomConfig};

#[derive(Parser)]
#[command(name = "zonesim", about = "Headless authoritative zone server")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one room with simulated clients
    Run {
        /// Room configuration (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Game data (JSON); builtin data when absent
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Directory of `<nav_mesh>.navmesh.json` files; open field when absent
        #[arg(long)]
        nav_dir: Option<PathBuf>,
        /// Character store directory; in-memory when absent
        #[arg(long)]
        store: Option<PathBuf>,
        /// Number of simulated clients
        #[arg(long, default_value = "4")]
        clients: usize,
        /// Number of room updates to run
        #[arg(short, long, default_value = "100")]
        ticks: u64,
        /// Overrides the seed from the config
        #[arg(short, long)]
        seed: Option<u64>,
        /// Sleep between updates to run at wall-clock pace
        #[arg(long)]
        realtime: bool,
    },
    /// Validate game data and optionally write it out as JSON
    Data {
        /// Game data (JSON); builtin data when absent
        file: Option<PathBuf>,
        /// Write the (validated) data to this path
        #[arg(long)]
        dump: Option<PathBuf>,
    },
    /// Probe a nav mesh file with a segment check and a path query
    Nav {
        file: PathBuf,
        /// Start as x,y,z
        #[arg(long, value_delimiter = ',', num_args = 3)]
        from: Vec<f32>,
        /// End as x,y,z
        #[arg(long, value_delimiter = ',', num_args = 3)]
        to: Vec<f32>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Run {
            config,
            data,
            nav_dir,
            store,
            clients,
            ticks,
            seed,
            realtime,
        } => {
            let mut room_config = match config {
                Some(path) => RoomConfig::load(&path)
                    .with_context(|| format!("load room config {}", path.display()))?,
                None => RoomConfig::default(),
            };
            if seed.is_some() {
                room_config.seed = seed;
            }
            let data = Arc::new(load_data(data.as_deref())?);
            run(RunOptions {
                config: room_config,
                data,
                nav_dir,
                store,
                clients,
                ticks,
                realtime,
            })?;
        }
        Commands::Data { file, dump } => {
            let data = load_data(file.as_deref())?;
            println!(
                "game data ok: {} abilities, {} races, {} locations",
                data.abilities().len(),
                data.races().len(),
                data.locations().len()
            );
            if let Some(out) = dump {
                data.save(&out)
                    .with_context(|| format!("write game data {}", out.display()))?;
                println!("written to {}", out.display());
            }
        }
        Commands::Nav { file, from, to } => {
            let mesh = GridNavMesh::load(&file)
                .with_context(|| format!("load nav mesh {}", file.display()))?;
            let (from, to) = (vec3(&from)?, vec3(&to)?);
            println!(
                "regions: {}, cell size: {}",
                mesh.region_count(),
                mesh.cell_size()
            );
            println!("check_path: {}", mesh.check_path(from, to));
            let path = mesh.find_path(from, to);
            if path.is_empty() {
                println!("find_path: unreachable");
            } else {
                println!("find_path: {} waypoints", path.len());
                for p in &path {
                    println!("  ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z);
                }
            }
        }
    }

    Ok(())
}

struct RunOptions {
    config: RoomConfig,
    data: Arc<GameData>,
    nav_dir: Option<PathBuf>,
    store: Option<PathBuf>,
    clients: usize,
    ticks: u64,
    realtime: bool,
}

fn run(opts: RunOptions) -> anyhow::Result<()> {
    let location = opts
        .data
        .location(&opts.config.location)
        .with_context(|| format!("unknown location {}", opts.config.location))?;
    let nav: Box<dyn NavMesh> = match &opts.nav_dir {
        Some(dir) => Box::new(zonesim_nav::load_nav_mesh(dir, &location.nav_mesh)?),
        None => Box::new(GridNavMesh::open_field(64, 1.0)),
    };

    let store: Box<dyn CharacterStore> = match &opts.store {
        Some(dir) => Box::new(FileCharacterStore::open(dir)?),
        None => Box::new(MemoryCharacterStore::new()),
    };

    let step_ms = opts.config.update_rate_ms;
    let mut rng = match opts.config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_os_rng(),
    };
    let mut room = Room::new(opts.config, Arc::clone(&opts.data), nav)?;

    let mut sessions = Vec::with_capacity(opts.clients);
    for i in 0..opts.clients {
        let session = SessionId::new(format!("session-{i}"));
        let character_id = format!("client-{i}");
        match store.load_character(&character_id) {
            Ok(record) => {
                room.join(session.clone(), &record)?;
            }
            Err(StoreError::NotFound(_)) => {
                room.join_new(
                    session.clone(),
                    character_id,
                    format!("Client {i}"),
                    "player_hobbit",
                )?;
            }
            Err(e) => return Err(e.into()),
        }
        sessions.push(session);
    }

    let worker = SaveWorker::spawn(store)?;
    let sender = room.sender();
    tracing::info!(
        clients = sessions.len(),
        ticks = opts.ticks,
        step_ms,
        realtime = opts.realtime,
        "simulation started"
    );
    let mut patch_bytes = 0usize;
    let mut casts = 0usize;

    for _ in 0..opts.ticks {
        for session in &sessions {
            for command in simulated_commands(&room, session, &mut rng) {
                sender.send(session.clone(), command)?;
            }
        }

        let frame = room.update(step_ms);
        if let Some(patch) = &frame.patch {
            patch_bytes += patch.encode()?.len();
        }
        casts += frame
            .notifications
            .iter()
            .filter(|n| matches!(n.kind, NotificationKind::EntityAbilityCast { .. }))
            .count();
        worker.submit(frame.saves)?;

        if opts.realtime {
            std::thread::sleep(Duration::from_secs_f32(step_ms / 1000.0));
        }
    }

    let mut finals = Vec::with_capacity(sessions.len());
    for session in &sessions {
        finals.push(room.leave(session)?);
    }
    worker.submit(finals)?;
    let stats = worker.shutdown();
    if stats.failed > 0 {
        tracing::warn!(failed = stats.failed, "some characters were not saved");
    }

    let world = room.world();
    println!(
        "ran {} ticks at {}: {} entities ({} ai), {} casts resolved",
        world.tick_count(),
        world.location(),
        world.entity_count(),
        world.ai_count(),
        casts
    );
    println!("patch bytes: {patch_bytes}");
    println!("saves: {} ok, {} failed", stats.saved, stats.failed);
    println!("state hash: {:016x}", world.state_hash());
    Ok(())
}

/// What a scripted client sends this step: wander, attack a nearby monster,
/// revive when dead.
fn simulated_commands(
    room: &Room,
    session: &SessionId,
    rng: &mut StdRng,
) -> Vec<Command> {
    let world = room.world();
    let Some(me) = world.get(session) else {
        return Vec::new();
    };
    if !me.is_alive() {
        return vec![Command::RevivePressed];
    }

    let mut commands = Vec::new();
    if rng.random_bool(0.2) {
        let target = world
            .entities()
            .values()
            .filter(|e| e.capabilities().ai_driven && e.is_alive())
            .min_by(|a, b| {
                a.position
                    .distance_squared(me.position)
                    .total_cmp(&b.position.distance_squared(me.position))
            });
        if let Some(target) = target {
            commands.push(Command::PickupItem {
                session_id: target.session_id.clone(),
            });
            commands.push(Command::AbilityKey {
                target_id: Some(target.session_id.clone()),
                digit: 1,
            });
            return commands;
        }
    }

    if me.to_region.is_none() && rng.random_bool(0.1) {
        let to = Vec3::new(
            rng.random_range(-20.0..20.0),
            0.0,
            rng.random_range(-20.0..20.0),
        );
        commands.push(Command::move_to(to));
    } else if me.to_region.is_none() {
        commands.push(Command::PlayerInput(PlayerInput {
            h: rng.random_range(-1..=1) as f32,
            v: rng.random_range(-1..=1) as f32,
            seq: me.sequence.wrapping_add(1),
        }));
    }
    commands
}

fn load_data(path: Option<&Path>) -> anyhow::Result<GameData> {
    let data = match path {
        Some(path) => GameData::load(path)
            .with_context(|| format!("load game data {}", path.display()))?,
        None => GameData::builtin(),
    };
    data.validate()?;
    Ok(data)
}

fn vec3(v: &[f32]) -> anyhow::Result<Vec3> {
    match v {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => anyhow::bail!("expected x,y,z, got {} values", v.len()),
    }
}
