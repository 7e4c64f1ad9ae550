//! Sentry-post demo
//!
//! A scripted scenario that exercises the blackboard engine end to end:
//! - templates authored in code and loaded from JSON
//! - validation, chain compilation, instance spawning
//! - a tick loop driving the unvalidated accessor tier
//! - synchronized writes with unexpected-change polling
//! - teardown with balanced object bookkeeping
//!
//! Run with: cargo run -p sentry

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use glam::{Quat, Vec3};

use slate_blackboard::prelude::*;

/// Stand-in for the host's entity system. It only counts the lifetime
/// hints, so the demo can show the retain/release balance at teardown.
struct WorldObjects {
    retains: Arc<AtomicU32>,
    releases: Arc<AtomicU32>,
}

impl ObjectModel for WorldObjects {
    fn retain(&mut self, handle: ObjectHandle) {
        log::trace!("world retains {handle:?}");
        self.retains.fetch_add(1, Ordering::Relaxed);
    }

    fn release(&mut self, handle: ObjectHandle) {
        log::trace!("world releases {handle:?}");
        self.releases.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SentryStance {
    Watching,
    Alert,
}

impl BlackboardEnum for SentryStance {
    fn from_byte(byte: u8) -> Self {
        match byte {
            1 => SentryStance::Alert,
            _ => SentryStance::Watching,
        }
    }

    fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Descriptors the tick loop needs, resolved once at bind time.
struct BoundKeys {
    health: KeyInfo,
    heading: KeyInfo,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!();
    println!("╔═══════════════════════════════════════════════╗");
    println!("║       SLATE BLACKBOARD - SENTRY DEMO          ║");
    println!("╚═══════════════════════════════════════════════╝");
    println!();

    if let Err(error) = run() {
        log::error!("sentry demo failed: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let retains = Arc::new(AtomicU32::new(0));
    let releases = Arc::new(AtomicU32::new(0));
    let mut runtime = BlackboardRuntime::new().with_object_model(WorldObjects {
        retains: Arc::clone(&retains),
        releases: Arc::clone(&releases),
    });

    // Authoring. The shared alarm lives on the root so every post in the
    // chain sees one value; the intruder handle is likewise synchronized.
    let agent_level = runtime.register_template(
        Template::new("Agent")
            .with_key(KeyDef::boolean("Alive", true))
            .with_key(KeyDef::float("Health", 100.0))
            .with_key(
                KeyDef::integer("AlarmLevel", 0)
                    .with_instance_sync()
                    .with_unexpected_change_broadcast(),
            ),
    );
    let sentry_level = runtime.register_template(
        Template::new("Sentry")
            .with_parent(agent_level)
            .with_key(KeyDef::enum_key("Stance", SentryStance::Watching))
            .with_key(KeyDef::boolean("TargetSeen", false))
            .with_key(KeyDef::vector3("LastKnown", Vec3::ZERO))
            .with_key(KeyDef::quaternion("ScanHeading", Quat::IDENTITY))
            .with_key(
                KeyDef::object("Intruder", ObjectHandle::NULL)
                    .with_instance_sync()
                    .with_unexpected_change_broadcast(),
            ),
    );

    // A derived level as the asset pipeline would deliver it.
    let watchtower_json = r#"{
        "name": "Watchtower",
        "parent_name": "Sentry",
        "keys": [
            { "name": "Elevation", "default": { "Float": 12.0 } }
        ]
    }"#;
    let watchtower_level = runtime.register_template(serde_json::from_str(watchtower_json)?);
    let linked = runtime.link_authored_parents();
    log::info!("registered 3 templates, linked {linked} authored parent(s)");

    // Validation reports everything at once; a dirty chain never compiles.
    let mut clean = true;
    for id in [agent_level, sentry_level, watchtower_level] {
        let report = runtime.validate(id);
        for issue in report.issues() {
            log::warn!("validation: {issue}");
            clean = false;
        }
    }
    if !clean {
        return Err("template validation failed".into());
    }

    // Compile parent-first and show what the layouts came out as.
    runtime.compile(agent_level)?;
    runtime.compile(sentry_level)?;
    runtime.compile(watchtower_level)?;
    for id in [agent_level, sentry_level, watchtower_level] {
        let data = runtime.compiled(id).ok_or("level not compiled")?;
        log::info!(
            "compiled '{}': {} key(s), {} byte(s)",
            runtime.template(id).ok_or("template missing")?.name,
            data.key_count(),
            data.size()
        );
    }

    // Bind phase: resolve the hot-path descriptors once. Inherited keys
    // keep their offsets at every level, so one set serves all posts.
    let sentry_data = runtime.compiled(sentry_level).ok_or("level not compiled")?;
    let bound = BoundKeys {
        health: sentry_data["Health"],
        heading: sentry_data["ScanHeading"],
    };
    if !bound.health.is_valid() || !bound.heading.is_valid() {
        return Err("hot-path key resolution failed".into());
    }
    let alarm_offset = sentry_data["AlarmLevel"].offset;

    if let Some(owner) = runtime.owning_level(watchtower_level, alarm_offset) {
        log::info!(
            "'AlarmLevel' is owned by level '{}'",
            runtime.template(owner).ok_or("template missing")?.name
        );
    }

    let tower_data = runtime.compiled(watchtower_level).ok_or("level not compiled")?;
    let mut snapshot = vec![0u8; tower_data.size() as usize];
    let copied = tower_data.copy_buffer_to(&mut snapshot);
    log::debug!("watchtower canonical snapshot ({copied} bytes): {snapshot:02x?}");

    let first = runtime.spawn(sentry_level)?;
    let second = runtime.spawn(sentry_level)?;
    let tower = runtime.spawn(watchtower_level)?;
    let posts = [("sentry-1", first), ("sentry-2", second), ("watchtower", tower)];

    let intruder = ObjectHandle::new(17, 0);
    for tick in 1u32..=6 {
        // Planner poll: posts that saw unexpected synchronized changes
        // re-plan before doing anything else this tick.
        for (label, id) in posts {
            let changed = runtime
                .agent(id)
                .ok_or("instance despawned")?
                .take_unexpected_changes();
            if changed.is_empty() {
                continue;
            }
            let template = runtime.instance(id).ok_or("instance despawned")?.template();
            let data = runtime.compiled(template).ok_or("level freed")?;
            let names = changed
                .iter()
                .filter_map(|offset| data.key_at(*offset).map(|entry| &*entry.name))
                .collect::<Vec<_>>()
                .join(", ");
            log::info!("tick {tick}: {label} re-plans after unexpected change to [{names}]");
            runtime
                .agent(id)
                .ok_or("instance despawned")?
                .set_enum("Stance", SentryStance::Alert)?;
        }

        // Hot path: every post regenerates and sweeps its scan heading
        // through the unvalidated tier.
        for (_, id) in posts {
            let mut board = runtime.agent(id).ok_or("instance despawned")?;
            tick_post(&mut board, &bound)?;
        }

        if tick == 3 {
            log::info!("tick {tick}: sentry-1 spots an intruder and raises the shared alarm");
            {
                let mut spotter = runtime.agent(first).ok_or("instance despawned")?;
                spotter.set("TargetSeen", true)?;
                spotter.set("LastKnown", Vec3::new(14.0, 0.0, -3.5))?;
            }
            runtime.set_synced(first, "Intruder", intruder, Expectation::Unexpected)?;
            runtime.set_synced(first, "AlarmLevel", 2, Expectation::Unexpected)?;
        }
        if tick == 5 {
            log::info!("tick {tick}: all clear, alarm stands down as planned");
            runtime.set_synced(first, "Intruder", ObjectHandle::NULL, Expectation::Expected)?;
            runtime.set_synced(first, "AlarmLevel", 0, Expectation::Expected)?;
        }

        let alarm = runtime
            .compiled(agent_level)
            .ok_or("root level freed")?
            .get::<i32>("AlarmLevel")?;
        log::info!("tick {tick}: shared alarm level is {alarm}");
    }

    log::info!("final state:");
    for (label, id) in posts {
        let board = runtime.agent(id).ok_or("instance despawned")?;
        log::info!(
            "  {label}: health {:.1}, stance {:?}, target seen {}, intruder {:?}",
            board.get::<f32>("Health")?,
            board.get_enum::<SentryStance>("Stance")?,
            board.get::<bool>("TargetSeen")?,
            board.get::<ObjectHandle>("Intruder")?,
        );
    }
    let tower_board = runtime.agent(tower).ok_or("instance despawned")?;
    log::info!(
        "  watchtower elevation {:.1}",
        tower_board.get::<f32>("Elevation")?
    );

    for (_, id) in posts {
        runtime.despawn(id);
    }
    runtime.free(watchtower_level);
    runtime.free(sentry_level);
    runtime.free(agent_level);
    log::info!(
        "teardown complete: {} instance(s), {} compiled level(s), object refs {} retained / {} released",
        runtime.instance_count(),
        runtime.compiled_count(),
        retains.load(Ordering::Relaxed),
        releases.load(Ordering::Relaxed)
    );
    Ok(())
}

/// One simulation tick for a single post: slow health regeneration and a
/// scan-heading sweep, all through descriptors resolved at bind time.
fn tick_post(board: &mut AgentBoard<'_>, bound: &BoundKeys) -> Result<(), AccessError> {
    let mut view = board.raw_view_mut()?;
    unsafe {
        let health = view.view().float(bound.health);
        view.set_float(bound.health, (health + 0.5).min(100.0));
        let heading = view.view().quaternion(bound.heading);
        view.set_quaternion(bound.heading, Quat::from_rotation_y(0.2) * heading);
    }
    Ok(())
}
