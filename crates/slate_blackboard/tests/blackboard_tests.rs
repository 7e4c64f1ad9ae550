//! Integration tests for slate_blackboard

use glam::{Quat, Vec3};
use slate_blackboard::*;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stance {
    Passive,
    Alert,
    Hostile,
}

impl BlackboardEnum for Stance {
    fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Stance::Alert,
            2 => Stance::Hostile,
            _ => Stance::Passive,
        }
    }

    fn to_byte(self) -> u8 {
        self as u8
    }
}

#[test]
fn test_parent_child_layout_scenario() {
    // Parent declares a boolean and an integer: boolean packs at 0,
    // integer at 1, level size 5. A child adding a vector places it at
    // offset 5 for a total of 17.
    let mut runtime = BlackboardRuntime::new();
    let enemy = runtime.register_template(
        Template::new("Enemy")
            .with_key(KeyDef::boolean("IsVisible", false))
            .with_key(KeyDef::integer("ThreatLevel", 0)),
    );
    let ranged = runtime.register_template(
        Template::new("RangedEnemy")
            .with_parent(enemy)
            .with_key(KeyDef::vector3("LastKnownPosition", Vec3::ZERO)),
    );

    assert!(runtime.validate(enemy).is_valid());
    assert!(runtime.validate(ranged).is_valid());
    runtime.compile(enemy).unwrap();
    runtime.compile(ranged).unwrap();

    let parent = runtime.compiled(enemy).unwrap();
    assert_eq!(parent.size(), 5);
    assert_eq!(parent.key_info("IsVisible").offset, 0);
    assert_eq!(parent.key_info("ThreatLevel").offset, 1);

    let child = runtime.compiled(ranged).unwrap();
    assert_eq!(child.size(), 17);
    assert_eq!(child.key_info("IsVisible").offset, 0);
    assert_eq!(child.key_info("ThreatLevel").offset, 1);
    assert_eq!(child.key_info("LastKnownPosition").offset, 5);
    assert_eq!(child.key_count(), 3);
}

#[test]
fn test_authoring_to_teardown_walkthrough() {
    let mut runtime = BlackboardRuntime::new();

    let creature = runtime.register_template(
        Template::new("Creature")
            .with_key(KeyDef::float("Health", 100.0))
            .with_key(KeyDef::enum_key("Stance", Stance::Passive))
            .with_key(KeyDef::integer("GroupAlarm", 0).with_instance_sync()),
    );
    let stalker = runtime.register_template(
        Template::new("Stalker")
            .with_parent(creature)
            .with_key(KeyDef::quaternion("FacingGoal", Quat::IDENTITY))
            .with_key(KeyDef::object("PreyHandle", ObjectHandle::NULL)),
    );

    runtime.compile(creature).unwrap();
    runtime.compile(stalker).unwrap();

    let a = runtime.spawn(stalker).unwrap();
    let b = runtime.spawn(stalker).unwrap();

    // Defaults are visible through validated reads.
    let mut board = runtime.agent(a).unwrap();
    assert_eq!(board.get::<f32>("Health").unwrap(), 100.0);
    assert_eq!(board.get_enum::<Stance>("Stance").unwrap(), Stance::Passive);
    assert!(board.get::<ObjectHandle>("PreyHandle").unwrap().is_null());

    // Local writes touch only the written instance.
    board.set("Health", 62.5f32).unwrap();
    board.set_enum("Stance", Stance::Hostile).unwrap();
    board.set("PreyHandle", ObjectHandle::new(12, 0)).unwrap();
    assert_eq!(runtime.agent(b).unwrap().get::<f32>("Health").unwrap(), 100.0);

    // Synced writes reach the chain and every instance.
    runtime
        .set_synced(a, "GroupAlarm", 2, Expectation::Expected)
        .unwrap();
    assert_eq!(runtime.agent(b).unwrap().get::<i32>("GroupAlarm").unwrap(), 2);
    assert_eq!(
        runtime.compiled(creature).unwrap().get::<i32>("GroupAlarm").unwrap(),
        2
    );

    runtime.despawn(a);
    runtime.despawn(b);
    runtime.free(stalker);
    runtime.free(creature);
    assert_eq!(runtime.instance_count(), 0);
    assert_eq!(runtime.compiled_count(), 0);
}

#[test]
fn test_authored_json_template_loads_and_links() {
    let mut runtime = BlackboardRuntime::new();
    runtime.register_template(
        Template::new("Animal").with_key(KeyDef::boolean("Fleeing", false)),
    );

    let json = r#"{
        "name": "Wolf",
        "parent_name": "Animal",
        "keys": [
            { "name": "PackSize", "default": { "Integer": 3 } },
            null,
            { "name": "Den", "default": { "Vector3": [0.0, 0.0, 0.0] } }
        ]
    }"#;
    let wolf_template: Template = serde_json::from_str(json).unwrap();
    let wolf = runtime.register_template(wolf_template);
    assert_eq!(runtime.link_authored_parents(), 1);

    // The empty slot authored as JSON null is a diagnostic, not a crash.
    let report = runtime.validate(wolf);
    assert!(!report.is_valid());
    assert!(matches!(
        report.issues()[0],
        ValidationIssue::EmptyKeySlot { index: 1, .. }
    ));

    // Designer fixes the asset; the chain then compiles.
    runtime.template_mut(wolf).unwrap().keys.remove(1);
    assert!(runtime.validate(wolf).is_valid());

    let animal = runtime.find_template("Animal").unwrap();
    runtime.compile(animal).unwrap();
    runtime.compile(wolf).unwrap();
    let data = runtime.compiled(wolf).unwrap();
    assert_eq!(data.get::<i32>("PackSize").unwrap(), 3);
    assert_eq!(data.key_info("Fleeing").offset, 0);
}

#[test]
fn test_validated_error_cases() {
    #[derive(Debug, Clone, Copy, PartialEq)]
    #[repr(u32)]
    enum WideStance {
        Only = 0,
    }
    impl BlackboardEnum for WideStance {
        fn from_byte(_byte: u8) -> Self {
            WideStance::Only
        }
        fn to_byte(self) -> u8 {
            self as u8
        }
    }

    let mut runtime = BlackboardRuntime::new();
    let id = runtime.register_template(
        Template::new("Errors")
            .with_key(KeyDef::float("Health", 1.0))
            .with_key(KeyDef::enum_key("Stance", Stance::Alert)),
    );
    runtime.compile(id).unwrap();
    let instance = runtime.spawn(id).unwrap();
    let mut board = runtime.agent(instance).unwrap();

    assert!(matches!(
        board.get::<f32>("Missing"),
        Err(AccessError::KeyNotFound(_))
    ));
    assert!(matches!(
        board.get::<i32>("Health"),
        Err(AccessError::TypeMismatch { .. })
    ));
    assert!(matches!(
        board.get_enum::<WideStance>("Stance"),
        Err(AccessError::Overflow { width: 4 })
    ));
    assert!(matches!(
        board.set_with("Health", 2.0f32, Expectation::Expected),
        Ok(())
    ));
    assert!(matches!(
        runtime.set_synced(instance, "Health", 3.0f32, Expectation::Expected),
        Err(AccessError::InvalidOperation(_))
    ));
    // Offsets that start no key resolve to nothing.
    assert!(matches!(
        runtime.agent(instance).unwrap().get_at::<f32>(2),
        Err(AccessError::KeyNotFound(_))
    ));
}

#[test]
fn test_sentinel_indexer_and_copy_buffer() {
    let mut runtime = BlackboardRuntime::new();
    let id = runtime.register_template(
        Template::new("Probe")
            .with_key(KeyDef::integer("Seen", 4))
            .with_key(KeyDef::boolean("Alive", true)),
    );
    runtime.compile(id).unwrap();
    let data = runtime.compiled(id).unwrap();

    assert!(data["Seen"].is_valid());
    assert_eq!(data["Seen"].kind, KeyKind::Integer);
    assert!(!data["NoSuchKey"].is_valid());
    assert_eq!(data["NoSuchKey"].kind, KeyKind::Invalid);

    let mut exact = [0u8; 5];
    assert_eq!(data.copy_buffer_to(&mut exact), 5);
    assert_eq!(exact[0], 1);
    assert_eq!(&exact[1..5], &4i32.to_ne_bytes());

    let mut short = [0u8; 3];
    assert_eq!(data.copy_buffer_to(&mut short), 3);
    assert_eq!(short[0], 1);
}

#[test]
fn test_owning_level_resolution() {
    let mut runtime = BlackboardRuntime::new();
    let root = runtime.register_template(
        Template::new("Root").with_key(KeyDef::integer("Shared", 0)),
    );
    let mid = runtime.register_template(
        Template::new("Mid")
            .with_parent(root)
            .with_key(KeyDef::float("Speed", 1.0)),
    );
    let leaf = runtime.register_template(
        Template::new("Leaf")
            .with_parent(mid)
            .with_key(KeyDef::boolean("Busy", false)),
    );
    runtime.compile(root).unwrap();
    runtime.compile(mid).unwrap();
    runtime.compile(leaf).unwrap();

    let shared = runtime.compiled(leaf).unwrap().key_info("Shared").offset;
    let speed = runtime.compiled(leaf).unwrap().key_info("Speed").offset;
    let busy = runtime.compiled(leaf).unwrap().key_info("Busy").offset;

    assert_eq!(runtime.owning_level(leaf, shared), Some(root));
    assert_eq!(runtime.owning_level(leaf, speed), Some(mid));
    assert_eq!(runtime.owning_level(leaf, busy), Some(leaf));
    assert_eq!(runtime.owning_level(root, shared), Some(root));
    // Offsets past the level's size resolve to no owner.
    let leaf_size = runtime.compiled(leaf).unwrap().size();
    assert_eq!(runtime.owning_level(leaf, leaf_size), None);
}

#[test]
fn test_unvalidated_tier_hot_path() {
    let mut runtime = BlackboardRuntime::new();
    let id = runtime.register_template(
        Template::new("VmAgent")
            .with_key(KeyDef::float("Cooldown", 4.0))
            .with_key(KeyDef::vector3("MoveGoal", Vec3::ZERO))
            .with_key(KeyDef::enum_key("Stance", Stance::Alert)),
    );
    runtime.compile(id).unwrap();
    let instance = runtime.spawn(id).unwrap();

    // Bind phase: resolve descriptors once through the indexer.
    let data = runtime.compiled(id).unwrap();
    let cooldown = data["Cooldown"];
    let goal = data["MoveGoal"];
    let stance = data["Stance"];
    assert!(cooldown.is_valid() && goal.is_valid() && stance.is_valid());

    // Tick phase: raw access only, no lookups.
    let mut board = runtime.agent(instance).unwrap();
    let mut view = board.raw_view_mut().unwrap();
    unsafe {
        let remaining = view.view().float(cooldown);
        view.set_float(cooldown, remaining - 0.25);
        view.set_vector3(goal, Vec3::new(8.0, 0.0, 3.0));
        view.set_enum(stance, Stance::Hostile);
    }

    assert_eq!(board.get::<f32>("Cooldown").unwrap(), 3.75);
    assert_eq!(board.get::<Vec3>("MoveGoal").unwrap(), Vec3::new(8.0, 0.0, 3.0));
    assert_eq!(board.get_enum::<Stance>("Stance").unwrap(), Stance::Hostile);
}

#[test]
fn test_template_serde_round_trip() {
    let template = Template::new("Persisted")
        .with_parent_name("Base")
        .with_backends(Backends::COMPILED)
        .with_key(KeyDef::boolean("Flag", true).with_instance_sync())
        .with_empty_slot()
        .with_key(KeyDef::object("Target", ObjectHandle::NULL));

    let json = serde_json::to_string(&template).unwrap();
    let back: Template = serde_json::from_str(&json).unwrap();

    assert_eq!(back.name, "Persisted");
    assert_eq!(back.parent_name.as_deref(), Some("Base"));
    assert_eq!(back.backends, Backends::COMPILED);
    assert_eq!(back.keys.len(), 3);
    assert!(back.keys[1].is_none());
    let flag = back.keys[0].as_ref().unwrap();
    assert!(flag.traits.instance_synced);
    assert_eq!(flag.kind(), KeyKind::Boolean);
    // Runtime-only parent link never persists.
    assert!(back.parent.is_none());
}
