/// Whole-field runs: the dispatcher stepping against the headless stage,
/// one tick of input at a time.

use crate::config::FieldSettings;
use crate::domain::direction::Direction;
use crate::domain::entity::FrameInput;
use crate::domain::event::{DoorEvent, EventKind, StepDirection, TileEvent};
use crate::domain::location::{PixelPos, TilePos};
use crate::domain::map::FieldMap;
use crate::domain::tile::{CollisionGrid, Terrain, TileLayer, TileProperties};
use crate::error::{FieldError, FieldResult};

use super::event::FieldEvent;
use super::maps::MapLibrary;
use super::services::Physics;
use super::session::Session;
use super::stage::Stage;
use super::step::step;
use super::world::FieldState;

struct Rig {
    field: FieldState,
    stage: Stage,
    log: Vec<FieldEvent>,
    tick_ms: u32,
}

impl Rig {
    fn new(library: MapLibrary, map: &str, tile: TilePos, layer: u32, facing: Direction) -> Rig {
        let settings = FieldSettings::default();
        let tick_ms = settings.timing.tick_rate_ms as u32;
        let map = library.build(map).unwrap();
        let mut stage = Stage::new(library, &settings.timing);
        let mut field = FieldState::new(map, tile, layer, facing, settings);
        field.enter(&mut stage);
        Rig { field, stage, log: Vec::new(), tick_ms }
    }

    fn embedded(map: &str, tile: TilePos, facing: Direction) -> Rig {
        Rig::new(MapLibrary::embedded().unwrap(), map, tile, 0, facing)
    }

    fn single(map: FieldMap, tile: TilePos, facing: Direction) -> Rig {
        let name = map.name.clone();
        let mut library = MapLibrary::new();
        library.add_map(map);
        Rig::new(library, &name, tile, 0, facing)
    }

    fn try_tick(&mut self, input: FrameInput) -> FieldResult<Vec<FieldEvent>> {
        let events = step(&mut self.field, input, &mut self.stage)?;
        self.stage.advance(self.tick_ms);
        self.log.extend(events.iter().cloned());
        Ok(events)
    }

    fn tick(&mut self, input: FrameInput) -> Vec<FieldEvent> {
        self.try_tick(input).unwrap()
    }

    /// Tick until `done` holds for a tick's events. False on timeout.
    fn run_until(&mut self, input: FrameInput, max: usize, done: impl Fn(&FieldEvent) -> bool) -> bool {
        (0..max).any(|_| self.tick(input).iter().any(&done))
    }

    fn count(&self, pred: impl Fn(&FieldEvent) -> bool) -> usize {
        self.log.iter().filter(|e| pred(e)).count()
    }
}

fn jump(x: i32, y: i32, dirs: &[Direction]) -> TileEvent {
    TileEvent::new(TilePos::new(x, y), dirs, EventKind::Jump)
}

fn set_terrain(map: &mut FieldMap, layer: u32, pos: TilePos, terrain: Terrain) {
    if let Some(grid) = map.collision.get_mut(&layer) {
        grid.set(pos, terrain);
    }
}

// ══════════════════════════════════════════════════════════════
// Ledge jumps
// ══════════════════════════════════════════════════════════════

/// A one-tile gap at (6,5) with ledges at (5,5) and (7,5).
fn ledge_map(side_jump: bool) -> FieldMap {
    let mut map = FieldMap::new("A", 12, 10, 16, 16);
    set_terrain(&mut map, 0, TilePos::new(6, 5), Terrain::Void);
    map.registry.register(jump(5, 5, &[Direction::Right]));
    if side_jump {
        map.registry.register(jump(6, 5, &[Direction::Left]));
    }
    map.registry.register(jump(7, 5, &[Direction::Left]));
    map
}

#[test]
fn ledge_jump_lands_two_tiles_ahead() {
    let mut rig = Rig::single(ledge_map(false), TilePos::new(5, 5), Direction::Right);
    let landed = rig.run_until(FrameInput::moving(Direction::Right), 120, |e| {
        matches!(e, FieldEvent::JumpLanded { .. })
    });
    assert!(landed);
    assert!(rig.log.contains(&FieldEvent::JumpStarted { from: TilePos::new(5, 5), to: TilePos::new(7, 5) }));
    assert!(rig.log.contains(&FieldEvent::JumpLanded { at: TilePos::new(7, 5) }));
    assert_eq!(rig.field.session.hero_tile, TilePos::new(7, 5));
    assert!(rig.field.session.is_free());
    assert!(!rig.stage.is_paused());
    assert_eq!(rig.count(|e| matches!(e, FieldEvent::JumpStarted { .. })), 1);
}

#[test]
fn jump_waits_for_collision_pressure() {
    let mut rig = Rig::single(ledge_map(false), TilePos::new(5, 5), Direction::Right);
    for _ in 0..20 {
        rig.tick(FrameInput::default());
    }
    assert!(rig.log.is_empty());
    assert!(rig.field.session.is_free());
}

#[test]
fn jump_across_a_side_jump_is_refused() {
    let mut rig = Rig::single(ledge_map(true), TilePos::new(5, 5), Direction::Right);
    for _ in 0..60 {
        rig.tick(FrameInput::moving(Direction::Right));
    }
    assert_eq!(rig.count(|e| matches!(e, FieldEvent::JumpStarted { .. })), 0);
    assert_eq!(rig.field.session.hero_tile, TilePos::new(5, 5));
    assert!(rig.stage.hero_blocked());
}

#[test]
fn open_menu_blocks_jumping() {
    let mut rig = Rig::single(ledge_map(false), TilePos::new(5, 5), Direction::Right);
    // Nine ticks reach the gap; the tenth would jump.
    for _ in 0..9 {
        rig.tick(FrameInput::moving(Direction::Right));
    }
    assert!(rig.stage.hero_blocked());
    rig.tick(FrameInput { menu: true, ..Default::default() });
    assert!(rig.field.session.menu_open());
    for _ in 0..10 {
        rig.tick(FrameInput::moving(Direction::Right));
    }
    assert_eq!(rig.stage.hero_velocity(), PixelPos::ZERO);
    assert_eq!(rig.count(|e| matches!(e, FieldEvent::JumpStarted { .. })), 0);

    rig.tick(FrameInput { menu: true, ..Default::default() });
    assert!(rig.log.contains(&FieldEvent::MenuClosed));
    assert!(rig.field.session.is_free());
}

// ══════════════════════════════════════════════════════════════
// Doors
// ══════════════════════════════════════════════════════════════

fn door_to(target: &str, advance_effect: bool, dest_collider_layer: u32) -> EventKind {
    EventKind::Door(DoorEvent {
        target: target.to_string(),
        x_target: 2,
        y_target: 2,
        dest_collider_layer,
        advance_effect,
    })
}

/// Map "A": a wall-backed door at (10,3) leading to (2,2) on layer 1 of "B".
fn door_library() -> MapLibrary {
    let mut a = FieldMap::new("A", 14, 8, 16, 16);
    set_terrain(&mut a, 0, TilePos::new(10, 2), Terrain::Wall);
    let mut doors = TileLayer::new("doors", 14, 8);
    doors.set(TilePos::new(10, 2), 1);
    a.layers.push(doors);
    a.door_layer = Some("doors".to_string());
    a.tileset.insert(0, TileProperties {
        door_type: Some(1),
        id: Some(0),
        close_door: Some(1),
        open_door: None,
        base_offset: Some((0, 0)),
    });
    a.tileset.insert(1, TileProperties {
        door_type: Some(1),
        id: Some(1),
        close_door: None,
        open_door: Some(1),
        base_offset: None,
    });
    a.registry.register(TileEvent::new(TilePos::new(10, 3), &[Direction::Up], door_to("B", true, 1)));
    a.resolve_doors().unwrap();

    let mut b = FieldMap::new("B", 6, 6, 16, 16);
    b.collision.insert(1, CollisionGrid::filled(6, 6, Terrain::Floor));
    let mut ledge = jump(4, 4, &[Direction::Up, Direction::Down]).on_layers(&[1]);
    ledge.deactivate_at(Direction::Down);
    b.registry.register(ledge);
    b.registry.register(
        TileEvent::new(TilePos::new(5, 1), &Direction::ALL, EventKind::Speed { speed: 30.0 })
            .on_layers(&[1])
            .enabled(false),
    );

    let mut library = MapLibrary::new();
    library.add_map(a);
    library.add_map(b);
    library
}

#[test]
fn door_teleports_to_target_tile_and_layer() {
    let mut rig = Rig::new(door_library(), "A", TilePos::new(10, 3), 0, Direction::Up);

    assert!(rig.run_until(FrameInput::moving(Direction::Up), 30, |e| matches!(e, FieldEvent::DoorEntered { .. })));
    assert!(rig.log.contains(&FieldEvent::DoorOpened { at: TilePos::new(10, 3), tiles: 1 }));
    assert_eq!(rig.field.map.layer("doors").map(|l| l.get(TilePos::new(10, 2))), Some(2));
    assert!(rig.stage.is_paused());
    assert!(rig.field.session.teleporting());
    assert!(rig.field.session.on_event());
    assert!(!rig.field.session.jumping());

    let done = rig.run_until(FrameInput::moving(Direction::Up), 300, |e| *e == FieldEvent::TransitionFinished);
    assert!(done);

    let order: Vec<&FieldEvent> = rig
        .log
        .iter()
        .filter(|e| {
            matches!(
                e,
                FieldEvent::DoorOpened { .. }
                    | FieldEvent::DoorEntered { .. }
                    | FieldEvent::MapMounted { .. }
                    | FieldEvent::TransitionFinished
            )
        })
        .collect();
    assert_eq!(order.len(), 4);
    assert!(matches!(order[0], FieldEvent::DoorOpened { .. }));
    assert!(matches!(order[1], FieldEvent::DoorEntered { .. }));
    assert_eq!(order[2], &FieldEvent::MapMounted { map: "B".to_string() });
    assert_eq!(order[3], &FieldEvent::TransitionFinished);

    let session = &rig.field.session;
    assert_eq!(session.map_name, "B");
    assert_eq!(session.collider_layer, 1);
    assert_eq!(session.hero_tile, TilePos::new(2, 2));
    assert!(session.is_free());
    assert_eq!(rig.field.map.name, "B");
    assert_eq!(rig.stage.hero_position(), PixelPos::new(40.0, 40.0));
    assert!(!rig.stage.is_paused());
    assert!(!rig.stage.camera().dimmed);
}

/// One A → B transition from a fresh field, idled until settled.
fn settled_door_run() -> Rig {
    let mut rig = Rig::new(door_library(), "A", TilePos::new(10, 3), 0, Direction::Up);
    assert!(rig.run_until(FrameInput::moving(Direction::Up), 400, |e| *e == FieldEvent::TransitionFinished));
    for _ in 0..5 {
        rig.tick(FrameInput::default());
    }
    rig
}

fn event_flags(map: &FieldMap) -> Vec<TileEvent> {
    map.registry.iter().cloned().collect()
}

#[test]
fn door_transitions_settle_identically() {
    let first = settled_door_run();
    let second = settled_door_run();
    assert_eq!(first.field.session, second.field.session);
    assert_eq!(first.stage.hero_position(), second.stage.hero_position());
    assert_eq!(first.log, second.log);

    // Arrival leaves the destination's own events as the map declared them.
    let fresh_b = door_library().build("B").unwrap();
    assert_eq!(event_flags(&first.field.map), event_flags(&fresh_b));
    assert_eq!(event_flags(&second.field.map), event_flags(&fresh_b));
    let ledge = &first.field.map.registry.lookup(4, 4)[0];
    assert!(ledge.is_active(Direction::Up));
    assert!(!ledge.is_active(Direction::Down));
    assert!(!first.field.map.registry.lookup(5, 1)[0].is_set);
}

#[test]
fn entering_the_inn_twice_ends_the_same_way() {
    fn enter(rig: &mut Rig) -> (Session, PixelPos, Vec<TileEvent>) {
        assert!(rig.run_until(FrameInput::moving(Direction::Up), 400, |e| *e == FieldEvent::TransitionFinished));
        for _ in 0..5 {
            rig.tick(FrameInput::default());
        }
        assert_eq!(rig.field.map.name, "madra_inn");
        (rig.field.session.clone(), rig.stage.hero_position(), event_flags(&rig.field.map))
    }

    let mut rig = Rig::embedded("madra", TilePos::new(6, 5), Direction::Up);
    let first = enter(&mut rig);
    assert!(rig.run_until(FrameInput::moving(Direction::Down), 400, |e| *e == FieldEvent::TransitionFinished));
    assert_eq!(rig.field.map.name, "madra");
    assert_eq!(rig.field.session.hero_tile, TilePos::new(6, 5));
    let second = enter(&mut rig);

    assert_eq!(first, second);
    assert_eq!(first.0.hero_tile, TilePos::new(5, 7));
    assert!(first.0.is_free());
}

#[test]
fn long_walks_keep_timers_bounded() {
    let mut rig = Rig::embedded("madra", TilePos::new(11, 5), Direction::Left);
    for i in 0..5000 {
        let dir = if i % 2 == 0 { Direction::Left } else { Direction::Right };
        rig.tick(FrameInput::moving(dir));
    }
    assert!(rig.stage.clock_count() <= 4);
    assert_eq!(rig.field.session.hero_tile, TilePos::new(11, 5));
}

#[test]
fn door_with_effect_needs_pressure() {
    let mut rig = Rig::new(door_library(), "A", TilePos::new(10, 3), 0, Direction::Up);
    for _ in 0..10 {
        rig.tick(FrameInput::default());
    }
    assert!(rig.log.is_empty());
    assert!(rig.field.session.is_free());
    assert_eq!(rig.field.map.layer("doors").map(|l| l.get(TilePos::new(10, 2))), Some(1));
}

#[test]
fn door_never_triggers_twice() {
    let mut rig = Rig::new(door_library(), "A", TilePos::new(10, 3), 0, Direction::Up);
    rig.run_until(FrameInput::moving(Direction::Up), 400, |e| *e == FieldEvent::TransitionFinished);
    assert_eq!(rig.count(|e| matches!(e, FieldEvent::DoorEntered { .. })), 1);
    assert_eq!(rig.count(|e| matches!(e, FieldEvent::MapMounted { .. })), 1);
}

#[test]
fn failed_mount_keeps_the_old_map() {
    let mut a = FieldMap::new("A", 8, 4, 16, 16);
    a.registry.register(TileEvent::new(TilePos::new(2, 1), &[Direction::Right], door_to("Nowhere", false, 0)));
    let mut rig = Rig::single(a, TilePos::new(1, 1), Direction::Right);

    let mut failure = None;
    for _ in 0..200 {
        if let Err(e) = rig.try_tick(FrameInput::moving(Direction::Right)) {
            failure = Some(e);
            break;
        }
    }
    match failure {
        Some(FieldError::MountFailed { map, source }) => {
            assert_eq!(map, "Nowhere");
            assert!(matches!(*source, FieldError::UnknownMap(_)));
        }
        other => panic!("expected a mount failure, got {other:?}"),
    }
    assert_eq!(rig.field.map.name, "A");
    assert_eq!(rig.field.session.map_name, "A");
    assert_eq!(rig.field.session.collider_layer, 0);
    assert_eq!(rig.field.map.registry.len(), 1);
}

#[test]
fn walking_through_an_exit_needs_no_pressure() {
    let mut rig = Rig::embedded("madra", TilePos::new(18, 6), Direction::Right);
    assert!(rig.run_until(FrameInput::moving(Direction::Right), 400, |e| *e == FieldEvent::TransitionFinished));
    assert_eq!(rig.count(|e| matches!(e, FieldEvent::DoorOpened { .. })), 0);
    assert_eq!(rig.field.map.name, "cliffs");
    assert_eq!(rig.field.session.hero_tile, TilePos::new(1, 9));
}

#[test]
fn leaving_the_inn_releases_stair_blocks() {
    let mut rig = Rig::embedded("madra_inn", TilePos::new(5, 7), Direction::Down);
    assert_eq!(rig.stage.body_count(), 1);
    assert!(rig.field.map.interactables[0].blocking_stair_block.is_some());

    assert!(rig.run_until(FrameInput::moving(Direction::Down), 400, |e| *e == FieldEvent::TransitionFinished));
    assert_eq!(rig.field.map.name, "madra");
    assert_eq!(rig.field.session.hero_tile, TilePos::new(6, 5));
    assert_eq!(rig.stage.body_count(), 0);
}

// ══════════════════════════════════════════════════════════════
// Pillars
// ══════════════════════════════════════════════════════════════

#[test]
fn pillar_hop_raises_and_lowers_bodies() {
    let mut rig = Rig::embedded("cliffs", TilePos::new(5, 5), Direction::Right);
    let across = rig.run_until(FrameInput::moving(Direction::Right), 600, |e| {
        *e == FieldEvent::JumpLanded { at: TilePos::new(13, 5) }
    });
    assert!(across);

    let landings: Vec<TilePos> = rig
        .log
        .iter()
        .filter_map(|e| match e {
            FieldEvent::JumpLanded { at } => Some(*at),
            _ => None,
        })
        .collect();
    assert_eq!(landings, vec![TilePos::new(7, 5), TilePos::new(9, 5), TilePos::new(11, 5), TilePos::new(13, 5)]);

    // Four pillar tops expose thirteen distinct edge tiles.
    assert_eq!(rig.log.iter().find(|e| matches!(e, FieldEvent::PillarsRaised { .. })), Some(&FieldEvent::PillarsRaised { bodies: 13 }));
    assert!(rig.log.contains(&FieldEvent::PillarsLowered));
    assert_eq!(rig.stage.body_count(), 0);
    assert!(rig.stage.hero_map_collision());
    assert_eq!(rig.field.pillars.count(), 0);
}

#[test]
fn pillar_bodies_hold_the_hero_on_top() {
    let mut rig = Rig::embedded("cliffs", TilePos::new(5, 5), Direction::Right);
    rig.run_until(FrameInput::moving(Direction::Right), 200, |e| matches!(e, FieldEvent::JumpLanded { .. }));
    assert_eq!(rig.field.session.hero_tile, TilePos::new(7, 5));
    assert!(!rig.stage.hero_map_collision());

    // Walking off the top toward the chasm stops at a body.
    for _ in 0..40 {
        rig.tick(FrameInput::moving(Direction::Up));
    }
    assert_eq!(rig.field.session.hero_tile, TilePos::new(7, 5));
    assert!(rig.stage.hero_blocked());
}

// ══════════════════════════════════════════════════════════════
// Crossings and speed tiles
// ══════════════════════════════════════════════════════════════

#[test]
fn speed_tile_boosts_until_left() {
    let mut map = FieldMap::new("road", 8, 4, 16, 16);
    map.registry.register(TileEvent::new(TilePos::new(2, 1), &Direction::ALL, EventKind::Speed { speed: 30.0 }));
    let mut rig = Rig::single(map, TilePos::new(2, 1), Direction::Right);

    let events = rig.tick(FrameInput::moving(Direction::Right));
    assert_eq!(events, vec![FieldEvent::SpeedChanged { extra: 30.0 }]);
    let walk = FieldSettings::default().movement.walk_speed;
    assert_eq!(rig.stage.hero_velocity(), PixelPos::new(walk + 30.0, 0.0));

    assert!(rig.run_until(FrameInput::moving(Direction::Right), 40, |e| *e == FieldEvent::SpeedChanged { extra: 0.0 }));
    assert_eq!(rig.field.session.extra_speed, 0.0);
    assert_eq!(rig.field.session.hero_tile, TilePos::new(3, 1));
}

#[test]
fn step_shifts_the_hero_half_a_tile() {
    let mut map = FieldMap::new("stairs", 8, 4, 16, 16);
    map.registry.register(TileEvent::new(
        TilePos::new(2, 1),
        &[Direction::Right],
        EventKind::Step { step_direction: StepDirection::Up },
    ));
    let mut rig = Rig::single(map, TilePos::new(2, 1), Direction::Right);

    assert!(rig.run_until(FrameInput::moving(Direction::Right), 40, |e| matches!(e, FieldEvent::Stepped { .. })));
    assert!(rig.log.contains(&FieldEvent::Stepped { shift_y: -8 }));
    assert_eq!(rig.stage.hero_position().y, 16.0);
    assert!(rig.field.session.pending_step.is_none());
}

#[test]
fn turning_back_disarms_a_step() {
    let mut map = FieldMap::new("stairs", 8, 4, 16, 16);
    map.registry.register(TileEvent::new(
        TilePos::new(2, 1),
        &[Direction::Right],
        EventKind::Step { step_direction: StepDirection::Up },
    ));
    let mut rig = Rig::single(map, TilePos::new(2, 1), Direction::Right);
    rig.tick(FrameInput::moving(Direction::Right));
    assert!(rig.field.session.pending_step.is_some());

    for _ in 0..30 {
        rig.tick(FrameInput::moving(Direction::Left));
    }
    assert!(rig.field.session.pending_step.is_none());
    assert_eq!(rig.count(|e| matches!(e, FieldEvent::Stepped { .. })), 0);
}

#[test]
fn stairs_switch_collider_layers() {
    let mut rig = Rig::embedded("madra_inn", TilePos::new(9, 6), Direction::Up);
    assert!(rig.run_until(FrameInput::moving(Direction::Up), 60, |e| matches!(e, FieldEvent::ColliderLayerChanged { .. })));
    assert!(rig.log.contains(&FieldEvent::ColliderLayerChanged { layer: 1 }));
    assert_eq!(rig.field.session.collider_layer, 1);
    assert_eq!(rig.field.session.hero_tile, TilePos::new(9, 4));

    assert!(rig.run_until(FrameInput::moving(Direction::Down), 60, |e| matches!(e, FieldEvent::ColliderLayerChanged { .. })));
    assert_eq!(rig.field.session.collider_layer, 0);
    assert_eq!(rig.field.session.hero_tile, TilePos::new(9, 5));
}

// ══════════════════════════════════════════════════════════════
// NPCs
// ══════════════════════════════════════════════════════════════

#[test]
fn npc_turns_talks_and_turns_back() {
    let mut rig = Rig::embedded("madra", TilePos::new(8, 8), Direction::Up);
    let talk = FrameInput { interact: true, ..Default::default() };

    let first = rig.tick(talk);
    assert!(matches!(&first[..], [FieldEvent::NpcSpoke { npc, .. }] if npc == "garet"));
    assert!(rig.field.session.npc_event());
    assert_eq!(rig.field.map.npcs[0].facing, Direction::Down);

    // Movement is ignored while talking.
    rig.tick(FrameInput::moving(Direction::Left));
    assert_eq!(rig.stage.hero_velocity(), PixelPos::ZERO);

    rig.tick(talk);
    let last = rig.tick(talk);
    assert_eq!(last, vec![FieldEvent::NpcDialogClosed { npc: "garet".to_string() }]);
    assert!(rig.field.session.is_free());
    assert_eq!(rig.field.map.npcs[0].facing, Direction::Left);
    assert_eq!(rig.count(|e| matches!(e, FieldEvent::NpcSpoke { .. })), 2);
}

#[test]
fn talking_to_empty_air_walks_on() {
    let mut rig = Rig::embedded("madra", TilePos::new(5, 9), Direction::Up);
    let events = rig.tick(FrameInput { interact: true, movement: Some(Direction::Up), ..Default::default() });
    assert!(events.is_empty());
    assert!(rig.field.session.is_free());
    assert!(rig.stage.hero_velocity().y < 0.0);
}
