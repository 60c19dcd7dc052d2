/// Trigger rules for doors and jumps, table driven.
///
/// Pure functions over the mounted map. They say whether an event may
/// start; they never perform it.
///
/// ## Jump Truth Table
///
/// `side` is the tile one step ahead along the facing, `landing` two steps.
///
/// ┌────────────────────────────────────────────┬──────────┐
/// │ Condition (checked in order)               │ Verdict  │
/// ├────────────────────────────────────────────┼──────────┤
/// │ hero not pressing against collision        │ CANCEL   │
/// │ hero tile ≠ event tile                     │ CANCEL   │
/// │ casting/pushing/climbing/jumping/menu/battle│ CANCEL  │
/// │ facing is diagonal                         │ CANCEL   │
/// │ side holds a set jump on layer             │ CANCEL   │
/// │   (unless an object on layer stands there) │          │
/// │ object on layer stands on landing          │ CANCEL   │
/// │ landing has events, none is a set jump on  │ CANCEL   │
/// │   layer active for the opposite facing     │          │
/// │ landing has no events, event is dynamic    │ CANCEL   │
/// │ Otherwise                                  │ JUMP     │
/// └────────────────────────────────────────────┴──────────┘
///
/// ## Pillar side effect of a committed jump
///
/// ┌────────────────────────────────┬─────────────────────┬────────────┐
/// │ landing jump dynamic           │ triggering dynamic  │ Action     │
/// ├────────────────────────────────┼─────────────────────┼────────────┤
/// │ yes                            │ any                 │ Rebuild    │
/// │ no                             │ yes                 │ Release    │
/// │ no                             │ no                  │ Keep       │
/// │ (landing has no events)        │ no                  │ Keep       │
/// └────────────────────────────────┴─────────────────────┴────────────┘

use super::direction::Direction;
use super::event::{DoorEvent, TileEvent};
use super::location::TilePos;
use super::map::FieldMap;

/// Hero-side inputs to the jump rules.
#[derive(Clone, Copy, Debug)]
pub struct JumpContext {
    pub hero_tile: TilePos,
    pub facing: Direction,
    pub layer: u32,
    pub stop_by_colliding: bool,
    /// Any of casting, pushing, climbing, jumping, menu or battle.
    pub busy: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct JumpPlan {
    pub direction: Direction,
    pub side: TilePos,
    pub landing: TilePos,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PillarAction {
    Keep,
    Rebuild,
    Release,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JumpCancel {
    NoPressure,
    OffEventTile,
    Busy,
    Diagonal,
    SideJump,
    LandingOccupied,
    NoLandingJump,
    DynamicWithoutLanding,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JumpVerdict {
    Go { plan: JumpPlan, pillars: PillarAction },
    Cancel(JumpCancel),
}

pub fn evaluate_jump(map: &FieldMap, ctx: &JumpContext, event: &TileEvent) -> JumpVerdict {
    use JumpCancel::*;

    if !ctx.stop_by_colliding { return JumpVerdict::Cancel(NoPressure); }
    if ctx.hero_tile != event.pos { return JumpVerdict::Cancel(OffEventTile); }
    if ctx.busy { return JumpVerdict::Cancel(Busy); }
    if ctx.facing.is_diagonal() { return JumpVerdict::Cancel(Diagonal); }

    let direction = ctx.facing;
    let side = ctx.hero_tile.toward(direction, 1);
    let landing = ctx.hero_tile.toward(direction, 2);
    let layer = ctx.layer;

    for ev in map.registry.at(side) {
        if map.object_at(ev.pos, layer).is_some() {
            continue;
        }
        if ev.is_jump() && ev.is_set && ev.on_layer(layer) {
            return JumpVerdict::Cancel(SideJump);
        }
    }

    if map.object_at(landing, layer).is_some() {
        return JumpVerdict::Cancel(LandingOccupied);
    }

    let mut pillars = PillarAction::Keep;
    let landing_events = map.registry.at(landing);
    if landing_events.is_empty() {
        if event.dynamic {
            return JumpVerdict::Cancel(DynamicWithoutLanding);
        }
    } else {
        let mut found = false;
        for ev in landing_events {
            if ev.is_jump() && ev.is_active(direction.opposite()) && ev.is_set && ev.on_layer(layer) {
                found = true;
                if ev.dynamic {
                    pillars = PillarAction::Rebuild;
                    break;
                } else if event.dynamic {
                    pillars = PillarAction::Release;
                }
            }
        }
        if !found {
            return JumpVerdict::Cancel(NoLandingJump);
        }
    }

    JumpVerdict::Go { plan: JumpPlan { direction, side, landing }, pillars }
}

/// Doors with an approach effect need the hero pressing into them.
pub fn door_may_start(door: &DoorEvent, stop_by_colliding: bool) -> bool {
    !door.advance_effect || stop_by_colliding
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::InteractableObject;
    use crate::domain::event::EventKind;

    fn jump_at(x: i32, y: i32, dirs: &[Direction]) -> TileEvent {
        TileEvent::new(TilePos::new(x, y), dirs, EventKind::Jump)
    }

    fn ctx(x: i32, y: i32, facing: Direction) -> JumpContext {
        JumpContext {
            hero_tile: TilePos::new(x, y),
            facing,
            layer: 0,
            stop_by_colliding: true,
            busy: false,
        }
    }

    /// Ledge at (5,5) facing right, landing at (7,5) facing left.
    fn ledge() -> (FieldMap, TileEvent) {
        let mut map = FieldMap::new("m", 12, 10, 16, 16);
        map.registry.register(jump_at(5, 5, &[Direction::Right]));
        map.registry.register(jump_at(7, 5, &[Direction::Left]));
        let ev = map.registry.lookup(5, 5)[0].clone();
        (map, ev)
    }

    fn cancel(v: JumpVerdict) -> Option<JumpCancel> {
        match v {
            JumpVerdict::Cancel(c) => Some(c),
            JumpVerdict::Go { .. } => None,
        }
    }

    #[test]
    fn plain_ledge_jump_goes() {
        let (map, ev) = ledge();
        let v = evaluate_jump(&map, &ctx(5, 5, Direction::Right), &ev);
        assert_eq!(
            v,
            JumpVerdict::Go {
                plan: JumpPlan {
                    direction: Direction::Right,
                    side: TilePos::new(6, 5),
                    landing: TilePos::new(7, 5),
                },
                pillars: PillarAction::Keep,
            }
        );
    }

    #[test]
    fn preconditions_cancel_in_order() {
        let (map, ev) = ledge();
        let mut c = ctx(5, 5, Direction::Right);
        c.stop_by_colliding = false;
        assert_eq!(cancel(evaluate_jump(&map, &c, &ev)), Some(JumpCancel::NoPressure));

        let c = ctx(4, 5, Direction::Right);
        assert_eq!(cancel(evaluate_jump(&map, &c, &ev)), Some(JumpCancel::OffEventTile));

        let mut c = ctx(5, 5, Direction::Right);
        c.busy = true;
        assert_eq!(cancel(evaluate_jump(&map, &c, &ev)), Some(JumpCancel::Busy));

        let c = ctx(5, 5, Direction::UpRight);
        assert_eq!(cancel(evaluate_jump(&map, &c, &ev)), Some(JumpCancel::Diagonal));
    }

    #[test]
    fn jump_on_side_tile_cancels() {
        let (mut map, ev) = ledge();
        map.registry.register(jump_at(6, 5, &[Direction::Right]));
        let v = evaluate_jump(&map, &ctx(5, 5, Direction::Right), &ev);
        assert_eq!(cancel(v), Some(JumpCancel::SideJump));
    }

    #[test]
    fn object_on_side_jump_neutralises_it() {
        let (mut map, ev) = ledge();
        map.registry.register(jump_at(6, 5, &[Direction::Right]));
        map.interactables.push(InteractableObject::new("pillar", TilePos::new(6, 5), 0));
        let v = evaluate_jump(&map, &ctx(5, 5, Direction::Right), &ev);
        assert!(matches!(v, JumpVerdict::Go { .. }));
    }

    #[test]
    fn side_jump_on_other_layer_is_ignored() {
        let (mut map, ev) = ledge();
        map.registry.register(jump_at(6, 5, &[Direction::Right]).on_layers(&[1]));
        let v = evaluate_jump(&map, &ctx(5, 5, Direction::Right), &ev);
        assert!(matches!(v, JumpVerdict::Go { .. }));
    }

    #[test]
    fn object_on_landing_cancels() {
        let (mut map, ev) = ledge();
        map.interactables.push(InteractableObject::new("statue", TilePos::new(7, 5), 0));
        let v = evaluate_jump(&map, &ctx(5, 5, Direction::Right), &ev);
        assert_eq!(cancel(v), Some(JumpCancel::LandingOccupied));
    }

    #[test]
    fn landing_must_face_back() {
        let mut map = FieldMap::new("m", 12, 10, 16, 16);
        map.registry.register(jump_at(5, 5, &[Direction::Right]));
        map.registry.register(jump_at(7, 5, &[Direction::Right]));
        let ev = map.registry.lookup(5, 5)[0].clone();
        let v = evaluate_jump(&map, &ctx(5, 5, Direction::Right), &ev);
        assert_eq!(cancel(v), Some(JumpCancel::NoLandingJump));
    }

    #[test]
    fn unset_landing_jump_does_not_count() {
        let mut map = FieldMap::new("m", 12, 10, 16, 16);
        map.registry.register(jump_at(5, 5, &[Direction::Right]));
        map.registry.register(jump_at(7, 5, &[Direction::Left]).enabled(false));
        let ev = map.registry.lookup(5, 5)[0].clone();
        let v = evaluate_jump(&map, &ctx(5, 5, Direction::Right), &ev);
        assert_eq!(cancel(v), Some(JumpCancel::NoLandingJump));
    }

    #[test]
    fn dynamic_jump_needs_a_landing_event() {
        let mut map = FieldMap::new("m", 12, 10, 16, 16);
        map.registry.register(jump_at(5, 5, &[Direction::Right]).dynamic(true));
        let ev = map.registry.lookup(5, 5)[0].clone();
        let v = evaluate_jump(&map, &ctx(5, 5, Direction::Right), &ev);
        assert_eq!(cancel(v), Some(JumpCancel::DynamicWithoutLanding));
    }

    #[test]
    fn plain_jump_may_land_on_bare_floor() {
        let mut map = FieldMap::new("m", 12, 10, 16, 16);
        map.registry.register(jump_at(5, 5, &[Direction::Right]));
        let ev = map.registry.lookup(5, 5)[0].clone();
        let v = evaluate_jump(&map, &ctx(5, 5, Direction::Right), &ev);
        assert!(matches!(v, JumpVerdict::Go { pillars: PillarAction::Keep, .. }));
    }

    #[test]
    fn pillar_actions_follow_dynamic_flags() {
        // landing dynamic → rebuild
        let mut map = FieldMap::new("m", 12, 10, 16, 16);
        map.registry.register(jump_at(5, 5, &[Direction::Right]));
        map.registry.register(jump_at(7, 5, &[Direction::Left]).dynamic(true));
        let ev = map.registry.lookup(5, 5)[0].clone();
        let v = evaluate_jump(&map, &ctx(5, 5, Direction::Right), &ev);
        assert!(matches!(v, JumpVerdict::Go { pillars: PillarAction::Rebuild, .. }));

        // triggering dynamic, landing plain → release
        let mut map = FieldMap::new("m", 12, 10, 16, 16);
        map.registry.register(jump_at(5, 5, &[Direction::Right]).dynamic(true));
        map.registry.register(jump_at(7, 5, &[Direction::Left]));
        let ev = map.registry.lookup(5, 5)[0].clone();
        let v = evaluate_jump(&map, &ctx(5, 5, Direction::Right), &ev);
        assert!(matches!(v, JumpVerdict::Go { pillars: PillarAction::Release, .. }));
    }

    #[test]
    fn door_pressure_rule() {
        let door = DoorEvent {
            target: "inn".into(),
            x_target: 0,
            y_target: 0,
            dest_collider_layer: 0,
            advance_effect: true,
        };
        assert!(!door_may_start(&door, false));
        assert!(door_may_start(&door, true));
        let plain = DoorEvent { advance_effect: false, ..door };
        assert!(door_may_start(&plain, false));
    }
}
