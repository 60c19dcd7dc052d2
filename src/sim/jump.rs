/// Jump event machine: hop over a one-tile gap to the tile beyond.
///
/// ```text
/// Rising (crouch anim) ─▶ Flight (body tween, shadow hidden) ─▶ Landing (anim reversed)
/// ```
///
/// Physics stays paused from the first phase until landing completes.

use log::debug;

use crate::domain::direction::{Action, Direction};
use crate::domain::event::TileEvent;
use crate::domain::location::TilePos;
use crate::domain::rules::{self, JumpContext, JumpVerdict, PillarAction};

use super::event::FieldEvent;
use super::services::{Host, HeroTween, Playback, Signal};
use super::world::{EventContext, Progress};

#[derive(Clone, Debug, PartialEq)]
pub enum JumpPhase {
    Rising { anim: Signal },
    Flight { tween: Signal },
    Landing { anim: Signal },
}

#[derive(Clone, Debug, PartialEq)]
pub struct JumpRun {
    pub direction: Direction,
    pub from: TilePos,
    pub landing: TilePos,
    pub phase: JumpPhase,
}

/// Evaluate the jump rules and, if they pass, take off.
pub fn try_start<H: Host>(ctx: &mut EventContext<'_, H>, event: &TileEvent) -> Option<JumpRun> {
    let jc = JumpContext {
        hero_tile: ctx.session.hero_tile,
        facing: ctx.session.facing,
        layer: ctx.session.collider_layer,
        stop_by_colliding: ctx.session.stop_by_colliding,
        busy: ctx.session.busy_for_jump(),
    };
    let (plan, pillars) = match rules::evaluate_jump(ctx.map, &jc, event) {
        JumpVerdict::Go { plan, pillars } => (plan, pillars),
        JumpVerdict::Cancel(reason) => {
            debug!("jump at {:?} cancelled: {reason:?}", event.pos);
            return None;
        }
    };

    match pillars {
        PillarAction::Rebuild => {
            let bodies = ctx.pillars.rebuild_for_map(ctx.map, jc.layer, ctx.host);
            ctx.events.push(FieldEvent::PillarsRaised { bodies });
        }
        PillarAction::Release => {
            ctx.pillars.release(ctx.host);
            ctx.events.push(FieldEvent::PillarsLowered);
        }
        PillarAction::Keep => {}
    }

    ctx.host.set_hero_velocity(Default::default());
    ctx.host.pause();
    ctx.session.action = Action::Jump;
    ctx.session.sprite = Some((Action::Jump, plan.direction));
    let anim = ctx.host.play_hero(Action::Jump, plan.direction, Playback::Once);

    debug!("jump {:?} → {:?}", event.pos, plan.landing);
    ctx.events.push(FieldEvent::JumpStarted { from: event.pos, to: plan.landing });
    Some(JumpRun {
        direction: plan.direction,
        from: event.pos,
        landing: plan.landing,
        phase: JumpPhase::Rising { anim },
    })
}

/// The body tween for the flight phase.
///
/// Horizontal jumps move `offset` along x while y arcs through
/// `[y-5, y-8, y-5, y]` at the landing row. Vertical jumps move along y
/// with x pinned to the landing column.
pub fn flight_tween(direction: Direction, hero_x: f32, hero_y: f32, landing_x: f32, landing_y: f32, offset: f32) -> HeroTween {
    let (dx, dy) = direction.offset();
    if dx != 0 {
        HeroTween {
            x: vec![hero_x + offset * dx as f32],
            y: vec![landing_y - 5.0, landing_y - 8.0, landing_y - 5.0, landing_y],
        }
    } else {
        HeroTween {
            x: vec![landing_x],
            y: vec![hero_y + offset * dy as f32],
        }
    }
}

/// One phase step.
pub fn advance<H: Host>(mut run: JumpRun, ctx: &mut EventContext<'_, H>) -> Progress<JumpRun> {
    run.phase = match run.phase {
        JumpPhase::Rising { anim } if ctx.host.finished(anim) => {
            let center = ctx.map.tile_center(run.landing);
            ctx.host.place_shadow(center, false);
            let hero = ctx.host.hero_position();
            let tween = flight_tween(
                run.direction,
                hero.x,
                hero.y,
                center.x,
                center.y,
                ctx.settings.timing.jump_offset_px,
            );
            JumpPhase::Flight { tween: ctx.host.tween_hero(tween, ctx.settings.timing.jump_duration_ms) }
        }
        JumpPhase::Flight { tween } if ctx.host.finished(tween) => {
            let center = ctx.map.tile_center(run.landing);
            ctx.host.place_shadow(center, true);
            JumpPhase::Landing { anim: ctx.host.play_hero(Action::Jump, run.direction, Playback::Reverse) }
        }
        JumpPhase::Landing { anim } if ctx.host.finished(anim) => {
            ctx.host.resume();
            let hero = ctx.host.hero_position();
            ctx.session.hero_tile = ctx.map.tile_of(hero);
            ctx.session.action = Action::Idle;
            ctx.session.sprite = None;
            ctx.events.push(FieldEvent::JumpLanded { at: ctx.session.hero_tile });
            return Progress::Finished;
        }
        waiting => waiting,
    };
    Progress::Running(run)
}
