/// Door / teleport event machine.
///
/// ```text
/// start ─▶ Approaching ─▶ Teleporting ─▶ ProcessingTeleport ─▶ FadingOut ─▶ done
///  (only with advance_effect)
/// ```
///
/// Each phase first issues its work (tween, fade, mount, flash) and stores
/// the handle, then polls that handle on later ticks. The old map is torn
/// down only once the new one has mounted, so a failed mount leaves the
/// previous map, layer and hero position untouched.

use std::task::Poll;

use log::{debug, info};

use crate::domain::direction::{Action, Direction};
use crate::domain::event::{DoorEvent, EventKind, TileEvent};
use crate::domain::location::{PixelPos, TilePos};
use crate::domain::map::FieldMap;
use crate::domain::rules;
use crate::error::{FieldError, FieldResult};

use super::event::FieldEvent;
use super::movement;
use super::services::{Host, HeroTween, MountTicket, Playback, Signal};
use super::world::{configure_map_physics, frame_camera, release_map, EventContext, Progress};

#[derive(Clone, Debug, PartialEq)]
pub enum DoorPhase {
    Approaching { tween: Signal },
    Teleporting { fade: Option<Signal> },
    ProcessingTeleport { mount: Option<MountTicket> },
    FadingOut { flash: Option<Signal> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct DoorRun {
    pub at: TilePos,
    pub facing: Direction,
    pub door: DoorEvent,
    pub phase: DoorPhase,
}

/// Begin a door transition, or do nothing when its preconditions fail.
pub fn start<H: Host>(ctx: &mut EventContext<'_, H>, event: &TileEvent) -> Option<DoorRun> {
    let EventKind::Door(door) = &event.kind else { return None };
    if !rules::door_may_start(door, ctx.session.stop_by_colliding) {
        debug!("door at {:?} waits for collision pressure", event.pos);
        return None;
    }

    let phase = if door.advance_effect {
        movement::stop_hero(ctx.session, ctx.host);
        ctx.host.play_hero(Action::Walk, Direction::Up, Playback::Loop);
        ctx.session.sprite = Some((Action::Walk, Direction::Up));

        let tiles = ctx.map.open_door(event.id);
        ctx.events.push(FieldEvent::DoorOpened { at: event.pos, tiles });

        ctx.host.pause();
        let hero = ctx.host.hero_position();
        let target = PixelPos::new(
            ctx.map.tile_center(event.pos).x,
            hero.y - ctx.settings.timing.door_approach_px,
        );
        let ms = ctx.settings.timing.door_tween_ms;
        ctx.host.tween_shadow(target, ms);
        let tween = ctx.host.tween_hero(HeroTween::to(target), ms);
        DoorPhase::Approaching { tween }
    } else {
        DoorPhase::Teleporting { fade: None }
    };

    info!("door at {:?} → `{}` ({},{})", event.pos, door.target, door.x_target, door.y_target);
    ctx.events.push(FieldEvent::DoorEntered { target: door.target.clone() });
    Some(DoorRun {
        at: event.pos,
        facing: event.primary_direction().unwrap_or(ctx.session.facing),
        door: door.clone(),
        phase,
    })
}

/// One phase step.
pub fn advance<H: Host>(mut run: DoorRun, ctx: &mut EventContext<'_, H>) -> FieldResult<Progress<DoorRun>> {
    run.phase = match run.phase {
        DoorPhase::Approaching { tween } => {
            if ctx.host.finished(tween) {
                DoorPhase::Teleporting { fade: None }
            } else {
                DoorPhase::Approaching { tween }
            }
        }

        DoorPhase::Teleporting { fade: None } => {
            movement::face(ctx.session, run.facing, ctx.host);
            DoorPhase::Teleporting { fade: Some(ctx.host.camera_fade()) }
        }
        DoorPhase::Teleporting { fade: Some(fade) } => {
            if ctx.host.finished(fade) {
                ctx.host.set_camera_lerp(1.0);
                DoorPhase::ProcessingTeleport { mount: None }
            } else {
                DoorPhase::Teleporting { fade: Some(fade) }
            }
        }

        DoorPhase::ProcessingTeleport { mount: None } => {
            debug!("mounting `{}`", run.door.target);
            DoorPhase::ProcessingTeleport { mount: Some(ctx.host.begin_mount(&run.door.target)) }
        }
        DoorPhase::ProcessingTeleport { mount: Some(ticket) } => match ctx.host.poll_mount(ticket) {
            Poll::Pending => DoorPhase::ProcessingTeleport { mount: Some(ticket) },
            Poll::Ready(Err(e)) => {
                return Err(FieldError::MountFailed { map: run.door.target.clone(), source: Box::new(e) });
            }
            Poll::Ready(Ok(map)) => {
                commit_teleport(&run.door, map, ctx);
                DoorPhase::FadingOut { flash: None }
            }
        },

        DoorPhase::FadingOut { flash: None } => {
            let hero = ctx.host.hero_position();
            ctx.host.place_shadow(hero, true);
            DoorPhase::FadingOut { flash: Some(ctx.host.camera_flash()) }
        }
        DoorPhase::FadingOut { flash: Some(flash) } => {
            if !ctx.host.finished(flash) {
                DoorPhase::FadingOut { flash: Some(flash) }
            } else {
                ctx.host.set_camera_lerp(ctx.settings.camera.lerp);
                movement::stop_hero(ctx.session, ctx.host);
                ctx.events.push(FieldEvent::TransitionFinished);
                return Ok(Progress::Finished);
            }
        }
    };
    Ok(Progress::Running(run))
}

/// Swap maps: release the old one, then place the hero on the new one.
fn commit_teleport<H: Host>(door: &DoorEvent, map: FieldMap, ctx: &mut EventContext<'_, H>) {
    release_map(ctx.map, ctx.pillars, ctx.host);
    *ctx.map = map;

    let session = &mut *ctx.session;
    session.map_name = door.target.clone();
    session.collider_layer = door.dest_collider_layer;
    session.hero_tile = TilePos::new(door.x_target, door.y_target);
    session.pending_step = None;
    session.pending_layer_change = None;
    session.extra_speed = 0.0;

    let pos = ctx.map.tile_center(session.hero_tile);
    ctx.host.set_hero_position(pos);
    ctx.host.resume();
    configure_map_physics(ctx.map, door.dest_collider_layer, ctx.host);
    frame_camera(ctx.map, ctx.settings, ctx.host);

    info!("mounted `{}`, hero at {:?} layer {}", door.target, session.hero_tile, door.dest_collider_layer);
    ctx.events.push(FieldEvent::MapMounted { map: door.target.clone() });
}
