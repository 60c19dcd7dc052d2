/// Step and collision-change events: armed on entry, resolved on exit.
///
/// Entering the event tile arms a pending crossing toward the next tile in
/// the activation direction. Reaching that tile applies the effect (a
/// half-tile vertical shift, or a collider layer switch). Leaving the event
/// tile any other way disarms it.

use log::debug;

use crate::domain::direction::Direction;
use crate::domain::event::{StepDirection, TileEvent};
use crate::domain::location::TilePos;

use super::event::FieldEvent;
use super::services::Host;
use super::session::Session;
use super::world::{configure_map_physics, EventContext};

#[derive(Clone, Debug, PartialEq)]
pub struct PendingStep {
    pub origin: TilePos,
    pub next: TilePos,
    pub shift_y: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingLayerChange {
    pub origin: TilePos,
    pub next: TilePos,
    pub dest_layer: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Crossing {
    Waiting,
    Reached,
    Abandoned,
}

fn check(origin: TilePos, next: TilePos, hero: TilePos) -> Crossing {
    if hero == next {
        Crossing::Reached
    } else if hero != origin {
        Crossing::Abandoned
    } else {
        Crossing::Waiting
    }
}

pub fn arm_step(session: &mut Session, event: &TileEvent, step: StepDirection, toward: Direction, tile_height: u32) {
    let half = (tile_height / 2) as i32;
    let shift_y = match step {
        StepDirection::Up => -half,
        StepDirection::Down => half,
    };
    session.pending_step = Some(PendingStep {
        origin: event.pos,
        next: event.pos.toward(toward, 1),
        shift_y,
    });
}

pub fn arm_layer_change(session: &mut Session, event: &TileEvent, dest_layer: u32, toward: Direction) {
    session.pending_layer_change = Some(PendingLayerChange {
        origin: event.pos,
        next: event.pos.toward(toward, 1),
        dest_layer,
    });
}

pub fn advance_step<H: Host>(ctx: &mut EventContext<'_, H>) {
    let Some(pending) = ctx.session.pending_step.clone() else { return };
    match check(pending.origin, pending.next, ctx.session.hero_tile) {
        Crossing::Waiting => {}
        Crossing::Abandoned => ctx.session.pending_step = None,
        Crossing::Reached => {
            ctx.session.pending_step = None;
            let mut pos = ctx.host.hero_position();
            pos.y += pending.shift_y as f32;
            ctx.host.set_hero_position(pos);
            ctx.session.hero_tile = ctx.map.tile_of(pos);
            debug!("stepped {} px at {:?}", pending.shift_y, pending.next);
            ctx.events.push(FieldEvent::Stepped { shift_y: pending.shift_y });
        }
    }
}

pub fn advance_layer_change<H: Host>(ctx: &mut EventContext<'_, H>) {
    let Some(pending) = ctx.session.pending_layer_change.clone() else { return };
    match check(pending.origin, pending.next, ctx.session.hero_tile) {
        Crossing::Waiting => {}
        Crossing::Abandoned => ctx.session.pending_layer_change = None,
        Crossing::Reached => {
            ctx.session.pending_layer_change = None;
            ctx.session.collider_layer = pending.dest_layer;
            ctx.host.pause();
            configure_map_physics(ctx.map, pending.dest_layer, ctx.host);
            ctx.host.resume();
            debug!("collider layer → {}", pending.dest_layer);
            ctx.events.push(FieldEvent::ColliderLayerChanged { layer: pending.dest_layer });
        }
    }
}
