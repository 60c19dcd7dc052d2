/// The step function: advances the field by one tick.
///
/// Processing order:
///   1. Menu toggle
///   2. If free:
///      a. Read collision pressure and hero tile from physics
///      b. Resolve pending step / collision-change crossings
///      c. Trigger events on the hero tile (or reset the speed bonus)
///      d. NPC talk, then free movement
///   3. Otherwise: advance exactly one phase of the owning activity
///
/// The activity is moved out of the session for the duration of the tick
/// and written back by whichever branch keeps it alive.

use crate::domain::entity::FrameInput;
use crate::domain::event::{EventKind, TileEvent};
use crate::domain::location::PixelPos;
use crate::error::FieldResult;

use super::crossing;
use super::door;
use super::event::FieldEvent;
use super::jump;
use super::movement;
use super::npc;
use super::services::Host;
use super::session::{ActiveEvent, Activity};
use super::world::{EventContext, FieldState, Progress};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step<H: Host>(field: &mut FieldState, input: FrameInput, host: &mut H) -> FieldResult<Vec<FieldEvent>> {
    let mut events: Vec<FieldEvent> = Vec::new();
    field.tick += 1;
    field.tick_message();

    if input.menu {
        toggle_menu(field, host, &mut events);
    }

    let activity = std::mem::take(&mut field.session.activity);
    let mut ctx = field.context(host, &mut events);

    match activity {
        Activity::Free => free_roam(&mut ctx, &input),

        Activity::OnEvent(ActiveEvent::Door(run)) => {
            ctx.host.set_hero_velocity(PixelPos::ZERO);
            if let Progress::Running(run) = door::advance(run, &mut ctx)? {
                ctx.session.activity = Activity::OnEvent(ActiveEvent::Door(run));
            }
        }

        Activity::OnEvent(ActiveEvent::Jump(run)) => {
            ctx.host.set_hero_velocity(PixelPos::ZERO);
            if let Progress::Running(run) = jump::advance(run, &mut ctx) {
                ctx.session.activity = Activity::OnEvent(ActiveEvent::Jump(run));
            }
        }

        Activity::NpcEvent(talk) => {
            if let Progress::Running(talk) = npc::advance(talk, input.interact, &mut ctx) {
                ctx.session.activity = Activity::NpcEvent(talk);
            }
        }

        // Owned elsewhere: keep the hero still until the owner finishes.
        other => {
            movement::stop_hero(ctx.session, ctx.host);
            ctx.session.activity = other;
        }
    }

    Ok(events)
}

// ══════════════════════════════════════════════════════════════
// Menu
// ══════════════════════════════════════════════════════════════

fn toggle_menu<H: Host>(field: &mut FieldState, host: &mut H, events: &mut Vec<FieldEvent>) {
    let session = &mut field.session;
    if session.menu_open() {
        session.finish_activity();
        events.push(FieldEvent::MenuClosed);
    } else if session.begin(Activity::Menu) {
        movement::stop_hero(session, host);
        events.push(FieldEvent::MenuOpened);
    }
}

// ══════════════════════════════════════════════════════════════
// Free roaming
// ══════════════════════════════════════════════════════════════

fn free_roam<H: Host>(ctx: &mut EventContext<'_, H>, input: &FrameInput) {
    ctx.session.stop_by_colliding = ctx.host.hero_blocked();
    let hero = ctx.host.hero_position();
    ctx.session.hero_tile = ctx.map.tile_of(hero);

    crossing::advance_step(ctx);
    crossing::advance_layer_change(ctx);

    if ctx.map.registry.has_events(ctx.session.hero_tile) {
        trigger_events(ctx);
    } else if ctx.session.extra_speed != 0.0 {
        ctx.session.extra_speed = 0.0;
        ctx.events.push(FieldEvent::SpeedChanged { extra: 0.0 });
    }

    if !ctx.session.is_free() {
        return;
    }

    if input.interact {
        if let Some(talk) = npc::try_start(ctx) {
            ctx.session.activity = Activity::NpcEvent(talk);
            return;
        }
    }

    movement::drive_hero(ctx.session, input, &ctx.settings.movement, ctx.host);
}

/// Walk the hero tile's bucket in declaration order. The first event that
/// starts an exclusive activity ends the walk.
fn trigger_events<H: Host>(ctx: &mut EventContext<'_, H>) {
    let tile = ctx.session.hero_tile;
    let layer = ctx.session.collider_layer;
    let bucket: Vec<TileEvent> = ctx.map.registry.at(tile).to_vec();

    for event in &bucket {
        if !event.on_layer(layer) {
            continue;
        }
        if event.is_jump() {
            let facing = ctx.session.facing;
            if let Some(ev) = ctx.pillars.walk_near(ctx.map, tile, facing, layer, event, ctx.host) {
                ctx.events.push(ev);
            }
        }
        let facing = ctx.session.facing;
        if !event.is_set || !event.is_active(facing) {
            continue;
        }

        match &event.kind {
            EventKind::Speed { speed } => {
                if ctx.session.extra_speed != *speed {
                    ctx.session.extra_speed = *speed;
                    ctx.events.push(FieldEvent::SpeedChanged { extra: *speed });
                }
            }
            EventKind::Door(_) => {
                if let Some(run) = door::start(ctx, event) {
                    ctx.session.activity = Activity::OnEvent(ActiveEvent::Door(run));
                    return;
                }
            }
            EventKind::Jump => {
                if let Some(run) = jump::try_start(ctx, event) {
                    ctx.session.activity = Activity::OnEvent(ActiveEvent::Jump(run));
                    return;
                }
            }
            EventKind::Step { step_direction } => {
                if ctx.session.pending_step.is_none() {
                    crossing::arm_step(ctx.session, event, *step_direction, facing, ctx.map.tile_height);
                }
            }
            EventKind::CollisionChange { dest_collider_layer } => {
                if ctx.session.pending_layer_change.is_none() {
                    crossing::arm_layer_change(ctx.session, event, *dest_collider_layer, facing);
                }
            }
        }
    }
}
