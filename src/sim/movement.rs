/// Free-roam hero movement: velocity from input and sprite switching.

use crate::config::MovementConfig;
use crate::domain::direction::{Action, Direction};
use crate::domain::entity::FrameInput;
use crate::domain::location::PixelPos;

use super::services::{Host, Playback, Presentation};
use super::session::Session;

/// Set facing, action and velocity from held input.
pub fn drive_hero<H: Host>(session: &mut Session, input: &FrameInput, movement: &MovementConfig, host: &mut H) {
    match input.movement {
        Some(dir) => {
            session.facing = dir;
            let (base, action) = if input.dash {
                (movement.dash_speed, Action::Dash)
            } else {
                (movement.walk_speed, Action::Walk)
            };
            let speed = (base + session.extra_speed).max(0.0);
            let (ux, uy) = dir.unit_vector();
            host.set_hero_velocity(PixelPos::new(ux * speed, uy * speed));
            // Pressing into a wall shows the idle pose.
            session.action = if session.stop_by_colliding && !session.pushing() {
                Action::Idle
            } else {
                action
            };
        }
        None => {
            host.set_hero_velocity(PixelPos::ZERO);
            session.action = Action::Idle;
        }
    }
    refresh_sprite(session, host);
}

/// Zero velocity and drop to the idle pose.
pub fn stop_hero<H: Host>(session: &mut Session, host: &mut H) {
    host.set_hero_velocity(PixelPos::ZERO);
    session.action = Action::Idle;
    refresh_sprite(session, host);
}

/// Turn in place, then idle.
pub fn face<H: Host>(session: &mut Session, facing: Direction, host: &mut H) {
    session.facing = facing;
    stop_hero(session, host);
}

fn refresh_sprite<P: Presentation>(session: &mut Session, presentation: &mut P) {
    let wanted = (session.action, session.facing);
    if session.sprite != Some(wanted) {
        presentation.play_hero(wanted.0, wanted.1, Playback::Loop);
        session.sprite = Some(wanted);
    }
}
