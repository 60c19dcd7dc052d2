/// Collaborator traits the field drives: physics, presentation and map loading.
///
/// Long-running work (animations, tweens, camera effects, map mounts) hands
/// back a handle. Event machines store the handle in their phase and poll it
/// on later ticks, so no callbacks cross this boundary.

use std::task::Poll;

use crate::domain::direction::{Action, Direction};
use crate::domain::location::PixelPos;
use crate::domain::map::FieldMap;
use crate::domain::physics::{BodyId, StaticBody};
use crate::error::FieldResult;

/// Completion handle for an animation, tween or camera effect.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Signal(pub u32);

/// Handle for an in-flight map mount.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MountTicket(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Playback {
    /// Never completes.
    Loop,
    Once,
    Reverse,
}

/// Keyframed hero movement. Each axis lists target values visited in order
/// from the current position; an empty axis stays put.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct HeroTween {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
}

impl HeroTween {
    pub fn to(target: PixelPos) -> Self {
        HeroTween { x: vec![target.x], y: vec![target.y] }
    }
}

pub trait Physics {
    fn pause(&mut self);
    fn resume(&mut self);
    fn is_paused(&self) -> bool;

    fn hero_position(&self) -> PixelPos;
    fn set_hero_position(&mut self, pos: PixelPos);
    /// Pixels per second.
    fn set_hero_velocity(&mut self, velocity: PixelPos);
    /// Whether the last movement attempt was stopped by a collision.
    fn hero_blocked(&self) -> bool;

    fn create_static_body(&mut self, body: StaticBody) -> BodyId;
    fn destroy_body(&mut self, id: BodyId);
    /// Enable or disable hero collision against map terrain.
    fn set_hero_map_collision(&mut self, enabled: bool);
    /// Rebuild terrain, NPC and object colliders for `layer` of `map`.
    fn configure_map(&mut self, map: &FieldMap, layer: u32);
}

pub trait Presentation {
    fn play_hero(&mut self, action: Action, facing: Direction, playback: Playback) -> Signal;
    fn tween_hero(&mut self, tween: HeroTween, duration_ms: u32) -> Signal;
    fn tween_shadow(&mut self, to: PixelPos, duration_ms: u32) -> Signal;
    fn place_shadow(&mut self, pos: PixelPos, visible: bool);

    fn camera_fade(&mut self) -> Signal;
    fn camera_flash(&mut self) -> Signal;
    fn set_camera_lerp(&mut self, lerp: f32);
    fn set_camera_bounds(&mut self, width: u32, height: u32);

    fn finished(&self, signal: Signal) -> bool;
}

pub trait MapLoader {
    fn begin_mount(&mut self, name: &str) -> MountTicket;
    /// `Ready` exactly once per ticket.
    fn poll_mount(&mut self, ticket: MountTicket) -> Poll<FieldResult<FieldMap>>;
}

/// Everything the dispatcher needs from its environment.
pub trait Host: Physics + Presentation + MapLoader {}

impl<T: Physics + Presentation + MapLoader> Host for T {}
