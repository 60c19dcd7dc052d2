/// FieldState: the complete snapshot of a running field session.
///
/// ## Ownership
///
///   - `map`    : the mounted map, owning its event registry and entities.
///   - `session`: hero state and the single exclusive activity.
///   - `pillars`: synthetic body handles plus their adjacency memo.
///
/// Event machines never see `FieldState` itself. `context()` splits it into
/// an `EventContext` of disjoint borrows, so each machine touches only the
/// pieces it is handed.

use log::debug;

use crate::config::FieldSettings;
use crate::domain::direction::Direction;
use crate::domain::location::TilePos;
use crate::domain::map::FieldMap;
use crate::domain::physics::{CollisionGroup, StaticBody};

use super::event::FieldEvent;
use super::pillars::PillarBodies;
use super::services::{Host, Physics, Presentation};
use super::session::Session;

const MESSAGE_TICKS: u32 = 180;

pub struct FieldState {
    pub session: Session,
    pub map: FieldMap,
    pub pillars: PillarBodies,
    pub settings: FieldSettings,
    pub tick: u64,
    pub message: String,
    pub message_timer: u32,
}

/// Outcome of one phase step of an event machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Progress<T> {
    Running(T),
    Finished,
}

/// Borrowed view of field state for one machine step.
pub struct EventContext<'a, H> {
    pub session: &'a mut Session,
    pub map: &'a mut FieldMap,
    pub pillars: &'a mut PillarBodies,
    pub settings: &'a FieldSettings,
    pub host: &'a mut H,
    pub events: &'a mut Vec<FieldEvent>,
}

impl FieldState {
    pub fn new(map: FieldMap, tile: TilePos, layer: u32, facing: Direction, settings: FieldSettings) -> Self {
        FieldState {
            session: Session::new(&map.name, tile, layer, facing),
            map,
            pillars: PillarBodies::default(),
            settings,
            tick: 0,
            message: String::new(),
            message_timer: 0,
        }
    }

    /// Place the hero and build physics for the current map.
    pub fn enter<H: Host>(&mut self, host: &mut H) {
        let pos = self.map.tile_center(self.session.hero_tile);
        host.set_hero_position(pos);
        host.set_hero_velocity(Default::default());
        configure_map_physics(&mut self.map, self.session.collider_layer, host);
        frame_camera(&self.map, &self.settings, host);
        host.set_camera_lerp(self.settings.camera.lerp);
        host.place_shadow(pos, true);
        debug!("entered `{}` at {:?}", self.map.name, self.session.hero_tile);
    }

    pub fn context<'a, H>(&'a mut self, host: &'a mut H, events: &'a mut Vec<FieldEvent>) -> EventContext<'a, H> {
        EventContext {
            session: &mut self.session,
            map: &mut self.map,
            pillars: &mut self.pillars,
            settings: &self.settings,
            host,
            events,
        }
    }

    /// Release every physics handle the map holds, then drop its contents.
    pub fn unload_map<P: Physics>(&mut self, physics: &mut P) {
        release_map(&mut self.map, &mut self.pillars, physics);
    }

    pub fn set_message(&mut self, msg: &str) {
        self.message = msg.to_string();
        self.message_timer = MESSAGE_TICKS;
    }

    pub fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }
}

/// Terrain colliders plus the blocking stair blocks of interactables.
pub fn configure_map_physics<P: Physics>(map: &mut FieldMap, layer: u32, physics: &mut P) {
    physics.configure_map(map, layer);
    let (tw, th) = (map.tile_width, map.tile_height);
    for obj in map.interactables.iter_mut().filter(|o| o.has_stair_block) {
        if obj.blocking_stair_block.is_none() {
            let body = StaticBody::tile(obj.pos.offset(0, -1), tw, th, CollisionGroup::Interactable);
            obj.blocking_stair_block = Some(physics.create_static_body(body));
        }
    }
}

pub fn release_map<P: Physics>(map: &mut FieldMap, pillars: &mut PillarBodies, physics: &mut P) {
    for obj in &mut map.interactables {
        if let Some(body) = obj.blocking_stair_block.take() {
            physics.destroy_body(body);
        }
    }
    pillars.release(physics);
    map.unload();
}

/// Camera bounds cover the map, and never shrink below the viewport.
pub fn frame_camera<P: Presentation>(map: &FieldMap, settings: &FieldSettings, presentation: &mut P) {
    let (w, h) = map.pixel_size();
    presentation.set_camera_bounds(
        w.max(settings.camera.viewport_width),
        h.max(settings.camera.viewport_height),
    );
}
