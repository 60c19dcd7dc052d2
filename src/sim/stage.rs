/// Stage: the built-in headless host.
///
/// Implements physics, presentation and map loading with plain timers, so
/// the field runs the same in the terminal front end and in tests.
///
/// ## Physics model
///
///   The hero is a point. Each `advance()` moves it by velocity × dt, one
///   axis at a time. An axis move is rejected when the new point lands on
///   solid terrain (while map collision is on), on an NPC or object tile of
///   the configured layer, or inside any static body.
///
/// ## Timers
///
///   Every animation, tween and camera effect gets a `Signal` backed by a
///   countdown on its channel. A new signal on a channel supersedes the old
///   one, which then reads as finished. Looping animations never finish on
///   their own. Map mounts complete after `mount_delay_ms` and build a fresh
///   map from the library.

use std::collections::{BTreeMap, HashMap};
use std::task::Poll;

use log::{debug, trace};

use crate::config::TimingConfig;
use crate::domain::direction::{animation_key, Action, Direction};
use crate::domain::location::{PixelPos, TilePos};
use crate::domain::map::FieldMap;
use crate::domain::physics::{BodyId, StaticBody};
use crate::domain::tile::CollisionGrid;
use crate::error::{FieldError, FieldResult};

use super::maps::MapLibrary;
use super::services::{HeroTween, MapLoader, MountTicket, Physics, Playback, Presentation, Signal};

// ── Tweens ──

/// Piecewise-linear path through `[start, keys..]` on each axis independently.
#[derive(Clone, Debug)]
struct Track {
    start: PixelPos,
    x: Vec<f32>,
    y: Vec<f32>,
    elapsed_ms: u32,
    duration_ms: u32,
}

impl Track {
    fn new(start: PixelPos, tween: HeroTween, duration_ms: u32) -> Self {
        Track { start, x: tween.x, y: tween.y, elapsed_ms: 0, duration_ms }
    }

    fn done(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }

    fn sample(&self) -> PixelPos {
        let t = if self.duration_ms == 0 {
            1.0
        } else {
            (self.elapsed_ms as f32 / self.duration_ms as f32).min(1.0)
        };
        PixelPos::new(sample_axis(self.start.x, &self.x, t), sample_axis(self.start.y, &self.y, t))
    }
}

fn sample_axis(start: f32, keys: &[f32], t: f32) -> f32 {
    let Some(&last) = keys.last() else { return start };
    if t >= 1.0 {
        return last;
    }
    let segments = keys.len() as f32;
    let scaled = t * segments;
    let i = scaled.floor() as usize;
    let from = if i == 0 { start } else { keys[i - 1] };
    let to = keys[i];
    from + (to - from) * (scaled - i as f32)
}

// ── Camera ──

#[derive(Clone, Debug)]
pub struct Camera {
    pub focus: PixelPos,
    pub lerp: f32,
    pub bounds: (u32, u32),
    /// Faded to black and not yet flashed back.
    pub dimmed: bool,
}

// ── Clocks ──

/// What a clock times. Each channel holds at most one live signal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Channel {
    HeroAnimation,
    HeroTween,
    ShadowTween,
    Camera,
}

#[derive(Clone, Copy, Debug)]
struct Clock {
    signal: Signal,
    /// `None` loops forever.
    remaining_ms: Option<u32>,
}

#[derive(Clone, Debug)]
struct Mount {
    map: String,
    remaining_ms: u32,
}

// ══════════════════════════════════════════════════════════════
// Stage
// ══════════════════════════════════════════════════════════════

pub struct Stage {
    library: MapLibrary,
    timing: TimingConfig,

    tile_size: (u32, u32),
    terrain: Option<CollisionGrid>,
    blockers: Vec<TilePos>,

    hero: PixelPos,
    velocity: PixelPos,
    paused: bool,
    blocked: bool,
    map_collision: bool,
    bodies: BTreeMap<BodyId, StaticBody>,
    next_body: u32,
    bodies_created: usize,

    clocks: HashMap<Channel, Clock>,
    next_signal: u32,
    hero_track: Option<Track>,
    hero_animation: String,
    shadow: PixelPos,
    shadow_visible: bool,
    shadow_track: Option<Track>,
    camera: Camera,

    mounts: HashMap<MountTicket, Mount>,
    next_ticket: u32,
}

impl Stage {
    pub fn new(library: MapLibrary, timing: &TimingConfig) -> Self {
        Stage {
            library,
            timing: timing.clone(),
            tile_size: (16, 16),
            terrain: None,
            blockers: Vec::new(),
            hero: PixelPos::ZERO,
            velocity: PixelPos::ZERO,
            paused: false,
            blocked: false,
            map_collision: true,
            bodies: BTreeMap::new(),
            next_body: 1,
            bodies_created: 0,
            clocks: HashMap::new(),
            next_signal: 1,
            hero_track: None,
            hero_animation: animation_key(Action::Idle, Direction::Down),
            shadow: PixelPos::ZERO,
            shadow_visible: true,
            shadow_track: None,
            camera: Camera { focus: PixelPos::ZERO, lerp: 1.0, bounds: (0, 0), dimmed: false },
            mounts: HashMap::new(),
            next_ticket: 1,
        }
    }

    /// A stage whose library holds only `map`, with its layer 0 configured.
    #[cfg(test)]
    pub fn for_map(map: &FieldMap) -> Self {
        let mut library = MapLibrary::new();
        library.add_map(map.clone());
        let mut stage = Stage::new(library, &TimingConfig::default());
        stage.configure_map(map, 0);
        stage
    }

    /// Run every timer, tween and the hero's movement forward by `dt_ms`.
    pub fn advance(&mut self, dt_ms: u32) {
        for clock in self.clocks.values_mut() {
            if let Some(remaining) = &mut clock.remaining_ms {
                *remaining = remaining.saturating_sub(dt_ms);
            }
        }
        for mount in self.mounts.values_mut() {
            mount.remaining_ms = mount.remaining_ms.saturating_sub(dt_ms);
        }

        if let Some(track) = &mut self.hero_track {
            track.elapsed_ms = track.elapsed_ms.saturating_add(dt_ms);
            self.hero = track.sample();
            if track.done() {
                self.hero_track = None;
            }
        } else if !self.paused {
            self.move_hero(dt_ms);
        }

        if let Some(track) = &mut self.shadow_track {
            track.elapsed_ms = track.elapsed_ms.saturating_add(dt_ms);
            self.shadow = track.sample();
            if track.done() {
                self.shadow_track = None;
            }
        }

        self.follow_hero();
    }

    fn move_hero(&mut self, dt_ms: u32) {
        let secs = dt_ms as f32 / 1000.0;
        let (dx, dy) = (self.velocity.x * secs, self.velocity.y * secs);
        let mut blocked = false;

        if dx != 0.0 {
            let next = PixelPos::new(self.hero.x + dx, self.hero.y);
            if self.collides(next) {
                blocked = true;
            } else {
                self.hero = next;
            }
        }
        if dy != 0.0 {
            let next = PixelPos::new(self.hero.x, self.hero.y + dy);
            if self.collides(next) {
                blocked = true;
            } else {
                self.hero = next;
            }
        }

        if blocked && !self.blocked {
            trace!("hero blocked at {:?}", self.hero);
        }
        self.blocked = blocked;
    }

    fn collides(&self, p: PixelPos) -> bool {
        let tile = p.tile(self.tile_size.0, self.tile_size.1);
        if self.map_collision {
            let solid = match &self.terrain {
                Some(grid) => grid.is_solid(tile),
                None => true,
            };
            if solid {
                return true;
            }
        }
        self.blockers.contains(&tile) || self.bodies.values().any(|b| b.contains(p))
    }

    fn follow_hero(&mut self) {
        let lerp = self.camera.lerp.clamp(0.0, 1.0);
        let (w, h) = self.camera.bounds;
        let focus = &mut self.camera.focus;
        focus.x += (self.hero.x - focus.x) * lerp;
        focus.y += (self.hero.y - focus.y) * lerp;
        focus.x = focus.x.clamp(0.0, w as f32);
        focus.y = focus.y.clamp(0.0, h as f32);
    }

    fn signal(&mut self, channel: Channel, duration_ms: Option<u32>) -> Signal {
        let signal = Signal(self.next_signal);
        self.next_signal += 1;
        self.clocks.insert(channel, Clock { signal, remaining_ms: duration_ms });
        signal
    }

    // ── Accessors ──

    #[cfg(test)]
    pub fn clock_count(&self) -> usize {
        self.clocks.len()
    }

    pub fn hero_velocity(&self) -> PixelPos {
        self.velocity
    }

    pub fn hero_animation(&self) -> &str {
        &self.hero_animation
    }

    pub fn hero_map_collision(&self) -> bool {
        self.map_collision
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Bodies ever created, including destroyed ones.
    pub fn bodies_created(&self) -> usize {
        self.bodies_created
    }

    pub fn bodies(&self) -> impl Iterator<Item = &StaticBody> {
        self.bodies.values()
    }

    pub fn shadow(&self) -> Option<PixelPos> {
        self.shadow_visible.then_some(self.shadow)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Whether a hero tween is still running.
    pub fn tweening(&self) -> bool {
        self.hero_track.is_some()
    }
}

// ══════════════════════════════════════════════════════════════
// Host implementation
// ══════════════════════════════════════════════════════════════

impl Physics for Stage {
    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn hero_position(&self) -> PixelPos {
        self.hero
    }

    fn set_hero_position(&mut self, pos: PixelPos) {
        self.hero_track = None;
        self.hero = pos;
        self.blocked = false;
    }

    fn set_hero_velocity(&mut self, velocity: PixelPos) {
        self.velocity = velocity;
    }

    fn hero_blocked(&self) -> bool {
        self.blocked
    }

    fn create_static_body(&mut self, body: StaticBody) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies_created += 1;
        self.bodies.insert(id, body);
        id
    }

    fn destroy_body(&mut self, id: BodyId) {
        self.bodies.remove(&id);
    }

    fn set_hero_map_collision(&mut self, enabled: bool) {
        self.map_collision = enabled;
    }

    fn configure_map(&mut self, map: &FieldMap, layer: u32) {
        self.tile_size = (map.tile_width, map.tile_height);
        self.terrain = map.collision.get(&layer).cloned();
        self.blockers = map
            .npcs
            .iter()
            .filter(|n| n.collider_layer == layer)
            .map(|n| n.pos)
            .chain(map.interactables.iter().filter(|o| o.collider_layer == layer).map(|o| o.pos))
            .collect();
        debug!("stage configured for `{}` layer {layer} ({} blockers)", map.name, self.blockers.len());
    }
}

impl Presentation for Stage {
    fn play_hero(&mut self, action: Action, facing: Direction, playback: Playback) -> Signal {
        self.hero_animation = animation_key(action, facing);
        let duration = match playback {
            Playback::Loop => None,
            Playback::Once | Playback::Reverse => Some(self.timing.jump_anim_ms),
        };
        self.signal(Channel::HeroAnimation, duration)
    }

    fn tween_hero(&mut self, tween: HeroTween, duration_ms: u32) -> Signal {
        self.hero_track = Some(Track::new(self.hero, tween, duration_ms));
        self.blocked = false;
        self.signal(Channel::HeroTween, Some(duration_ms))
    }

    fn tween_shadow(&mut self, to: PixelPos, duration_ms: u32) -> Signal {
        self.shadow_track = Some(Track::new(self.shadow, HeroTween::to(to), duration_ms));
        self.signal(Channel::ShadowTween, Some(duration_ms))
    }

    fn place_shadow(&mut self, pos: PixelPos, visible: bool) {
        self.shadow_track = None;
        self.shadow = pos;
        self.shadow_visible = visible;
    }

    fn camera_fade(&mut self) -> Signal {
        self.camera.dimmed = true;
        self.signal(Channel::Camera, Some(self.timing.fade_ms))
    }

    fn camera_flash(&mut self) -> Signal {
        self.camera.dimmed = false;
        self.signal(Channel::Camera, Some(self.timing.flash_ms))
    }

    fn set_camera_lerp(&mut self, lerp: f32) {
        self.camera.lerp = lerp;
    }

    fn set_camera_bounds(&mut self, width: u32, height: u32) {
        self.camera.bounds = (width, height);
    }

    fn finished(&self, signal: Signal) -> bool {
        match self.clocks.values().find(|c| c.signal == signal) {
            Some(clock) => clock.remaining_ms == Some(0),
            // Superseded on its channel.
            None => signal.0 < self.next_signal,
        }
    }
}

impl MapLoader for Stage {
    fn begin_mount(&mut self, name: &str) -> MountTicket {
        let ticket = MountTicket(self.next_ticket);
        self.next_ticket += 1;
        self.mounts.insert(ticket, Mount { map: name.to_string(), remaining_ms: self.timing.mount_delay_ms });
        ticket
    }

    fn poll_mount(&mut self, ticket: MountTicket) -> Poll<FieldResult<FieldMap>> {
        let loading = match self.mounts.get(&ticket) {
            None => return Poll::Ready(Err(FieldError::UnknownMap(format!("<mount #{}>", ticket.0)))),
            Some(m) => m.remaining_ms > 0,
        };
        if loading {
            return Poll::Pending;
        }
        match self.mounts.remove(&ticket) {
            Some(mount) => Poll::Ready(self.library.build(&mount.map)),
            None => Poll::Pending,
        }
    }
}
