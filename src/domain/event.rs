/// Tile events: typed triggers bound to a map tile.
///
/// Each event carries its activation directions (with a runtime active flag
/// per direction), the collision layers it listens on, an `is_set` enable
/// flag, and whether it takes part in pillar hopping (`dynamic`).

use serde::Deserialize;

use super::direction::Direction;
use super::location::TilePos;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct EventId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDirection {
    Up,
    Down,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DoorEvent {
    pub target: String,
    pub x_target: i32,
    pub y_target: i32,
    pub dest_collider_layer: u32,
    pub advance_effect: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    Door(DoorEvent),
    Jump,
    Step { step_direction: StepDirection },
    CollisionChange { dest_collider_layer: u32 },
    Speed { speed: f32 },
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Door(_) => "door",
            EventKind::Jump => "jump",
            EventKind::Step { .. } => "step",
            EventKind::CollisionChange { .. } => "collision",
            EventKind::Speed { .. } => "speed",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TileEvent {
    pub id: EventId,
    pub pos: TilePos,
    pub activation_directions: Vec<Direction>,
    active: Vec<bool>,
    pub activation_collision_layers: Vec<u32>,
    pub is_set: bool,
    pub dynamic: bool,
    pub kind: EventKind,
}

impl TileEvent {
    /// A set, non-dynamic event on layer 0, active in every given direction.
    pub fn new(pos: TilePos, directions: &[Direction], kind: EventKind) -> Self {
        TileEvent {
            id: EventId(0),
            pos,
            activation_directions: directions.to_vec(),
            active: vec![true; directions.len()],
            activation_collision_layers: vec![0],
            is_set: true,
            dynamic: false,
            kind,
        }
    }

    pub fn on_layers(mut self, layers: &[u32]) -> Self {
        self.activation_collision_layers = layers.to_vec();
        self
    }

    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    pub fn enabled(mut self, is_set: bool) -> Self {
        self.is_set = is_set;
        self
    }

    /// True when `dir` is one of the activation directions and still active.
    pub fn is_active(&self, dir: Direction) -> bool {
        self.activation_directions
            .iter()
            .zip(&self.active)
            .any(|(d, on)| *d == dir && *on)
    }

    pub fn activate_at(&mut self, dir: Direction) {
        self.set_active(dir, true);
    }

    pub fn deactivate_at(&mut self, dir: Direction) {
        self.set_active(dir, false);
    }

    fn set_active(&mut self, dir: Direction, on: bool) {
        for (d, flag) in self.activation_directions.iter().zip(self.active.iter_mut()) {
            if *d == dir {
                *flag = on;
            }
        }
    }

    pub fn on_layer(&self, layer: u32) -> bool {
        self.activation_collision_layers.contains(&layer)
    }

    /// True when any cardinal component of `facing` is an activation direction.
    pub fn faces(&self, facing: Direction) -> bool {
        facing.split().iter().any(|d| self.activation_directions.contains(d))
    }

    pub fn is_jump(&self) -> bool {
        matches!(self.kind, EventKind::Jump)
    }

    pub fn primary_direction(&self) -> Option<Direction> {
        self.activation_directions.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jump(dirs: &[Direction]) -> TileEvent {
        TileEvent::new(TilePos::new(5, 5), dirs, EventKind::Jump)
    }

    #[test]
    fn active_only_in_listed_directions() {
        let ev = jump(&[Direction::Right, Direction::Left]);
        assert!(ev.is_active(Direction::Right));
        assert!(ev.is_active(Direction::Left));
        assert!(!ev.is_active(Direction::Up));
    }

    #[test]
    fn directions_toggle_independently() {
        let mut ev = jump(&[Direction::Right, Direction::Left]);
        ev.deactivate_at(Direction::Left);
        assert!(ev.is_active(Direction::Right));
        assert!(!ev.is_active(Direction::Left));
        ev.activate_at(Direction::Left);
        assert!(ev.is_active(Direction::Left));
    }

    #[test]
    fn diagonal_facing_matches_component() {
        let ev = jump(&[Direction::Up]);
        assert!(ev.faces(Direction::UpLeft));
        assert!(!ev.faces(Direction::DownLeft));
        assert!(!ev.is_active(Direction::UpLeft));
    }

    #[test]
    fn layer_filter() {
        let ev = jump(&[Direction::Up]).on_layers(&[1, 2]);
        assert!(ev.on_layer(2));
        assert!(!ev.on_layer(0));
    }
}
