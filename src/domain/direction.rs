/// Facing directions and hero actions.
///
/// Eight-way facing in screen coordinates (y grows downward). Everything
/// here is pure: opposites, component splitting and animation names.

use serde::Deserialize;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Right,
    UpRight,
    Up,
    UpLeft,
    Left,
    DownLeft,
    Down,
    DownRight,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Right,
        Direction::UpRight,
        Direction::Up,
        Direction::UpLeft,
        Direction::Left,
        Direction::DownLeft,
        Direction::Down,
        Direction::DownRight,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Right => Direction::Left,
            Direction::UpRight => Direction::DownLeft,
            Direction::Up => Direction::Down,
            Direction::UpLeft => Direction::DownRight,
            Direction::Left => Direction::Right,
            Direction::DownLeft => Direction::UpRight,
            Direction::Down => Direction::Up,
            Direction::DownRight => Direction::UpLeft,
        }
    }

    /// Cardinal components of this direction. Cardinals split into themselves.
    pub fn split(self) -> &'static [Direction] {
        match self {
            Direction::Right => &[Direction::Right],
            Direction::UpRight => &[Direction::Up, Direction::Right],
            Direction::Up => &[Direction::Up],
            Direction::UpLeft => &[Direction::Up, Direction::Left],
            Direction::Left => &[Direction::Left],
            Direction::DownLeft => &[Direction::Down, Direction::Left],
            Direction::Down => &[Direction::Down],
            Direction::DownRight => &[Direction::Down, Direction::Right],
        }
    }

    pub fn is_diagonal(self) -> bool {
        self.split().len() == 2
    }

    /// Tile step for one unit of movement.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Right => (1, 0),
            Direction::UpRight => (1, -1),
            Direction::Up => (0, -1),
            Direction::UpLeft => (-1, -1),
            Direction::Left => (-1, 0),
            Direction::DownLeft => (-1, 1),
            Direction::Down => (0, 1),
            Direction::DownRight => (1, 1),
        }
    }

    /// Unit-length velocity vector (diagonals normalised).
    pub fn unit_vector(self) -> (f32, f32) {
        let (dx, dy) = self.offset();
        if self.is_diagonal() {
            let k = std::f32::consts::FRAC_1_SQRT_2;
            (dx as f32 * k, dy as f32 * k)
        } else {
            (dx as f32, dy as f32)
        }
    }

    /// Combine held axis inputs into a facing. Opposing keys cancel.
    pub fn from_axes(left: bool, right: bool, up: bool, down: bool) -> Option<Direction> {
        let dx = right as i32 - left as i32;
        let dy = down as i32 - up as i32;
        match (dx, dy) {
            (1, 0) => Some(Direction::Right),
            (1, -1) => Some(Direction::UpRight),
            (0, -1) => Some(Direction::Up),
            (-1, -1) => Some(Direction::UpLeft),
            (-1, 0) => Some(Direction::Left),
            (-1, 1) => Some(Direction::DownLeft),
            (0, 1) => Some(Direction::Down),
            (1, 1) => Some(Direction::DownRight),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Right => "right",
            Direction::UpRight => "up_right",
            Direction::Up => "up",
            Direction::UpLeft => "up_left",
            Direction::Left => "left",
            Direction::DownLeft => "down_left",
            Direction::Down => "down",
            Direction::DownRight => "down_right",
        }
    }
}

/// What the hero sprite is doing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Idle,
    Walk,
    Dash,
    Jump,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::Idle => "idle",
            Action::Walk => "walk",
            Action::Dash => "dash",
            Action::Jump => "jump",
        }
    }
}

/// Sprite animation key, e.g. `walk_up`.
pub fn animation_key(action: Action, facing: Direction) -> String {
    format!("{}_{}", action.name(), facing.name())
}
