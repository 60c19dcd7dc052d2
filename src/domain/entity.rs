/// Field entities other than the hero: NPCs and interactable objects.
/// Also the per-frame input snapshot.

use super::direction::Direction;
use super::location::TilePos;
use super::physics::BodyId;

/// Frame input: held movement plus edge-triggered buttons.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub movement: Option<Direction>,
    pub dash: bool,
    /// Talk / confirm (fresh press).
    pub interact: bool,
    /// Menu toggle (fresh press).
    pub menu: bool,
}

impl FrameInput {
    pub fn moving(dir: Direction) -> Self {
        FrameInput { movement: Some(dir), ..Default::default() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Npc {
    pub key: String,
    pub pos: TilePos,
    pub facing: Direction,
    pub collider_layer: u32,
    pub dialog: Vec<String>,
}

/// Pushable pillars, statues and the like. Some carry a stair block: a
/// static body that keeps the hero from walking up onto them.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractableObject {
    pub key: String,
    pub pos: TilePos,
    pub collider_layer: u32,
    pub has_stair_block: bool,
    pub blocking_stair_block: Option<BodyId>,
}

impl InteractableObject {
    pub fn new(key: &str, pos: TilePos, collider_layer: u32) -> Self {
        InteractableObject {
            key: key.to_string(),
            pos,
            collider_layer,
            has_stair_block: false,
            blocking_stair_block: None,
        }
    }
}
