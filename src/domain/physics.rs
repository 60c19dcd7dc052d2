/// Physics vocabulary shared by the field and its physics backend.
///
/// The field never simulates bodies itself. It asks the backend to create
/// static rectangles and toggles which groups collide with the hero.

use super::location::{PixelPos, TilePos};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct BodyId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CollisionGroup {
    /// Map objects that physically block, such as stair blocks.
    Interactable,
    /// Synthetic bodies raised around pillar tops.
    DynamicEvents,
}

/// An axis-aligned static rectangle, centred on `center`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct StaticBody {
    pub center: PixelPos,
    pub width: f32,
    pub height: f32,
    pub group: CollisionGroup,
}

impl StaticBody {
    /// A body covering exactly one tile.
    pub fn tile(pos: TilePos, tile_w: u32, tile_h: u32, group: CollisionGroup) -> Self {
        StaticBody {
            center: PixelPos::new(
                tile_w as f32 * (pos.x as f32 + 0.5),
                tile_h as f32 * (pos.y as f32 + 0.5),
            ),
            width: tile_w as f32,
            height: tile_h as f32,
            group,
        }
    }

    /// Half-open containment, so neighbouring tile bodies never both claim a point.
    pub fn contains(&self, p: PixelPos) -> bool {
        let left = self.center.x - self.width / 2.0;
        let top = self.center.y - self.height / 2.0;
        p.x >= left && p.x < left + self.width && p.y >= top && p.y < top + self.height
    }
}
