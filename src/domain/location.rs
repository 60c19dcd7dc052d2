/// Tile coordinates, pixel coordinates and the location key codec.
///
/// `LocationKey` packs a signed tile pair into one `u64`. The upper 32 bits
/// hold `x`, the lower 32 bits hold `y`, both as raw two's-complement bits,
/// so the mapping is a bijection over every `(i32, i32)` pair.

use serde::Deserialize;

use super::direction::Direction;

// ── Location Key ──

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct LocationKey(u64);

pub fn location_key(x: i32, y: i32) -> LocationKey {
    LocationKey(((x as u32 as u64) << 32) | (y as u32 as u64))
}

impl LocationKey {
    pub fn tile(self) -> TilePos {
        TilePos { x: (self.0 >> 32) as u32 as i32, y: self.0 as u32 as i32 }
    }
}

// ── Tile Position ──

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

/// A neighbouring tile and whether it touches only by a corner.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Neighbor {
    pub pos: TilePos,
    pub diagonal: bool,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        TilePos { x, y }
    }

    pub fn key(self) -> LocationKey {
        location_key(self.x, self.y)
    }

    pub fn offset(self, dx: i32, dy: i32) -> TilePos {
        TilePos { x: self.x + dx, y: self.y + dy }
    }

    /// `n` tiles along `dir` (diagonals move on both axes).
    pub fn toward(self, dir: Direction, n: i32) -> TilePos {
        let (dx, dy) = dir.offset();
        self.offset(dx * n, dy * n)
    }

    pub fn neighbors4(self) -> [TilePos; 4] {
        [self.offset(1, 0), self.offset(-1, 0), self.offset(0, 1), self.offset(0, -1)]
    }

    /// Orthogonal neighbours, plus the four corners when `with_diagonals`.
    pub fn surroundings(self, with_diagonals: bool) -> Vec<Neighbor> {
        let mut out: Vec<Neighbor> = self
            .neighbors4()
            .into_iter()
            .map(|pos| Neighbor { pos, diagonal: false })
            .collect();
        if with_diagonals {
            for (dx, dy) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
                out.push(Neighbor { pos: self.offset(dx, dy), diagonal: true });
            }
        }
        out
    }
}

// ── Pixel Position ──

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct PixelPos {
    pub x: f32,
    pub y: f32,
}

impl PixelPos {
    pub const ZERO: PixelPos = PixelPos { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        PixelPos { x, y }
    }

    /// Tile containing this point for the given tile size.
    pub fn tile(self, tile_w: u32, tile_h: u32) -> TilePos {
        TilePos {
            x: (self.x / tile_w as f32).floor() as i32,
            y: (self.y / tile_h as f32).floor() as i32,
        }
    }
}
