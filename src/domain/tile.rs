/// Tile layers, collision terrain and tileset properties.
///
/// Terrain semantics are centralized in `Terrain` methods. Graphic layers
/// store raw gids (0 = empty, otherwise tileset index + 1). Door opening is
/// a gid swap resolved from tileset properties when the map is built.

use std::collections::BTreeMap;

use super::location::TilePos;

// ── Collision terrain ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Terrain {
    #[default]
    Floor,
    Wall,
    /// A gap or pit. Blocks walking like a wall; jumps cross it.
    Void,
}

impl Terrain {
    pub fn is_solid(self) -> bool {
        !matches!(self, Terrain::Floor)
    }

    /// Legend: `.` floor, `#` wall, space void.
    pub fn from_char(c: char) -> Option<Terrain> {
        match c {
            '.' => Some(Terrain::Floor),
            '#' => Some(Terrain::Wall),
            ' ' => Some(Terrain::Void),
            _ => None,
        }
    }
}

/// Walkability of one collision layer. Out of bounds reads as wall.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionGrid {
    width: usize,
    height: usize,
    cells: Vec<Terrain>,
}

impl CollisionGrid {
    pub fn filled(width: usize, height: usize, terrain: Terrain) -> Self {
        CollisionGrid { width, height, cells: vec![terrain; width * height] }
    }

    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, String> {
        let height = rows.len();
        let width = rows.first().map(|r| r.as_ref().chars().count()).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err("collision grid is empty".into());
        }
        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(format!(
                    "collision row {y} has width {}, expected {width}",
                    row.chars().count()
                ));
            }
            for (x, ch) in row.chars().enumerate() {
                let t = Terrain::from_char(ch)
                    .ok_or_else(|| format!("unknown collision glyph {ch:?} at ({x},{y})"))?;
                cells.push(t);
            }
        }
        Ok(CollisionGrid { width, height, cells })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    pub fn terrain_at(&self, pos: TilePos) -> Terrain {
        self.index(pos).map(|i| self.cells[i]).unwrap_or(Terrain::Wall)
    }

    pub fn is_solid(&self, pos: TilePos) -> bool {
        self.terrain_at(pos).is_solid()
    }

    pub fn set(&mut self, pos: TilePos, terrain: Terrain) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = terrain;
        }
    }
}

// ── Graphic layers ──

#[derive(Clone, Debug, PartialEq)]
pub struct TileLayer {
    pub name: String,
    width: usize,
    height: usize,
    gids: Vec<u32>,
}

impl TileLayer {
    pub fn new(name: &str, width: usize, height: usize) -> Self {
        TileLayer { name: name.to_string(), width, height, gids: vec![0; width * height] }
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x as usize >= self.width || pos.y as usize >= self.height {
            return None;
        }
        Some(pos.y as usize * self.width + pos.x as usize)
    }

    pub fn get(&self, pos: TilePos) -> u32 {
        self.index(pos).map(|i| self.gids[i]).unwrap_or(0)
    }

    pub fn set(&mut self, pos: TilePos, gid: u32) -> bool {
        match self.index(pos) {
            Some(i) => {
                self.gids[i] = gid;
                true
            }
            None => false,
        }
    }

    /// Swap `source` for `target` at `pos`. No-op when the tile differs.
    pub fn replace(&mut self, source: u32, target: u32, pos: TilePos) -> bool {
        match self.index(pos) {
            Some(i) if self.gids[i] == source => {
                self.gids[i] = target;
                true
            }
            _ => false,
        }
    }
}

// ── Tileset ──

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileProperties {
    pub door_type: Option<u32>,
    pub id: Option<u32>,
    pub close_door: Option<u32>,
    pub open_door: Option<u32>,
    pub base_offset: Option<(i32, i32)>,
}

/// One closed-door tile replaced by its open counterpart.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TileSwap {
    pub source: u32,
    pub target: u32,
    pub pos: TilePos,
}

/// Parse a `"x,y"` offset.
pub fn parse_offset(s: &str) -> Option<(i32, i32)> {
    let (a, b) = s.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

/// Per-tile properties keyed by 0-based tileset index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tileset {
    properties: BTreeMap<u32, TileProperties>,
}

impl Tileset {
    pub fn insert(&mut self, index: u32, props: TileProperties) {
        self.properties.insert(index, props);
    }

    pub fn properties_of(&self, gid: u32) -> Option<&TileProperties> {
        gid.checked_sub(1).and_then(|index| self.properties.get(&index))
    }

    /// Swaps that open the door whose event sits at `door`.
    ///
    /// `sample_gid` is the door-layer tile one row above the event. Every
    /// tile sharing its `door_type` and `id` that has a `close_door` value
    /// becomes a swap to the tile whose `open_door` carries the same value,
    /// placed at `door + base_offset - (0, 1)`.
    pub fn door_swaps(&self, sample_gid: u32, door: TilePos) -> Result<Vec<TileSwap>, String> {
        if sample_gid == 0 {
            return Err("no door tile above the event".into());
        }
        let sample = self
            .properties_of(sample_gid)
            .ok_or_else(|| format!("door tile {sample_gid} has no properties"))?;
        let door_type = sample.door_type.ok_or("door tile lacks door_type")?;
        let id = sample.id.ok_or("door tile lacks id")?;

        let mut swaps = Vec::new();
        for (index, props) in &self.properties {
            if props.door_type != Some(door_type) || props.id != Some(id) {
                continue;
            }
            let Some(close) = props.close_door else { continue };
            let target = self
                .properties
                .iter()
                .find(|(_, p)| p.open_door == Some(close))
                .map(|(i, _)| *i)
                .ok_or_else(|| format!("no tile opens close_door {close}"))?;
            let (ox, oy) = props
                .base_offset
                .ok_or_else(|| format!("tile {index} lacks base_offset"))?;
            swaps.push(TileSwap { source: index + 1, target: target + 1, pos: door.offset(ox, oy - 1) });
        }
        if swaps.is_empty() {
            return Err(format!("no closed-door tiles for door_type {door_type} id {id}"));
        }
        Ok(swaps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(door_type: u32, id: u32, close: Option<u32>, open: Option<u32>, off: (i32, i32)) -> TileProperties {
        TileProperties {
            door_type: Some(door_type),
            id: Some(id),
            close_door: close,
            open_door: open,
            base_offset: Some(off),
        }
    }

    /// Two-tile-wide door (indices 10, 11) opening into indices 20, 21.
    fn double_door() -> Tileset {
        let mut ts = Tileset::default();
        ts.insert(10, props(1, 0, Some(1), None, (0, 0)));
        ts.insert(11, props(1, 0, Some(2), None, (1, 0)));
        ts.insert(20, props(1, 9, None, Some(1), (0, 0)));
        ts.insert(21, props(1, 9, None, Some(2), (1, 0)));
        ts
    }

    #[test]
    fn grid_from_rows() {
        let g = CollisionGrid::from_rows(&["#.#", ". ."]).unwrap();
        assert_eq!((g.width(), g.height()), (3, 2));
        assert_eq!(g.terrain_at(TilePos::new(1, 0)), Terrain::Floor);
        assert_eq!(g.terrain_at(TilePos::new(1, 1)), Terrain::Void);
        assert!(g.is_solid(TilePos::new(-1, 0)));
        assert!(g.is_solid(TilePos::new(3, 0)));
    }

    #[test]
    fn grid_rejects_ragged_rows_and_unknown_glyphs() {
        assert!(CollisionGrid::from_rows(&["..", "."]).is_err());
        assert!(CollisionGrid::from_rows(&[".x"]).is_err());
    }

    #[test]
    fn replace_only_matches_source() {
        let mut layer = TileLayer::new("doors", 4, 4);
        layer.set(TilePos::new(1, 1), 11);
        assert!(!layer.replace(12, 21, TilePos::new(1, 1)));
        assert!(layer.replace(11, 21, TilePos::new(1, 1)));
        assert_eq!(layer.get(TilePos::new(1, 1)), 21);
        assert!(!layer.replace(0, 1, TilePos::new(9, 9)));
    }

    #[test]
    fn offsets_parse() {
        assert_eq!(parse_offset("1, -2"), Some((1, -2)));
        assert_eq!(parse_offset("3"), None);
        assert_eq!(parse_offset("a,b"), None);
    }

    #[test]
    fn door_swaps_resolve_every_panel() {
        let ts = double_door();
        let mut swaps = ts.door_swaps(11, TilePos::new(10, 3)).unwrap();
        swaps.sort_by_key(|s| s.source);
        assert_eq!(
            swaps,
            vec![
                TileSwap { source: 11, target: 21, pos: TilePos::new(10, 2) },
                TileSwap { source: 12, target: 22, pos: TilePos::new(11, 2) },
            ]
        );
    }

    #[test]
    fn door_swaps_report_missing_metadata() {
        let ts = double_door();
        assert!(ts.door_swaps(0, TilePos::new(0, 0)).is_err());
        assert!(ts.door_swaps(99, TilePos::new(0, 0)).is_err());

        let mut broken = Tileset::default();
        broken.insert(10, props(1, 0, Some(7), None, (0, 0)));
        let err = broken.door_swaps(11, TilePos::new(0, 0)).unwrap_err();
        assert!(err.contains("close_door 7"));
    }
}
