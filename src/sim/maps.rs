/// Map loader: TOML map definitions → `FieldMap`.
///
/// ## Sources (priority order):
///   1. `maps/` directory (`*.toml`, one map per file)
///   2. Built-in embedded maps
///
/// ## Map format:
///   ```toml
///   name = "madra"
///   tile_width = 16
///   tile_height = 16
///   door_layer = "doors"
///
///   [[collision]]          # one grid per collider layer
///   layer = 0
///   rows = ["#####", "#...#", ...]
///
///   [[layers]]             # sparse gid layers
///   name = "doors"
///   tiles = [{ x = 4, y = 2, gid = 11 }]
///
///   [tileset.10]           # properties of tileset index 10 (gid 11)
///   door_type = 1
///   id = 0
///   close_door = 1
///   base_offset = "0,0"
///
///   [[events]]
///   type = "door"          # door | jump | step | collision | speed
///   x = 4
///   y = 3
///   directions = ["up"]    # omitted = all eight
///   ...
///   ```
///
/// ## Collision legend:
///   '.' = Floor    '#' = Wall    ' ' = Void (gap, jumpable)

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::domain::direction::Direction;
use crate::domain::entity::{InteractableObject, Npc};
use crate::domain::event::{DoorEvent, EventKind, StepDirection, TileEvent};
use crate::domain::location::TilePos;
use crate::domain::map::FieldMap;
use crate::domain::tile::{parse_offset, CollisionGrid, TileLayer, TileProperties};
use crate::error::{FieldError, FieldResult};

const EMBEDDED_MAPS: &[(&str, &str)] = &[
    ("madra.toml", include_str!("../../maps/madra.toml")),
    ("madra_inn.toml", include_str!("../../maps/madra_inn.toml")),
    ("cliffs.toml", include_str!("../../maps/cliffs.toml")),
];

// ── TOML Schema ──

#[derive(Deserialize, Debug)]
pub struct MapDef {
    pub name: String,
    #[serde(default = "default_tile_size")]
    pub tile_width: u32,
    #[serde(default = "default_tile_size")]
    pub tile_height: u32,
    #[serde(default)]
    pub door_layer: Option<String>,
    pub collision: Vec<CollisionDef>,
    #[serde(default)]
    pub layers: Vec<LayerDef>,
    #[serde(default)]
    pub tileset: BTreeMap<String, TilePropsDef>,
    #[serde(default)]
    pub events: Vec<EventDef>,
    #[serde(default)]
    pub npcs: Vec<NpcDef>,
    #[serde(default)]
    pub objects: Vec<ObjectDef>,
}

#[derive(Deserialize, Debug)]
pub struct CollisionDef {
    pub layer: u32,
    pub rows: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct LayerDef {
    pub name: String,
    #[serde(default)]
    pub tiles: Vec<TileDef>,
}

#[derive(Deserialize, Debug)]
pub struct TileDef {
    pub x: i32,
    pub y: i32,
    pub gid: u32,
}

#[derive(Deserialize, Debug, Default)]
pub struct TilePropsDef {
    pub door_type: Option<u32>,
    pub id: Option<u32>,
    pub close_door: Option<u32>,
    pub open_door: Option<u32>,
    pub base_offset: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Door,
    Jump,
    Step,
    Collision,
    Speed,
}

#[derive(Deserialize, Debug)]
pub struct EventDef {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub directions: Vec<Direction>,
    #[serde(default = "default_layers")]
    pub layers: Vec<u32>,
    #[serde(default = "default_true")]
    pub is_set: bool,
    #[serde(default)]
    pub dynamic: bool,
    // door
    pub target: Option<String>,
    pub x_target: Option<i32>,
    pub y_target: Option<i32>,
    pub dest_collider_layer: Option<u32>,
    #[serde(default)]
    pub advance_effect: bool,
    // step
    pub step_direction: Option<StepDirection>,
    // speed
    pub speed: Option<f32>,
}

#[derive(Deserialize, Debug)]
pub struct NpcDef {
    pub key: String,
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_npc_facing")]
    pub facing: Direction,
    #[serde(default)]
    pub layer: u32,
    #[serde(default)]
    pub dialog: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct ObjectDef {
    pub key: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub layer: u32,
    #[serde(default)]
    pub blocking_stair_block: bool,
}

fn default_tile_size() -> u32 { 16 }
fn default_layers() -> Vec<u32> { vec![0] }
fn default_true() -> bool { true }
fn default_npc_facing() -> Direction { Direction::Down }

// ══════════════════════════════════════════════════════════════
// Building
// ══════════════════════════════════════════════════════════════

impl MapDef {
    pub fn parse(source: &str, text: &str) -> FieldResult<MapDef> {
        toml::from_str(text).map_err(|e| FieldError::Parse { name: source.to_string(), source: e })
    }

    /// Validate the definition and build a ready-to-mount map.
    pub fn build(&self) -> FieldResult<FieldMap> {
        let name = self.name.as_str();
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(FieldError::invalid_map(name, "tile size must be non-zero"));
        }
        let first = self
            .collision
            .first()
            .ok_or_else(|| FieldError::invalid_map(name, "no collision layers"))?;
        let base = CollisionGrid::from_rows(&first.rows).map_err(|r| FieldError::invalid_map(name, r))?;
        let (width, height) = (base.width(), base.height());

        let mut map = FieldMap::new(name, width, height, self.tile_width, self.tile_height);
        map.collision.clear();
        for def in &self.collision {
            let grid = CollisionGrid::from_rows(&def.rows)
                .map_err(|r| FieldError::invalid_map(name, format!("layer {}: {r}", def.layer)))?;
            if grid.width() != width || grid.height() != height {
                return Err(FieldError::invalid_map(
                    name,
                    format!("layer {} is {}x{}, expected {width}x{height}", def.layer, grid.width(), grid.height()),
                ));
            }
            if map.collision.insert(def.layer, grid).is_some() {
                return Err(FieldError::invalid_map(name, format!("collision layer {} defined twice", def.layer)));
            }
        }

        for def in &self.layers {
            let mut layer = TileLayer::new(&def.name, width, height);
            for t in &def.tiles {
                if !layer.set(TilePos::new(t.x, t.y), t.gid) {
                    return Err(FieldError::invalid_map(
                        name,
                        format!("layer `{}` tile ({},{}) out of bounds", def.name, t.x, t.y),
                    ));
                }
            }
            map.layers.push(layer);
        }
        map.door_layer = self.door_layer.clone();

        for (key, def) in &self.tileset {
            let index: u32 = key
                .parse()
                .map_err(|_| FieldError::invalid_map(name, format!("tileset key `{key}` is not an index")))?;
            let base_offset = match &def.base_offset {
                Some(s) => Some(parse_offset(s).ok_or_else(|| {
                    FieldError::invalid_map(name, format!("tile {index}: bad base_offset `{s}`"))
                })?),
                None => None,
            };
            map.tileset.insert(index, TileProperties {
                door_type: def.door_type,
                id: def.id,
                close_door: def.close_door,
                open_door: def.open_door,
                base_offset,
            });
        }

        for def in &self.events {
            let event = build_event(name, def)?;
            map.registry.register(event);
        }

        for def in &self.npcs {
            map.npcs.push(Npc {
                key: def.key.clone(),
                pos: TilePos::new(def.x, def.y),
                facing: def.facing,
                collider_layer: def.layer,
                dialog: def.dialog.clone(),
            });
        }
        for def in &self.objects {
            let mut obj = InteractableObject::new(&def.key, TilePos::new(def.x, def.y), def.layer);
            obj.has_stair_block = def.blocking_stair_block;
            map.interactables.push(obj);
        }

        map.resolve_doors()?;
        debug!("built map `{}` ({}x{}, {} events)", name, width, height, map.registry.len());
        Ok(map)
    }
}

fn build_event(map: &str, def: &EventDef) -> FieldResult<TileEvent> {
    let missing = |field: &str| {
        FieldError::invalid_map(map, format!("{:?} event at ({},{}) lacks `{field}`", def.kind, def.x, def.y))
    };
    let kind = match def.kind {
        EventType::Door => EventKind::Door(DoorEvent {
            target: def.target.clone().ok_or_else(|| missing("target"))?,
            x_target: def.x_target.ok_or_else(|| missing("x_target"))?,
            y_target: def.y_target.ok_or_else(|| missing("y_target"))?,
            dest_collider_layer: def.dest_collider_layer.ok_or_else(|| missing("dest_collider_layer"))?,
            advance_effect: def.advance_effect,
        }),
        EventType::Jump => EventKind::Jump,
        EventType::Step => EventKind::Step {
            step_direction: def.step_direction.ok_or_else(|| missing("step_direction"))?,
        },
        EventType::Collision => EventKind::CollisionChange {
            dest_collider_layer: def.dest_collider_layer.ok_or_else(|| missing("dest_collider_layer"))?,
        },
        EventType::Speed => EventKind::Speed { speed: def.speed.ok_or_else(|| missing("speed"))? },
    };
    if def.layers.is_empty() {
        return Err(FieldError::invalid_map(map, format!("event at ({},{}) has no layers", def.x, def.y)));
    }
    let directions: &[Direction] = if def.directions.is_empty() { &Direction::ALL } else { &def.directions };
    Ok(TileEvent::new(TilePos::new(def.x, def.y), directions, kind)
        .on_layers(&def.layers)
        .dynamic(def.dynamic)
        .enabled(def.is_set))
}

// ══════════════════════════════════════════════════════════════
// Library
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
enum MapSource {
    Text { origin: String, text: String },
    Built(FieldMap),
}

/// Every map the field can mount, by name.
#[derive(Clone, Debug, Default)]
pub struct MapLibrary {
    maps: BTreeMap<String, MapSource>,
}

impl MapLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The maps compiled into the binary.
    pub fn embedded() -> FieldResult<Self> {
        let mut lib = Self::new();
        for (file, text) in EMBEDDED_MAPS {
            lib.add_source(file, text)?;
        }
        Ok(lib)
    }

    /// Parse `text` and register it under its declared name.
    pub fn add_source(&mut self, origin: &str, text: &str) -> FieldResult<String> {
        let def = MapDef::parse(origin, text)?;
        let name = def.name.clone();
        self.maps.insert(name.clone(), MapSource::Text { origin: origin.to_string(), text: text.to_string() });
        Ok(name)
    }

    pub fn add_map(&mut self, map: FieldMap) {
        self.maps.insert(map.name.clone(), MapSource::Built(map));
    }

    /// Load every `*.toml` in `dir`, overriding same-named maps.
    /// Unreadable or unparsable files are skipped with a warning.
    pub fn load_dir(&mut self, dir: &Path) -> usize {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                debug!("no maps directory at {}: {e}", dir.display());
                return 0;
            }
        };
        let mut paths: Vec<_> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |x| x == "toml"))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let origin = path.display().to_string();
            match std::fs::read_to_string(&path) {
                Ok(text) => match self.add_source(&origin, &text) {
                    Ok(name) => {
                        info!("map `{name}` from {origin}");
                        loaded += 1;
                    }
                    Err(e) => warn!("skipping {origin}: {e}"),
                },
                Err(source) => warn!("{}", FieldError::Io { path: path.clone(), source }),
            }
        }
        loaded
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    /// A fresh instance of the named map.
    pub fn build(&self, name: &str) -> FieldResult<FieldMap> {
        match self.maps.get(name) {
            None => Err(FieldError::UnknownMap(name.to_string())),
            Some(MapSource::Built(map)) => Ok(map.clone()),
            Some(MapSource::Text { origin, text }) => MapDef::parse(origin, text)?.build(),
        }
    }

    /// Every door must land on a walkable tile of a known map and layer.
    /// Run once after all sources are added, so overrides are checked too.
    pub fn check_doors(&self) -> FieldResult<()> {
        let maps = self.names().map(|n| self.build(n)).collect::<FieldResult<Vec<_>>>()?;
        for map in &maps {
            for event in map.registry.iter() {
                let EventKind::Door(door) = &event.kind else { continue };
                let broken = |reason: String| FieldError::BrokenDoor {
                    map: map.name.clone(),
                    x: event.pos.x,
                    y: event.pos.y,
                    reason,
                };
                let target = maps
                    .iter()
                    .find(|m| m.name == door.target)
                    .ok_or_else(|| broken(format!("no map named `{}`", door.target)))?;
                let layer = door.dest_collider_layer;
                if !target.collision.contains_key(&layer) {
                    return Err(broken(format!("`{}` has no collider layer {layer}", target.name)));
                }
                let landing = TilePos::new(door.x_target, door.y_target);
                if target.is_solid(layer, landing) {
                    return Err(broken(format!(
                        "landing ({},{}) on `{}` layer {layer} is not floor",
                        landing.x, landing.y, target.name
                    )));
                }
            }
        }
        debug!("door links checked across {} maps", maps.len());
        Ok(())
    }
}
