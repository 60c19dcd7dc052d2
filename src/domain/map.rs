/// FieldMap: a mounted map with its layers, collision, events and entities.
///
/// ## Layers
///
///   - `collision`: one walkability grid per collider layer id.
///   - `layers`: graphic gid layers; only `door_layer` is mutated at
///     runtime, by door tile swaps.
///
/// Door swaps are resolved once, by `resolve_doors()`, when the map is
/// built, so bad tileset metadata fails the load instead of a door.

use std::collections::{BTreeMap, HashMap};

use crate::error::{FieldError, FieldResult};

use super::entity::{InteractableObject, Npc};
use super::event::{EventId, EventKind, TileEvent};
use super::location::{PixelPos, TilePos};
use super::registry::EventRegistry;
use super::tile::{CollisionGrid, TileLayer, TileSwap, Tileset};

#[derive(Clone, Debug)]
pub struct FieldMap {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub tile_width: u32,
    pub tile_height: u32,
    pub layers: Vec<TileLayer>,
    pub door_layer: Option<String>,
    pub tileset: Tileset,
    pub collision: BTreeMap<u32, CollisionGrid>,
    pub registry: EventRegistry,
    pub npcs: Vec<Npc>,
    pub interactables: Vec<InteractableObject>,
    door_swaps: HashMap<EventId, Vec<TileSwap>>,
}

impl FieldMap {
    /// An all-floor map with collision layer 0 and no events.
    pub fn new(name: &str, width: usize, height: usize, tile_width: u32, tile_height: u32) -> Self {
        let mut collision = BTreeMap::new();
        collision.insert(0, CollisionGrid::filled(width, height, Default::default()));
        FieldMap {
            name: name.to_string(),
            width,
            height,
            tile_width,
            tile_height,
            layers: Vec::new(),
            door_layer: None,
            tileset: Tileset::default(),
            collision,
            registry: EventRegistry::new(),
            npcs: Vec::new(),
            interactables: Vec::new(),
            door_swaps: HashMap::new(),
        }
    }

    // ── Geometry ──

    pub fn tile_center(&self, pos: TilePos) -> PixelPos {
        PixelPos::new(
            self.tile_width as f32 * (pos.x as f32 + 0.5),
            self.tile_height as f32 * (pos.y as f32 + 0.5),
        )
    }

    pub fn tile_of(&self, p: PixelPos) -> TilePos {
        p.tile(self.tile_width, self.tile_height)
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width as u32 * self.tile_width, self.height as u32 * self.tile_height)
    }

    // ── Queries ──

    /// Missing collider layers read as solid everywhere.
    pub fn is_solid(&self, layer: u32, pos: TilePos) -> bool {
        self.collision.get(&layer).map(|g| g.is_solid(pos)).unwrap_or(true)
    }

    pub fn object_at(&self, pos: TilePos, layer: u32) -> Option<&InteractableObject> {
        self.interactables.iter().find(|o| o.pos == pos && o.collider_layer == layer)
    }

    pub fn npc_at(&self, pos: TilePos, layer: u32) -> Option<usize> {
        self.npcs.iter().position(|n| n.pos == pos && n.collider_layer == layer)
    }

    pub fn layer(&self, name: &str) -> Option<&TileLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut TileLayer> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    // ── Doors ──

    /// Precompute tile swaps for every door that plays the approach effect.
    pub fn resolve_doors(&mut self) -> FieldResult<()> {
        let mut resolved = HashMap::new();
        for ev in self.registry.iter() {
            let EventKind::Door(door) = &ev.kind else { continue };
            if !door.advance_effect {
                continue;
            }
            let swaps = self.swaps_for(ev).map_err(|reason| FieldError::DoorMetadata {
                map: self.name.clone(),
                x: ev.pos.x,
                y: ev.pos.y,
                reason,
            })?;
            resolved.insert(ev.id, swaps);
        }
        self.door_swaps = resolved;
        Ok(())
    }

    fn swaps_for(&self, ev: &TileEvent) -> Result<Vec<TileSwap>, String> {
        let name = self.door_layer.as_deref().ok_or("map has no door_layer")?;
        let layer = self.layer(name).ok_or_else(|| format!("door layer `{name}` not found"))?;
        let sample = layer.get(ev.pos.offset(0, -1));
        self.tileset.door_swaps(sample, ev.pos)
    }

    /// Apply the door's swaps. Returns how many tiles changed.
    pub fn open_door(&mut self, id: EventId) -> usize {
        let Some(swaps) = self.door_swaps.get(&id).cloned() else { return 0 };
        let Some(name) = self.door_layer.clone() else { return 0 };
        let Some(layer) = self.layer_mut(&name) else { return 0 };
        swaps
            .iter()
            .filter(|s| layer.replace(s.source, s.target, s.pos))
            .count()
    }

    /// Drop entities and events. Body handles must be released first.
    pub fn unload(&mut self) {
        self.npcs.clear();
        self.interactables.clear();
        self.registry.clear();
        self.door_swaps.clear();
    }
}
