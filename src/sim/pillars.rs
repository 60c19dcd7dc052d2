/// Synthetic collision bodies for pillar hopping.
///
/// While the hero stands on pillar tops (dynamic jump tiles), hero↔map
/// collision is switched off and replaced by tile-sized static bodies on
/// every tile that would let the hero walk off a pillar edge. The body set
/// is always rebuilt wholesale: destroy everything, then create.
///
/// The memo holds the adjacency signature the current bodies were built for
/// (hero key first, then the keys of the matched neighbours), so standing
/// still never rebuilds twice.

use std::collections::BTreeSet;

use log::debug;

use crate::domain::direction::Direction;
use crate::domain::event::TileEvent;
use crate::domain::location::{LocationKey, TilePos};
use crate::domain::map::FieldMap;
use crate::domain::physics::{BodyId, CollisionGroup, StaticBody};

use super::event::FieldEvent;
use super::services::Physics;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PillarSignature(Vec<LocationKey>);

impl PillarSignature {
    pub fn keys(&self) -> &[LocationKey] {
        &self.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct PillarBodies {
    bodies: Vec<BodyId>,
    tiles: Vec<TilePos>,
    memo: Option<PillarSignature>,
}

impl PillarBodies {
    pub fn count(&self) -> usize {
        self.bodies.len()
    }

    /// Tiles currently covered by a synthetic body.
    pub fn tiles(&self) -> &[TilePos] {
        &self.tiles
    }

    pub fn memo(&self) -> Option<&PillarSignature> {
        self.memo.as_ref()
    }

    /// Per-tick adjacency check for one jump event under the hero.
    pub fn walk_near<P: Physics>(
        &mut self,
        map: &FieldMap,
        hero: TilePos,
        facing: Direction,
        layer: u32,
        current: &TileEvent,
        physics: &mut P,
    ) -> Option<FieldEvent> {
        let right_direction = current.faces(facing);
        let surroundings = hero.surroundings(true);

        let mut keys = vec![hero.key()];
        let mut excluded = vec![hero];
        let mut candidates: BTreeSet<TilePos> = surroundings.iter().map(|n| n.pos).collect();
        let mut on_pillar_edge = false;

        if right_direction {
            for n in &surroundings {
                for ev in map.registry.at(n.pos) {
                    if !(ev.is_jump() && ev.is_set && ev.on_layer(layer)) {
                        continue;
                    }
                    if (ev.dynamic || current.dynamic) && !n.diagonal {
                        on_pillar_edge = true;
                    }
                    candidates.extend(n.pos.neighbors4());
                    keys.push(n.pos.key());
                    excluded.push(n.pos);
                }
            }
        }

        let signature = PillarSignature(keys);
        if on_pillar_edge && self.memo.as_ref() != Some(&signature) {
            self.destroy_all(physics);
            physics.set_hero_map_collision(false);
            candidates.retain(|t| !excluded.contains(t));
            self.raise(candidates, map, physics);
            debug!("pillar bodies raised around {hero:?}: {}", self.count());
            self.memo = Some(signature);
            return Some(FieldEvent::PillarsRaised { bodies: self.count() });
        }

        if !current.dynamic && !right_direction && self.memo.is_some() {
            self.release(physics);
            debug!("pillar bodies lowered at {hero:?}");
            return Some(FieldEvent::PillarsLowered);
        }

        None
    }

    /// Bodies on every exposed edge of every dynamic jump on `layer`.
    pub fn rebuild_for_map<P: Physics>(&mut self, map: &FieldMap, layer: u32, physics: &mut P) -> usize {
        self.destroy_all(physics);
        self.memo = None;
        physics.set_hero_map_collision(false);
        let edges = exposed_edges(&dynamic_jump_tiles(map, layer));
        self.raise(edges, map, physics);
        debug!("pillar bodies rebuilt for `{}`: {}", map.name, self.count());
        self.count()
    }

    /// Back to plain terrain collision.
    pub fn release<P: Physics>(&mut self, physics: &mut P) {
        physics.set_hero_map_collision(true);
        self.destroy_all(physics);
        self.memo = None;
    }

    fn destroy_all<P: Physics>(&mut self, physics: &mut P) {
        for id in self.bodies.drain(..) {
            physics.destroy_body(id);
        }
        self.tiles.clear();
    }

    fn raise<P: Physics>(&mut self, tiles: BTreeSet<TilePos>, map: &FieldMap, physics: &mut P) {
        for pos in tiles {
            let body = StaticBody::tile(pos, map.tile_width, map.tile_height, CollisionGroup::DynamicEvents);
            self.bodies.push(physics.create_static_body(body));
            self.tiles.push(pos);
        }
    }
}

/// Tiles hosting a set, dynamic jump on `layer`.
pub fn dynamic_jump_tiles(map: &FieldMap, layer: u32) -> BTreeSet<TilePos> {
    map.registry
        .iter()
        .filter(|e| e.is_jump() && e.dynamic && e.is_set && e.on_layer(layer))
        .map(|e| e.pos)
        .collect()
}

/// Orthogonal neighbours of `tiles` that are not themselves in `tiles`.
pub fn exposed_edges(tiles: &BTreeSet<TilePos>) -> BTreeSet<TilePos> {
    tiles
        .iter()
        .flat_map(|t| t.neighbors4())
        .filter(|n| !tiles.contains(n))
        .collect()
}
