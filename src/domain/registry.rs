/// Event registry: location key → ordered bucket of tile events.
///
/// Buckets keep declaration order; the dispatcher walks them front to back.
/// Events are only ever dropped wholesale, on map unload.

use std::collections::HashMap;

use super::event::{EventId, TileEvent};
use super::location::{location_key, LocationKey, TilePos};

#[derive(Clone, Debug, Default)]
pub struct EventRegistry {
    buckets: HashMap<LocationKey, Vec<TileEvent>>,
    next_id: u32,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the event's tile bucket and hand back its fresh id.
    pub fn register(&mut self, mut event: TileEvent) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        event.id = id;
        self.buckets.entry(event.pos.key()).or_default().push(event);
        id
    }

    pub fn lookup(&self, x: i32, y: i32) -> &[TileEvent] {
        self.lookup_key(location_key(x, y))
    }

    pub fn at(&self, pos: TilePos) -> &[TileEvent] {
        self.lookup_key(pos.key())
    }

    pub fn lookup_key(&self, key: LocationKey) -> &[TileEvent] {
        self.buckets.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_events(&self, pos: TilePos) -> bool {
        !self.at(pos).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileEvent> {
        self.buckets.values().flatten()
    }

    pub fn get_mut(&mut self, id: EventId) -> Option<&mut TileEvent> {
        self.buckets.values_mut().flatten().find(|e| e.id == id)
    }

    /// Toggle `is_set`. Returns false when no event has this id.
    pub fn set_enabled(&mut self, id: EventId, is_set: bool) -> bool {
        match self.get_mut(id) {
            Some(ev) => {
                ev.is_set = is_set;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
