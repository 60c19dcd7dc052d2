/// Overworld field engine.
///
/// Tile-anchored events (doors, ledge jumps, steps, collider layer changes,
/// speed tiles) dispatched once per frame against a mounted map. The engine
/// drives its environment through the `sim::services` traits; `sim::stage`
/// is the built-in headless host.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;
