pub mod direction;
pub mod entity;
pub mod event;
pub mod location;
pub mod map;
pub mod physics;
pub mod registry;
pub mod rules;
pub mod tile;
