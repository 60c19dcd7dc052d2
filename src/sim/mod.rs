pub mod crossing;
pub mod door;
pub mod event;
pub mod jump;
pub mod maps;
pub mod movement;
pub mod npc;
pub mod pillars;
pub mod services;
pub mod session;
pub mod stage;
pub mod step;
pub mod world;

#[cfg(test)]
mod scenarios;
