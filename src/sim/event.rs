/// Events emitted during a field step.
/// The front end turns these into status messages; tests assert on them.

use crate::domain::location::TilePos;

#[derive(Clone, Debug, PartialEq)]
pub enum FieldEvent {
    DoorOpened { at: TilePos, tiles: usize },
    DoorEntered { target: String },
    MapMounted { map: String },
    TransitionFinished,
    JumpStarted { from: TilePos, to: TilePos },
    JumpLanded { at: TilePos },
    PillarsRaised { bodies: usize },
    PillarsLowered,
    Stepped { shift_y: i32 },
    ColliderLayerChanged { layer: u32 },
    SpeedChanged { extra: f32 },
    NpcSpoke { npc: String, line: String },
    NpcDialogClosed { npc: String },
    MenuOpened,
    MenuClosed,
}
