/// NPC interaction: turn to face the hero, then page through dialog lines.

use log::debug;

use crate::domain::direction::Direction;

use super::event::FieldEvent;
use super::movement;
use super::services::Host;
use super::world::{EventContext, Progress};

#[derive(Clone, Debug, PartialEq)]
pub struct NpcTalk {
    pub npc: usize,
    pub line: usize,
    /// Facing to restore when the talk ends.
    pub original_facing: Direction,
}

/// Talk to the NPC standing directly ahead on the hero's layer.
pub fn try_start<H: Host>(ctx: &mut EventContext<'_, H>) -> Option<NpcTalk> {
    let ahead = ctx.session.hero_tile.toward(ctx.session.facing, 1);
    let idx = ctx.map.npc_at(ahead, ctx.session.collider_layer)?;
    let npc = &mut ctx.map.npcs[idx];
    let original_facing = npc.facing;
    npc.facing = ctx.session.facing.opposite();
    debug!("talking to `{}`", npc.key);

    movement::stop_hero(ctx.session, ctx.host);
    let talk = NpcTalk { npc: idx, line: 0, original_facing };
    emit_line(ctx, &talk)
}

/// Confirm advances to the next line; past the last line the talk ends.
pub fn advance<H: Host>(talk: NpcTalk, confirm: bool, ctx: &mut EventContext<'_, H>) -> Progress<NpcTalk> {
    movement::stop_hero(ctx.session, ctx.host);
    if !confirm {
        return Progress::Running(talk);
    }
    let next = NpcTalk { line: talk.line + 1, ..talk };
    match emit_line(ctx, &next) {
        Some(t) => Progress::Running(t),
        None => Progress::Finished,
    }
}

/// Emit the current line, or close the dialog when there is none.
fn emit_line<H: Host>(ctx: &mut EventContext<'_, H>, talk: &NpcTalk) -> Option<NpcTalk> {
    let npc = ctx.map.npcs.get_mut(talk.npc)?;
    match npc.dialog.get(talk.line) {
        Some(line) => {
            ctx.events.push(FieldEvent::NpcSpoke { npc: npc.key.clone(), line: line.clone() });
            Some(talk.clone())
        }
        None => {
            npc.facing = talk.original_facing;
            ctx.events.push(FieldEvent::NpcDialogClosed { npc: npc.key.clone() });
            None
        }
    }
}
