/// Session: hero-side state the field dispatcher reads and mutates.
///
/// Exclusive activities live in one `Activity` enum, so "on event" and
/// "talking to an NPC" (or a menu, a battle...) can never overlap.
/// `climbing` is a movement mode, not an activity.

use crate::domain::direction::{Action, Direction};
use crate::domain::location::TilePos;

use super::crossing::{PendingLayerChange, PendingStep};
use super::door::DoorRun;
use super::jump::JumpRun;
use super::npc::NpcTalk;

#[derive(Clone, Debug, PartialEq)]
pub enum ActiveEvent {
    Door(DoorRun),
    Jump(JumpRun),
}

#[derive(Clone, Debug, PartialEq, Default)]
pub enum Activity {
    #[default]
    Free,
    OnEvent(ActiveEvent),
    NpcEvent(NpcTalk),
    /// The remaining activities are owned by subsystems outside the field.
    Pushing,
    Menu,
    Battle,
    Casting,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub activity: Activity,
    pub climbing: bool,
    pub hero_tile: TilePos,
    pub facing: Direction,
    pub action: Action,
    pub map_name: String,
    pub collider_layer: u32,
    pub stop_by_colliding: bool,
    /// Bonus from speed tiles, px per second.
    pub extra_speed: f32,
    pub pending_step: Option<PendingStep>,
    pub pending_layer_change: Option<PendingLayerChange>,
    /// Last sprite sent to the presentation layer.
    pub sprite: Option<(Action, Direction)>,
}

impl Session {
    pub fn new(map_name: &str, hero_tile: TilePos, collider_layer: u32, facing: Direction) -> Self {
        Session {
            activity: Activity::Free,
            climbing: false,
            hero_tile,
            facing,
            action: Action::Idle,
            map_name: map_name.to_string(),
            collider_layer,
            stop_by_colliding: false,
            extra_speed: 0.0,
            pending_step: None,
            pending_layer_change: None,
            sprite: None,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self.activity, Activity::Free)
    }

    pub fn on_event(&self) -> bool {
        matches!(self.activity, Activity::OnEvent(_))
    }

    pub fn jumping(&self) -> bool {
        matches!(self.activity, Activity::OnEvent(ActiveEvent::Jump(_)))
    }

    pub fn teleporting(&self) -> bool {
        matches!(self.activity, Activity::OnEvent(ActiveEvent::Door(_)))
    }

    pub fn npc_event(&self) -> bool {
        matches!(self.activity, Activity::NpcEvent(_))
    }

    pub fn pushing(&self) -> bool {
        matches!(self.activity, Activity::Pushing)
    }

    pub fn menu_open(&self) -> bool {
        matches!(self.activity, Activity::Menu)
    }

    pub fn in_battle(&self) -> bool {
        matches!(self.activity, Activity::Battle)
    }

    pub fn casting_psynergy(&self) -> bool {
        matches!(self.activity, Activity::Casting)
    }

    /// Anything that forbids starting a jump.
    pub fn busy_for_jump(&self) -> bool {
        self.casting_psynergy()
            || self.pushing()
            || self.climbing
            || self.jumping()
            || self.menu_open()
            || self.in_battle()
    }

    /// Enter an activity. Refused unless the hero is free.
    pub fn begin(&mut self, activity: Activity) -> bool {
        if !self.is_free() {
            return false;
        }
        self.activity = activity;
        true
    }

    /// Hand control back to free roaming.
    pub fn finish_activity(&mut self) {
        self.activity = Activity::Free;
    }

    pub fn label(&self) -> &'static str {
        match &self.activity {
            Activity::Free => "free",
            Activity::OnEvent(ActiveEvent::Door(_)) => "door",
            Activity::OnEvent(ActiveEvent::Jump(_)) => "jump",
            Activity::NpcEvent(_) => "talk",
            Activity::Pushing => "push",
            Activity::Menu => "menu",
            Activity::Battle => "battle",
            Activity::Casting => "psynergy",
        }
    }
}
