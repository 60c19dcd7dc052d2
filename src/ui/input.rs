/// Keyboard state → per-tick `FrameInput`.
///
/// Movement and dash are level-triggered (held keys); interact and menu are
/// edge-triggered so one press confirms one dialog line.
///
/// Terminals that never report key releases fall back to a hold timeout.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use overworld::domain::direction::Direction;
use overworld::domain::entity::FrameInput;

/// Without a Press/Repeat for this long, a key counts as released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

const UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const DASH: &[KeyCode] = &[KeyCode::Char('x'), KeyCode::Char('X')];
const INTERACT: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' '), KeyCode::Char('z'), KeyCode::Char('Z')];
const MENU: &[KeyCode] = &[KeyCode::Tab, KeyCode::Char('m'), KeyCode::Char('M')];

pub struct InputState {
    last_active: HashMap<KeyCode, Instant>,
    /// Presses not yet handed to a field tick.
    fresh_presses: Vec<KeyCode>,
    pub raw_events: Vec<KeyEvent>,
    /// Trust Release events (keyboard enhancement confirmed).
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Read every pending terminal event without blocking. Once per frame.
    pub fn drain_events(&mut self) {
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else { continue };
            self.raw_events.push(key);
            match key.kind {
                KeyEventKind::Release if self.honor_release => {
                    self.last_active.remove(&key.code);
                }
                KeyEventKind::Release => {}
                _ => {
                    if !self.is_held(key.code) {
                        self.fresh_presses.push(key.code);
                    }
                    self.last_active.insert(key.code, Instant::now());
                }
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    /// Snapshot for one field tick. Presses collected since the previous
    /// tick are consumed here.
    pub fn frame_input(&mut self) -> FrameInput {
        let input = FrameInput {
            movement: Direction::from_axes(
                self.any_held(LEFT),
                self.any_held(RIGHT),
                self.any_held(UP),
                self.any_held(DOWN),
            ),
            dash: self.any_held(DASH),
            interact: self.any_pressed(INTERACT),
            menu: self.any_pressed(MENU),
        };
        self.fresh_presses.clear();
        input
    }

    pub fn quit_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.code == KeyCode::Esc
                || (k.modifiers.contains(KeyModifiers::CONTROL)
                    && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C')))
        })
    }
}
