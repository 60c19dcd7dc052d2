/// Terminal renderer: double-buffered and diff-based.
///
///   1. Compose the next frame into `front`
///   2. Compare each cell with `back` (the previous frame)
///   3. Queue terminal commands only for changed cells, flush once
///   4. Swap front/back
///
/// Each map tile is two terminal columns wide. The viewport follows the
/// stage camera's focus and is clamped to the map.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use overworld::domain::direction::Direction;
use overworld::domain::event::{EventKind, StepDirection, TileEvent};
use overworld::domain::location::TilePos;
use overworld::domain::map::FieldMap;
use overworld::domain::tile::Terrain;
use overworld::sim::services::Physics;
use overworld::sim::stage::Stage;
use overworld::sim::world::FieldState;

// ── Cell ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Every cell gets an explicit background so row gaps match.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 20, b: 28 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }
}

// ── Tile glyphs ──

/// Two-column glyph for one map tile.
#[derive(Clone, Copy)]
struct Glyph {
    text: [char; 2],
    fg: Color,
    bg: Color,
}

impl Glyph {
    const fn new(a: char, b: char, fg: Color, bg: Color) -> Self {
        Glyph { text: [a, b], fg, bg }
    }
}

const FLOOR_BG: Color = Color::Rgb { r: 34, g: 52, b: 34 };
const WALL_BG: Color = Color::Rgb { r: 88, g: 84, b: 78 };
const VOID_BG: Color = Color::Rgb { r: 6, g: 6, b: 12 };
const BODY_BG: Color = Color::Rgb { r: 110, g: 36, b: 36 };
const HUD_BG: Color = Color::Rgb { r: 24, g: 30, b: 70 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 60 };

fn terrain_glyph(terrain: Terrain) -> Glyph {
    match terrain {
        Terrain::Floor => Glyph::new(' ', ' ', Color::DarkGreen, FLOOR_BG),
        Terrain::Wall => Glyph::new('▓', '▓', Color::Grey, WALL_BG),
        Terrain::Void => Glyph::new(' ', ' ', Color::DarkGrey, VOID_BG),
    }
}

fn event_glyph(ev: &TileEvent, bg: Color) -> Glyph {
    let fg = if ev.is_set { Color::Yellow } else { Color::DarkGrey };
    match &ev.kind {
        EventKind::Door(_) => Glyph::new('▯', '▯', Color::Rgb { r: 200, g: 140, b: 80 }, bg),
        EventKind::Jump if ev.dynamic => Glyph::new('(', ')', Color::Cyan, bg),
        EventKind::Jump => Glyph::new('┅', '┅', fg, bg),
        EventKind::Step { step_direction: StepDirection::Up } => Glyph::new('▁', '▃', fg, bg),
        EventKind::Step { step_direction: StepDirection::Down } => Glyph::new('▃', '▁', fg, bg),
        EventKind::CollisionChange { .. } => Glyph::new('╱', '╱', fg, bg),
        EventKind::Speed { .. } => Glyph::new('»', '»', Color::Green, bg),
    }
}

fn hero_arrow(facing: Direction) -> char {
    match facing {
        Direction::Up => '↑',
        Direction::Down => '↓',
        Direction::Left => '←',
        Direction::Right => '→',
        Direction::UpLeft => '↖',
        Direction::UpRight => '↗',
        Direction::DownLeft => '↙',
        Direction::DownRight => '↘',
    }
}

// ══════════════════════════════════════════════════════════════
// Renderer
// ══════════════════════════════════════════════════════════════

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD, gap, message bar and help line.
const RESERVED_ROWS: usize = MAP_ROW + 4;
const CELL_W: usize = 2;

/// Visible window onto the map, in tiles.
struct View {
    x: i32,
    y: i32,
    w: usize,
    h: usize,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_map: String,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_map: String::new(),
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, field: &FieldState, stage: &Stage) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }
        // A new map can be smaller than the old one: repaint everything.
        if self.last_map != field.map.name {
            self.back.cells.fill(Cell::INVALID);
            self.last_map = field.map.name.clone();
        }

        self.front.cells.fill(Cell::BLANK);
        let view = self.view(&field.map, stage);
        self.compose_hud(field, stage);
        self.compose_map(field, stage, &view);
        if stage.camera().dimmed {
            self.dim_map(&view);
        }
        self.compose_footer(field, &view);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn view(&self, map: &FieldMap, stage: &Stage) -> View {
        let w = (self.term_w / CELL_W).min(map.width).max(1);
        let h = self.term_h.saturating_sub(RESERVED_ROWS).min(map.height).max(1);
        let focus = map.tile_of(stage.camera().focus);
        let clamp = |center: i32, span: usize, total: usize| {
            let max = total.saturating_sub(span) as i32;
            (center - span as i32 / 2).clamp(0, max)
        };
        View { x: clamp(focus.x, w, map.width), y: clamp(focus.y, h, map.height), w, h }
    }

    // ── Compose ──

    fn compose_hud(&mut self, field: &FieldState, stage: &Stage) {
        let s = &field.session;
        let mut hud = format!(
            " {}  ({:>2},{:>2})  layer {}  {:<8}  {}",
            field.map.name,
            s.hero_tile.x,
            s.hero_tile.y,
            s.collider_layer,
            s.label(),
            s.action.name(),
        );
        if s.extra_speed != 0.0 {
            hud.push_str(&format!("  +{:.0}px/s", s.extra_speed));
        }
        if field.pillars.count() > 0 {
            hud.push_str(&format!("  pillars:{}", field.pillars.count()));
        }
        if !stage.hero_map_collision() {
            hud.push_str("  [no terrain]");
        }
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_map(&mut self, field: &FieldState, stage: &Stage, view: &View) {
        let map = &field.map;
        let layer = field.session.collider_layer;

        for vy in 0..view.h {
            for vx in 0..view.w {
                let pos = TilePos::new(view.x + vx as i32, view.y + vy as i32);
                let glyph = tile_glyph(map, layer, pos);
                self.put_glyph(view, pos, glyph);
            }
        }

        for body in stage.bodies() {
            let pos = map.tile_of(body.center);
            let mut glyph = tile_glyph(map, layer, pos);
            glyph.bg = BODY_BG;
            self.put_glyph(view, pos, glyph);
        }

        for obj in map.interactables.iter().filter(|o| o.collider_layer == layer) {
            self.put_glyph(view, obj.pos, Glyph::new('[', ']', Color::Rgb { r: 190, g: 150, b: 90 }, FLOOR_BG));
        }

        for npc in &map.npcs {
            let initial = npc.key.chars().next().map(|c| c.to_ascii_uppercase()).unwrap_or('?');
            let fg = if npc.collider_layer == layer { Color::Magenta } else { Color::DarkMagenta };
            self.put_glyph(view, npc.pos, Glyph::new(initial, hero_arrow(npc.facing), fg, FLOOR_BG));
        }

        if let Some(shadow) = stage.shadow() {
            let pos = map.tile_of(shadow);
            let mut glyph = tile_glyph(map, layer, pos);
            glyph.text = ['░', '░'];
            glyph.fg = Color::Black;
            self.put_glyph(view, pos, glyph);
        }

        let hero_tile = map.tile_of(stage.hero_position());
        let bg = if stage.hero_blocked() { Color::Rgb { r: 90, g: 60, b: 20 } } else { FLOOR_BG };
        let body = if field.session.jumping() { '▲' } else { '◆' };
        self.put_glyph(view, hero_tile, Glyph::new(body, hero_arrow(field.session.facing), Color::White, bg));
    }

    fn put_glyph(&mut self, view: &View, pos: TilePos, glyph: Glyph) {
        let (vx, vy) = (pos.x - view.x, pos.y - view.y);
        if vx < 0 || vy < 0 || vx as usize >= view.w || vy as usize >= view.h {
            return;
        }
        let col = vx as usize * CELL_W;
        let row = MAP_ROW + vy as usize;
        for (i, ch) in glyph.text.iter().enumerate() {
            self.front.set(col + i, row, Cell::new(*ch, glyph.fg, glyph.bg));
        }
    }

    fn dim_map(&mut self, view: &View) {
        for row in MAP_ROW..MAP_ROW + view.h {
            for col in 0..view.w * CELL_W {
                let mut cell = self.front.get(col, row);
                cell.fg = Color::DarkGrey;
                cell.bg = Color::Black;
                self.front.set(col, row, cell);
            }
        }
    }

    fn compose_footer(&mut self, field: &FieldState, view: &View) {
        let msg_row = MAP_ROW + view.h + 1;
        if !field.message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", field.message), Color::Black, MSG_BG);
        }
        let help = " Arrows/WASD:move  X:dash  Z/Enter:talk  M:menu  Esc:quit";
        self.front.put_str(0, msg_row + 2, help, Color::DarkGrey, Cell::BASE_BG);
    }

    // ── Diff flush ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }
}

fn tile_glyph(map: &FieldMap, layer: u32, pos: TilePos) -> Glyph {
    let terrain = map.collision.get(&layer).map(|g| g.terrain_at(pos)).unwrap_or(Terrain::Wall);
    let base = terrain_glyph(terrain);

    if let Some(ev) = map.registry.at(pos).iter().find(|e| e.on_layer(layer)).or_else(|| map.registry.at(pos).first()) {
        return event_glyph(ev, base.bg);
    }

    let door_gid = map.door_layer.as_deref().and_then(|name| map.layer(name)).map(|l| l.get(pos)).unwrap_or(0);
    if door_gid != 0 {
        let closed = map.tileset.properties_of(door_gid).map_or(false, |p| p.close_door.is_some());
        let ch = if closed { '▆' } else { '▁' };
        return Glyph::new(ch, ch, Color::Rgb { r: 160, g: 100, b: 50 }, base.bg);
    }
    base
}
