/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use log::{info, warn};
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::direction::Direction;
use crate::domain::location::TilePos;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub field: FieldSettings,
    pub start: StartConfig,
    pub maps_dir: PathBuf,
}

/// The slice of config the field engine reads every tick.
#[derive(Clone, Debug, Default)]
pub struct FieldSettings {
    pub timing: TimingConfig,
    pub movement: MovementConfig,
    pub camera: CameraConfig,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub door_tween_ms: u32,
    pub door_approach_px: f32,   // how far the hero steps into the doorway
    pub jump_offset_px: f32,
    pub jump_duration_ms: u32,
    pub jump_anim_ms: u32,       // crouch / land animation length
    pub fade_ms: u32,
    pub flash_ms: u32,
    pub mount_delay_ms: u32,     // simulated map load time on the stage
}

#[derive(Clone, Debug)]
pub struct MovementConfig {
    pub walk_speed: f32,         // px per second
    pub dash_speed: f32,
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub lerp: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

#[derive(Clone, Debug)]
pub struct StartConfig {
    pub map: String,
    pub tile: TilePos,
    pub layer: u32,
    pub direction: Direction,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    movement: TomlMovement,
    #[serde(default)]
    camera: TomlCamera,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_door_tween")]
    door_tween_ms: u32,
    #[serde(default = "default_door_approach")]
    door_approach_px: f32,
    #[serde(default = "default_jump_offset")]
    jump_offset_px: f32,
    #[serde(default = "default_jump_duration")]
    jump_duration_ms: u32,
    #[serde(default = "default_jump_anim")]
    jump_anim_ms: u32,
    #[serde(default = "default_fade")]
    fade_ms: u32,
    #[serde(default = "default_flash")]
    flash_ms: u32,
    #[serde(default = "default_mount_delay")]
    mount_delay_ms: u32,
}

#[derive(Deserialize, Debug)]
struct TomlMovement {
    #[serde(default = "default_walk_speed")]
    walk_speed: f32,
    #[serde(default = "default_dash_speed")]
    dash_speed: f32,
}

#[derive(Deserialize, Debug)]
struct TomlCamera {
    #[serde(default = "default_camera_lerp")]
    lerp: f32,
    #[serde(default = "default_viewport_width")]
    viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    viewport_height: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_maps_dir")]
    maps_dir: String,
    #[serde(default = "default_start_map")]
    start_map: String,
    #[serde(default = "default_start_x")]
    start_x: i32,
    #[serde(default = "default_start_y")]
    start_y: i32,
    #[serde(default)]
    start_layer: u32,
    #[serde(default = "default_start_direction")]
    start_direction: Direction,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_door_tween() -> u32 { 400 }
fn default_door_approach() -> f32 { 15.0 }
fn default_jump_offset() -> f32 { 30.0 }
fn default_jump_duration() -> u32 { 150 }
fn default_jump_anim() -> u32 { 120 }
fn default_fade() -> u32 { 300 }
fn default_flash() -> u32 { 250 }
fn default_mount_delay() -> u32 { 100 }

fn default_walk_speed() -> f32 { 60.0 }
fn default_dash_speed() -> f32 { 90.0 }

fn default_camera_lerp() -> f32 { 0.15 }
fn default_viewport_width() -> u32 { 240 }
fn default_viewport_height() -> u32 { 160 }

fn default_maps_dir() -> String { "maps".into() }
fn default_start_map() -> String { "madra".into() }
fn default_start_x() -> i32 { 5 }
fn default_start_y() -> i32 { 9 }
fn default_start_direction() -> Direction { Direction::Down }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            door_tween_ms: default_door_tween(),
            door_approach_px: default_door_approach(),
            jump_offset_px: default_jump_offset(),
            jump_duration_ms: default_jump_duration(),
            jump_anim_ms: default_jump_anim(),
            fade_ms: default_fade(),
            flash_ms: default_flash(),
            mount_delay_ms: default_mount_delay(),
        }
    }
}

impl Default for TomlMovement {
    fn default() -> Self {
        TomlMovement {
            walk_speed: default_walk_speed(),
            dash_speed: default_dash_speed(),
        }
    }
}

impl Default for TomlCamera {
    fn default() -> Self {
        TomlCamera {
            lerp: default_camera_lerp(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            maps_dir: default_maps_dir(),
            start_map: default_start_map(),
            start_x: default_start_x(),
            start_y: default_start_y(),
            start_layer: 0,
            start_direction: default_start_direction(),
        }
    }
}

impl From<TomlTiming> for TimingConfig {
    fn from(t: TomlTiming) -> Self {
        TimingConfig {
            tick_rate_ms: t.tick_rate_ms.max(1),
            door_tween_ms: t.door_tween_ms,
            door_approach_px: t.door_approach_px,
            jump_offset_px: t.jump_offset_px,
            jump_duration_ms: t.jump_duration_ms,
            jump_anim_ms: t.jump_anim_ms,
            fade_ms: t.fade_ms,
            flash_ms: t.flash_ms,
            mount_delay_ms: t.mount_delay_ms,
        }
    }
}

impl From<TomlMovement> for MovementConfig {
    fn from(m: TomlMovement) -> Self {
        MovementConfig { walk_speed: m.walk_speed, dash_speed: m.dash_speed }
    }
}

impl From<TomlCamera> for CameraConfig {
    fn from(c: TomlCamera) -> Self {
        CameraConfig {
            lerp: c.lerp.clamp(0.0, 1.0),
            viewport_width: c.viewport_width,
            viewport_height: c.viewport_height,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self { TomlTiming::default().into() }
}

impl Default for MovementConfig {
    fn default() -> Self { TomlMovement::default().into() }
}

impl Default for CameraConfig {
    fn default() -> Self { TomlCamera::default().into() }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    /// Parse config text directly (defaults fill the gaps).
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::resolve(toml_cfg, &[]))
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve maps directory
        let maps_dir_str = &toml_cfg.general.maps_dir;
        let maps_dir = if PathBuf::from(maps_dir_str).is_absolute() {
            PathBuf::from(maps_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(maps_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(maps_dir_str))
        };

        let general = toml_cfg.general;
        GameConfig {
            field: FieldSettings {
                timing: toml_cfg.timing.into(),
                movement: toml_cfg.movement.into(),
                camera: toml_cfg.camera.into(),
            },
            start: StartConfig {
                map: general.start_map,
                tile: TilePos::new(general.start_x, general.start_y),
                layer: general.start_layer,
                direction: general.start_direction,
            },
            maps_dir,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::resolve(TomlConfig::default(), &[])
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/overworld)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/overworld");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/overworld)
    let sys = PathBuf::from("/usr/share/overworld");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    // 5. Fallback
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        info!("loaded config from {}", path.display());
                        return cfg;
                    }
                    Err(e) => {
                        warn!("config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.field.timing.door_tween_ms, 400);
        assert_eq!(cfg.field.timing.jump_offset_px, 30.0);
        assert_eq!(cfg.field.timing.jump_duration_ms, 150);
        assert_eq!(cfg.field.camera.viewport_width, 240);
        assert_eq!(cfg.start.direction, Direction::Down);
        assert_eq!(cfg.maps_dir, PathBuf::from("maps"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[timing]\njump_duration_ms = 200\n\n[general]\nstart_map = \"inn\"\nstart_direction = \"up_left\"\n",
        )
        .unwrap();
        assert_eq!(cfg.field.timing.jump_duration_ms, 200);
        assert_eq!(cfg.field.timing.fade_ms, 300);
        assert_eq!(cfg.start.map, "inn");
        assert_eq!(cfg.start.direction, Direction::UpLeft);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = GameConfig::from_toml_str("[camera]\nlerp = 3.0\n[timing]\ntick_rate_ms = 0\n").unwrap();
        assert_eq!(cfg.field.camera.lerp, 1.0);
        assert_eq!(cfg.field.timing.tick_rate_ms, 1);
    }

    #[test]
    fn bad_types_are_reported() {
        assert!(GameConfig::from_toml_str("[timing]\nfade_ms = \"slow\"\n").is_err());
    }
}
