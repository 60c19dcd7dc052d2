/// Entry point and field loop.

mod ui;

use std::error::Error;
use std::fs::File;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use overworld::config::GameConfig;
use overworld::error::FieldResult;
use overworld::sim::event::FieldEvent;
use overworld::sim::maps::MapLibrary;
use overworld::sim::stage::Stage;
use overworld::sim::step;
use overworld::sim::world::FieldState;

use ui::input::InputState;
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "overworld.log";

fn main() {
    init_logging();
    let config = GameConfig::load();

    let (mut field, mut stage) = match boot(&config) {
        Ok(parts) => parts,
        Err(e) => {
            error!("startup failed: {e}");
            eprintln!("Startup failed: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = field_loop(&mut field, &mut stage, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        error!("field stopped: {e}");
        eprintln!("Field error: {e}");
        std::process::exit(1);
    }
    info!("left the field on `{}` at {:?}", field.map.name, field.session.hero_tile);
}

/// The terminal belongs to the renderer, so logs go to a file.
fn init_logging() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match File::create(LOG_FILE) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => eprintln!("cannot open {LOG_FILE} ({e}); logging to stderr"),
    }
    builder.init();
}

fn boot(config: &GameConfig) -> FieldResult<(FieldState, Stage)> {
    let mut library = MapLibrary::embedded()?;
    let overrides = library.load_dir(&config.maps_dir);
    library.check_doors()?;
    info!(
        "{} maps available ({} from {})",
        library.names().count(),
        overrides,
        config.maps_dir.display()
    );

    let start = &config.start;
    let map = library.build(&start.map)?;
    let mut stage = Stage::new(library, &config.field.timing);
    let mut field = FieldState::new(map, start.tile, start.layer, start.direction, config.field.clone());
    field.enter(&mut stage);
    info!("starting on `{}` at {:?} layer {}", start.map, start.tile, start.layer);
    Ok((field, stage))
}

fn field_loop(
    field: &mut FieldState,
    stage: &mut Stage,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn Error>> {
    let mut kb = InputState::new();
    let tick_rate = Duration::from_millis(config.field.timing.tick_rate_ms);
    let tick_ms = config.field.timing.tick_rate_ms as u32;
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();
        if kb.quit_pressed() {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            let events = step::step(field, kb.frame_input(), stage)?;
            stage.advance(tick_ms);
            report(field, &events);
            last_tick = Instant::now();
        }

        renderer.render(field, stage)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Surface field events on the message bar.
fn report(field: &mut FieldState, events: &[FieldEvent]) {
    for event in events {
        match event {
            FieldEvent::NpcSpoke { npc, line } => field.set_message(&format!("{npc}: {line}")),
            FieldEvent::NpcDialogClosed { .. } => field.set_message(""),
            FieldEvent::MapMounted { map } => field.set_message(&format!("Entered {map}")),
            FieldEvent::MenuOpened => field.set_message("Menu (M to close)"),
            FieldEvent::MenuClosed => field.set_message(""),
            FieldEvent::PillarsRaised { bodies } => info!("pillar bodies: {bodies}"),
            FieldEvent::DoorOpened { at, tiles } if *tiles == 0 => warn!("door at {at:?} swapped no tiles"),
            _ => {}
        }
    }
}
