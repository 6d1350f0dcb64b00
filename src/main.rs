// Allow unused code for accessors only exercised by tests
#![allow(dead_code)]

mod config;
mod display;
mod drawing;
mod effects;
mod events;
mod modules;
mod util;

use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::Parser;
use sdl2::keyboard::Keycode;
use sdl2::render::TextureCreator;
use sdl2::video::WindowContext;
use serde_json::json;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use display::{Display, InputEvent, RenderTarget};
use drawing::DrawingService;
use events::MqttSource;
use modules::{ModuleContext, ModuleManager, ModuleRegistry, GG};
use util::Rng;

/// Sleep between polls while no animation is running
const IDLE_SLEEP: Duration = Duration::from_millis(16);

const DEMO_USERS: &[&str] = &["alice", "bob", "carol", "dave", "erin"];
const DEMO_MESSAGES: &[&str] = &["gg", "wp", "nice one", "let's go", "gg ez"];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pyrocast=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Same path as a broker trigger, without the broker
fn fire_local(manager: &ModuleManager, username: &str, message: &str) {
    let data = json!({ "username": username, "message": message });
    if !manager.dispatch(GG, data) {
        debug!("gg module not loaded; local trigger ignored");
    }
}

/// Upload the canvas to the window, recreating the texture after a resize
fn present_canvas<'a>(
    display: &mut Display,
    target: &mut RenderTarget<'a>,
    texture_creator: &'a TextureCreator<WindowContext>,
    drawing: &DrawingService,
) -> Result<()> {
    let size = drawing.acquire_surface();
    if target.size() != size {
        *target = RenderTarget::with_size(texture_creator, size.0, size.1)
            .map_err(|e| anyhow!("failed to resize render target: {}", e))?;
    }
    if let Some(presented) = drawing.with_pixels(|pixels| display.present(target, pixels)) {
        presented.map_err(|e| anyhow!("failed to present frame: {}", e))?;
    }
    Ok(())
}

fn connect_source(config: &Config) -> Option<MqttSource> {
    if config.no_mqtt {
        info!("MQTT disabled");
        return None;
    }
    match MqttSource::connect(&config.mqtt_host, config.mqtt_port, &config.topic) {
        Ok(source) => Some(source),
        Err(e) => {
            warn!(error = %e, cause = ?std::error::Error::source(&e), "continuing without MQTT");
            None
        },
    }
}

fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing();

    let (width, height) = config.window_size();
    let vsync = !config.no_vsync;

    let (mut display, texture_creator) = Display::with_options("pyrocast", width, height, vsync)
        .map_err(|e| anyhow!("failed to open window: {}", e))?;

    let (canvas_width, canvas_height) = display.size();
    let drawing = Rc::new(DrawingService::new(canvas_width, canvas_height, config.background));
    let mut target = RenderTarget::with_size(&texture_creator, canvas_width, canvas_height)
        .map_err(|e| anyhow!("failed to create render target: {}", e))?;

    let mut rng = match config.seed {
        Some(seed) => Rng::new(seed),
        None => Rng::from_clock(),
    };

    let context = ModuleContext::new(drawing.clone(), rng.fork());
    let mut manager = ModuleManager::new(ModuleRegistry::with_builtin(), context);
    let loaded = manager.load_all(config.modules.as_slice());
    if loaded == 0 {
        warn!(requested = ?config.modules, "no modules loaded; triggers will be ignored");
    }

    let source = connect_source(&config);

    info!(
        width = canvas_width,
        height = canvas_height,
        vsync,
        demo = config.demo,
        "pyrocast running (Space fires a firework, Escape quits)"
    );

    let demo_interval = Duration::from_millis(config.demo_interval.max(1));
    let mut last_demo = Instant::now();
    // Window needs an empty overlay: at startup and after an idle resize
    let mut needs_clear = true;

    'main: loop {
        for event in display.poll_events() {
            match event {
                InputEvent::Quit | InputEvent::KeyDown(Keycode::Escape) => break 'main,
                InputEvent::KeyDown(Keycode::Space) => fire_local(&manager, "local", "gg"),
                InputEvent::KeyDown(_) => {},
                InputEvent::Resized { width, height } => {
                    drawing.resize(width, height);
                    needs_clear = true;
                },
            }
        }

        if let Some(source) = &source {
            for payload in source.poll() {
                events::dispatch_payload(&manager, &payload);
            }
        }

        if config.demo && last_demo.elapsed() >= demo_interval {
            let username = DEMO_USERS[rng.range_usize(0, DEMO_USERS.len())];
            let message = DEMO_MESSAGES[rng.range_usize(0, DEMO_MESSAGES.len())];
            fire_local(&manager, username, message);
            last_demo = Instant::now();
        }

        if drawing.frame(Instant::now()) {
            needs_clear = false;
        } else if needs_clear && drawing.clear_surface() {
            debug!("presenting empty overlay");
            needs_clear = false;
        } else {
            thread::sleep(IDLE_SLEEP);
            continue;
        }

        present_canvas(&mut display, &mut target, &texture_creator, &drawing)?;
    }

    info!("shutting down");
    Ok(())
}
