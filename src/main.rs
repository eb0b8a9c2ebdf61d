//! Entry point for the **screen-ruler** daemon.
//!
//! Spawns the Unix-socket [`EventSource`](screen_ruler::traits::EventSource)
//! on a background thread and processes incoming events on the main thread,
//! which owns every window and controller.  Ruler positions are saved when
//! the event stream ends.

use screen_ruler::app::RulerApp;
use screen_ruler::backend::headless::HeadlessBackend;
use screen_ruler::config::{config_dir, default_socket_path, Config};
use screen_ruler::event::Event;
use screen_ruler::ipc::listener::UnixSocketListener;
use screen_ruler::positions::SavedPositions;
use screen_ruler::traits::EventSource;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Try to load the config from `$XDG_CONFIG_HOME/screen-ruler/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

fn positions_path() -> PathBuf {
    config_dir().join("positions.json")
}

fn load_positions(path: &Path) -> SavedPositions {
    match SavedPositions::load(path) {
        Ok(p) => {
            info!("restored {} ruler position(s)", p.len());
            p
        }
        Err(e) => {
            warn!("{}; starting from default positions", e);
            SavedPositions::default()
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    let config = load_config();
    let positions_file = positions_path();
    let positions = load_positions(&positions_file);

    let mut app = match RulerApp::new(HeadlessBackend::new(), &config, &positions) {
        Ok(app) => app,
        Err(e) => {
            error!("failed to create rulers: {}", e);
            std::process::exit(1);
        }
    };

    let socket_path = config.socket_path.clone().unwrap_or_else(default_socket_path);
    let (event_tx, event_rx) = mpsc::channel::<Event>();
    spawn_event_sources(event_tx, socket_path);

    app.handle(Event::ShowRulers);
    info!("screen-ruler running");
    for event in event_rx {
        if event == Event::Quit {
            info!("quit requested");
            break;
        }
        app.handle(event);
    }
    info!("event loop finished, exiting");

    if let Err(e) = app.positions().save(&positions_file) {
        error!("failed to save ruler positions: {}", e);
    }
}

//  Helpers

fn spawn_event_sources(tx: mpsc::Sender<Event>, socket_path: PathBuf) {
    std::thread::spawn(move || {
        let mut source = UnixSocketListener::new(&socket_path);
        if let Err(e) = source.run(tx) {
            error!("socket listener error: {}", e);
        }
    });
}
