use log::{error, info, warn};
use soundboard::http::{self, AppState};
use soundboard::ui::app::SoundboardApp;
use soundboard::{
    AppConfig, ButtonStore, CpalBackend, PathResolver, SettingsStore, SoundEngine,
    create_notification_channel,
};
use std::sync::{Arc, Mutex};

const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 256;

/// Web view assets, next to the executable
const WEB_ROOT_DIR: &str = "wwwroot";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    let resolver = PathResolver::from_executable();
    info!("Data directory: {}", config.data_dir.display());
    info!("Relative sound paths resolve against {}", resolver.base().display());

    let settings = Arc::new(SettingsStore::load(config.settings_path()));

    let store = match ButtonStore::open(config.buttons_path(), resolver.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Cannot open {}: {}", config.buttons_path().display(), e);
            std::process::exit(1);
        }
    };

    let engine = Arc::new(SoundEngine::new(Arc::new(CpalBackend), resolver.clone()));
    restore_devices(&engine, &settings);

    let (notification_tx, notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let notification_tx = Arc::new(Mutex::new(notification_tx));

    let state = AppState::new(
        Arc::clone(&store),
        Arc::clone(&engine),
        resolver.resolve(WEB_ROOT_DIR),
    );
    let web_url = format!("http://localhost:{}", config.http_addr.port());
    if let Err(e) = http::spawn_server(state, config.http_addr) {
        warn!("HTTP API disabled, cannot start server thread: {}", e);
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 520.0])
            .with_title("Soundboard")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    let ui_engine = Arc::clone(&engine);
    let result = eframe::run_native(
        "Soundboard",
        native_options,
        Box::new(move |_cc| {
            Ok(Box::new(SoundboardApp::new(
                store,
                ui_engine,
                settings,
                resolver,
                notification_tx,
                notification_rx,
                web_url,
            )))
        }),
    );
    if let Err(e) = result {
        error!("UI exited with error: {}", e);
    }

    engine.dispose();
    info!("Soundboard stopped");
}

/// Re-apply the saved devices, skipping indices that no longer exist
fn restore_devices(engine: &SoundEngine, settings: &SettingsStore) {
    let saved = settings.current();

    if let Some(index) = saved.selected_audio_device {
        if index < engine.output_devices().len() {
            engine.set_output_device(Some(index));
        } else {
            warn!("Saved output device {} no longer exists, using default", index);
        }
    }

    if let Some(index) = saved.selected_microphone_device {
        if index < engine.input_devices().len() {
            engine.set_microphone_device(Some(index));
        } else {
            warn!("Saved microphone {} no longer exists, microphone disabled", index);
        }
    }
}
