// Soundboard - Library exports for the binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod http;
pub mod messaging;
pub mod paths;
pub mod settings;
pub mod store;
pub mod ui;

// Re-export commonly used types for convenience
pub use audio::backend::{AudioBackend, DeviceError, StreamFormat};
pub use audio::cpal_backend::CpalBackend;
pub use audio::engine::{EngineError, SoundEngine};
pub use audio::retry::RetryPolicy;
pub use config::AppConfig;
pub use messaging::channels::create_notification_channel;
pub use paths::PathResolver;
pub use settings::SettingsStore;
pub use store::{ButtonStore, SoundButton, StoreError};
