// Catalogue persistant des boutons - stockage, persistance et ordre par groupe

pub mod button;
pub mod ordering;
pub mod persistence;
pub mod repository;

pub use button::{DEFAULT_GROUP, MISSING_FILES_GROUP, SoundButton};
pub use repository::ButtonStore;

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
