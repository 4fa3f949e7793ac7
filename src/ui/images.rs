use iced::widget::image::Handle;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest edge kept after decoding; product photos are shown at card size
const MAX_DIMENSION: u32 = 1024;

/// Why a product photo could not be turned into a texture
///
/// Reasons are kept as strings so the error can travel inside
/// `Clone` UI messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageLoadError {
    #[error("failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("image task failed: {0}")]
    Task(String),
}

/// Decode an image off the UI thread
///
/// The completion is delivered by the caller's `Task::perform`, so a card
/// that has gone away simply never looks at the result.
pub async fn load(path: PathBuf) -> Result<Handle, ImageLoadError> {
    // Spawn blocking task for CPU-bound work
    tokio::task::spawn_blocking(move || decode(&path))
        .await
        .map_err(|e| ImageLoadError::Task(e.to_string()))?
}

/// Blocking version of image loading
pub fn decode(path: &Path) -> Result<Handle, ImageLoadError> {
    let bytes = std::fs::read(path).map_err(|e| ImageLoadError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut img = image::load_from_memory(&bytes).map_err(|e| ImageLoadError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img = img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Triangle);
    }

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    log::debug!("Decoded {} ({}x{})", path.display(), width, height);

    Ok(Handle::from_rgba(width, height, rgba.into_raw()))
}
