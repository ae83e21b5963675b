//! Image loading module
//!
//! Decodes question images from their sources with a hard per-load timeout
//! so a broken or slow resource can never stall the flow. Decoding runs on
//! the blocking pool; the engine awaits it as a bounded suspension point.

use image::RgbaImage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::model::ImageSource;

/// Default upper bound for a single image load/decode.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_millis(3000);

/// Image loading error types
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Image not found: {0}")]
    ImageNotFound(PathBuf),

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image has zero width or height")]
    EmptyImage,

    #[error("Load timed out")]
    TimedOut,
}

pub type Result<T> = std::result::Result<T, LoadError>;

/// Source-to-pixels decoder. Implementations must be cheap to share; the
/// engine clones the handle into blocking tasks.
pub trait ImageLoader: Send + Sync {
    /// Decode a source into RGBA pixels. Zero-dimension images are errors.
    fn load(&self, source: &ImageSource) -> Result<RgbaImage>;
}

/// Filesystem-backed loader: `Path` sources are opened from disk, `Memory`
/// sources are decoded in place.
#[derive(Debug, Default)]
pub struct FsImageLoader;

impl ImageLoader for FsImageLoader {
    fn load(&self, source: &ImageSource) -> Result<RgbaImage> {
        let img = match source {
            ImageSource::Path(path) => {
                if !path.exists() {
                    return Err(LoadError::ImageNotFound(path.clone()));
                }
                image::open(path).map_err(|e| LoadError::DecodeFailed(e.to_string()))?
            }
            ImageSource::Memory(bytes) => image::load_from_memory(bytes)
                .map_err(|e| LoadError::DecodeFailed(e.to_string()))?,
        };

        let rgba = img.to_rgba8();
        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(LoadError::EmptyImage);
        }
        Ok(rgba)
    }
}

/// Load a source on the blocking pool, bounded by `timeout`.
///
/// All failure modes (missing file, decode error, zero dimensions, timeout,
/// cancelled task) collapse into `Err`; callers degrade, they do not abort.
pub async fn load_with_timeout(
    loader: Arc<dyn ImageLoader>,
    source: ImageSource,
    timeout: Duration,
) -> Result<RgbaImage> {
    let task = tokio::task::spawn_blocking(move || loader.load(&source));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(LoadError::DecodeFailed(join_err.to_string())),
        Err(_) => Err(LoadError::TimedOut),
    }
}
