//! Shared test support.

use image::{Rgba, RgbaImage};

use crate::loader::{ImageLoader, LoadError};
use crate::model::ImageSource;

/// Test loader that synthesizes an image whose height is encoded in the
/// file stem (`h420.png` -> 357x420) at exactly the default column width,
/// so a block's measured height is `label_height + <stem height>`.
pub struct SyntheticLoader;

impl ImageLoader for SyntheticLoader {
    fn load(&self, source: &ImageSource) -> crate::loader::Result<RgbaImage> {
        match source {
            ImageSource::Path(path) => {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default();
                let height: u32 = stem
                    .trim_start_matches('h')
                    .parse()
                    .map_err(|_| LoadError::DecodeFailed(stem.to_string()))?;
                Ok(RgbaImage::from_pixel(357, height, Rgba([0, 0, 0, 255])))
            }
            ImageSource::Memory(bytes) => image::load_from_memory(bytes)
                .map(|i| i.to_rgba8())
                .map_err(|e| LoadError::DecodeFailed(e.to_string())),
        }
    }
}
