//! Whitespace Cropping module
//!
//! Trims uniform background from all four edges of a question image before
//! it is measured for placement. A pixel counts as background when its
//! alpha is at or below the alpha threshold OR all three color channels
//! are at or above the brightness threshold; this is a binary
//! foreground/background test, not a gradient trim.
//!
//! Cropping is best-effort by contract: [`ImageNormalizer::normalize`]
//! always resolves to a usable source, returning the original reference on
//! any failure (missing file, decode error, timeout, degenerate bounds).
//! Callers never branch on failure, they only consume the returned source.
//!
//! # Example
//!
//! ```rust,no_run
//! use exambook_pdf::crop::{CropOptions, ImageNormalizer};
//! use exambook_pdf::loader::FsImageLoader;
//! use exambook_pdf::model::ImageSource;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let normalizer = ImageNormalizer::new(Arc::new(FsImageLoader), CropOptions::default());
//! let source = ImageSource::Path(PathBuf::from("question.png"));
//! let trimmed = normalizer.normalize(&source).await;
//! # let _ = trimmed;
//! # }
//! ```

use image::{Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use crate::loader::{load_with_timeout, ImageLoader, DEFAULT_LOAD_TIMEOUT};
use crate::model::ImageSource;

// ============================================================
// Constants
// ============================================================

/// Default padding kept around detected content, in pixels.
const DEFAULT_PADDING: u32 = 1;

/// Default brightness threshold: channels at or above this are background.
const DEFAULT_BRIGHTNESS_THRESHOLD: u8 = 180;

/// Default alpha threshold: alpha at or below this is background.
const DEFAULT_ALPHA_THRESHOLD: u8 = 16;

// ============================================================
// Options
// ============================================================

/// Whitespace cropping options
#[derive(Debug, Clone)]
pub struct CropOptions {
    /// Master switch; when off, sources pass through untouched
    pub enabled: bool,
    /// Pixels of background kept around the content bounding box
    pub padding: u32,
    /// Channel brightness at or above which a pixel is background (0-255)
    pub brightness_threshold: u8,
    /// Alpha at or below which a pixel is background (0-255)
    pub alpha_threshold: u8,
    /// Hard upper bound for loading the image to be cropped
    pub load_timeout: Duration,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            padding: DEFAULT_PADDING,
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

impl CropOptions {
    /// Create a new options builder
    pub fn builder() -> CropOptionsBuilder {
        CropOptionsBuilder::default()
    }
}

/// Builder for CropOptions
#[derive(Debug, Default)]
pub struct CropOptionsBuilder {
    options: CropOptions,
}

impl CropOptionsBuilder {
    /// Enable or disable cropping entirely
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.options.enabled = enabled;
        self
    }

    /// Set content padding in pixels
    #[must_use]
    pub fn padding(mut self, padding: u32) -> Self {
        self.options.padding = padding;
        self
    }

    /// Set the background brightness threshold
    #[must_use]
    pub fn brightness_threshold(mut self, threshold: u8) -> Self {
        self.options.brightness_threshold = threshold;
        self
    }

    /// Set the background alpha threshold
    #[must_use]
    pub fn alpha_threshold(mut self, threshold: u8) -> Self {
        self.options.alpha_threshold = threshold;
        self
    }

    /// Set the load timeout
    #[must_use]
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.options.load_timeout = timeout;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> CropOptions {
        self.options
    }
}

// ============================================================
// Bounds Detection
// ============================================================

/// Inclusive content bounding box detected by the edge scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl ContentBounds {
    /// Width of the box, inclusive of both edges.
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Height of the box, inclusive of both edges.
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Grow the box by `padding` on every side, clamped to the image.
    pub fn padded(&self, padding: u32, img_w: u32, img_h: u32) -> ContentBounds {
        ContentBounds {
            min_x: self.min_x.saturating_sub(padding),
            min_y: self.min_y.saturating_sub(padding),
            max_x: (self.max_x + padding).min(img_w - 1),
            max_y: (self.max_y + padding).min(img_h - 1),
        }
    }

    /// Whether the box covers the whole image.
    pub fn covers(&self, img_w: u32, img_h: u32) -> bool {
        self.min_x == 0 && self.min_y == 0 && self.max_x == img_w - 1 && self.max_y == img_h - 1
    }
}

/// Binary background test: transparent-enough OR bright-enough on all
/// three channels.
#[inline]
pub fn is_background(pixel: &Rgba<u8>, options: &CropOptions) -> bool {
    let [r, g, b, a] = pixel.0;
    a <= options.alpha_threshold
        || (r >= options.brightness_threshold
            && g >= options.brightness_threshold
            && b >= options.brightness_threshold)
}

/// Scan inward from each of the four edges independently for the first
/// row/column containing a foreground pixel.
///
/// Returns `None` when the image has no foreground at all or zero
/// dimensions; later scans are bounded by the earlier ones so a fully
/// scanned blank edge is not revisited.
pub fn content_bounds(img: &RgbaImage, options: &CropOptions) -> Option<ContentBounds> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return None;
    }

    // Left edge
    let mut min_x = None;
    'left: for x in 0..w {
        for y in 0..h {
            if !is_background(img.get_pixel(x, y), options) {
                min_x = Some(x);
                break 'left;
            }
        }
    }
    let min_x = min_x?;

    // Right edge, bounded by the left result
    let mut max_x = min_x;
    'right: for x in (min_x..w).rev() {
        for y in 0..h {
            if !is_background(img.get_pixel(x, y), options) {
                max_x = x;
                break 'right;
            }
        }
    }

    // Top edge, scanning only the horizontal content span
    let mut min_y = None;
    'top: for y in 0..h {
        for x in min_x..=max_x {
            if !is_background(img.get_pixel(x, y), options) {
                min_y = Some(y);
                break 'top;
            }
        }
    }
    let min_y = min_y?;

    // Bottom edge
    let mut max_y = min_y;
    'bottom: for y in (min_y..h).rev() {
        for x in min_x..=max_x {
            if !is_background(img.get_pixel(x, y), options) {
                max_y = y;
                break 'bottom;
            }
        }
    }

    if min_x > max_x || min_y > max_y {
        return None;
    }

    Some(ContentBounds {
        min_x,
        min_y,
        max_x,
        max_y,
    })
}

/// Crop an image to its padded content bounding box.
///
/// Returns `None` when there is nothing to trim: no foreground at all, or
/// the padded box already covers the whole image.
pub fn crop_to_content(img: &RgbaImage, options: &CropOptions) -> Option<RgbaImage> {
    let (w, h) = img.dimensions();
    let bounds = content_bounds(img, options)?.padded(options.padding, w, h);

    if bounds.covers(w, h) {
        return None;
    }

    let mut out = RgbaImage::new(bounds.width(), bounds.height());
    for y in 0..bounds.height() {
        for x in 0..bounds.width() {
            out.put_pixel(x, y, *img.get_pixel(bounds.min_x + x, bounds.min_y + y));
        }
    }
    Some(out)
}

// ============================================================
// Normalizer
// ============================================================

/// Best-effort whitespace cropper for question images.
pub struct ImageNormalizer {
    loader: Arc<dyn ImageLoader>,
    options: CropOptions,
}

impl ImageNormalizer {
    /// Create a normalizer over a loader and crop options.
    pub fn new(loader: Arc<dyn ImageLoader>, options: CropOptions) -> Self {
        Self { loader, options }
    }

    /// The configured crop options.
    pub fn options(&self) -> &CropOptions {
        &self.options
    }

    /// Produce a tightly-cropped version of `source`, or the original
    /// source unchanged on any failure. Never fails.
    pub async fn normalize(&self, source: &ImageSource) -> ImageSource {
        if !self.options.enabled {
            return source.clone();
        }

        let img = match load_with_timeout(
            Arc::clone(&self.loader),
            source.clone(),
            self.options.load_timeout,
        )
        .await
        {
            Ok(img) => img,
            Err(e) => {
                log::warn!("whitespace crop skipped, image unusable: {}", e);
                return source.clone();
            }
        };

        let options = self.options.clone();
        let cropped = tokio::task::spawn_blocking(move || {
            crop_to_content(&img, &options).and_then(|out| encode_png(&out))
        })
        .await;

        match cropped {
            Ok(Some(bytes)) => ImageSource::from_bytes(bytes),
            Ok(None) => source.clone(),
            Err(e) => {
                log::warn!("whitespace crop task failed: {}", e);
                source.clone()
            }
        }
    }
}

/// Lossless PNG encode; `None` on encoder failure.
fn encode_png(img: &RgbaImage) -> Option<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img.clone())
        .write_to(&mut buf, image::ImageFormat::Png)
        .ok()?;
    Some(buf.into_inner())
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FsImageLoader;
    use std::path::PathBuf;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn white_image_with_rect(
        w: u32,
        h: u32,
        rect: (u32, u32, u32, u32),
        pixel: Rgba<u8>,
    ) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(w, h, WHITE);
        let (x0, y0, x1, y1) = rect;
        for y in y0..=y1 {
            for x in x0..=x1 {
                img.put_pixel(x, y, pixel);
            }
        }
        img
    }

    #[test]
    fn test_default_options() {
        let opts = CropOptions::default();
        assert!(opts.enabled);
        assert_eq!(opts.padding, 1);
        assert_eq!(opts.brightness_threshold, 180);
        assert_eq!(opts.alpha_threshold, 16);
        assert_eq!(opts.load_timeout, DEFAULT_LOAD_TIMEOUT);
    }

    #[test]
    fn test_builder() {
        let opts = CropOptions::builder()
            .padding(4)
            .brightness_threshold(200)
            .alpha_threshold(8)
            .load_timeout(Duration::from_millis(500))
            .build();

        assert_eq!(opts.padding, 4);
        assert_eq!(opts.brightness_threshold, 200);
        assert_eq!(opts.alpha_threshold, 8);
        assert_eq!(opts.load_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_background_classification_boundaries() {
        let opts = CropOptions::default();

        // Brightness exactly at the threshold is background
        assert!(is_background(&Rgba([180, 180, 180, 255]), &opts));
        // One channel below the threshold is foreground
        assert!(!is_background(&Rgba([179, 180, 180, 255]), &opts));
        // Alpha exactly at the threshold is background regardless of color
        assert!(is_background(&Rgba([0, 0, 0, 16]), &opts));
        // Alpha just above the threshold with dark color is foreground
        assert!(!is_background(&Rgba([0, 0, 0, 17]), &opts));
    }

    #[test]
    fn test_content_bounds_detection() {
        let img = white_image_with_rect(40, 30, (5, 7, 12, 18), BLACK);
        let bounds = content_bounds(&img, &CropOptions::default()).unwrap();

        assert_eq!(bounds.min_x, 5);
        assert_eq!(bounds.min_y, 7);
        assert_eq!(bounds.max_x, 12);
        assert_eq!(bounds.max_y, 18);
        assert_eq!(bounds.width(), 8);
        assert_eq!(bounds.height(), 12);
    }

    #[test]
    fn test_content_bounds_all_white() {
        let img = RgbaImage::from_pixel(20, 20, WHITE);
        assert!(content_bounds(&img, &CropOptions::default()).is_none());
    }

    #[test]
    fn test_content_bounds_all_transparent() {
        let img = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 0]));
        assert!(content_bounds(&img, &CropOptions::default()).is_none());
    }

    #[test]
    fn test_content_bounds_single_pixel() {
        let img = white_image_with_rect(9, 9, (4, 4, 4, 4), BLACK);
        let bounds = content_bounds(&img, &CropOptions::default()).unwrap();
        assert_eq!((bounds.min_x, bounds.max_x), (4, 4));
        assert_eq!((bounds.min_y, bounds.max_y), (4, 4));
    }

    #[test]
    fn test_padded_bounds_clamp_at_edges() {
        let bounds = ContentBounds {
            min_x: 0,
            min_y: 1,
            max_x: 9,
            max_y: 8,
        };
        let padded = bounds.padded(2, 10, 10);
        assert_eq!(padded.min_x, 0);
        assert_eq!(padded.min_y, 0);
        assert_eq!(padded.max_x, 9);
        assert_eq!(padded.max_y, 9);
    }

    #[test]
    fn test_crop_to_content() {
        let img = white_image_with_rect(40, 30, (10, 10, 19, 14), BLACK);
        let cropped = crop_to_content(&img, &CropOptions::default()).unwrap();

        // 10 wide content + 1px padding per side
        assert_eq!(cropped.dimensions(), (12, 7));
        // Padding ring stays background, content is preserved
        assert!(is_background(
            cropped.get_pixel(0, 0),
            &CropOptions::default()
        ));
        assert_eq!(cropped.get_pixel(1, 1), &BLACK);
    }

    #[test]
    fn test_crop_nothing_to_trim() {
        // Content touches every edge; the padded box covers the image
        let img = white_image_with_rect(10, 10, (0, 0, 9, 9), BLACK);
        assert!(crop_to_content(&img, &CropOptions::default()).is_none());
    }

    #[test]
    fn test_crop_blank_image() {
        let img = RgbaImage::from_pixel(16, 16, WHITE);
        assert!(crop_to_content(&img, &CropOptions::default()).is_none());
    }

    #[tokio::test]
    async fn test_normalize_produces_cropped_source() {
        let img = white_image_with_rect(60, 40, (20, 10, 29, 19), BLACK);
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        let source = ImageSource::from_bytes(buf.into_inner());

        let normalizer = ImageNormalizer::new(Arc::new(FsImageLoader), CropOptions::default());
        let result = normalizer.normalize(&source).await;

        assert!(result.is_cropped());
        assert_ne!(result, source);
        let reloaded = FsImageLoader.load(&result).unwrap();
        assert_eq!(reloaded.dimensions(), (12, 12));
    }

    #[tokio::test]
    async fn test_normalize_missing_image_returns_original() {
        let source = ImageSource::Path(PathBuf::from("/nonexistent/question.png"));
        let normalizer = ImageNormalizer::new(Arc::new(FsImageLoader), CropOptions::default());
        let result = normalizer.normalize(&source).await;
        assert_eq!(result, source);
    }

    #[tokio::test]
    async fn test_normalize_undecodable_returns_original() {
        let source = ImageSource::from_bytes(vec![1, 2, 3, 4]);
        let normalizer = ImageNormalizer::new(Arc::new(FsImageLoader), CropOptions::default());
        let result = normalizer.normalize(&source).await;
        assert_eq!(result, source);
    }

    #[tokio::test]
    async fn test_normalize_disabled_passes_through() {
        let img = white_image_with_rect(60, 40, (20, 10, 29, 19), BLACK);
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        let source = ImageSource::from_bytes(buf.into_inner());

        let options = CropOptions::builder().enabled(false).build();
        let normalizer = ImageNormalizer::new(Arc::new(FsImageLoader), options);
        assert_eq!(normalizer.normalize(&source).await, source);
    }

    #[tokio::test]
    async fn test_normalize_blank_image_returns_original() {
        let img = RgbaImage::from_pixel(10, 10, WHITE);
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        let source = ImageSource::from_bytes(buf.into_inner());

        let normalizer = ImageNormalizer::new(Arc::new(FsImageLoader), CropOptions::default());
        let result = normalizer.normalize(&source).await;
        assert_eq!(result, source);
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CropOptions>();
        assert_send_sync::<ContentBounds>();
        assert_send_sync::<ImageNormalizer>();
    }
}
