//! Question block construction and measurement
//!
//! A block is the visual unit for one question: the number label stacked
//! over the question image, rendered at full column width with the image's
//! aspect ratio preserved. Blocks are built detached from any page; the
//! builder returns a [`PendingBlock`] whose [`PendingBlock::measured`]
//! future resolves once the image has loaded (or errored, or timed out),
//! so placement decisions always use final post-load geometry.

use std::sync::Arc;
use std::time::Duration;

use crate::loader::{load_with_timeout, ImageLoader};
use crate::model::{ImageSource, Question};
use crate::page::PageMetrics;

/// Default upper bound for awaiting a built block's image readiness.
pub const DEFAULT_IMAGE_READY_TIMEOUT: Duration = Duration::from_millis(1500);

/// A measured question block, ready for placement.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionBlock {
    /// Question number, if the question carries one
    pub number: Option<u32>,
    /// Rendered number label, e.g. `7.` (empty for unnumbered questions)
    pub label: String,
    /// The (possibly cropped) image backing this block
    pub image: Option<ImageSource>,
    /// Natural decoded image dimensions; `None` when the load degraded
    pub image_size: Option<(u32, u32)>,
    /// Measured block height at column width, label included
    pub height: f32,
}

impl QuestionBlock {
    /// Whether the image failed to load and the block occupies the
    /// fallback box instead of real image geometry.
    pub fn is_degraded(&self) -> bool {
        self.image.is_some() && self.image_size.is_none()
    }
}

/// Builds detached, measurable question blocks.
pub struct MeasuredBlockBuilder {
    loader: Arc<dyn ImageLoader>,
    metrics: PageMetrics,
    image_ready_timeout: Duration,
}

impl MeasuredBlockBuilder {
    /// Create a builder over a loader and the page geometry.
    pub fn new(
        loader: Arc<dyn ImageLoader>,
        metrics: PageMetrics,
        image_ready_timeout: Duration,
    ) -> Self {
        Self {
            loader,
            metrics,
            image_ready_timeout,
        }
    }

    /// Construct the block for a question without attaching it anywhere.
    ///
    /// `image` is the already-normalized source (or `None` for questions
    /// without one). The returned handle is awaited for final geometry.
    pub fn begin(&self, question: &Question, image: Option<ImageSource>) -> PendingBlock<'_> {
        PendingBlock {
            builder: self,
            number: question.question_number,
            label: question.label(),
            image,
        }
    }
}

/// A constructed block whose image readiness has not been awaited yet.
pub struct PendingBlock<'a> {
    builder: &'a MeasuredBlockBuilder,
    number: Option<u32>,
    label: String,
    image: Option<ImageSource>,
}

impl PendingBlock<'_> {
    /// Await image readiness (bounded) and resolve final geometry.
    ///
    /// Load failures and timeouts degrade to the configured fallback box;
    /// they never fail the block.
    pub async fn measured(self) -> QuestionBlock {
        let metrics = &self.builder.metrics;

        let image_size = match &self.image {
            Some(source) => {
                match load_with_timeout(
                    Arc::clone(&self.builder.loader),
                    source.clone(),
                    self.builder.image_ready_timeout,
                )
                .await
                {
                    Ok(img) => Some(img.dimensions()),
                    Err(e) => {
                        log::warn!("question image unavailable, using fallback box: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let column_width = metrics.column_width();
        let image_height = match image_size {
            Some((w, h)) if w > 0 => column_width * h as f32 / w as f32,
            _ => metrics.fallback_image_height,
        };

        QuestionBlock {
            number: self.number,
            label: self.label,
            image: self.image,
            image_size,
            height: metrics.label_height + image_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FsImageLoader;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn png_source(width: u32, height: u32) -> ImageSource {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        ImageSource::from_bytes(buf.into_inner())
    }

    fn builder() -> MeasuredBlockBuilder {
        MeasuredBlockBuilder::new(
            Arc::new(FsImageLoader),
            PageMetrics::default(),
            DEFAULT_IMAGE_READY_TIMEOUT,
        )
    }

    #[tokio::test]
    async fn test_measured_block_scales_to_column_width() {
        let metrics = PageMetrics::default();
        let width = metrics.column_width() as u32 * 2;
        let question = Question {
            question_number: Some(3),
            image_url: Some("q3.png".to_string()),
        };

        // Image twice as wide as the column, 200 tall: scales to half
        let builder = builder();
        let block = builder
            .begin(&question, Some(png_source(width, 200)))
            .measured()
            .await;

        assert_eq!(block.number, Some(3));
        assert_eq!(block.label, "3.");
        assert_eq!(block.image_size, Some((width, 200)));
        let expected = metrics.label_height + metrics.column_width() * 200.0 / width as f32;
        assert!((block.height - expected).abs() < 0.001);
        assert!(!block.is_degraded());
    }

    #[tokio::test]
    async fn test_measured_block_missing_image_uses_fallback() {
        let metrics = PageMetrics::default();
        let question = Question {
            question_number: Some(1),
            image_url: Some("gone.png".to_string()),
        };
        let source = ImageSource::Path(PathBuf::from("/nonexistent/gone.png"));

        let builder = builder();
        let block = builder.begin(&question, Some(source)).measured().await;

        assert!(block.is_degraded());
        assert_eq!(block.image_size, None);
        let expected = metrics.label_height + metrics.fallback_image_height;
        assert!((block.height - expected).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_measured_block_without_image() {
        let metrics = PageMetrics::default();
        let question = Question::default();

        let builder = builder();
        let block = builder.begin(&question, None).measured().await;

        assert_eq!(block.label, "");
        assert!(block.image.is_none());
        assert!(!block.is_degraded());
        let expected = metrics.label_height + metrics.fallback_image_height;
        assert!((block.height - expected).abs() < 0.001);
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QuestionBlock>();
        assert_send_sync::<MeasuredBlockBuilder>();
    }
}
