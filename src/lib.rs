//! exambook-pdf - Two-column exam booklet layout engine
//!
//! A headless layout engine that renders structured exam data (school
//! metadata, test sections with image-backed questions, and an answer key)
//! into a sequence of fixed-size, two-column pages ready for a downstream
//! rasterizer to capture into a printable PDF booklet.
//!
//! # Features
//!
//! - **Whitespace Cropping** ([`crop`]) - Trim uniform background from
//!   question images before they are measured
//! - **Block Measurement** ([`block`]) - Build detached question blocks
//!   and await their post-load geometry
//! - **Page Factory** ([`page`]) - Cover, section-first, continuation and
//!   answer-key page skeletons with odd/even parity
//! - **Flow Engine** ([`flow`]) - The greedy two-column pagination core
//! - **Answer Key** ([`answer_key`]) - Fixed-grid answer summary pages
//! - **Viewport Fitting** ([`fit`]) - Post-layout presentation scaling
//! - **Render Session** ([`session`]) - The render entry point, lifecycle
//!   callbacks and the deferred-export policy
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use exambook_pdf::{ExamDocument, RenderOptions, RenderSession, SilentCallback};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let json = std::fs::read_to_string("exam.json")?;
//! let document = ExamDocument::from_json(&json)?;
//!
//! let session = RenderSession::new(RenderOptions::default());
//! let booklet = session.render(&document, &SilentCallback).await?;
//! println!("Pages: {}", booklet.page_count());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ExamDocument -> FlowEngine (PageFactory + MeasuredBlockBuilder
//!                             + ImageNormalizer per question)
//!              -> page sequence -> AnswerKeySheetBuilder
//!              -> ViewportFitter -> rasterizer collaborator
//! ```
//!
//! Flow is greedy, single-pass and strictly sequential: question order is
//! input order, placement decisions use measured post-load geometry, and
//! resource failures always degrade instead of aborting.
//!
//! # License
//!
//! AGPL-3.0

pub mod answer_key;
pub mod block;
pub mod cli;
pub mod config;
pub mod crop;
pub mod fit;
pub mod flow;
pub mod loader;
pub mod manifest;
pub mod model;
pub mod page;
pub mod session;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use answer_key::{
    build_grid, total_slots, AnswerKeyGrid, AnswerKeyLayout, AnswerKeySheetBuilder, AnswerSlot,
};
pub use block::{MeasuredBlockBuilder, PendingBlock, QuestionBlock, DEFAULT_IMAGE_READY_TIMEOUT};
pub use cli::{create_progress_bar, create_spinner, AnswerKeyArg, Cli, Commands, ExitCode, RenderArgs};
pub use config::{CliOverrides, Config, ConfigError};
pub use crop::{content_bounds, crop_to_content, ContentBounds, CropOptions, ImageNormalizer};
pub use fit::{FitOptions, PageTransform, ViewportFitter};
pub use flow::{FlowCursor, FlowEngine, LayoutError};
pub use loader::{FsImageLoader, ImageLoader, LoadError, DEFAULT_LOAD_TIMEOUT};
pub use manifest::{collect_cropped_images, LayoutManifest, SavedImage};
pub use model::{
    lesson_colors, AnswerEntry, ColorPair, ExamDocument, ImageSource, Question, Section,
    CHOICE_LETTERS,
};
pub use page::{
    Column, ColumnSide, Columns, CoverFace, Page, PageFactory, PageKind, PageMetrics, PageParity,
};
pub use session::{
    ExportDisposition, ExportError, RasterizeError, Rasterizer, RenderCallback, RenderError,
    RenderOptions, RenderSession, RenderedBooklet, SilentCallback,
};
pub use util::{format_duration, mm_to_points, mm_to_px, percentage, points_to_mm, px_to_mm};
