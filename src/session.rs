//! Render session
//!
//! The top-level entry point tying the components together: cover pages,
//! per-section flow, answer-key pages, page numbering, viewport fitting,
//! and lifecycle callbacks. One session renders one document at a time;
//! there is no ambient shared state.
//!
//! The page tree is exclusively owned by the engine while a pass runs.
//! Export requests arriving mid-pass are deferred (at most one pending,
//! latest wins) and executed exactly once after the pass completes; the
//! rasterizer itself is an external collaborator behind the narrow
//! [`Rasterizer`] trait.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::answer_key::{AnswerKeyLayout, AnswerKeySheetBuilder};
use crate::block::{MeasuredBlockBuilder, DEFAULT_IMAGE_READY_TIMEOUT};
use crate::crop::{CropOptions, ImageNormalizer};
use crate::fit::{FitOptions, ViewportFitter};
use crate::flow::{FlowCursor, FlowEngine, LayoutError};
use crate::loader::{FsImageLoader, ImageLoader};
use crate::model::ExamDocument;
use crate::page::{ColumnSide, CoverFace, Page, PageFactory, PageMetrics};

// ============================================================
// Options
// ============================================================

/// Everything a render pass can be configured with.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Whitespace cropping configuration
    pub crop: CropOptions,
    /// Hard upper bound for awaiting a placed block's image readiness
    pub image_ready_timeout: Duration,
    /// Fixed page geometry
    pub metrics: PageMetrics,
    /// Overflow tolerance in layout units
    pub overflow_tolerance: f32,
    /// Whether cover pages consume page numbers (covers themselves never
    /// display one; the first content page then starts past them)
    pub covers_numbered: bool,
    /// Whether cover pages advance the odd/even parity sequence
    pub covers_in_parity: bool,
    /// Answer-key page layout policy
    pub answer_key_layout: AnswerKeyLayout,
    /// Viewport fitting configuration
    pub fit: FitOptions,
    /// Viewport width to fit after layout; `None` skips fitting
    pub viewport_width: Option<f32>,
    /// Base directory against which relative image references resolve
    pub asset_root: PathBuf,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            crop: CropOptions::default(),
            image_ready_timeout: DEFAULT_IMAGE_READY_TIMEOUT,
            metrics: PageMetrics::default(),
            overflow_tolerance: 1.0,
            covers_numbered: true,
            covers_in_parity: true,
            answer_key_layout: AnswerKeyLayout::SharedPage,
            fit: FitOptions::default(),
            viewport_width: None,
            asset_root: PathBuf::from("."),
        }
    }
}

impl RenderOptions {
    /// Create a new options builder
    pub fn builder() -> RenderOptionsBuilder {
        RenderOptionsBuilder::default()
    }
}

/// Builder for RenderOptions
#[derive(Debug, Default)]
pub struct RenderOptionsBuilder {
    options: RenderOptions,
}

impl RenderOptionsBuilder {
    /// Set cropping options
    #[must_use]
    pub fn crop(mut self, crop: CropOptions) -> Self {
        self.options.crop = crop;
        self
    }

    /// Set the image readiness timeout
    #[must_use]
    pub fn image_ready_timeout(mut self, timeout: Duration) -> Self {
        self.options.image_ready_timeout = timeout;
        self
    }

    /// Set page geometry
    #[must_use]
    pub fn metrics(mut self, metrics: PageMetrics) -> Self {
        self.options.metrics = metrics;
        self
    }

    /// Set the overflow tolerance
    #[must_use]
    pub fn overflow_tolerance(mut self, tolerance: f32) -> Self {
        self.options.overflow_tolerance = tolerance;
        self
    }

    /// Set whether covers consume page numbers
    #[must_use]
    pub fn covers_numbered(mut self, numbered: bool) -> Self {
        self.options.covers_numbered = numbered;
        self
    }

    /// Set whether covers advance the parity sequence
    #[must_use]
    pub fn covers_in_parity(mut self, in_parity: bool) -> Self {
        self.options.covers_in_parity = in_parity;
        self
    }

    /// Set the answer-key layout policy
    #[must_use]
    pub fn answer_key_layout(mut self, layout: AnswerKeyLayout) -> Self {
        self.options.answer_key_layout = layout;
        self
    }

    /// Set viewport fitting options
    #[must_use]
    pub fn fit(mut self, fit: FitOptions) -> Self {
        self.options.fit = fit;
        self
    }

    /// Set the viewport width to fit after layout
    #[must_use]
    pub fn viewport_width(mut self, width: f32) -> Self {
        self.options.viewport_width = Some(width);
        self
    }

    /// Set the asset root for relative image references
    #[must_use]
    pub fn asset_root(mut self, root: PathBuf) -> Self {
        self.options.asset_root = root;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> RenderOptions {
        self.options
    }
}

// ============================================================
// Callbacks & Errors
// ============================================================

/// Lifecycle and progress callbacks for a render pass.
pub trait RenderCallback: Send + Sync {
    /// Called once when a pass begins
    fn on_render_started(&self, document: &ExamDocument);
    /// Called when a section's flow begins
    fn on_section_start(&self, section_name: &str);
    /// Called whenever a page is allocated
    fn on_page_created(&self, page_index: usize, kind: &str);
    /// Called after each committed placement
    fn on_question_placed(
        &self,
        section_name: &str,
        question_number: Option<u32>,
        page_index: usize,
        column: ColumnSide,
    );
    /// Called once when a pass completes successfully
    fn on_render_complete(&self, page_count: usize);
    /// Called once when a pass aborts
    fn on_render_error(&self, error: &RenderError);
    /// Called for debug/verbose messages
    fn on_debug(&self, message: &str);
}

/// No-op callback (silent mode)
pub struct SilentCallback;

impl RenderCallback for SilentCallback {
    fn on_render_started(&self, _document: &ExamDocument) {}
    fn on_section_start(&self, _section_name: &str) {}
    fn on_page_created(&self, _page_index: usize, _kind: &str) {}
    fn on_question_placed(
        &self,
        _section_name: &str,
        _question_number: Option<u32>,
        _page_index: usize,
        _column: ColumnSide,
    ) {
    }
    fn on_render_complete(&self, _page_count: usize) {}
    fn on_render_error(&self, _error: &RenderError) {}
    fn on_debug(&self, _message: &str) {}
}

/// Render pass error types. Resource degradations never surface here;
/// only input-level failures abort a pass.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("exam document could not be parsed: {0}")]
    DocumentParse(#[from] serde_json::Error),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Rasterization failure reported by the external collaborator.
#[derive(Debug, Error)]
#[error("rasterizer failed: {0}")]
pub struct RasterizeError(pub String);

/// External rasterization collaborator: receives the finalized, ordered
/// page list once layout is complete. Image capture and PDF assembly are
/// its concern, not this crate's.
pub trait Rasterizer: Send {
    fn rasterize(&mut self, pages: &[Page]) -> std::result::Result<(), RasterizeError>;
}

/// How an export request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportDisposition {
    /// Ran immediately against the last completed render
    Executed,
    /// Queued; will run once the in-flight pass completes
    Deferred,
}

/// Export request error types
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no completed render to export")]
    NothingRendered,

    #[error(transparent)]
    Rasterize(#[from] RasterizeError),
}

// ============================================================
// Booklet
// ============================================================

/// The finished output of one render pass.
#[derive(Debug)]
pub struct RenderedBooklet {
    /// Ordered, finalized pages
    pub pages: Vec<Page>,
    /// Total questions placed
    pub question_count: usize,
    /// Wall-clock duration of the pass
    pub elapsed: Duration,
}

impl RenderedBooklet {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// ============================================================
// Session
// ============================================================

struct SessionState {
    rendering: bool,
    pending_export: Option<Box<dyn Rasterizer>>,
    last: Option<Arc<RenderedBooklet>>,
}

/// One render session: owns the configuration and the in-flight/completed
/// pass state.
pub struct RenderSession {
    options: RenderOptions,
    loader: Arc<dyn ImageLoader>,
    state: Mutex<SessionState>,
}

impl RenderSession {
    /// Create a session over the filesystem loader.
    pub fn new(options: RenderOptions) -> Self {
        Self::with_loader(options, Arc::new(FsImageLoader))
    }

    /// Create a session over a custom image loader.
    pub fn with_loader(options: RenderOptions, loader: Arc<dyn ImageLoader>) -> Self {
        Self {
            options,
            loader,
            state: Mutex::new(SessionState {
                rendering: false,
                pending_export: None,
                last: None,
            }),
        }
    }

    /// The session's render options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Whether a pass is currently in flight.
    pub fn is_rendering(&self) -> bool {
        self.lock_state().rendering
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Render a document to a finished page sequence.
    ///
    /// Runs to completion once started; abandoning a render means
    /// discarding the output and starting a fresh pass.
    pub async fn render(
        &self,
        document: &ExamDocument,
        callback: &dyn RenderCallback,
    ) -> std::result::Result<Arc<RenderedBooklet>, RenderError> {
        callback.on_render_started(document);
        self.lock_state().rendering = true;

        let result = self.render_inner(document, callback).await;

        let mut state = self.lock_state();
        state.rendering = false;

        match result {
            Ok(booklet) => {
                let booklet = Arc::new(booklet);
                state.last = Some(Arc::clone(&booklet));
                let pending = state.pending_export.take();
                drop(state);

                callback.on_render_complete(booklet.page_count());

                if let Some(mut rasterizer) = pending {
                    callback.on_debug("running deferred export");
                    if let Err(e) = rasterizer.rasterize(&booklet.pages) {
                        log::warn!("deferred export failed: {}", e);
                    }
                }
                Ok(booklet)
            }
            Err(e) => {
                // A failed pass has no output; a pending export request
                // cannot be honored.
                state.pending_export = None;
                drop(state);
                callback.on_render_error(&e);
                Err(e)
            }
        }
    }

    async fn render_inner(
        &self,
        document: &ExamDocument,
        callback: &dyn RenderCallback,
    ) -> std::result::Result<RenderedBooklet, RenderError> {
        let started = Instant::now();
        let options = &self.options;

        let factory = PageFactory::new(options.metrics.clone());
        let normalizer = ImageNormalizer::new(Arc::clone(&self.loader), options.crop.clone());
        let blocks = MeasuredBlockBuilder::new(
            Arc::clone(&self.loader),
            options.metrics.clone(),
            options.image_ready_timeout,
        );

        let mut pages: Vec<Page> = Vec::new();
        let mut parity_count = 0usize;
        let mut next_number = 1u32;

        // Cover pages, only for a valid declared booklet kind
        if document.has_valid_test_type() {
            for face in [CoverFace::Front, CoverFace::Inner] {
                let page = factory.cover_page(document, face, parity_count, None);
                pages.push(page);
                callback.on_page_created(pages.len() - 1, "cover");
                if options.covers_in_parity {
                    parity_count += 1;
                }
                if options.covers_numbered {
                    next_number += 1;
                }
            }
        }

        // Flow every section
        let mut cursor = FlowCursor::new(parity_count, next_number);
        let engine = FlowEngine::new(
            &factory,
            &normalizer,
            &blocks,
            &options.asset_root,
            options.overflow_tolerance,
        );
        engine
            .flow_document(document, &mut pages, &mut cursor, callback)
            .await?;

        // Trailing answer key
        let key_builder = AnswerKeySheetBuilder::new(options.answer_key_layout);
        let mut key_pages = key_builder.build(document, &factory, cursor.pages_created);
        for (i, _) in key_pages.iter().enumerate() {
            callback.on_page_created(pages.len() + i, "answerKey");
        }
        pages.append(&mut key_pages);

        // Presentation-only viewport fit, after layout is complete
        if let Some(width) = options.viewport_width {
            ViewportFitter::new(options.fit.clone(), options.metrics.clone())
                .fit(&mut pages, width);
        }

        Ok(RenderedBooklet {
            pages,
            question_count: document.question_count(),
            elapsed: started.elapsed(),
        })
    }

    /// Request final output. Executes immediately against the last
    /// completed render, or defers (at most one pending request, latest
    /// wins) while a pass is in flight.
    pub fn request_export(
        &self,
        rasterizer: Box<dyn Rasterizer>,
    ) -> std::result::Result<ExportDisposition, ExportError> {
        let mut state = self.lock_state();

        if state.rendering {
            state.pending_export = Some(rasterizer);
            return Ok(ExportDisposition::Deferred);
        }

        match state.last.clone() {
            Some(booklet) => {
                drop(state);
                let mut rasterizer = rasterizer;
                rasterizer.rasterize(&booklet.pages)?;
                Ok(ExportDisposition::Executed)
            }
            None => Err(ExportError::NothingRendered),
        }
    }

    #[cfg(test)]
    fn set_rendering_for_test(&self, rendering: bool) {
        self.lock_state().rendering = rendering;
    }
}
