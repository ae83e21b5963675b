//! Page model and factory
//!
//! Pages are fixed-size print units (A4 at 96 px/inch) with a tagged kind:
//! cover, section-first, continuation, or answer-key. Content pages carry
//! two flowing columns; answer-key pages carry a flat grid; covers carry
//! only notice text. The factory builds empty page skeletons; the flow
//! engine owns page numbering and decides when capacity is needed.
//!
//! Odd/even styling alternates strictly by running created-page parity,
//! never by displayed page number.

use serde::Serialize;

use crate::answer_key::AnswerKeyGrid;
use crate::block::QuestionBlock;
use crate::fit::PageTransform;
use crate::model::{lesson_colors, ColorPair, ExamDocument, Section};

// ============================================================
// Metrics
// ============================================================

/// Fixed page geometry in layout units (A4 at 96 px/inch, rounded).
#[derive(Debug, Clone, PartialEq)]
pub struct PageMetrics {
    /// Page width
    pub page_width: f32,
    /// Page height
    pub page_height: f32,
    /// Horizontal margin on each side of the content area
    pub side_margin: f32,
    /// Width of the vertical divider between the two columns
    pub divider_width: f32,
    /// Header height on a section's first page (title + instructions bar)
    pub section_header_height: f32,
    /// Header height on continuation pages (running titles only)
    pub header_height: f32,
    /// Footer height on content pages
    pub footer_height: f32,
    /// Height of a block's number label row
    pub label_height: f32,
    /// Vertical spacing between consecutive blocks in a column
    pub block_spacing: f32,
    /// Box height a block occupies when its image failed to load
    pub fallback_image_height: f32,
}

impl Default for PageMetrics {
    fn default() -> Self {
        Self {
            page_width: 794.0,
            page_height: 1123.0,
            side_margin: 28.0,
            divider_width: 24.0,
            section_header_height: 160.0,
            header_height: 96.0,
            footer_height: 64.0,
            label_height: 22.0,
            block_spacing: 14.0,
            fallback_image_height: 120.0,
        }
    }
}

impl PageMetrics {
    /// Create a new metrics builder
    pub fn builder() -> PageMetricsBuilder {
        PageMetricsBuilder::default()
    }

    /// Width of one flowing column.
    pub fn column_width(&self) -> f32 {
        (self.page_width - 2.0 * self.side_margin - self.divider_width) / 2.0
    }

    /// Fixed capacity of a column on a section-first or continuation page.
    pub fn column_capacity(&self, section_first: bool) -> f32 {
        let header = if section_first {
            self.section_header_height
        } else {
            self.header_height
        };
        self.page_height - header - self.footer_height
    }
}

/// Builder for PageMetrics
#[derive(Debug, Default)]
pub struct PageMetricsBuilder {
    metrics: PageMetrics,
}

impl PageMetricsBuilder {
    /// Set page dimensions
    #[must_use]
    pub fn page_size(mut self, width: f32, height: f32) -> Self {
        self.metrics.page_width = width;
        self.metrics.page_height = height;
        self
    }

    /// Set header heights (section-first, continuation)
    #[must_use]
    pub fn header_heights(mut self, section_first: f32, continuation: f32) -> Self {
        self.metrics.section_header_height = section_first;
        self.metrics.header_height = continuation;
        self
    }

    /// Set footer height
    #[must_use]
    pub fn footer_height(mut self, height: f32) -> Self {
        self.metrics.footer_height = height;
        self
    }

    /// Set vertical spacing between blocks
    #[must_use]
    pub fn block_spacing(mut self, spacing: f32) -> Self {
        self.metrics.block_spacing = spacing;
        self
    }

    /// Set the fallback box height for failed images
    #[must_use]
    pub fn fallback_image_height(mut self, height: f32) -> Self {
        self.metrics.fallback_image_height = height;
        self
    }

    /// Build the metrics
    #[must_use]
    pub fn build(self) -> PageMetrics {
        self.metrics
    }
}

// ============================================================
// Columns
// ============================================================

/// Column side within a content page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnSide {
    Left,
    Right,
}

impl ColumnSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnSide::Left => "left",
            ColumnSide::Right => "right",
        }
    }
}

/// One flowing column: an append-only block sequence against a fixed
/// capacity. The only removal is the rollback used by the overflow probe.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub blocks: Vec<QuestionBlock>,
    pub capacity: f32,
}

impl Column {
    /// Create an empty column with the given capacity.
    pub fn new(capacity: f32) -> Self {
        Self {
            blocks: Vec::new(),
            capacity,
        }
    }

    /// Measured occupied extent: block heights plus inter-block spacing.
    pub fn occupied_extent(&self, spacing: f32) -> f32 {
        let heights: f32 = self.blocks.iter().map(|b| b.height).sum();
        if self.blocks.len() > 1 {
            heights + spacing * (self.blocks.len() - 1) as f32
        } else {
            heights
        }
    }

    /// Strict overflow test with a small tolerance against float rounding.
    pub fn overflows(&self, spacing: f32, tolerance: f32) -> bool {
        self.occupied_extent(spacing) > self.capacity + tolerance
    }

    /// Speculatively append a block.
    pub fn push(&mut self, block: QuestionBlock) {
        self.blocks.push(block);
    }

    /// Roll back the most recent speculative append.
    pub fn rollback(&mut self) -> Option<QuestionBlock> {
        self.blocks.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

/// The left/right column pair of a content page.
#[derive(Debug, Clone, PartialEq)]
pub struct Columns {
    pub left: Column,
    pub right: Column,
}

impl Columns {
    /// Create an empty pair with a shared capacity.
    pub fn new(capacity: f32) -> Self {
        Self {
            left: Column::new(capacity),
            right: Column::new(capacity),
        }
    }

    pub fn get(&self, side: ColumnSide) -> &Column {
        match side {
            ColumnSide::Left => &self.left,
            ColumnSide::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, side: ColumnSide) -> &mut Column {
        match side {
            ColumnSide::Left => &mut self.left,
            ColumnSide::Right => &mut self.right,
        }
    }
}

// ============================================================
// Page Kinds
// ============================================================

/// Odd/even styling variant, selected from the running created-page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageParity {
    Odd,
    Even,
}

impl PageParity {
    /// Parity of the next page given how many pages exist already.
    pub fn from_created(pages_created: usize) -> Self {
        if (pages_created + 1) % 2 == 1 {
            PageParity::Odd
        } else {
            PageParity::Even
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageParity::Odd => "odd",
            PageParity::Even => "even",
        }
    }
}

/// Which face of the cover sheet a cover page represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverFace {
    Front,
    Inner,
}

/// Front/inner cover content.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverPage {
    pub face: CoverFace,
    /// Booklet kind (selects cover artwork)
    pub booklet_kind: Option<String>,
    /// School name, shown on the front face only
    pub school_name: Option<String>,
    /// Candidate notice (front) or attention notice (inner)
    pub notice: Option<String>,
    /// Booklet instructions, shown on the inner face only
    pub instructions: Option<String>,
}

/// First page of a section: distinct header with name, instructions and
/// the section's color pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionFirstPage {
    pub section_name: String,
    pub instructions: Option<String>,
    pub colors: ColorPair,
    pub booklet_kind: Option<String>,
    pub qr_code_url: Option<String>,
    pub columns: Columns,
}

/// Any later page of a section: running titles plus the section name and
/// color for footer cross-referencing.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationPage {
    pub booklet_title: Option<String>,
    pub section_name: String,
    pub colors: ColorPair,
    pub columns: Columns,
}

/// Trailing answer-key page: a flat grid, no flowing columns.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerKeyPage {
    pub grids: Vec<AnswerKeyGrid>,
}

/// Tagged page kind; each variant carries only the fields it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum PageKind {
    Cover(CoverPage),
    SectionFirst(SectionFirstPage),
    Continuation(ContinuationPage),
    AnswerKey(AnswerKeyPage),
}

impl PageKind {
    pub fn name(&self) -> &'static str {
        match self {
            PageKind::Cover(_) => "cover",
            PageKind::SectionFirst(_) => "sectionFirst",
            PageKind::Continuation(_) => "continuation",
            PageKind::AnswerKey(_) => "answerKey",
        }
    }
}

/// One finalized rendering unit with fixed print dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub kind: PageKind,
    pub parity: PageParity,
    /// Displayed page number; `None` for unnumbered pages
    pub number: Option<u32>,
    /// Presentation-only viewport transform, set after layout completes
    pub transform: Option<PageTransform>,
}

impl Page {
    /// The flowing column pair, for content pages.
    pub fn columns(&self) -> Option<&Columns> {
        match &self.kind {
            PageKind::SectionFirst(p) => Some(&p.columns),
            PageKind::Continuation(p) => Some(&p.columns),
            _ => None,
        }
    }

    /// Mutable column pair, for content pages.
    pub fn columns_mut(&mut self) -> Option<&mut Columns> {
        match &mut self.kind {
            PageKind::SectionFirst(p) => Some(&mut p.columns),
            PageKind::Continuation(p) => Some(&mut p.columns),
            _ => None,
        }
    }

    /// Section name for content pages.
    pub fn section_name(&self) -> Option<&str> {
        match &self.kind {
            PageKind::SectionFirst(p) => Some(&p.section_name),
            PageKind::Continuation(p) => Some(&p.section_name),
            _ => None,
        }
    }

    /// Blocks in reading order: left column top-to-bottom, then right.
    pub fn blocks_in_reading_order(&self) -> impl Iterator<Item = &QuestionBlock> {
        let (left, right) = match self.columns() {
            Some(c) => (c.left.blocks.as_slice(), c.right.blocks.as_slice()),
            None => (&[][..], &[][..]),
        };
        left.iter().chain(right.iter())
    }
}

// ============================================================
// Factory
// ============================================================

/// Builds empty page skeletons. Numbering policy belongs to the caller;
/// the factory only stamps the number it is handed.
pub struct PageFactory {
    metrics: PageMetrics,
}

impl PageFactory {
    /// Create a factory over fixed page geometry.
    pub fn new(metrics: PageMetrics) -> Self {
        Self { metrics }
    }

    /// The page geometry this factory builds against.
    pub fn metrics(&self) -> &PageMetrics {
        &self.metrics
    }

    /// Build the first page of a section.
    pub fn section_first_page(
        &self,
        section: &Section,
        document: &ExamDocument,
        pages_created: usize,
        number: Option<u32>,
    ) -> Page {
        Page {
            kind: PageKind::SectionFirst(SectionFirstPage {
                section_name: section.name.clone(),
                instructions: section.test_instructions.clone(),
                colors: lesson_colors(section.lesson_code.as_deref()),
                booklet_kind: document.test_type.clone(),
                qr_code_url: document.qr_code_url.clone(),
                columns: Columns::new(self.metrics.column_capacity(true)),
            }),
            parity: PageParity::from_created(pages_created),
            number,
            transform: None,
        }
    }

    /// Build a continuation page for the section currently being flowed.
    pub fn continuation_page(
        &self,
        section: &Section,
        document: &ExamDocument,
        pages_created: usize,
        number: Option<u32>,
    ) -> Page {
        Page {
            kind: PageKind::Continuation(ContinuationPage {
                booklet_title: document.booklet_name.clone(),
                section_name: section.name.clone(),
                colors: lesson_colors(section.lesson_code.as_deref()),
                columns: Columns::new(self.metrics.column_capacity(false)),
            }),
            parity: PageParity::from_created(pages_created),
            number,
            transform: None,
        }
    }

    /// Build one cover page.
    pub fn cover_page(
        &self,
        document: &ExamDocument,
        face: CoverFace,
        pages_created: usize,
        number: Option<u32>,
    ) -> Page {
        let cover = match face {
            CoverFace::Front => CoverPage {
                face,
                booklet_kind: document.test_type.clone(),
                school_name: document.school_name.clone(),
                notice: document.attention_candidate.clone(),
                instructions: None,
            },
            CoverFace::Inner => CoverPage {
                face,
                booklet_kind: document.test_type.clone(),
                school_name: None,
                notice: document.attention.clone(),
                instructions: document.booklet_instructions.clone(),
            },
        };
        Page {
            kind: PageKind::Cover(cover),
            parity: PageParity::from_created(pages_created),
            number,
            transform: None,
        }
    }

    /// Build an answer-key page from prepared grids. Answer-key pages are
    /// never numbered.
    pub fn answer_key_page(&self, grids: Vec<AnswerKeyGrid>, pages_created: usize) -> Page {
        Page {
            kind: PageKind::AnswerKey(AnswerKeyPage { grids }),
            parity: PageParity::from_created(pages_created),
            number: None,
            transform: None,
        }
    }
}
