//! Flow engine: the pagination core
//!
//! Consumes the ordered question list of each section and greedily packs
//! question blocks into two-column pages, strictly in input order, one
//! question at a time. Each placement is speculative: the freshly built
//! block is appended to the current column, its post-load geometry is
//! measured, and on overflow it is rolled back and retried in the next
//! column or on a newly allocated continuation page. Every retry rebuilds
//! the block from scratch; normalization and measurement are never cached
//! across attempts.
//!
//! Sections are flowed strictly sequentially and a new section always
//! starts a fresh page. The retry loop is bounded by a precondition: a
//! block taller than a full empty column is rejected with
//! [`LayoutError::QuestionTooTall`] instead of cycling forever.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::block::MeasuredBlockBuilder;
use crate::crop::ImageNormalizer;
use crate::model::{ExamDocument, ImageSource, Question, Section};
use crate::page::{ColumnSide, Page, PageFactory};
use crate::session::RenderCallback;

/// Pagination error types
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A single block's minimum rendered height exceeds one full column.
    /// The greedy retry loop could never terminate for such a block, so
    /// it is rejected up front.
    #[error(
        "question {label} in section '{section}' is taller than a full column \
         ({height:.1} > {capacity:.1} layout units)"
    )]
    QuestionTooTall {
        section: String,
        label: String,
        height: f32,
        capacity: f32,
    },
}

pub type Result<T> = std::result::Result<T, LayoutError>;

/// Transient engine state: current page, column side, and the running
/// counters for parity and displayed numbering. Exactly one cursor lives
/// per render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowCursor {
    /// Index of the page currently receiving blocks
    pub page_index: usize,
    /// Column side the last commit landed in
    pub column: ColumnSide,
    /// Total pages created so far (parity anchor)
    pub pages_created: usize,
    /// Next displayed page number to assign
    pub next_page_number: u32,
}

impl FlowCursor {
    /// Cursor for a fresh pass, after any cover pages.
    pub fn new(pages_created: usize, next_page_number: u32) -> Self {
        Self {
            page_index: 0,
            column: ColumnSide::Left,
            pages_created,
            next_page_number,
        }
    }
}

/// The pagination engine. Borrows its collaborators for one render pass.
pub struct FlowEngine<'a> {
    factory: &'a PageFactory,
    normalizer: &'a ImageNormalizer,
    blocks: &'a MeasuredBlockBuilder,
    asset_root: PathBuf,
    overflow_tolerance: f32,
}

impl<'a> FlowEngine<'a> {
    /// Create an engine over its collaborators.
    pub fn new(
        factory: &'a PageFactory,
        normalizer: &'a ImageNormalizer,
        blocks: &'a MeasuredBlockBuilder,
        asset_root: &Path,
        overflow_tolerance: f32,
    ) -> Self {
        Self {
            factory,
            normalizer,
            blocks,
            asset_root: asset_root.to_path_buf(),
            overflow_tolerance,
        }
    }

    /// Flow every section of the document, appending pages as capacity is
    /// needed. Sections are processed strictly sequentially.
    pub async fn flow_document(
        &self,
        document: &ExamDocument,
        pages: &mut Vec<Page>,
        cursor: &mut FlowCursor,
        callback: &dyn RenderCallback,
    ) -> Result<()> {
        for section in &document.tests {
            self.flow_section(document, section, pages, cursor, callback)
                .await?;
        }
        Ok(())
    }

    /// Flow one section: allocate its first page, then place each question
    /// in input order.
    async fn flow_section(
        &self,
        document: &ExamDocument,
        section: &Section,
        pages: &mut Vec<Page>,
        cursor: &mut FlowCursor,
        callback: &dyn RenderCallback,
    ) -> Result<()> {
        callback.on_section_start(&section.name);

        let page = self.factory.section_first_page(
            section,
            document,
            cursor.pages_created,
            Some(cursor.next_page_number),
        );
        pages.push(page);
        cursor.pages_created += 1;
        cursor.next_page_number += 1;
        cursor.page_index = pages.len() - 1;
        cursor.column = ColumnSide::Left;
        callback.on_page_created(cursor.page_index, "sectionFirst");

        for question in &section.questions {
            self.place_question(document, section, question, pages, cursor, callback)
                .await?;
        }
        Ok(())
    }

    /// Normalize the question's image and build a fresh measured block.
    async fn build_block(&self, question: &Question) -> crate::block::QuestionBlock {
        let source = question
            .image_url
            .as_deref()
            .map(|url| ImageSource::resolve(url, &self.asset_root));

        let normalized = match &source {
            Some(s) => Some(self.normalizer.normalize(s).await),
            None => None,
        };

        self.blocks.begin(question, normalized).measured().await
    }

    /// Place one question: left column, then right, then a fresh
    /// continuation page, rebuilding the block for every attempt.
    async fn place_question(
        &self,
        document: &ExamDocument,
        section: &Section,
        question: &Question,
        pages: &mut Vec<Page>,
        cursor: &mut FlowCursor,
        callback: &dyn RenderCallback,
    ) -> Result<()> {
        let metrics = self.factory.metrics();
        let spacing = metrics.block_spacing;
        let full_capacity = metrics.column_capacity(false);
        let mut attempt = cursor.column;

        loop {
            let block = self.build_block(question).await;

            if block.height > full_capacity + self.overflow_tolerance {
                return Err(LayoutError::QuestionTooTall {
                    section: section.name.clone(),
                    label: if block.label.is_empty() {
                        "(unnumbered)".to_string()
                    } else {
                        block.label.clone()
                    },
                    height: block.height,
                    capacity: full_capacity,
                });
            }

            let page = &mut pages[cursor.page_index];
            let columns = match page.columns_mut() {
                Some(c) => c,
                // The cursor only ever points at section-first or
                // continuation pages, both of which carry columns.
                None => unreachable!("flow cursor points at a page without columns"),
            };

            columns.get_mut(attempt).push(block);
            if !columns.get(attempt).overflows(spacing, self.overflow_tolerance) {
                cursor.column = attempt;
                callback.on_question_placed(
                    &section.name,
                    question.question_number,
                    cursor.page_index,
                    attempt,
                );
                return Ok(());
            }
            columns.get_mut(attempt).rollback();

            match attempt {
                ColumnSide::Left => {
                    attempt = ColumnSide::Right;
                }
                ColumnSide::Right => {
                    let page = self.factory.continuation_page(
                        section,
                        document,
                        cursor.pages_created,
                        Some(cursor.next_page_number),
                    );
                    pages.push(page);
                    cursor.pages_created += 1;
                    cursor.next_page_number += 1;
                    cursor.page_index = pages.len() - 1;
                    cursor.column = ColumnSide::Left;
                    attempt = ColumnSide::Left;
                    callback.on_page_created(cursor.page_index, "continuation");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::DEFAULT_IMAGE_READY_TIMEOUT;
    use crate::crop::CropOptions;
    use crate::loader::ImageLoader;
    use crate::page::{PageKind, PageMetrics, PageParity};
    use crate::session::SilentCallback;
    use crate::testing::SyntheticLoader;
    use std::sync::Arc;

    struct Harness {
        factory: PageFactory,
        normalizer: ImageNormalizer,
        blocks: MeasuredBlockBuilder,
    }

    impl Harness {
        fn new() -> Self {
            let loader: Arc<dyn ImageLoader> = Arc::new(SyntheticLoader);
            Self {
                factory: PageFactory::new(PageMetrics::default()),
                normalizer: ImageNormalizer::new(Arc::clone(&loader), CropOptions::default()),
                blocks: MeasuredBlockBuilder::new(
                    loader,
                    PageMetrics::default(),
                    DEFAULT_IMAGE_READY_TIMEOUT,
                ),
            }
        }

        fn engine(&self) -> FlowEngine<'_> {
            FlowEngine::new(
                &self.factory,
                &self.normalizer,
                &self.blocks,
                Path::new("/"),
                1.0,
            )
        }
    }

    fn question(number: u32, image_height: u32) -> Question {
        Question {
            question_number: Some(number),
            image_url: Some(format!("h{}.png", image_height)),
        }
    }

    fn document_with_questions(questions: Vec<Question>) -> ExamDocument {
        ExamDocument {
            tests: vec![Section {
                name: "Matematik".to_string(),
                lesson_code: Some("mat".to_string()),
                questions,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    async fn flow(doc: &ExamDocument) -> Result<Vec<Page>> {
        let harness = Harness::new();
        let engine = harness.engine();
        let mut pages = Vec::new();
        let mut cursor = FlowCursor::new(0, 1);
        engine
            .flow_document(doc, &mut pages, &mut cursor, &SilentCallback)
            .await?;
        Ok(pages)
    }

    fn reading_order(pages: &[Page]) -> Vec<u32> {
        pages
            .iter()
            .flat_map(|p| p.blocks_in_reading_order())
            .filter_map(|b| b.number)
            .collect()
    }

    #[tokio::test]
    async fn test_tiny_questions_stay_in_left_column() {
        // Blocks of 122 units never overflow the 899-unit first column
        let doc = document_with_questions((1..=3).map(|n| question(n, 100)).collect());
        let pages = flow(&doc).await.unwrap();

        assert_eq!(pages.len(), 1);
        let columns = pages[0].columns().unwrap();
        assert_eq!(columns.left.len(), 3);
        assert!(columns.right.is_empty());
    }

    #[tokio::test]
    async fn test_overflow_moves_to_right_then_new_page() {
        // Each block measures 22 + 858 = 880: one per column
        let doc = document_with_questions((1..=3).map(|n| question(n, 858)).collect());
        let pages = flow(&doc).await.unwrap();

        assert_eq!(pages.len(), 2);
        let first = pages[0].columns().unwrap();
        assert_eq!(first.left.len(), 1);
        assert_eq!(first.right.len(), 1);
        assert_eq!(first.left.blocks[0].number, Some(1));
        assert_eq!(first.right.blocks[0].number, Some(2));

        assert!(matches!(pages[1].kind, PageKind::Continuation(_)));
        assert_eq!(pages[1].columns().unwrap().left.blocks[0].number, Some(3));

        // Odd/even alternates by creation order
        assert_eq!(pages[0].parity, PageParity::Odd);
        assert_eq!(pages[1].parity, PageParity::Even);
        assert_eq!(pages[0].number, Some(1));
        assert_eq!(pages[1].number, Some(2));
    }

    #[tokio::test]
    async fn test_order_preserved_and_exhaustive() {
        let heights = [300, 500, 120, 700, 80, 640, 210, 450, 330, 90];
        let doc = document_with_questions(
            heights
                .iter()
                .enumerate()
                .map(|(i, &h)| question(i as u32 + 1, h))
                .collect(),
        );
        let pages = flow(&doc).await.unwrap();

        let placed = reading_order(&pages);
        assert_eq!(placed, (1..=10).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_new_section_starts_fresh_page() {
        let mut doc = document_with_questions(vec![question(1, 100)]);
        doc.tests.push(Section {
            name: "Fizik".to_string(),
            questions: vec![question(1, 100)],
            ..Default::default()
        });

        let pages = flow(&doc).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert!(matches!(pages[0].kind, PageKind::SectionFirst(_)));
        assert!(matches!(pages[1].kind, PageKind::SectionFirst(_)));
        assert_eq!(pages[1].section_name(), Some("Fizik"));
        // First page's right column stays empty; the section never shares
        assert!(pages[0].columns().unwrap().right.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_question_is_rejected() {
        // 22 + 1000 exceeds even a continuation column (963 + tolerance)
        let doc = document_with_questions(vec![question(1, 1000)]);
        let result = flow(&doc).await;

        match result {
            Err(LayoutError::QuestionTooTall {
                section,
                label,
                height,
                capacity,
            }) => {
                assert_eq!(section, "Matematik");
                assert_eq!(label, "1.");
                assert!(height > capacity);
            }
            Ok(_) => panic!("oversized question must not flow"),
        }
    }

    #[tokio::test]
    async fn test_block_taller_than_first_page_flows_to_continuation() {
        // 22 + 920 = 942: too tall for the 899-unit first-page column but
        // fits the 963-unit continuation column
        let doc = document_with_questions(vec![question(1, 920)]);
        let pages = flow(&doc).await.unwrap();

        assert_eq!(pages.len(), 2);
        assert!(pages[0].columns().unwrap().left.is_empty());
        assert!(pages[0].columns().unwrap().right.is_empty());
        assert_eq!(pages[1].columns().unwrap().left.len(), 1);
    }

    #[tokio::test]
    async fn test_degraded_image_still_flows() {
        // Unparsable stem: the loader fails, the block takes the fallback
        // box, and the question is still placed
        let doc = document_with_questions(vec![Question {
            question_number: Some(1),
            image_url: Some("broken.png".to_string()),
        }]);
        let pages = flow(&doc).await.unwrap();

        let block = &pages[0].columns().unwrap().left.blocks[0];
        assert!(block.is_degraded());
        assert_eq!(
            block.height,
            PageMetrics::default().label_height + PageMetrics::default().fallback_image_height
        );
    }

    #[tokio::test]
    async fn test_deterministic_assignment() {
        let heights = [430, 610, 150, 870, 60, 330, 540, 720];
        let doc = document_with_questions(
            heights
                .iter()
                .enumerate()
                .map(|(i, &h)| question(i as u32 + 1, h))
                .collect(),
        );

        let first = flow(&doc).await.unwrap();
        let second = flow(&doc).await.unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.columns().map(|c| c.left.len()), b.columns().map(|c| c.left.len()));
            assert_eq!(
                a.columns().map(|c| c.right.len()),
                b.columns().map(|c| c.right.len())
            );
            assert_eq!(a.parity, b.parity);
        }
    }

    #[tokio::test]
    async fn test_empty_document_produces_no_pages() {
        let pages = flow(&ExamDocument::default()).await.unwrap();
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_section_without_questions_still_gets_first_page() {
        let doc = document_with_questions(Vec::new());
        let pages = flow(&doc).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert!(matches!(pages[0].kind, PageKind::SectionFirst(_)));
    }

    #[tokio::test]
    async fn test_cursor_counters_advance() {
        let doc = document_with_questions((1..=3).map(|n| question(n, 858)).collect());
        let harness = Harness::new();
        let engine = harness.engine();
        let mut pages = Vec::new();
        let mut cursor = FlowCursor::new(2, 3);

        engine
            .flow_document(&doc, &mut pages, &mut cursor, &SilentCallback)
            .await
            .unwrap();

        // Two covers already counted: first content page is 3rd created
        assert_eq!(pages[0].parity, PageParity::Odd);
        assert_eq!(pages[0].number, Some(3));
        assert_eq!(cursor.pages_created, 4);
        assert_eq!(cursor.next_page_number, 5);
    }
}
