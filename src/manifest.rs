//! Layout manifest
//!
//! A serializable description of a rendered booklet: every page, column
//! and block placement, ready for a downstream rasterizer or for
//! inspection. Cropped in-memory images are referenced by deterministic
//! file names; [`collect_cropped_images`] yields the bytes to write next
//! to the manifest.

use serde::Serialize;
use std::sync::Arc;

use crate::answer_key::AnswerKeyGrid;
use crate::block::QuestionBlock;
use crate::fit::PageTransform;
use crate::model::{ExamDocument, ImageSource};
use crate::page::{Page, PageKind};
use crate::session::RenderedBooklet;

/// Deterministic file name for a cropped block image.
pub fn image_file_name(page_index: usize, block_index: usize) -> String {
    format!("p{:02}_q{:02}.png", page_index, block_index)
}

/// One block placement in the manifest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockEntry {
    pub question_number: Option<u32>,
    pub label: String,
    /// Measured block height in layout units
    pub height: f32,
    /// Image reference: an input path, or the file name of a saved crop
    pub image: Option<String>,
    /// Whether the image went through the whitespace cropper
    pub cropped: bool,
    /// Whether the image failed to load and the fallback box was used
    pub degraded: bool,
}

/// One column of a content page.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnsEntry {
    pub left: Vec<BlockEntry>,
    pub right: Vec<BlockEntry>,
}

/// One page of the manifest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEntry {
    pub index: usize,
    pub kind: &'static str,
    pub parity: &'static str,
    pub number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<PageTransform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<ColumnsEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grids: Option<Vec<AnswerKeyGrid>>,
}

/// The whole rendered booklet as data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutManifest {
    pub school_name: Option<String>,
    pub booklet_name: Option<String>,
    pub page_count: usize,
    pub question_count: usize,
    pub pages: Vec<PageEntry>,
}

impl LayoutManifest {
    /// Describe a rendered booklet.
    pub fn new(document: &ExamDocument, booklet: &RenderedBooklet) -> Self {
        let pages = booklet
            .pages
            .iter()
            .enumerate()
            .map(|(index, page)| page_entry(index, page))
            .collect();

        Self {
            school_name: document.school_name.clone(),
            booklet_name: document.booklet_name.clone(),
            page_count: booklet.page_count(),
            question_count: booklet.question_count,
            pages,
        }
    }

    /// Pretty-printed JSON form.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn page_entry(index: usize, page: &Page) -> PageEntry {
    let columns = page.columns().map(|c| ColumnsEntry {
        left: block_entries(index, 0, &c.left.blocks),
        right: block_entries(index, c.left.blocks.len(), &c.right.blocks),
    });

    let grids = match &page.kind {
        PageKind::AnswerKey(p) => Some(p.grids.clone()),
        _ => None,
    };

    PageEntry {
        index,
        kind: page.kind.name(),
        parity: page.parity.as_str(),
        number: page.number,
        section: page.section_name().map(str::to_string),
        transform: page.transform,
        columns,
        grids,
    }
}

fn block_entries(page_index: usize, offset: usize, blocks: &[QuestionBlock]) -> Vec<BlockEntry> {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| BlockEntry {
            question_number: block.number,
            label: block.label.clone(),
            height: block.height,
            image: block.image.as_ref().map(|source| match source {
                ImageSource::Path(path) => path.display().to_string(),
                ImageSource::Memory(_) => image_file_name(page_index, offset + i),
            }),
            cropped: block.image.as_ref().is_some_and(ImageSource::is_cropped),
            degraded: block.is_degraded(),
        })
        .collect()
}

/// A cropped image to be written alongside the manifest.
#[derive(Debug, Clone)]
pub struct SavedImage {
    pub file_name: String,
    pub bytes: Arc<Vec<u8>>,
}

/// Collect every in-memory cropped image of a booklet, named exactly as
/// the manifest references it.
pub fn collect_cropped_images(booklet: &RenderedBooklet) -> Vec<SavedImage> {
    let mut out = Vec::new();
    for (page_index, page) in booklet.pages.iter().enumerate() {
        for (block_index, block) in page.blocks_in_reading_order().enumerate() {
            if let Some(ImageSource::Memory(bytes)) = &block.image {
                out.push(SavedImage {
                    file_name: image_file_name(page_index, block_index),
                    bytes: Arc::clone(bytes),
                });
            }
        }
    }
    out
}
