//! Answer key sheet builder
//!
//! Builds the trailing fixed-grid summary pages mapping question numbers
//! to correct choice letters. Slot counts are always a multiple of 10 and
//! at least 10, sized from the larger of the section's declared maximum
//! and its answer count, so sparse keys keep their full grid.
//!
//! A slot's number label is present only when a question with that exact
//! number exists; its choice letter only when an answer entry with that
//! number carries a choice index in 0-4. The two are independent: an
//! answer without a question still renders its letter, and a question
//! with a pending answer renders a blank choice.

use serde::{Deserialize, Serialize};

use crate::model::{lesson_colors, ColorPair, ExamDocument, Section};
use crate::page::{Page, PageFactory};

/// How answer-key grids are distributed over pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnswerKeyLayout {
    /// All sections share one page as titled sub-grids (default)
    SharedPage,
    /// Each section gets its own dedicated page
    PerSection,
}

/// One grid cell of the answer sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerSlot {
    /// Number label, e.g. `7.`; `None` when no such question exists
    pub label: Option<String>,
    /// Correct choice letter A-E; `None` when unknown or out of range
    pub choice: Option<char>,
}

/// One section's answer grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerKeyGrid {
    /// Grid title (the section name, uppercased)
    pub title: String,
    pub lesson_code: Option<String>,
    pub colors: ColorPair,
    pub slots: Vec<AnswerSlot>,
}

/// Slot count for a section: the larger of the declared maximum, the
/// answer count, and 10, rounded up to a multiple of 10.
pub fn total_slots(section: &Section) -> u32 {
    let declared = section.max_question.unwrap_or(0);
    let answers = section.answers.len() as u32;
    let base = declared.max(answers).max(10);
    base.div_ceil(10) * 10
}

/// Build one section's grid.
pub fn build_grid(section: &Section) -> AnswerKeyGrid {
    let slots = (1..=total_slots(section))
        .map(|number| AnswerSlot {
            label: section
                .has_question_number(number)
                .then(|| format!("{}.", number)),
            choice: section
                .answer_for(number)
                .and_then(|entry| entry.choice_letter()),
        })
        .collect();

    AnswerKeyGrid {
        title: section.name.to_uppercase(),
        lesson_code: section.lesson_code.clone(),
        colors: lesson_colors(section.lesson_code.as_deref()),
        slots,
    }
}

/// Builds the answer-key page(s) for a document.
pub struct AnswerKeySheetBuilder {
    layout: AnswerKeyLayout,
}

impl AnswerKeySheetBuilder {
    /// Create a builder with the chosen layout policy.
    pub fn new(layout: AnswerKeyLayout) -> Self {
        Self { layout }
    }

    /// Build the answer-key pages. `pages_created` is the running page
    /// count used for parity; returns no pages for an empty document.
    pub fn build(
        &self,
        document: &ExamDocument,
        factory: &PageFactory,
        pages_created: usize,
    ) -> Vec<Page> {
        if document.tests.is_empty() {
            return Vec::new();
        }

        let grids: Vec<AnswerKeyGrid> = document.tests.iter().map(build_grid).collect();

        match self.layout {
            AnswerKeyLayout::SharedPage => {
                vec![factory.answer_key_page(grids, pages_created)]
            }
            AnswerKeyLayout::PerSection => grids
                .into_iter()
                .enumerate()
                .map(|(i, grid)| factory.answer_key_page(vec![grid], pages_created + i))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerEntry, Question};
    use crate::page::{PageKind, PageMetrics, PageParity};

    fn section(
        questions: &[u32],
        answers: &[(u32, u32)],
        max_question: Option<u32>,
    ) -> Section {
        Section {
            name: "Matematik".to_string(),
            lesson_code: Some("mat".to_string()),
            questions: questions
                .iter()
                .map(|&n| Question {
                    question_number: Some(n),
                    image_url: None,
                })
                .collect(),
            answers: answers
                .iter()
                .map(|&(n, c)| AnswerEntry {
                    question_number: Some(n),
                    correct_choice_index: Some(c),
                })
                .collect(),
            max_question,
            ..Default::default()
        }
    }

    #[test]
    fn test_total_slots_minimum_ten() {
        let s = section(&[1], &[(1, 0)], None);
        assert_eq!(total_slots(&s), 10);
    }

    #[test]
    fn test_total_slots_from_declared_max() {
        let s = section(&[1, 2, 3], &[(1, 0)], Some(25));
        assert_eq!(total_slots(&s), 30);
    }

    #[test]
    fn test_total_slots_from_answer_count() {
        let answers: Vec<(u32, u32)> = (1..=14).map(|n| (n, 0)).collect();
        let s = section(&[1], &answers, Some(5));
        assert_eq!(total_slots(&s), 20);
    }

    #[test]
    fn test_total_slots_exact_multiple() {
        let s = section(&[], &[], Some(20));
        assert_eq!(total_slots(&s), 20);
    }

    #[test]
    fn test_grid_scenario() {
        // Questions [1,2,3], answers (1,A) and (3,C), declared max 10
        let s = section(&[1, 2, 3], &[(1, 0), (3, 2)], Some(10));
        let grid = build_grid(&s);

        assert_eq!(grid.title, "MATEMATIK");
        assert_eq!(grid.slots.len(), 10);

        assert_eq!(grid.slots[0].label.as_deref(), Some("1."));
        assert_eq!(grid.slots[0].choice, Some('A'));
        assert_eq!(grid.slots[1].label.as_deref(), Some("2."));
        assert_eq!(grid.slots[1].choice, None);
        assert_eq!(grid.slots[2].label.as_deref(), Some("3."));
        assert_eq!(grid.slots[2].choice, Some('C'));
        for slot in &grid.slots[3..] {
            assert_eq!(slot.label, None);
            assert_eq!(slot.choice, None);
        }
    }

    #[test]
    fn test_grid_answer_without_question() {
        let s = section(&[1], &[(7, 3)], None);
        let grid = build_grid(&s);

        // No question 7, so no label, but the answer still renders
        assert_eq!(grid.slots[6].label, None);
        assert_eq!(grid.slots[6].choice, Some('D'));
    }

    #[test]
    fn test_grid_invalid_choice_index_blank() {
        let s = section(&[1], &[(1, 9)], None);
        let grid = build_grid(&s);
        assert_eq!(grid.slots[0].label.as_deref(), Some("1."));
        assert_eq!(grid.slots[0].choice, None);
    }

    fn two_section_document() -> ExamDocument {
        ExamDocument {
            tests: vec![
                section(&[1, 2], &[(1, 0)], Some(10)),
                Section {
                    name: "Fizik".to_string(),
                    ..section(&[1], &[(1, 4)], Some(10))
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_shared_page_layout() {
        let doc = two_section_document();
        let factory = PageFactory::new(PageMetrics::default());
        let builder = AnswerKeySheetBuilder::new(AnswerKeyLayout::SharedPage);

        let pages = builder.build(&doc, &factory, 4);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].parity, PageParity::Odd);
        assert_eq!(pages[0].number, None);
        match &pages[0].kind {
            PageKind::AnswerKey(p) => {
                assert_eq!(p.grids.len(), 2);
                assert_eq!(p.grids[1].title, "FIZIK");
            }
            other => panic!("unexpected kind: {}", other.name()),
        }
    }

    #[test]
    fn test_per_section_layout() {
        let doc = two_section_document();
        let factory = PageFactory::new(PageMetrics::default());
        let builder = AnswerKeySheetBuilder::new(AnswerKeyLayout::PerSection);

        let pages = builder.build(&doc, &factory, 4);
        assert_eq!(pages.len(), 2);
        // Parity keeps alternating across the emitted pages
        assert_eq!(pages[0].parity, PageParity::Odd);
        assert_eq!(pages[1].parity, PageParity::Even);
    }

    #[test]
    fn test_empty_document_no_pages() {
        let factory = PageFactory::new(PageMetrics::default());
        let builder = AnswerKeySheetBuilder::new(AnswerKeyLayout::SharedPage);
        let pages = builder.build(&ExamDocument::default(), &factory, 0);
        assert!(pages.is_empty());
    }
}
