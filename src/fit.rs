//! Viewport fitting module
//!
//! Post-layout, non-semantic rescaling: finished pages are uniformly
//! scaled down to fit a narrow viewport while keeping their print
//! proportions, and a wrapper footprint is recorded so document flow
//! matches the visual size. Never affects pagination decisions; runs only
//! after the flow engine has finished.

use serde::Serialize;

use crate::page::{Page, PageMetrics};

/// Default viewport width above which pages render unscaled.
const DEFAULT_BREAKPOINT: f32 = 900.0;

/// Default minimum scale, keeping output legible on tiny viewports.
const DEFAULT_MIN_SCALE: f32 = 0.45;

/// Default safety gutter subtracted from the available width.
const DEFAULT_GUTTER: f32 = 8.0;

/// Uniform presentation transform applied to one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageTransform {
    /// Uniform scale factor in (0, 1]
    pub scale: f32,
    /// Wrapper width: the page's post-scale footprint
    pub width: f32,
    /// Wrapper height: the page's post-scale footprint
    pub height: f32,
}

/// Viewport fitting options
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Viewport width above which scaling is removed entirely
    pub breakpoint: f32,
    /// Lower clamp for the computed scale
    pub min_scale: f32,
    /// Safety gutter subtracted from the available width
    pub gutter: f32,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            breakpoint: DEFAULT_BREAKPOINT,
            min_scale: DEFAULT_MIN_SCALE,
            gutter: DEFAULT_GUTTER,
        }
    }
}

impl FitOptions {
    /// Create a new options builder
    pub fn builder() -> FitOptionsBuilder {
        FitOptionsBuilder::default()
    }
}

/// Builder for FitOptions
#[derive(Debug, Default)]
pub struct FitOptionsBuilder {
    options: FitOptions,
}

impl FitOptionsBuilder {
    /// Set the no-scaling breakpoint width
    #[must_use]
    pub fn breakpoint(mut self, breakpoint: f32) -> Self {
        self.options.breakpoint = breakpoint;
        self
    }

    /// Set the minimum scale clamp (0-1)
    #[must_use]
    pub fn min_scale(mut self, min_scale: f32) -> Self {
        self.options.min_scale = min_scale.clamp(0.0, 1.0);
        self
    }

    /// Set the safety gutter
    #[must_use]
    pub fn gutter(mut self, gutter: f32) -> Self {
        self.options.gutter = gutter;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> FitOptions {
        self.options
    }
}

/// Rescales finished pages to a viewport.
pub struct ViewportFitter {
    options: FitOptions,
    metrics: PageMetrics,
}

impl ViewportFitter {
    /// Create a fitter over the page geometry.
    pub fn new(options: FitOptions, metrics: PageMetrics) -> Self {
        Self { options, metrics }
    }

    /// Fit all pages to `available_width`.
    ///
    /// Above the breakpoint any prior transform is removed; otherwise a
    /// uniform scale is computed from the natural page width, clamped to
    /// the minimum, and stored with the post-scale wrapper footprint.
    pub fn fit(&self, pages: &mut [Page], available_width: f32) {
        if available_width > self.options.breakpoint {
            for page in pages.iter_mut() {
                page.transform = None;
            }
            return;
        }

        let usable = (available_width - self.options.gutter).max(1.0);
        let natural_w = self.metrics.page_width;
        let natural_h = self.metrics.page_height;

        let mut scale = if natural_w > usable {
            usable / natural_w
        } else {
            1.0
        };
        scale = scale.max(self.options.min_scale);

        for page in pages.iter_mut() {
            page.transform = Some(PageTransform {
                scale,
                width: natural_w * scale,
                height: natural_h * scale,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{PageFactory, PageKind};

    fn pages(count: usize) -> Vec<Page> {
        let factory = PageFactory::new(PageMetrics::default());
        (0..count)
            .map(|i| factory.answer_key_page(Vec::new(), i))
            .collect()
    }

    #[test]
    fn test_default_options() {
        let opts = FitOptions::default();
        assert_eq!(opts.breakpoint, 900.0);
        assert_eq!(opts.min_scale, 0.45);
        assert_eq!(opts.gutter, 8.0);
    }

    #[test]
    fn test_builder_clamps_min_scale() {
        let opts = FitOptions::builder().min_scale(1.5).build();
        assert_eq!(opts.min_scale, 1.0);

        let opts = FitOptions::builder().min_scale(-0.2).build();
        assert_eq!(opts.min_scale, 0.0);
    }

    #[test]
    fn test_wide_viewport_resets_transform() {
        let fitter = ViewportFitter::new(FitOptions::default(), PageMetrics::default());
        let mut pages = pages(2);
        pages[0].transform = Some(PageTransform {
            scale: 0.5,
            width: 397.0,
            height: 561.5,
        });

        fitter.fit(&mut pages, 1200.0);
        assert!(pages.iter().all(|p| p.transform.is_none()));
    }

    #[test]
    fn test_narrow_viewport_scales_uniformly() {
        let metrics = PageMetrics::default();
        let fitter = ViewportFitter::new(FitOptions::default(), metrics.clone());
        let mut pages = pages(3);

        fitter.fit(&mut pages, 600.0);

        let expected_scale = (600.0 - 8.0) / metrics.page_width;
        for page in &pages {
            let t = page.transform.unwrap();
            assert!((t.scale - expected_scale).abs() < 0.001);
            assert!((t.width - metrics.page_width * expected_scale).abs() < 0.01);
            assert!((t.height - metrics.page_height * expected_scale).abs() < 0.01);
        }
    }

    #[test]
    fn test_minimum_scale_clamp() {
        let fitter = ViewportFitter::new(FitOptions::default(), PageMetrics::default());
        let mut pages = pages(1);

        fitter.fit(&mut pages, 100.0);
        assert_eq!(pages[0].transform.unwrap().scale, 0.45);
    }

    #[test]
    fn test_viewport_wider_than_page_below_breakpoint() {
        let fitter = ViewportFitter::new(FitOptions::default(), PageMetrics::default());
        let mut pages = pages(1);

        // Below the breakpoint but wider than the page: scale stays 1
        fitter.fit(&mut pages, 880.0);
        let t = pages[0].transform.unwrap();
        assert_eq!(t.scale, 1.0);
        assert_eq!(t.width, PageMetrics::default().page_width);
    }

    #[test]
    fn test_fit_preserves_page_content() {
        let fitter = ViewportFitter::new(FitOptions::default(), PageMetrics::default());
        let mut pages = pages(1);
        fitter.fit(&mut pages, 500.0);
        assert!(matches!(pages[0].kind, PageKind::AnswerKey(_)));
    }
}
