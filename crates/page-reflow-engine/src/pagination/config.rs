use std::time::Duration;

use crate::pagination::error::PaginationError;

/// Default gap between simulated pages, in pixels
pub const DEFAULT_GAP_HEIGHT: f64 = 24.0;

/// Placeholder substituted with the upcoming page number in header templates
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Paper presets, measured at 96 CSS pixels per inch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageSize {
    A4,
    Letter,
    Legal,
    Custom(f64),
}

impl PageSize {
    /// Printable page height in pixels
    pub fn height_px(&self) -> f64 {
        match self {
            // 297mm
            PageSize::A4 => 1123.0,
            // 11in
            PageSize::Letter => 1056.0,
            // 14in
            PageSize::Legal => 1344.0,
            PageSize::Custom(px) => *px,
        }
    }
}

/// Settings the host application controls through `configure`
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationConfig {
    pub page_height: f64,
    pub gap_height: f64,
    pub enabled: bool,
    /// Number printed on the first simulated page
    pub first_page_number: u32,
    /// Header text shown for the page that starts after each gap, `{page}` expands
    pub header_template: Option<String>,
    /// How far the gap bar extends past the content margins on each side
    pub bleed: f64,
}

impl PaginationConfig {
    pub fn new(page_height: f64, gap_height: f64, enabled: bool) -> Result<Self, PaginationError> {
        let config = Self {
            page_height,
            gap_height,
            enabled,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn for_page_size(size: PageSize) -> Result<Self, PaginationError> {
        Self::new(size.height_px(), DEFAULT_GAP_HEIGHT, true)
    }

    pub fn with_first_page_number(mut self, first_page_number: u32) -> Self {
        self.first_page_number = first_page_number;
        self
    }

    pub fn with_header_template(mut self, template: impl Into<String>) -> Self {
        self.header_template = Some(template.into());
        self
    }

    pub fn with_bleed(mut self, bleed: f64) -> Self {
        self.bleed = bleed;
        self
    }

    /// Check every numeric field; builders do not validate on their own
    pub fn validate(&self) -> Result<(), PaginationError> {
        if !self.page_height.is_finite() || self.page_height <= 0.0 {
            return Err(PaginationError::InvalidPageHeight(self.page_height));
        }
        if !self.gap_height.is_finite() || self.gap_height < 0.0 {
            return Err(PaginationError::InvalidGapHeight(self.gap_height));
        }
        if !self.bleed.is_finite() || self.bleed < 0.0 {
            return Err(PaginationError::InvalidBleed(self.bleed));
        }
        if self.first_page_number == 0 {
            return Err(PaginationError::InvalidFirstPage);
        }
        Ok(())
    }

    /// Header text for the page numbered `page`, if a template is set
    pub fn header_for(&self, page: u32) -> Option<String> {
        self.header_template
            .as_ref()
            .map(|template| template.replace(PAGE_PLACEHOLDER, &page.to_string()))
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_height: PageSize::A4.height_px(),
            gap_height: DEFAULT_GAP_HEIGHT,
            enabled: true,
            first_page_number: 1,
            header_template: None,
            bleed: 48.0,
        }
    }
}

/// Debounce timings for the recalculation scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Quiet period after a document structure change
    pub structural_debounce: Duration,
    /// Quiet period after a viewport or container resize
    pub size_debounce: Duration,
    /// Size notices arriving this soon after a pass are the pass's own repaint
    pub settle_guard: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            structural_debounce: Duration::from_millis(250),
            size_debounce: Duration::from_millis(200),
            settle_guard: Duration::from_millis(50),
        }
    }
}
