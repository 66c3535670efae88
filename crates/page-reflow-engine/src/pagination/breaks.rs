//! Page break calculation.
//!
//! Pure geometry: takes the vertical extents of the top-level blocks as they
//! render with no pagination applied, and decides which blocks must be pushed
//! onto a later page. No surface access, so everything here is unit testable
//! on plain numbers.
//!
//! A block that straddles a page boundary is moved by growing the trailing
//! margin of the block *before* it. A block taller than a page is never split;
//! the content after it keeps flowing and is paginated on full page steps.

use log::trace;

/// Vertical extent of one block, in pixels from the surface origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockExtent {
    pub top: f64,
    pub bottom: f64,
}

impl BlockExtent {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    /// Lay out blocks with the given heights back to back from zero
    pub fn stacked(heights: &[f64]) -> Vec<Self> {
        let mut top = 0.0;
        heights
            .iter()
            .map(|height| {
                let extent = Self::new(top, top + height);
                top += height;
                extent
            })
            .collect()
    }
}

/// Where a page ends and how far the following content must move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBreakPoint {
    /// Index of the block that receives the trailing push
    pub after_block_index: usize,
    /// Extra trailing space, including the gap between pages
    pub push_pixels: f64,
    /// Number of the page that ends at this break
    pub page_number: u32,
}

/// Where a page begins once the plan's pushes are in place
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageStart {
    pub number: u32,
    /// First block whose top lies at or below the start of the page
    pub first_block: usize,
    /// Offset of the page's first content row
    pub top: f64,
    /// Push that opened the page; zero when the page began without a break
    pub push_pixels: f64,
}

/// Output of one calculation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BreakPlan {
    pub breaks: Vec<PageBreakPoint>,
    /// Every page the content reaches, in order
    pub pages: Vec<PageStart>,
    /// Number of the last page the content reaches
    pub last_page: u32,
}

impl BreakPlan {
    pub fn is_empty(&self) -> bool {
        self.breaks.is_empty()
    }
}

/// Compute page breaks with page numbering starting at 1
pub fn compute_breaks(extents: &[BlockExtent], page_height: f64, gap_height: f64) -> BreakPlan {
    compute_breaks_with_first_page(extents, page_height, gap_height, 1)
}

pub fn compute_breaks_with_first_page(
    extents: &[BlockExtent],
    page_height: f64,
    gap_height: f64,
    first_page: u32,
) -> BreakPlan {
    let mut plan = BreakPlan {
        breaks: Vec::new(),
        pages: Vec::new(),
        last_page: first_page,
    };
    if extents.is_empty() || !page_height.is_finite() || page_height <= 0.0 {
        return plan;
    }
    let first_top = extents[0].top;
    plan.pages.push(PageStart {
        number: first_page,
        first_block: 0,
        top: if first_top.is_finite() { first_top } else { 0.0 },
        push_pixels: 0.0,
    });
    let gap_height = if gap_height.is_finite() {
        gap_height.max(0.0)
    } else {
        0.0
    };

    let mut page_bottom = page_height;
    let mut cumulative_offset = 0.0;
    let mut page = first_page;

    for (index, extent) in extents.iter().enumerate() {
        let top = extent.top + cumulative_offset;
        // Inverted rects measure as empty
        let bottom = extent.bottom.max(extent.top) + cumulative_offset;
        if !top.is_finite() || !bottom.is_finite() {
            trace!("block {index} has no finite extent, skipped");
            continue;
        }

        loop {
            if bottom <= page_bottom {
                trace!("block {index} fits above {page_bottom}");
                break;
            }

            if top >= page_bottom {
                // Jump straight to the page containing the top edge
                let skipped = ((top - page_bottom) / page_height).floor() as u64 + 1;
                for _ in 0..skipped {
                    page = page.saturating_add(1);
                    plan.pages.push(PageStart {
                        number: page,
                        first_block: index,
                        top: page_bottom,
                        push_pixels: 0.0,
                    });
                    page_bottom += page_height;
                }
                trace!("block {index} starts past the boundary, page bottom now {page_bottom}");
                continue;
            }

            // Straddles the boundary
            if index == 0 {
                // Nothing before it to push; let it overflow this page
                trace!("first block overflows page {page}, not pushed");
                page = page.saturating_add(1);
                plan.pages.push(PageStart {
                    number: page,
                    first_block: 1,
                    top: page_bottom,
                    push_pixels: 0.0,
                });
                page_bottom += page_height;
                continue;
            }

            // Capped for out-of-order input; sorted geometry never reaches the cap
            let push = ((page_bottom - top) + gap_height).min(page_height + gap_height);
            plan.breaks.push(PageBreakPoint {
                after_block_index: index - 1,
                push_pixels: push,
                page_number: page,
            });
            trace!("block {index} straddles {page_bottom}, pushing by {push}");
            cumulative_offset += push;
            page_bottom += page_height + push;
            page = page.saturating_add(1);
            plan.pages.push(PageStart {
                number: page,
                first_block: index,
                top: top + push,
                push_pixels: push,
            });
            break;
        }
    }

    plan.last_page = page;
    plan
}
