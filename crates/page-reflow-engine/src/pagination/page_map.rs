//! Where each simulated page begins, read from settled geometry.

use log::warn;

use crate::pagination::breaks::{BlockExtent, BreakPlan};
use crate::pagination::mapper::ResolvedBreak;

/// Settled offsets further than this from the plan are reported
const SETTLE_TOLERANCE: f64 = 0.5;

/// The start of one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpan {
    pub number: u32,
    /// Measurement index of the first block starting on the page, or of the
    /// next block when a taller one runs across the whole page
    pub first_block: usize,
    /// Surface offset where the page's content starts
    pub top: f64,
}

/// Page starts for the whole document, as laid out after a pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageMap {
    pub pages: Vec<PageSpan>,
    /// Number of the page the content ends on
    pub last_page: u32,
}

impl PageMap {
    /// Build from the plan's page starts, the breaks that were applied and
    /// the geometry measured once the decorations settled.
    ///
    /// Pages opened by an applied push take the settled top of their first
    /// block. Other pages keep the plan's offset, moved up by the pushes that
    /// could not be applied before them.
    pub fn build(plan: &BreakPlan, settled: &[BlockExtent], applied: &[ResolvedBreak]) -> Self {
        let mut pages = Vec::with_capacity(plan.pages.len());
        let mut missing = 0.0;

        for start in &plan.pages {
            let opened_by_push = start.push_pixels > 0.0;
            let was_applied = opened_by_push
                && applied.iter().any(|brk| brk.point.after_block_index + 1 == start.first_block);
            if opened_by_push && !was_applied {
                missing += start.push_pixels;
            }
            let expected = start.top - missing;

            let top = match settled.get(start.first_block) {
                Some(block) if was_applied => {
                    if (block.top - expected).abs() > SETTLE_TOLERANCE {
                        warn!(
                            "page {} settled at {} instead of {expected}",
                            start.number,
                            block.top
                        );
                    }
                    block.top
                }
                _ => expected,
            };

            pages.push(PageSpan {
                number: start.number,
                first_block: start.first_block,
                top,
            });
        }

        Self {
            pages,
            last_page: plan.last_page,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages spanned by the content, counting ones a tall block runs across
    pub fn page_count(&self) -> u32 {
        match self.pages.first() {
            Some(first) => self.last_page.saturating_sub(first.number) + 1,
            None => 0,
        }
    }

    /// Page on which the block at `index` starts
    pub fn page_of_block(&self, index: usize) -> Option<u32> {
        self.pages
            .iter()
            .take_while(|page| page.first_block <= index)
            .last()
            .map(|page| page.number)
    }

    /// Page whose content region contains the surface offset `offset`
    pub fn page_at_offset(&self, offset: f64) -> Option<u32> {
        self.pages
            .iter()
            .take_while(|page| page.top <= offset)
            .last()
            .map(|page| page.number)
    }
}
