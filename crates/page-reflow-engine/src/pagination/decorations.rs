//! Presentational artifacts for simulated page boundaries.
//!
//! Each break becomes two decorations anchored on the block before the
//! boundary: a trailing margin that moves the following content down, and a
//! non-editable gap bar drawn inside that margin. A [`DecorationSet`] always
//! describes the complete pagination state of one pass; surfaces replace their
//! previous set wholesale and never merge.

use std::ops::Range;

use xi_rope::delta::Transformer;
use xi_rope::{Delta, RopeInfo};

use crate::pagination::config::PaginationConfig;
use crate::pagination::mapper::ResolvedBreak;
use crate::surface::PassId;

/// Extra space after a block, equal to the break's push
#[derive(Debug, Clone, PartialEq)]
pub struct TrailingMargin {
    /// Position range of the decorated block
    pub anchor: Range<usize>,
    pub push_pixels: f64,
}

/// The bar separating two simulated pages.
///
/// Occupies the bottom `gap_height` pixels of the preceding block's trailing
/// margin, so it takes no flow space of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGapWidget {
    /// Widget sits at this position, after the anchor block
    pub pos: usize,
    /// The page that ends at this gap
    pub ended_page: u32,
    /// The page that starts after it
    pub next_page: u32,
    pub gap_height: f64,
    /// Horizontal overhang past the content margins on each side
    pub bleed: f64,
    /// Header placeholder for `next_page`
    pub header: Option<String>,
}

impl PageGapWidget {
    /// Stable identity so renderers can reuse the same element across passes
    pub fn key(&self) -> String {
        format!("page-gap-{}", self.ended_page)
    }

    /// Markup for DOM-backed surfaces
    pub fn to_html(&self) -> String {
        let header = match &self.header {
            Some(text) => format!(
                r#"<span class="page-header">{}</span>"#,
                html_escape::encode_text(text)
            ),
            None => String::new(),
        };
        format!(
            concat!(
                r#"<div class="page-gap" contenteditable="false" data-key="{key}" "#,
                r#"style="height:{height}px;margin-left:-{bleed}px;margin-right:-{bleed}px">"#,
                r#"<span class="page-number">{page}</span>{header}</div>"#
            ),
            key = self.key(),
            height = self.gap_height,
            bleed = self.bleed,
            page = self.ended_page,
            header = header,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decoration {
    Margin(TrailingMargin),
    Widget(PageGapWidget),
}

impl Decoration {
    /// Position the decoration is keyed by
    pub fn anchor_pos(&self) -> usize {
        match self {
            Decoration::Margin(margin) => margin.anchor.start,
            Decoration::Widget(widget) => widget.pos,
        }
    }

    /// Follow an edit made before the next pass replaces this decoration.
    ///
    /// Returns `None` when the decorated block was deleted.
    pub fn map_through(&self, transformer: &mut Transformer<'_, RopeInfo>) -> Option<Decoration> {
        match self {
            Decoration::Margin(margin) => {
                let start = transformer.transform(margin.anchor.start, true);
                let end = transformer.transform(margin.anchor.end, false);
                (start < end).then(|| {
                    Decoration::Margin(TrailingMargin {
                        anchor: start..end,
                        push_pixels: margin.push_pixels,
                    })
                })
            }
            Decoration::Widget(widget) => Some(Decoration::Widget(PageGapWidget {
                pos: transformer.transform(widget.pos, false),
                ..widget.clone()
            })),
        }
    }
}

/// Every decoration produced by one pass
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationSet {
    pub pass: PassId,
    decorations: Vec<Decoration>,
}

impl DecorationSet {
    pub fn new(pass: PassId, mut decorations: Vec<Decoration>) -> Self {
        decorations.sort_by_key(Decoration::anchor_pos);
        Self { pass, decorations }
    }

    pub fn empty(pass: PassId) -> Self {
        Self {
            pass,
            decorations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter()
    }

    pub fn margins(&self) -> impl Iterator<Item = &TrailingMargin> {
        self.decorations.iter().filter_map(|d| match d {
            Decoration::Margin(margin) => Some(margin),
            Decoration::Widget(_) => None,
        })
    }

    pub fn widgets(&self) -> impl Iterator<Item = &PageGapWidget> {
        self.decorations.iter().filter_map(|d| match d {
            Decoration::Widget(widget) => Some(widget),
            Decoration::Margin(_) => None,
        })
    }

    /// Total trailing push on the block spanning `range`
    pub fn margin_for(&self, range: &Range<usize>) -> f64 {
        self.margins()
            .filter(|m| m.anchor == *range)
            .map(|m| m.push_pixels)
            .sum()
    }

    /// The gap widget sitting at `pos`, if any
    pub fn widget_at(&self, pos: usize) -> Option<&PageGapWidget> {
        self.widgets().find(|w| w.pos == pos)
    }

    /// Carry the set through a document edit
    pub fn map_through(&self, delta: &Delta<RopeInfo>) -> DecorationSet {
        let mut transformer = Transformer::new(delta);
        let decorations = self
            .decorations
            .iter()
            .filter_map(|d| d.map_through(&mut transformer))
            .collect();
        DecorationSet::new(self.pass, decorations)
    }
}

/// Turn resolved breaks into the full decoration set for a pass
pub fn synthesize(
    resolved: &[ResolvedBreak],
    config: &PaginationConfig,
    pass: PassId,
) -> DecorationSet {
    let mut decorations = Vec::with_capacity(resolved.len() * 2);

    for brk in resolved {
        let anchor = brk.anchor_range();
        let next_page = brk.point.page_number.saturating_add(1);

        decorations.push(Decoration::Margin(TrailingMargin {
            anchor: anchor.clone(),
            push_pixels: brk.point.push_pixels,
        }));
        decorations.push(Decoration::Widget(PageGapWidget {
            pos: anchor.end,
            ended_page: brk.point.page_number,
            next_page,
            gap_height: config.gap_height,
            bleed: config.bleed,
            header: config.header_for(next_page),
        }));
    }

    DecorationSet::new(pass, decorations)
}
