//! Deterministic in-memory surface.
//!
//! Holds a Markdown document in an xi-rope buffer and lays its top-level
//! blocks out with a fixed-pitch text model: prose wraps greedily on words,
//! code and tables never wrap, headings use a taller line. Geometry is only
//! recomputed on [`Surface::flush_layout`] after decorations change, the way a
//! browser only reflows on the next frame.
//!
//! Every mutation queues the [`ChangeNotice`]s a real surface would fire;
//! hosts drain them with [`HeadlessSurface::take_notices`].

use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag};
use xi_rope::{Delta, Rope};

use crate::pagination::decorations::{DecorationSet, PageGapWidget};
use crate::pagination::error::ResolveError;
use crate::surface::{
    BlockNode, BlockRect, ChangeNotice, NodePosition, Origin, PassId, RenderedBlock, Surface,
    Transaction,
};

/// Handle to one rendering of a block; re-rendering issues a new id
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ElementId(pub u64);

/// Top-level block kinds the layout model distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    BlockQuote,
    List,
    CodeBlock,
    Table,
    Rule,
    Html,
    Other,
}

impl BlockKind {
    fn wraps(&self) -> bool {
        !matches!(self, BlockKind::CodeBlock | BlockKind::Table | BlockKind::Rule)
    }
}

/// Fixed-pitch text layout model, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    /// Content width available to each block
    pub width: f64,
    pub char_width: f64,
    pub line_height: f64,
    /// Heading lines are this many times taller
    pub heading_scale: f64,
    /// Natural space after every block
    pub block_spacing: f64,
}

impl LayoutMetrics {
    /// Character-cell layout: one cell is 12x24 px
    pub fn terminal(columns: u16) -> Self {
        Self {
            width: f64::from(columns) * 12.0,
            char_width: 12.0,
            line_height: 24.0,
            heading_scale: 1.0,
            block_spacing: 24.0,
        }
    }

    fn columns(&self) -> usize {
        if self.char_width <= 0.0 {
            return usize::MAX;
        }
        ((self.width / self.char_width).floor() as usize).max(1)
    }

    fn line_height_for(&self, kind: BlockKind) -> f64 {
        match kind {
            BlockKind::Heading(_) => self.line_height * self.heading_scale,
            _ => self.line_height,
        }
    }
}

impl Default for LayoutMetrics {
    /// US Letter with one-inch margins at 96 dpi
    fn default() -> Self {
        Self {
            width: 624.0,
            char_width: 8.0,
            line_height: 24.0,
            heading_scale: 1.5,
            block_spacing: 16.0,
        }
    }
}

/// One row of a character-cell rendering
#[derive(Debug, Clone, PartialEq)]
pub enum VisualLine {
    Text { block: usize, text: String },
    Blank,
    Gap {
        ended_page: u32,
        header: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct RenderedNode {
    element: ElementId,
    kind: BlockKind,
    range: Range<usize>,
    lines: Vec<String>,
    detached: bool,
}

impl RenderedNode {
    fn height(&self, metrics: &LayoutMetrics) -> f64 {
        self.lines.len() as f64 * metrics.line_height_for(self.kind)
    }
}

pub struct HeadlessSurface {
    buffer: Rope,
    metrics: LayoutMetrics,
    mounted: bool,
    nodes: Vec<RenderedNode>,
    next_element: u64,
    decorations: DecorationSet,
    /// Geometry as of the last layout
    layout: Vec<BlockRect>,
    content_height: f64,
    /// Origin of decorations applied but not laid out yet
    pending_origin: Option<Origin>,
    notices: Vec<ChangeNotice>,
}

impl HeadlessSurface {
    pub fn new(markdown: &str, metrics: LayoutMetrics) -> Self {
        let mut surface = Self::unmounted(markdown, metrics);
        surface.mounted = true;
        surface.relayout();
        surface
    }

    /// A surface whose document is loaded but not rendered yet
    pub fn unmounted(markdown: &str, metrics: LayoutMetrics) -> Self {
        let mut surface = Self {
            buffer: Rope::from(markdown),
            metrics,
            mounted: false,
            nodes: Vec::new(),
            next_element: 0,
            decorations: DecorationSet::empty(PassId::default()),
            layout: Vec::new(),
            content_height: 0.0,
            pending_origin: None,
            notices: Vec::new(),
        };
        surface.render();
        surface
    }

    pub fn mount(&mut self) {
        if !self.mounted {
            self.mounted = true;
            self.relayout();
        }
    }

    /// Document content; decorations never appear here
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    /// Decorations currently applied
    pub fn decorations(&self) -> &DecorationSet {
        &self.decorations
    }

    pub fn content_height(&self) -> f64 {
        self.content_height
    }

    pub fn block_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drain queued change notices, oldest first
    pub fn take_notices(&mut self) -> Vec<ChangeNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Change the available width; prose re-wraps immediately
    pub fn set_width(&mut self, width: f64) {
        if width == self.metrics.width {
            return;
        }
        self.metrics.width = width;
        self.pending_origin = None;
        self.render();
        self.relayout();
    }

    /// Replace `range` with `text` as a local user edit
    pub fn edit(&mut self, range: Range<usize>, text: &str) {
        self.edit_with_origin(range, text, Origin::User);
    }

    /// Replace `range` with `text`; out-of-bounds ranges are clamped
    pub fn edit_with_origin(&mut self, range: Range<usize>, text: &str, origin: Origin) {
        let source = self.buffer.to_string();
        let range = clamp_to_char_boundaries(&source, range);
        let delta = Delta::simple_edit(range, Rope::from(text), self.buffer.len());

        self.buffer = delta.apply(&self.buffer);
        // Held decorations ride along until the next pass replaces them
        self.decorations = self.decorations.map_through(&delta);
        self.pending_origin = None;
        self.render();
        self.notices.push(ChangeNotice::structural(origin));
        self.relayout();
    }

    pub fn insert(&mut self, at: usize, text: &str) {
        self.edit(at..at, text);
    }

    /// Add a new paragraph after the last block
    pub fn append_paragraph(&mut self, text: &str) {
        let source = self.buffer.to_string();
        let separator = match source.len() - source.trim_end_matches('\n').len() {
            _ if source.is_empty() => "",
            0 => "\n\n",
            1 => "\n",
            _ => "",
        };
        let end = self.buffer.len();
        self.edit(end..end, &format!("{separator}{text}\n"));
    }

    /// Drop a block's element from the document tree; it keeps its box
    pub fn detach(&mut self, index: usize) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.detached = true;
        }
    }

    /// Rows for a character-cell display, one per `line_height`
    pub fn visual_lines(&self) -> Vec<VisualLine> {
        let line_height = self.metrics.line_height;
        let rows = |px: f64| -> usize {
            if line_height <= 0.0 {
                0
            } else {
                (px / line_height).round().max(0.0) as usize
            }
        };

        let mut out = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            let per_line = rows(self.metrics.line_height_for(node.kind)).max(1);
            for line in &node.lines {
                out.push(VisualLine::Text {
                    block: index,
                    text: line.clone(),
                });
                out.extend(std::iter::repeat_n(VisualLine::Blank, per_line - 1));
            }

            let last = index + 1 == self.nodes.len();
            let mut trailing = if last { 0 } else { rows(self.metrics.block_spacing) };
            let push = self.decorations.margin_for(&node.range);
            let widget = self.decorations.widget_at(node.range.end);
            let gap_rows = match widget {
                Some(widget) => rows(widget.gap_height).max(1),
                None => 0,
            };
            trailing += rows(push).max(gap_rows) - gap_rows;
            out.extend(std::iter::repeat_n(VisualLine::Blank, trailing));
            if let Some(widget) = widget {
                out.extend(gap_rows_for(widget, gap_rows));
            }
        }
        out
    }

    /// Plain-text rendering of [`visual_lines`](Self::visual_lines)
    pub fn render_text(&self) -> String {
        self.visual_lines()
            .iter()
            .map(|line| match line {
                VisualLine::Text { text, .. } => text.clone(),
                VisualLine::Blank => String::new(),
                VisualLine::Gap { ended_page, header } => match header {
                    Some(header) => format!("==== {ended_page} ==== {header}"),
                    None => format!("==== {ended_page} ===="),
                },
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn next_element_id(&mut self) -> ElementId {
        self.next_element += 1;
        ElementId(self.next_element)
    }

    /// Rebuild rendered nodes from the buffer; every block gets a fresh element
    fn render(&mut self) {
        let source = self.buffer.to_string();
        let columns = self.metrics.columns();
        let blocks = scan_blocks(&source);

        self.nodes = blocks
            .into_iter()
            .map(|(kind, range)| {
                let lines = layout_lines(&source[range.clone()], kind, columns);
                RenderedNode {
                    element: self.next_element_id(),
                    kind,
                    range,
                    lines,
                    detached: false,
                }
            })
            .collect();
    }

    /// Recompute geometry; queues a size notice when the content height moves
    fn relayout(&mut self) {
        let origin = self.pending_origin.take().unwrap_or(Origin::Layout);
        if !self.mounted {
            return;
        }

        let mut y = 0.0;
        let mut height = 0.0;
        self.layout = self
            .nodes
            .iter()
            .map(|node| {
                let rect = BlockRect::new(y, y + node.height(&self.metrics));
                height = rect.bottom;
                y = rect.bottom
                    + self.metrics.block_spacing
                    + self.decorations.margin_for(&node.range);
                rect
            })
            .collect();
        if let Some(last) = self.nodes.last() {
            height += self.decorations.margin_for(&last.range);
        }

        if height != self.content_height {
            self.content_height = height;
            self.notices.push(ChangeNotice::size_from(origin));
        }
    }

    fn node_index(&self, element: &ElementId) -> Option<usize> {
        self.nodes.iter().position(|node| node.element == *element)
    }
}

impl Surface for HeadlessSurface {
    type Element = ElementId;

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn top_level_blocks(&self) -> Vec<RenderedBlock<ElementId>> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| RenderedBlock {
                node: BlockNode {
                    index,
                    range: node.range.clone(),
                },
                element: node.element,
            })
            .collect()
    }

    fn measure_rect(&self, element: &ElementId) -> Option<BlockRect> {
        if !self.mounted {
            return None;
        }
        self.node_index(element)
            .and_then(|index| self.layout.get(index))
            .copied()
    }

    fn resolve_position(&self, element: &ElementId) -> Result<NodePosition, ResolveError> {
        let index = self.node_index(element).ok_or(ResolveError::Detached)?;
        let node = &self.nodes[index];
        if node.detached {
            return Err(ResolveError::Detached);
        }
        Ok(NodePosition(node.range.start))
    }

    fn apply_decorations(&mut self, set: DecorationSet, tx: Transaction) {
        self.decorations = set;
        self.pending_origin = Some(tx.origin);
        self.notices.push(ChangeNotice::structural(tx.origin));
    }

    fn flush_layout(&mut self) {
        self.relayout();
    }
}

fn gap_rows_for(widget: &PageGapWidget, rows: usize) -> impl Iterator<Item = VisualLine> + '_ {
    (0..rows).map(move |row| {
        if row + 1 == rows {
            VisualLine::Gap {
                ended_page: widget.ended_page,
                header: widget.header.clone(),
            }
        } else {
            VisualLine::Blank
        }
    })
}

fn clamp_to_char_boundaries(source: &str, range: Range<usize>) -> Range<usize> {
    let mut start = range.start.min(source.len());
    let mut end = range.end.min(source.len()).max(start);
    while !source.is_char_boundary(start) {
        start -= 1;
    }
    while !source.is_char_boundary(end) {
        end += 1;
    }
    start..end
}

/// Kind and trimmed byte range of each top-level Markdown block
fn scan_blocks(source: &str) -> Vec<(BlockKind, Range<usize>)> {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut blocks = Vec::new();
    let mut depth = 0usize;

    for (event, range) in Parser::new_ext(source, options).into_offset_iter() {
        let kind = match event {
            Event::Start(tag) => {
                depth += 1;
                if depth > 1 {
                    continue;
                }
                block_kind(&tag)
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                continue;
            }
            Event::Rule if depth == 0 => BlockKind::Rule,
            _ => continue,
        };

        let trimmed = source[range.clone()].trim_end().len();
        if trimmed > 0 {
            blocks.push((kind, range.start..range.start + trimmed));
        }
    }

    blocks
}

fn block_kind(tag: &Tag<'_>) -> BlockKind {
    match tag {
        Tag::Paragraph => BlockKind::Paragraph,
        Tag::Heading { level, .. } => BlockKind::Heading(*level as u8),
        Tag::BlockQuote(..) => BlockKind::BlockQuote,
        Tag::List(..) => BlockKind::List,
        Tag::CodeBlock(..) => BlockKind::CodeBlock,
        Tag::Table(..) => BlockKind::Table,
        Tag::HtmlBlock => BlockKind::Html,
        _ => BlockKind::Other,
    }
}

/// Visual lines of one block at the given column count
fn layout_lines(text: &str, kind: BlockKind, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for source_line in text.lines() {
        if kind.wraps() {
            wrap_words(source_line, columns, &mut lines);
        } else {
            lines.push(source_line.to_string());
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Greedy word wrap; words longer than a line are hard-split
fn wrap_words(line: &str, columns: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > columns {
            if current_len > 0 {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(columns);
            out.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current_len == 0 {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > columns {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || out.is_empty() {
        out.push(current);
    }
}
