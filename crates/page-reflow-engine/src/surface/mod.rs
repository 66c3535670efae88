/*!
 * # Editing Surface Boundary
 *
 * The pagination engine never owns the document. It talks to whatever renders
 * the document through the [`Surface`] trait, which exposes exactly what the
 * pipeline needs:
 *
 * - the ordered top-level blocks, each paired with its rendered element
 * - the element's rectangle relative to the surface origin
 * - the element's logical position in the document tree
 * - an atomic replace-all for presentational decorations
 * - a layout flush, standing in for "wait one frame"
 *
 * Change notifications flow the other way: the host forwards every
 * [`ChangeNotice`] it observes to the [`Paginator`](crate::Paginator). Each
 * notice carries the [`Origin`] of the transaction that caused it, so the
 * engine can recognise (and ignore) the repaints its own decorations cause.
 *
 * [`headless::HeadlessSurface`] is a deterministic in-memory implementation
 * used by the tests and the terminal viewer.
 */

pub mod headless;

use std::fmt::Debug;
use std::ops::Range;

use crate::pagination::decorations::DecorationSet;
use crate::pagination::error::ResolveError;

/// Identifies one pagination pass
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct PassId(pub u64);

impl PassId {
    pub fn next(self) -> Self {
        PassId(self.0 + 1)
    }
}

/// Who issued the mutation behind a change notification
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Origin {
    /// Local user editing
    User,
    /// Edits arriving from a collaborator
    Remote,
    /// Reflow with no transaction behind it (resize, font load)
    Layout,
    /// Decorations written by the pagination engine during the given pass
    Pagination(PassId),
}

impl Origin {
    /// True for mutations the pagination engine issued itself
    pub fn is_pagination(&self) -> bool {
        matches!(self, Origin::Pagination(_))
    }
}

/// Metadata attached to every mutation applied to the surface
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Transaction {
    pub origin: Origin,
}

impl Transaction {
    pub fn pagination(pass: PassId) -> Self {
        Self {
            origin: Origin::Pagination(pass),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ChangeKind {
    /// Document tree changed (blocks added, removed, edited, decorated)
    Structural,
    /// Surface or viewport dimensions changed
    Size,
}

/// A change observed by the host, forwarded to the scheduler
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ChangeNotice {
    pub kind: ChangeKind,
    pub origin: Origin,
}

impl ChangeNotice {
    pub fn structural(origin: Origin) -> Self {
        Self {
            kind: ChangeKind::Structural,
            origin,
        }
    }

    /// Size change from plain reflow
    pub fn size() -> Self {
        Self::size_from(Origin::Layout)
    }

    /// Size change caused by a transaction's mutation
    pub fn size_from(origin: Origin) -> Self {
        Self {
            kind: ChangeKind::Size,
            origin,
        }
    }
}

/// A top-level node of the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
    /// Ordinal among the top-level blocks
    pub index: usize,
    /// Position range `[start, end)` in the document
    pub range: Range<usize>,
}

/// A block together with the element currently rendering it
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock<E> {
    pub node: BlockNode,
    pub element: E,
}

/// Vertical extent of a rendered element, relative to the surface origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockRect {
    pub top: f64,
    pub bottom: f64,
}

impl BlockRect {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Logical position of a node in the document tree
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct NodePosition(pub usize);

/// The live editing surface, as seen by the pagination engine
pub trait Surface {
    /// Handle to whatever renders a block (DOM node, widget id, ...)
    type Element: Clone + Debug;

    /// False until the surface has a live layout to measure
    fn is_mounted(&self) -> bool;

    /// Direct child blocks in document order
    fn top_level_blocks(&self) -> Vec<RenderedBlock<Self::Element>>;

    /// Surface-relative rectangle, `None` if the element has no layout box
    fn measure_rect(&self, element: &Self::Element) -> Option<BlockRect>;

    /// Map a rendered element back to its node position
    fn resolve_position(&self, element: &Self::Element) -> Result<NodePosition, ResolveError>;

    /// Replace every pagination decoration at once
    fn apply_decorations(&mut self, set: DecorationSet, tx: Transaction);

    /// Bring layout up to date with everything applied so far.
    ///
    /// A size change caused by decorations is reported with the origin of the
    /// transaction that applied them.
    fn flush_layout(&mut self);
}
