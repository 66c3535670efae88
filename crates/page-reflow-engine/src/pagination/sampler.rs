//! Layout sampling: clean geometry for every top-level block.

use log::debug;

use crate::pagination::breaks::BlockExtent;
use crate::pagination::decorations::DecorationSet;
use crate::surface::{BlockNode, BlockRect, PassId, Surface, Transaction};

/// One measured block
#[derive(Debug, Clone, PartialEq)]
pub struct SampledBlock<E> {
    pub node: BlockNode,
    pub element: E,
    pub rect: BlockRect,
}

/// Per-pass geometry, indexed by measurement order.
///
/// Owned by a single pass and dropped with it; nothing keeps rects around
/// between passes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySnapshot<E> {
    pub blocks: Vec<SampledBlock<E>>,
}

impl<E> GeometrySnapshot<E> {
    pub fn empty() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn get(&self, index: usize) -> Option<&SampledBlock<E>> {
        self.blocks.get(index)
    }

    /// Extents in snapshot order, ready for the break calculator
    pub fn extents(&self) -> Vec<BlockExtent> {
        self.blocks
            .iter()
            .map(|b| BlockExtent::new(b.rect.top, b.rect.bottom))
            .collect()
    }
}

/// Remove every pagination decoration and let layout settle.
///
/// Measuring with pushes still in place would count them twice.
pub fn clear_decorations<S: Surface>(surface: &mut S, pass: PassId) {
    surface.apply_decorations(DecorationSet::empty(pass), Transaction::pagination(pass));
    surface.flush_layout();
}

/// Measure the surface as it currently lays out
pub fn measure<S: Surface>(surface: &S) -> GeometrySnapshot<S::Element> {
    if !surface.is_mounted() {
        return GeometrySnapshot::empty();
    }

    let blocks = surface
        .top_level_blocks()
        .into_iter()
        .filter_map(|rendered| match surface.measure_rect(&rendered.element) {
            Some(rect) => Some(SampledBlock {
                node: rendered.node,
                element: rendered.element,
                rect,
            }),
            None => {
                debug!("block {} has no layout box, skipping", rendered.node.index);
                None
            }
        })
        .collect();

    GeometrySnapshot { blocks }
}

/// Clear, flush, then measure
pub fn sample<S: Surface>(surface: &mut S, pass: PassId) -> GeometrySnapshot<S::Element> {
    if !surface.is_mounted() {
        return GeometrySnapshot::empty();
    }
    clear_decorations(surface, pass);
    measure(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::decorations::{Decoration, TrailingMargin};
    use crate::surface::headless::{HeadlessSurface, LayoutMetrics};

    fn metrics() -> LayoutMetrics {
        LayoutMetrics {
            width: 400.0,
            char_width: 10.0,
            line_height: 20.0,
            heading_scale: 1.5,
            block_spacing: 10.0,
        }
    }

    #[test]
    fn test_unmounted_surface_samples_nothing() {
        let mut surface = HeadlessSurface::unmounted("Hello\n\nWorld\n", metrics());
        let snapshot = sample(&mut surface, PassId(1));
        assert!(snapshot.is_empty());
        // Nothing was written to the surface either
        assert!(surface.take_notices().is_empty());
    }

    #[test]
    fn test_empty_document_samples_nothing() {
        let mut surface = HeadlessSurface::new("", metrics());
        assert!(sample(&mut surface, PassId(1)).is_empty());
    }

    #[test]
    fn test_blocks_are_measured_in_order_from_origin() {
        let mut surface = HeadlessSurface::new("First\n\nSecond\n\nThird\n", metrics());
        let snapshot = sample(&mut surface, PassId(1));

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.blocks[0].rect, BlockRect::new(0.0, 20.0));
        assert_eq!(snapshot.blocks[1].rect, BlockRect::new(30.0, 50.0));
        assert_eq!(snapshot.blocks[2].rect, BlockRect::new(60.0, 80.0));
        assert_eq!(
            snapshot.extents(),
            vec![
                BlockExtent::new(0.0, 20.0),
                BlockExtent::new(30.0, 50.0),
                BlockExtent::new(60.0, 80.0),
            ]
        );
    }

    #[test]
    fn test_sampling_clears_previous_pushes() {
        let mut surface = HeadlessSurface::new("First\n\nSecond\n", metrics());
        let pushed = DecorationSet::new(
            PassId(1),
            vec![Decoration::Margin(TrailingMargin {
                anchor: 0..5,
                push_pixels: 500.0,
            })],
        );
        surface.apply_decorations(pushed, Transaction::pagination(PassId(1)));
        surface.flush_layout();
        assert_eq!(measure(&surface).blocks[1].rect.top, 530.0);

        let snapshot = sample(&mut surface, PassId(2));
        assert_eq!(snapshot.blocks[1].rect.top, 30.0);
        assert!(surface.decorations().is_empty());
    }

    #[test]
    fn test_detached_block_is_still_measured() {
        let mut surface = HeadlessSurface::new("First\n\nSecond\n", metrics());
        surface.detach(0);
        // Detached elements keep their last layout box; only resolution fails
        assert_eq!(sample(&mut surface, PassId(1)).len(), 2);
    }
}
