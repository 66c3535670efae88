//! Mapping measured elements back to document positions.
//!
//! Geometry is indexed by rendered element, decorations by document position.
//! Positions are resolved fresh on every pass; a stale anchor is never
//! patched up, the next pass simply resolves again.

use std::ops::Range;

use log::debug;

use crate::pagination::breaks::PageBreakPoint;
use crate::pagination::error::ResolveError;
use crate::pagination::sampler::GeometrySnapshot;
use crate::surface::{NodePosition, Surface};

/// A break point tied to the node that receives its push
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBreak {
    pub point: PageBreakPoint,
    /// Start of the anchor block
    pub position: NodePosition,
    /// Length of the anchor block in document positions
    pub node_size: usize,
}

impl ResolvedBreak {
    pub fn anchor_range(&self) -> Range<usize> {
        self.position.0..self.position.0 + self.node_size
    }
}

/// A break point that could not be anchored this pass
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedBreak {
    pub point: PageBreakPoint,
    pub reason: ResolveError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappedBreaks {
    pub resolved: Vec<ResolvedBreak>,
    pub dropped: Vec<DroppedBreak>,
}

/// Resolve the anchor block of every break.
///
/// Failures drop only the affected break point.
pub fn resolve_breaks<S: Surface>(
    surface: &S,
    snapshot: &GeometrySnapshot<S::Element>,
    breaks: &[PageBreakPoint],
) -> MappedBreaks {
    let mut mapped = MappedBreaks::default();

    for point in breaks {
        match resolve_one(surface, snapshot, point) {
            Ok(resolved) => mapped.resolved.push(resolved),
            Err(reason) => {
                debug!(
                    "dropping break after block {} (page {}): {reason}",
                    point.after_block_index, point.page_number
                );
                mapped.dropped.push(DroppedBreak {
                    point: *point,
                    reason,
                });
            }
        }
    }

    mapped
}

fn resolve_one<S: Surface>(
    surface: &S,
    snapshot: &GeometrySnapshot<S::Element>,
    point: &PageBreakPoint,
) -> Result<ResolvedBreak, ResolveError> {
    let sampled = snapshot
        .get(point.after_block_index)
        .ok_or(ResolveError::UnknownBlock(point.after_block_index))?;
    let position = surface.resolve_position(&sampled.element)?;

    Ok(ResolvedBreak {
        point: *point,
        position,
        node_size: sampled.node.range.len(),
    })
}
