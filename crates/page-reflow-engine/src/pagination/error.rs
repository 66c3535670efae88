use thiserror::Error;

/// Rejected pagination settings
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaginationError {
    #[error("Page height must be a positive, finite pixel value (got {0})")]
    InvalidPageHeight(f64),
    #[error("Gap height must be a non-negative, finite pixel value (got {0})")]
    InvalidGapHeight(f64),
    #[error("Bleed must be a non-negative, finite pixel value (got {0})")]
    InvalidBleed(f64),
    #[error("First page number must be at least 1")]
    InvalidFirstPage,
}

/// Failure to map a rendered element back to its node position.
///
/// Only ever drops the single break point anchored at that element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Element is no longer attached to the surface")]
    Detached,
    #[error("No measured block at index {0}")]
    UnknownBlock(usize),
}

/// Why a pass finished without touching the surface.
///
/// These are expected transient states, never user-facing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The surface has no live rendering yet
    NotMounted,
    /// The surface is mounted but holds no top-level blocks
    NoBlocks,
    /// Pagination is switched off in the current config
    Disabled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SkipReason::NotMounted => "surface not mounted",
            SkipReason::NoBlocks => "no top-level blocks",
            SkipReason::Disabled => "pagination disabled",
        };
        f.write_str(reason)
    }
}
