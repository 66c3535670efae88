pub mod pagination;
pub mod surface;

// Re-export key types for easier usage
pub use pagination::{
    breaks::*, config::*, decorations::*, error::*, mapper::*, page_map::*, sampler::*,
    scheduler::*,
};
pub use surface::{headless::*, *};
