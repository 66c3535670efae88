/*!
 * # Pagination Pipeline
 *
 * Simulated page boundaries for a continuously flowing document. The document
 * itself is never modified: pages exist only as presentational decorations
 * that push content down and draw a gap bar where one page ends.
 *
 * ## Flow
 *
 * One recalculation pass runs these stages in order:
 *
 * 1. [`sampler`] clears the previous pass's decorations, lets layout settle,
 *    and measures every top-level block.
 * 2. [`breaks`] decides, on plain numbers, which blocks straddle a page
 *    boundary and how far the following content must move.
 * 3. [`mapper`] resolves each break's anchor block to a document position.
 *    A failure drops only that break.
 * 4. [`decorations`] turns resolved breaks into one complete
 *    [`DecorationSet`](decorations::DecorationSet), applied atomically.
 * 5. [`page_map`] reads the settled layout back into page start offsets.
 *
 * [`scheduler`] decides *when* a pass runs: it debounces change notices,
 * spreads a pass over frames, and keeps the engine from reacting to its own
 * decorations.
 *
 * ## Units
 *
 * All geometry is in surface pixels measured from the surface origin. Page
 * numbers start at [`PaginationConfig::first_page_number`](config::PaginationConfig).
 */

pub mod breaks;
pub mod config;
pub mod decorations;
pub mod error;
pub mod mapper;
pub mod page_map;
pub mod sampler;
pub mod scheduler;
