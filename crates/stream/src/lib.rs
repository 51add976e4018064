//! Streaming: the active-cell cache that keeps live cells in step with the view.
//!
//! # Invariants
//! - At most one live cell per coordinate; spawning is idempotent.
//! - Cells load and unload without touching world truth.
//! - A cell is live iff it lies in the padded window of the settled viewport or in the
//!   player neighborhood (after each reconcile).

mod cache;

pub use cache::{ActiveCell, ActiveCellCache, CacheStats};
