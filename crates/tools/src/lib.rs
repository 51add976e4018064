//! Developer Tooling: read-only inspection of game state.
//!
//! # Invariants
//! - Inspection never mutates the world or the player.

mod inspector;

pub use inspector::{CellInfo, CellOrigin, WorldInspector, WorldSummary};
