//! World Kernel: authoritative game state and the rules that mutate it.
//!
//! # Invariants
//! - Cell defaults are a pure function of the coordinate.
//! - Once a coordinate is committed, the generator is never consulted for it again.
//! - Every held or placed token is a power of two.
//! - All state mutations flow through [`WorldStore::commit`] and [`interaction::interact`].

pub mod generator;
pub mod interaction;
pub mod state;
pub mod world;

pub use interaction::{InteractError, Outcome};
pub use state::{GameState, MovementMode, PlayerState};
pub use world::{CellState, OverrideStore, WorldStore};
