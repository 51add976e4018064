//! Session controller: wires the kernel, the active-cell cache, movement,
//! presentation and saves into one playable game.
//!
//! # Invariants
//! - The session is the only owner of [`GameState`](gridmerge_kernel::GameState).
//! - At most one movement source is installed; switching stops the old one first.
//! - Every committed interaction is saved before `interact` returns.
//! - No failure ends the game; problems surface as [`Notification`]s.

mod notification;
mod session;

pub use notification::Notification;
pub use session::{GameSession, MovementFactory, handle_factory};
