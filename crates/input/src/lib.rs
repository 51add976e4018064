//! Movement sources: every way the player can be moved, behind one contract.
//!
//! # Invariants
//! - Exactly one subscriber per source; `on_move` replaces it.
//! - After `stop`, a source never calls its subscriber again.
//! - Absolute fixes are authoritative; key steps are not.

mod feed;
mod keys;
mod movement;
mod scripted;

pub use feed::{FeedHandle, PositionFeed};
pub use keys::{Direction, KeyHandle, KeyRepeatMovement};
pub use movement::{MoveCallback, MoveEvent, MovementError, MovementSource};
pub use scripted::ScriptedMovement;
