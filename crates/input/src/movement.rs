use std::time::Instant;

use gridmerge_common::LatLng;

/// One position update from a movement source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveEvent {
    pub position: LatLng,
    /// True for absolute fixes, which are persisted immediately.
    /// False for incremental nudges, which only update memory.
    pub authoritative: bool,
}

impl MoveEvent {
    pub fn fix(position: LatLng) -> Self {
        Self {
            position,
            authoritative: true,
        }
    }

    pub fn nudge(position: LatLng) -> Self {
        Self {
            position,
            authoritative: false,
        }
    }
}

/// The single subscriber of a movement source.
pub type MoveCallback = Box<dyn FnMut(MoveEvent)>;

/// Errors from starting a movement source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MovementError {
    #[error("movement source unavailable: {0}")]
    Unavailable(String),
}

/// A source of player movement.
///
/// Everything runs on the control thread: the session calls `pump` from its
/// event loop and the source invokes the callback zero or more times from
/// inside it. After `stop` returns, the callback is never invoked again
/// until the next `start`.
pub trait MovementSource {
    fn start(&mut self) -> Result<(), MovementError>;

    fn stop(&mut self);

    /// Install the subscriber, replacing any previous one.
    fn on_move(&mut self, callback: MoveCallback);

    /// Deliver whatever is due at `now`. `current` is the player's position,
    /// which relative sources step from.
    fn pump(&mut self, now: Instant, current: LatLng);

    fn is_running(&self) -> bool;
}
