use std::collections::VecDeque;
use std::time::Instant;

use gridmerge_common::LatLng;

use crate::movement::{MoveCallback, MoveEvent, MovementError, MovementSource};

/// Deterministic source for tests and replays: emits queued events on the next pump.
pub struct ScriptedMovement {
    queue: VecDeque<MoveEvent>,
    callback: Option<MoveCallback>,
    available: bool,
    running: bool,
}

impl ScriptedMovement {
    pub fn new(events: impl IntoIterator<Item = MoveEvent>) -> Self {
        Self {
            queue: events.into_iter().collect(),
            callback: None,
            available: true,
            running: false,
        }
    }

    /// A source whose `start` always fails.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new([])
        }
    }

    pub fn push(&mut self, event: MoveEvent) {
        self.queue.push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl MovementSource for ScriptedMovement {
    fn start(&mut self) -> Result<(), MovementError> {
        if !self.available {
            return Err(MovementError::Unavailable("scripted source disabled".into()));
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn on_move(&mut self, callback: MoveCallback) {
        self.callback = Some(callback);
    }

    fn pump(&mut self, _now: Instant, _current: LatLng) {
        if !self.running {
            return;
        }
        if let Some(cb) = self.callback.as_mut() {
            while let Some(event) = self.queue.pop_front() {
                cb(event);
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
