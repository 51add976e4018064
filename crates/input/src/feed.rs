use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use gridmerge_common::LatLng;

use crate::movement::{MoveCallback, MoveEvent, MovementError, MovementSource};

#[derive(Debug)]
struct FeedState {
    available: bool,
    listening: bool,
    pending: VecDeque<LatLng>,
}

/// Host side of a positioning source: where absolute fixes come in.
///
/// Cheap to clone; all clones feed the same queue. Fixes pushed while no
/// [`PositionFeed`] is listening are dropped.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    state: Rc<RefCell<FeedState>>,
}

impl FeedHandle {
    pub fn new() -> Self {
        Self::with_availability(true)
    }

    /// A host without positioning capability.
    pub fn unavailable() -> Self {
        Self::with_availability(false)
    }

    fn with_availability(available: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(FeedState {
                available,
                listening: false,
                pending: VecDeque::new(),
            })),
        }
    }

    /// Queue a fix. Returns false if it was dropped.
    pub fn push_fix(&self, position: LatLng) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.listening || !position.is_finite() {
            return false;
        }
        state.pending.push_back(position);
        true
    }
}

impl Default for FeedHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Push-based source: every delivered fix is authoritative.
pub struct PositionFeed {
    handle: FeedHandle,
    callback: Option<MoveCallback>,
    running: bool,
}

impl PositionFeed {
    pub fn new(handle: FeedHandle) -> Self {
        Self {
            handle,
            callback: None,
            running: false,
        }
    }
}

impl MovementSource for PositionFeed {
    fn start(&mut self) -> Result<(), MovementError> {
        let mut state = self.handle.state.borrow_mut();
        if !state.available {
            return Err(MovementError::Unavailable(
                "positioning is not supported on this host".into(),
            ));
        }
        state.listening = true;
        self.running = true;
        tracing::debug!("position feed started");
        Ok(())
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }
        let mut state = self.handle.state.borrow_mut();
        state.listening = false;
        state.pending.clear();
        self.running = false;
        tracing::debug!("position feed stopped");
    }

    fn on_move(&mut self, callback: MoveCallback) {
        self.callback = Some(callback);
    }

    fn pump(&mut self, _now: Instant, _current: LatLng) {
        if !self.running {
            return;
        }
        let fixes: Vec<LatLng> = self.handle.state.borrow_mut().pending.drain(..).collect();
        if let Some(cb) = self.callback.as_mut() {
            for fix in fixes {
                cb(MoveEvent::fix(fix));
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
