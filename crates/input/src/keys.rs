use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use gridmerge_common::LatLng;

use crate::movement::{MoveCallback, MoveEvent, MovementError, MovementSource};

/// A manual movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    North,
    South,
    West,
    East,
}

impl Direction {
    /// WASD mapping, case-insensitive.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "w" => Some(Self::North),
            "s" => Some(Self::South),
            "a" => Some(Self::West),
            "d" => Some(Self::East),
            _ => None,
        }
    }

    /// Unit delta as (lat, lng).
    fn unit(self) -> (f64, f64) {
        match self {
            Self::North => (1.0, 0.0),
            Self::South => (-1.0, 0.0),
            Self::West => (0.0, -1.0),
            Self::East => (0.0, 1.0),
        }
    }
}

/// Host side of the keyboard: which directions are held.
#[derive(Debug, Clone, Default)]
pub struct KeyHandle {
    held: Rc<RefCell<BTreeSet<Direction>>>,
}

impl KeyHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&self, dir: Direction) {
        self.held.borrow_mut().insert(dir);
    }

    pub fn key_up(&self, dir: Direction) {
        self.held.borrow_mut().remove(&dir);
    }

    pub fn is_held(&self, dir: Direction) -> bool {
        self.held.borrow().contains(&dir)
    }

    pub fn release_all(&self) {
        self.held.borrow_mut().clear();
    }

    fn delta(&self, step: f64) -> (f64, f64) {
        self.held.borrow().iter().fold((0.0, 0.0), |(lat, lng), dir| {
            let (dl, dn) = dir.unit();
            (lat + dl * step, lng + dn * step)
        })
    }
}

/// Poll-based source: while keys are held, steps the player once per
/// `interval`. Every step is a relative nudge, never authoritative.
pub struct KeyRepeatMovement {
    keys: KeyHandle,
    step: f64,
    interval: Duration,
    last_step: Option<Instant>,
    callback: Option<MoveCallback>,
    running: bool,
}

impl KeyRepeatMovement {
    /// `step` is in degrees per axis, usually one tile.
    pub fn new(keys: KeyHandle, step: f64, interval: Duration) -> Self {
        Self {
            keys,
            step,
            interval,
            last_step: None,
            callback: None,
            running: false,
        }
    }
}

impl MovementSource for KeyRepeatMovement {
    fn start(&mut self) -> Result<(), MovementError> {
        self.running = true;
        self.last_step = None;
        tracing::debug!(interval = ?self.interval, "key repeat started");
        Ok(())
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.last_step = None;
        self.keys.release_all();
        tracing::debug!("key repeat stopped");
    }

    fn on_move(&mut self, callback: MoveCallback) {
        self.callback = Some(callback);
    }

    fn pump(&mut self, now: Instant, current: LatLng) {
        if !self.running {
            return;
        }
        let (d_lat, d_lng) = self.keys.delta(self.step);
        if d_lat == 0.0 && d_lng == 0.0 {
            return;
        }
        if let Some(last) = self.last_step {
            if now.saturating_duration_since(last) < self.interval {
                return;
            }
        }
        self.last_step = Some(now);
        if let Some(cb) = self.callback.as_mut() {
            cb(MoveEvent::nudge(current.offset(d_lat, d_lng)));
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
