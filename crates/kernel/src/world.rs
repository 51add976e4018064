use gridmerge_common::{GridCoord, Token};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::generator;

/// Content of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellState {
    pub token_value: Option<Token>,
}

impl CellState {
    pub const EMPTY: CellState = CellState { token_value: None };

    pub fn with_token(token: Token) -> Self {
        Self {
            token_value: Some(token),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token_value.is_none()
    }
}

/// Sparse record of every cell the player has changed.
///
/// Only grows through explicit commits. BTreeMap keeps iteration (and
/// therefore save output) deterministic.
pub type OverrideStore = BTreeMap<GridCoord, CellState>;

/// The world: generator defaults shadowed by committed overrides.
///
/// The override map is the only mutable ground truth. Everything else,
/// including the live cell cache, is re-derivable from it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldStore {
    overrides: OverrideStore,
    spawn_probability: f64,
}

impl WorldStore {
    pub fn new(spawn_probability: f64) -> Self {
        Self {
            overrides: OverrideStore::new(),
            spawn_probability,
        }
    }

    /// Current state of any cell. No side effects.
    pub fn resolve(&self, coord: GridCoord) -> CellState {
        match self.overrides.get(&coord) {
            Some(state) => *state,
            None => generator::generate(coord, self.spawn_probability),
        }
    }

    /// Record `state` for `coord`, empty states included.
    ///
    /// Once committed, a coordinate never falls back to the generator.
    pub fn commit(&mut self, coord: GridCoord, state: CellState) {
        tracing::debug!(%coord, token = ?state.token_value, "commit");
        self.overrides.insert(coord, state);
    }

    pub fn is_overridden(&self, coord: GridCoord) -> bool {
        self.overrides.contains_key(&coord)
    }

    pub fn overrides(&self) -> &OverrideStore {
        &self.overrides
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Install a loaded store, discarding whatever was there.
    pub fn replace_overrides(&mut self, overrides: OverrideStore) {
        self.overrides = overrides;
    }

    /// Forget every override.
    pub fn clear(&mut self) {
        self.overrides.clear();
    }
}
