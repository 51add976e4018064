use gridmerge_common::{GameConfig, GridCoord, GridSpec, LatLng, Token};
use serde::{Deserialize, Serialize};

use crate::world::WorldStore;

/// Which movement source drives the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementMode {
    /// Absolute fixes from a positioning source.
    #[default]
    Geolocation,
    /// Relative key-driven steps.
    Manual,
}

impl MovementMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Geolocation => Self::Manual,
            Self::Manual => Self::Geolocation,
        }
    }

    pub fn uses_geolocation(self) -> bool {
        self == Self::Geolocation
    }

    pub fn from_geolocation_flag(flag: bool) -> Self {
        if flag {
            Self::Geolocation
        } else {
            Self::Manual
        }
    }
}

/// Player position, held token and movement mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub position: LatLng,
    pub held: Option<Token>,
    pub mode: MovementMode,
}

impl PlayerState {
    pub fn new(position: LatLng) -> Self {
        Self {
            position,
            held: None,
            mode: MovementMode::default(),
        }
    }
}

/// Everything one session owns and persists: the player and the world diff.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub player: PlayerState,
    pub world: WorldStore,
    grid: GridSpec,
}

impl GameState {
    /// Fresh state: player at the origin, nothing held, no overrides.
    pub fn new(config: &GameConfig) -> Self {
        Self {
            player: PlayerState::new(config.origin),
            world: WorldStore::new(config.spawn_probability),
            grid: config.grid(),
        }
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn player_cell(&self) -> GridCoord {
        self.grid.to_cell(self.player.position)
    }
}
