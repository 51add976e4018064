use gridmerge_common::{GridCoord, Token};
use gridmerge_kernel::{CellState, GameState, WorldStore};

/// World inspector for developer tooling.
///
/// Read-only queries against a game state, for debugging and the CLI.
pub struct WorldInspector;

impl WorldInspector {
    /// Summarize the player and the override store.
    pub fn summary(state: &GameState, live_cells: usize) -> WorldSummary {
        let overrides = state.world.overrides();
        WorldSummary {
            overrides: overrides.len(),
            occupied_overrides: overrides.values().filter(|c| !c.is_empty()).count(),
            highest_token: overrides.values().filter_map(|c| c.token_value).max(),
            held: state.player.held,
            player_cell: state.player_cell(),
            live_cells,
        }
    }

    /// Resolve one cell and report where its state comes from.
    pub fn inspect_cell(world: &WorldStore, coord: GridCoord) -> CellInfo {
        let origin = if world.is_overridden(coord) {
            CellOrigin::Overridden
        } else {
            CellOrigin::Generated
        };
        CellInfo {
            coord,
            state: world.resolve(coord),
            origin,
        }
    }

    /// Every committed coordinate, in key order.
    pub fn list_overrides(world: &WorldStore) -> Vec<GridCoord> {
        world.overrides().keys().copied().collect()
    }
}

/// Summary of game state for the inspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldSummary {
    pub overrides: usize,
    pub occupied_overrides: usize,
    pub highest_token: Option<Token>,
    pub held: Option<Token>,
    pub player_cell: GridCoord,
    pub live_cells: usize,
}

impl std::fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "World: player=[{}] held={} overrides={} occupied={} highest={} live={}",
            self.player_cell,
            display_token(self.held),
            self.overrides,
            self.occupied_overrides,
            display_token(self.highest_token),
            self.live_cells,
        )
    }
}

/// Whether a cell's state is committed or still the generator default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOrigin {
    Generated,
    Overridden,
}

/// Detailed info about a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellInfo {
    pub coord: GridCoord,
    pub state: CellState,
    pub origin: CellOrigin,
}

impl std::fmt::Display for CellInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let origin = match self.origin {
            CellOrigin::Generated => "generated",
            CellOrigin::Overridden => "overridden",
        };
        write!(
            f,
            "Cell [{}] token={} ({origin})",
            self.coord,
            display_token(self.state.token_value),
        )
    }
}

fn display_token(token: Option<Token>) -> String {
    token.map_or_else(|| "none".to_string(), |t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmerge_common::{GameConfig, LatLng};

    fn tok(v: u64) -> Token {
        Token::new(v).unwrap()
    }

    fn state() -> GameState {
        GameState::new(&GameConfig {
            origin: LatLng::new(0.0, 0.0),
            tile_size: 1.0,
            ..GameConfig::default()
        })
    }

    #[test]
    fn summary_fresh_state() {
        let summary = WorldInspector::summary(&state(), 0);
        assert_eq!(summary.overrides, 0);
        assert_eq!(summary.highest_token, None);
        assert_eq!(summary.player_cell, GridCoord::new(0, 0));
    }

    #[test]
    fn summary_counts_overrides() {
        let mut s = state();
        s.world.commit(GridCoord::new(1, 1), CellState::with_token(tok(8)));
        s.world.commit(GridCoord::new(2, 2), CellState::with_token(tok(2)));
        s.world.commit(GridCoord::new(3, 3), CellState::EMPTY);
        s.player.held = Some(tok(4));

        let summary = WorldInspector::summary(&s, 17);
        assert_eq!(summary.overrides, 3);
        assert_eq!(summary.occupied_overrides, 2);
        assert_eq!(summary.highest_token, Some(tok(8)));
        assert_eq!(summary.held, Some(tok(4)));
        assert_eq!(summary.live_cells, 17);
    }

    #[test]
    fn inspect_cell_reports_origin() {
        let mut world = WorldStore::new(1.0);
        let coord = GridCoord::new(-4, 9);
        let info = WorldInspector::inspect_cell(&world, coord);
        assert_eq!(info.origin, CellOrigin::Generated);
        assert_eq!(info.state, CellState::with_token(Token::ONE));

        world.commit(coord, CellState::EMPTY);
        let info = WorldInspector::inspect_cell(&world, coord);
        assert_eq!(info.origin, CellOrigin::Overridden);
        assert!(info.state.is_empty());
        assert_eq!(info.to_string(), "Cell [-4,9] token=none (overridden)");
    }

    #[test]
    fn list_overrides_in_key_order() {
        let mut world = WorldStore::new(0.0);
        world.commit(GridCoord::new(2, 0), CellState::EMPTY);
        world.commit(GridCoord::new(-1, 5), CellState::EMPTY);
        assert_eq!(
            WorldInspector::list_overrides(&world),
            vec![GridCoord::new(-1, 5), GridCoord::new(2, 0)]
        );
    }

    #[test]
    fn summary_display() {
        let summary = WorldInspector::summary(&state(), 3);
        let s = format!("{summary}");
        assert!(s.contains("held=none"));
        assert!(s.contains("live=3"));
    }
}
