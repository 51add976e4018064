//! Pickup / drop / merge rules.

use gridmerge_common::{GridCoord, Token};

use crate::state::GameState;
use crate::world::CellState;

/// A legal transition and its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    PickedUp(Token),
    Dropped(Token),
    Merged { value: Token, goal_reached: bool },
}

/// Why an interaction changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InteractError {
    #[error("cell is {distance} cells away, reach is {radius}")]
    TooFar { distance: u32, radius: u32 },
    #[error("nothing to do here")]
    NothingToDo,
}

/// Pure transition table: `(held, cell) -> (held', cell')`.
pub fn transition(
    held: Option<Token>,
    cell: CellState,
    target: Token,
) -> Result<(Option<Token>, CellState, Outcome), InteractError> {
    match (held, cell.token_value) {
        (None, Some(v)) => Ok((None, CellState::EMPTY, Outcome::PickedUp(v))),
        (Some(h), None) => Ok((None, CellState::with_token(h), Outcome::Dropped(h))),
        (Some(h), Some(v)) if h == v => {
            let value = h.doubled().ok_or(InteractError::NothingToDo)?;
            let goal_reached = value.value() >= target.value();
            Ok((
                None,
                CellState::with_token(value),
                Outcome::Merged {
                    value,
                    goal_reached,
                },
            ))
        }
        _ => Err(InteractError::NothingToDo),
    }
}

/// Apply the interact action against `coord`.
///
/// The range check runs first; on any error nothing is mutated. A legal
/// transition commits `coord` to the world store before returning.
pub fn interact(
    state: &mut GameState,
    coord: GridCoord,
    radius: u32,
    target: Token,
) -> Result<Outcome, InteractError> {
    let distance = state.player_cell().chebyshev(coord);
    if distance > radius {
        return Err(InteractError::TooFar { distance, radius });
    }

    let cell = state.world.resolve(coord);
    let (held, cell, outcome) = transition(state.player.held, cell, target)?;
    state.player.held = held;
    state.world.commit(coord, cell);
    tracing::debug!(%coord, ?outcome, "interact");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmerge_common::{GameConfig, LatLng};

    fn tok(v: u64) -> Token {
        Token::new(v).unwrap()
    }

    fn empty_world_state() -> GameState {
        let config = GameConfig {
            origin: LatLng::new(0.0, 0.0),
            tile_size: 1.0,
            spawn_probability: 0.0,
            ..GameConfig::default()
        };
        let mut state = GameState::new(&config);
        state.player.position = LatLng::new(0.5, 0.5);
        state
    }

    #[test]
    fn table_pickup() {
        let (held, cell, out) = transition(None, CellState::with_token(tok(4)), tok(32)).unwrap();
        assert_eq!(held, None);
        assert!(cell.is_empty());
        assert_eq!(out, Outcome::PickedUp(tok(4)));
    }

    #[test]
    fn table_drop() {
        let (held, cell, out) = transition(Some(tok(2)), CellState::EMPTY, tok(32)).unwrap();
        assert_eq!(held, None);
        assert_eq!(cell.token_value, Some(tok(2)));
        assert_eq!(out, Outcome::Dropped(tok(2)));
    }

    #[test]
    fn table_merge_and_goal() {
        let (_, cell, out) = transition(Some(tok(8)), CellState::with_token(tok(8)), tok(32)).unwrap();
        assert_eq!(cell.token_value, Some(tok(16)));
        assert_eq!(
            out,
            Outcome::Merged {
                value: tok(16),
                goal_reached: false
            }
        );

        let (_, _, out) = transition(Some(tok(16)), CellState::with_token(tok(16)), tok(32)).unwrap();
        assert_eq!(
            out,
            Outcome::Merged {
                value: tok(32),
                goal_reached: true
            }
        );
    }

    #[test]
    fn table_illegal_pairs() {
        assert_eq!(
            transition(Some(tok(2)), CellState::with_token(tok(4)), tok(32)),
            Err(InteractError::NothingToDo)
        );
        assert_eq!(
            transition(None, CellState::EMPTY, tok(32)),
            Err(InteractError::NothingToDo)
        );
    }

    #[test]
    fn merge_overflow_is_nothing_to_do() {
        let max = tok(1 << 63);
        assert_eq!(
            transition(Some(max), CellState::with_token(max), tok(32)),
            Err(InteractError::NothingToDo)
        );
    }

    #[test]
    fn too_far_is_checked_before_table() {
        let mut state = empty_world_state();
        state.player.held = Some(tok(1));
        let before = state.clone();
        let err = interact(&mut state, GridCoord::new(0, 4), 3, tok(32)).unwrap_err();
        assert_eq!(err, InteractError::TooFar { distance: 4, radius: 3 });
        assert_eq!(state, before);
    }

    #[test]
    fn illegal_interaction_leaves_no_override() {
        let mut state = empty_world_state();
        let err = interact(&mut state, GridCoord::new(1, 1), 3, tok(32)).unwrap_err();
        assert_eq!(err, InteractError::NothingToDo);
        assert_eq!(state.world.override_count(), 0);
    }

    #[test]
    fn legal_interaction_commits() {
        let mut state = empty_world_state();
        state.player.held = Some(tok(1));
        let out = interact(&mut state, GridCoord::new(-3, 3), 3, tok(32)).unwrap();
        assert_eq!(out, Outcome::Dropped(tok(1)));
        assert!(state.world.is_overridden(GridCoord::new(-3, 3)));
        assert_eq!(state.player.held, None);

        let out = interact(&mut state, GridCoord::new(-3, 3), 3, tok(32)).unwrap();
        assert_eq!(out, Outcome::PickedUp(tok(1)));
        assert_eq!(state.world.resolve(GridCoord::new(-3, 3)), CellState::EMPTY);
    }
}
