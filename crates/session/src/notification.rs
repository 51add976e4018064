use gridmerge_common::{GridCoord, Token};
use gridmerge_kernel::InteractError;

/// Transient, dismissable messages for the player. None of them end the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    TooFar { distance: u32, radius: u32 },
    NothingToDo,
    GoalReached { value: Token },
    /// The targeted cell has no live representation.
    NotActive(GridCoord),
    MovementUnavailable(String),
    /// A save existed but could not be used; the session started fresh.
    SaveDiscarded(String),
    SaveFailed(String),
}

impl From<InteractError> for Notification {
    fn from(e: InteractError) -> Self {
        match e {
            InteractError::TooFar { distance, radius } => Self::TooFar { distance, radius },
            InteractError::NothingToDo => Self::NothingToDo,
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFar { .. } => write!(f, "Too far to interact!"),
            Self::NothingToDo => write!(f, "Nothing to do here!"),
            Self::GoalReached { value } => {
                write!(f, "Congratulations! You created a high-value token ({value})!")
            }
            Self::NotActive(coord) => write!(f, "Cell [{coord}] is not on the map."),
            Self::MovementUnavailable(reason) => write!(f, "Movement unavailable: {reason}"),
            Self::SaveDiscarded(reason) => write!(f, "Saved game could not be loaded ({reason}); starting fresh."),
            Self::SaveFailed(reason) => write!(f, "Could not save the game: {reason}"),
        }
    }
}
