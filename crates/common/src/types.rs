use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a live, rendering-bound cell entity.
///
/// Handles are minted by the active-cell cache and handed to the presenter.
/// They never outlive the entity and are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(pub Uuid);

impl RenderHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RenderHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from constructing a token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token value {0} is not a positive power of two")]
    NotPowerOfTwo(u64),
}

/// A token value: always a positive power of two.
///
/// The only way to get a larger token is [`Token::doubled`], so the invariant
/// holds for every reachable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Token(u64);

impl Token {
    /// The value every generated token starts with.
    pub const ONE: Token = Token(1);

    pub fn new(value: u64) -> Result<Self, TokenError> {
        if value.is_power_of_two() {
            Ok(Self(value))
        } else {
            Err(TokenError::NotPowerOfTwo(value))
        }
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// The merged value, or `None` on overflow.
    pub fn doubled(self) -> Option<Self> {
        self.0.checked_mul(2).map(Self)
    }
}

impl TryFrom<u64> for Token {
    type Error = TokenError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Token> for u64 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
